//! zlib framing of the data that follows the header.

use std::borrow::Cow;
use std::io::{self, Read, Write};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;

use crate::format::{read_header, Header, HEADER_LEN};
use crate::FormatError;

pub(crate) fn compress(data: &[u8]) -> io::Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::with_capacity(data.len() / 2), Compression::default());
    encoder.write_all(data)?;
    encoder.finish()
}

/// The artifact's data, inflated if the header says it is compressed.
///
/// Also checks that the data is as long as the header's string table
/// implies.
pub fn decompress_data(artifact: &[u8]) -> Result<(Header, Cow<'_, [u8]>), FormatError> {
    let header = read_header(artifact)?;
    let payload = &artifact[HEADER_LEN..];

    let data = if header.is_compressed() {
        // The header's lengths are untrusted: inflate at most one byte past
        // what they promise, and grow the buffer only as data arrives.
        let limit = u64::try_from(header.data_len()).map_or(u64::MAX, |n| n.saturating_add(1));
        let mut out = Vec::new();
        ZlibDecoder::new(payload)
            .take(limit)
            .read_to_end(&mut out)
            .map_err(|e| FormatError::Corrupt(format!("inflate: {e}")))?;
        if out.len() > header.data_len() {
            return Err(FormatError::Corrupt(format!(
                "inflates past the {} bytes the header describes",
                header.data_len()
            )));
        }
        Cow::Owned(out)
    } else {
        Cow::Borrowed(payload)
    };

    if data.len() < header.data_len() {
        return Err(FormatError::Truncated {
            needed: HEADER_LEN + header.data_len(),
            len: HEADER_LEN + data.len(),
        });
    }
    Ok((header, data))
}
