//! On-disk layout, version 4.
//!
//! ```text
//! header (56 bytes, never compressed)
//!   u16 magic  u8 version  u8 flags
//!   u32 parent_label  u32 parent_name  u32 first_type
//!   u32 n_labels  u32 n_objects  u32 n_functions  u32 n_types
//!   u32 label_off  u32 object_off  u32 function_off  u32 type_off
//!   u32 str_off  u32 str_len
//! data (zlib-compressed when flagged; offsets are into the inflated data)
//!   labels, objects, functions, types, strings
//! ```
//!
//! Little-endian throughout.

use std::io::{self, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use ctf_ir::TypeKind;

use crate::FormatError;

pub const MAGIC: u16 = 0xCFF1;
pub const VERSION: u8 = 4;
pub const HEADER_LEN: usize = 56;

/// Header flag: the data is zlib-compressed.
pub const F_COMPRESSED: u8 = 1 << 0;

/// Symbol index of a descriptor that is not tied to a symbol.
pub const NO_SYMBOL: u32 = u32::MAX;

/// Highest encodable type ID.
pub const MAX_TYPE_ID: u32 = 0x7FFF_FFFF;

const KIND_SHIFT: u32 = 26;
const ROOT_BIT: u32 = 1 << 25;
/// Longest member, enumerator or argument list one entry can hold.
pub const MAX_VLEN: u32 = ROOT_BIT - 1;

/// Pack a type entry's info word.
#[inline]
pub fn type_info(kind: TypeKind, root: bool, vlen: u32) -> u32 {
    debug_assert!(vlen <= MAX_VLEN);
    let root = if root { ROOT_BIT } else { 0 };
    (u32::from(kind as u8) << KIND_SHIFT) | root | (vlen & MAX_VLEN)
}

#[inline]
pub fn info_kind(info: u32) -> u8 {
    #[expect(clippy::cast_possible_truncation, reason = "kind occupies the top six bits")]
    let kind = (info >> KIND_SHIFT) as u8;
    kind
}

#[inline]
pub fn info_root(info: u32) -> bool {
    info & ROOT_BIT != 0
}

#[inline]
pub fn info_vlen(info: u32) -> u32 {
    info & MAX_VLEN
}

/// Fixed-size artifact header.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Header {
    pub version: u8,
    pub flags: u8,
    /// String offset of the parent's label, 0 when there is no parent.
    pub parent_label: u32,
    /// String offset of the parent's name, 0 when there is no parent.
    pub parent_name: u32,
    /// Encoded ID of the first type entry.
    pub first_type: u32,
    pub n_labels: u32,
    pub n_objects: u32,
    pub n_functions: u32,
    pub n_types: u32,
    pub label_off: u32,
    pub object_off: u32,
    pub function_off: u32,
    pub type_off: u32,
    pub str_off: u32,
    pub str_len: u32,
}

impl Header {
    #[inline]
    pub fn is_compressed(&self) -> bool {
        self.flags & F_COMPRESSED != 0
    }

    /// Length of the inflated data.
    #[inline]
    pub fn data_len(&self) -> usize {
        self.str_off as usize + self.str_len as usize
    }

    pub fn write_to(&self, w: &mut impl Write) -> io::Result<()> {
        w.write_u16::<LittleEndian>(MAGIC)?;
        w.write_u8(self.version)?;
        w.write_u8(self.flags)?;
        for word in [
            self.parent_label,
            self.parent_name,
            self.first_type,
            self.n_labels,
            self.n_objects,
            self.n_functions,
            self.n_types,
            self.label_off,
            self.object_off,
            self.function_off,
            self.type_off,
            self.str_off,
            self.str_len,
        ] {
            w.write_u32::<LittleEndian>(word)?;
        }
        Ok(())
    }
}

/// Parse and validate the header at the start of `bytes`.
///
/// Versions other than [`VERSION`] are rejected rather than guessed at.
pub fn read_header(bytes: &[u8]) -> Result<Header, FormatError> {
    let truncated = |needed| FormatError::Truncated {
        needed,
        len: bytes.len(),
    };
    if bytes.len() < 4 {
        return Err(truncated(4));
    }

    let mut r = bytes;
    let magic = r.read_u16::<LittleEndian>().map_err(|_| truncated(2))?;
    if magic != MAGIC {
        return Err(FormatError::BadMagic(magic));
    }
    let version = r.read_u8().map_err(|_| truncated(3))?;
    if version != VERSION {
        return Err(FormatError::UnsupportedVersion(version));
    }
    if bytes.len() < HEADER_LEN {
        return Err(truncated(HEADER_LEN));
    }
    let flags = r.read_u8().map_err(|_| truncated(4))?;

    let mut words = [0u32; 13];
    for word in &mut words {
        *word = r
            .read_u32::<LittleEndian>()
            .map_err(|_| truncated(HEADER_LEN))?;
    }
    let [parent_label, parent_name, first_type, n_labels, n_objects, n_functions, n_types, label_off, object_off, function_off, type_off, str_off, str_len] =
        words;

    let header = Header {
        version,
        flags,
        parent_label,
        parent_name,
        first_type,
        n_labels,
        n_objects,
        n_functions,
        n_types,
        label_off,
        object_off,
        function_off,
        type_off,
        str_off,
        str_len,
    };
    let ordered = header.label_off <= header.object_off
        && header.object_off <= header.function_off
        && header.function_off <= header.type_off
        && header.type_off <= header.str_off;
    if !ordered {
        return Err(FormatError::Corrupt("section offsets out of order".into()));
    }
    Ok(header)
}

#[cfg(test)]
mod tests;
