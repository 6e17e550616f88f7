//! The string table: every name the artifact mentions, NUL-terminated,
//! each stored once. Offset 0 is the empty string.

use rustc_hash::FxHashMap;

use crate::EncodeError;

pub(crate) struct StringTable {
    bytes: Vec<u8>,
    offsets: FxHashMap<&'static str, u32>,
}

impl StringTable {
    pub(crate) fn new() -> Self {
        let mut offsets = FxHashMap::default();
        offsets.insert("", 0);
        Self {
            bytes: vec![0],
            offsets,
        }
    }

    /// Offset of `s`, adding it on first use.
    pub(crate) fn insert(&mut self, s: &'static str) -> Result<u32, EncodeError> {
        if let Some(&off) = self.offsets.get(s) {
            return Ok(off);
        }
        let off = u32::try_from(self.bytes.len()).map_err(|_| EncodeError::TooLarge {
            what: "string table",
        })?;
        self.bytes.extend_from_slice(s.as_bytes());
        self.bytes.push(0);
        self.offsets.insert(s, off);
        Ok(off)
    }

    pub(crate) fn len(&self) -> usize {
        self.bytes.len()
    }

    pub(crate) fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}
