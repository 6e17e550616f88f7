//! Encoder switches.

use bitflags::bitflags;

bitflags! {
    /// What the encoder emits and how it matches descriptors to symbols.
    #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
    pub struct CtfFlags: u8 {
        /// A local symbol with no static descriptor may bind a global one of
        /// the same name.
        const FUZZY_MATCH = 1 << 0;
        /// Match against dynamic symbols only.
        const USE_DYNSYM = 1 << 1;
        /// zlib-compress everything after the header.
        const COMPRESS = 1 << 2;
        /// Leave the input's debug sections in place. Does not change the
        /// encoded bytes.
        const KEEP_DEBUG_SECTIONS = 1 << 3;
        /// Types only: no object or function sections.
        const MINIMIZE = 1 << 4;
    }
}

impl CtfFlags {
    /// Fuzzy matching only means something when symbols are emitted.
    #[inline]
    pub fn fuzzy(self) -> bool {
        self.contains(CtfFlags::FUZZY_MATCH) && !self.contains(CtfFlags::MINIMIZE)
    }
}
