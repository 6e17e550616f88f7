//! Numeric type identifiers.

use std::fmt;

/// Identifier of a type node inside one [`TypeGraph`](crate::TypeGraph).
///
/// IDs are only unique within their graph until a merge renumbers them into
/// the target's ID space. `0` is reserved for "void / no type".
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Default)]
#[cfg_attr(
    feature = "interchange",
    derive(serde::Serialize, serde::Deserialize),
    serde(transparent)
)]
#[repr(transparent)]
pub struct TypeId(u32);

impl TypeId {
    /// Void / no type.
    pub const VOID: Self = Self(0);

    /// First ID a graph hands out.
    pub const FIRST: Self = Self(1);

    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn is_void(self) -> bool {
        self.0 == 0
    }

    /// The ID after this one, saturating at `u32::MAX`. Graphs never hold
    /// `u32::MAX` itself, so a saturated ID is rejected on insertion.
    #[inline]
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }

    /// The ID after this one, or `None` past the end of the ID space.
    #[inline]
    pub const fn checked_next(self) -> Option<Self> {
        match self.0.checked_add(1) {
            Some(raw) => Some(Self(raw)),
            None => None,
        }
    }

    /// The ID before this one, saturating at void.
    #[inline]
    pub const fn prev(self) -> Self {
        Self(self.0.saturating_sub(1))
    }
}

impl fmt::Debug for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_void() {
            write!(f, "TypeId::VOID")
        } else {
            write!(f, "TypeId({})", self.0)
        }
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}>", self.0)
    }
}

const _: () = assert!(std::mem::size_of::<TypeId>() == 4);
