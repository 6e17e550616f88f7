//! The closed set of type node kinds.

use std::fmt;

/// What a [`TypeNode`](crate::TypeNode) describes.
///
/// The set is closed; the binary encoder maps each kind to a fixed on-disk
/// discriminant.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
#[cfg_attr(feature = "interchange", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum TypeKind {
    /// Integer intrinsic (`int`, `char`, `_Bool`, bit-field bases).
    Integer = 1,
    /// Floating point intrinsic.
    Real = 2,
    Pointer = 3,
    Array = 4,
    /// Function signature.
    Function = 5,
    Struct = 6,
    Union = 7,
    Enum = 8,
    /// Forward declaration of a struct, union, or enum.
    Forward = 9,
    /// Typedef whose target is known.
    Typedef = 10,
    /// Typedef still waiting for its target to be bound.
    TypedefUnresolved = 11,
    Volatile = 12,
    Const = 13,
    Restrict = 14,
    /// Pointer-authentication wrapper around a pointer type.
    PtrAuth = 15,
}

impl TypeKind {
    pub const ALL: [TypeKind; 15] = [
        TypeKind::Integer,
        TypeKind::Real,
        TypeKind::Pointer,
        TypeKind::Array,
        TypeKind::Function,
        TypeKind::Struct,
        TypeKind::Union,
        TypeKind::Enum,
        TypeKind::Forward,
        TypeKind::Typedef,
        TypeKind::TypedefUnresolved,
        TypeKind::Volatile,
        TypeKind::Const,
        TypeKind::Restrict,
        TypeKind::PtrAuth,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            TypeKind::Integer => "integer",
            TypeKind::Real => "real",
            TypeKind::Pointer => "pointer",
            TypeKind::Array => "array",
            TypeKind::Function => "function",
            TypeKind::Struct => "struct",
            TypeKind::Union => "union",
            TypeKind::Enum => "enum",
            TypeKind::Forward => "forward",
            TypeKind::Typedef => "typedef",
            TypeKind::TypedefUnresolved => "typedef (unresolved)",
            TypeKind::Volatile => "volatile",
            TypeKind::Const => "const",
            TypeKind::Restrict => "restrict",
            TypeKind::PtrAuth => "ptrauth",
        }
    }

    #[inline]
    pub const fn is_intrinsic(self) -> bool {
        matches!(self, TypeKind::Integer | TypeKind::Real)
    }

    /// Kinds whose payload is a single referenced type.
    #[inline]
    pub const fn is_reference(self) -> bool {
        matches!(
            self,
            TypeKind::Pointer
                | TypeKind::Typedef
                | TypeKind::Volatile
                | TypeKind::Const
                | TypeKind::Restrict
        )
    }

    #[inline]
    pub const fn is_aggregate(self) -> bool {
        matches!(self, TypeKind::Struct | TypeKind::Union)
    }

    /// Kinds that a forward declaration can stand in for.
    #[inline]
    pub const fn is_forwardable(self) -> bool {
        matches!(self, TypeKind::Struct | TypeKind::Union | TypeKind::Enum)
    }
}

impl fmt::Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which tag namespace a forward declaration belongs to.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
#[cfg_attr(feature = "interchange", derive(serde::Serialize, serde::Deserialize))]
pub enum ForwardKind {
    Struct,
    Union,
    Enum,
}

impl ForwardKind {
    /// The definition kind this forward resolves to.
    pub const fn kind(self) -> TypeKind {
        match self {
            ForwardKind::Struct => TypeKind::Struct,
            ForwardKind::Union => TypeKind::Union,
            ForwardKind::Enum => TypeKind::Enum,
        }
    }

    pub const fn of(kind: TypeKind) -> Option<Self> {
        match kind {
            TypeKind::Struct => Some(ForwardKind::Struct),
            TypeKind::Union => Some(ForwardKind::Union),
            TypeKind::Enum => Some(ForwardKind::Enum),
            _ => None,
        }
    }
}
