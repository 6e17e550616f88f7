//! Type nodes and their kind-specific payloads.
//!
//! A node is owned by exactly one [`TypeGraph`](crate::TypeGraph) arena.
//! Edges between nodes are [`TypeId`]s, never references, so cyclic types
//! (a struct holding a pointer to itself) never form ownership cycles.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use bitflags::bitflags;
use smallvec::SmallVec;

use crate::{ForwardKind, Name, TypeId, TypeKind};

/// Inline capacity of a function argument list.
///
/// Most C functions take five or fewer arguments; longer lists spill to the heap.
pub const FUNCARG_DEF: usize = 5;

/// Ordered argument types of a function or function descriptor.
pub type FuncArgs = SmallVec<[TypeId; FUNCARG_DEF]>;

bitflags! {
    /// Per-node flags.
    #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
    pub struct NodeFlags: u8 {
        /// A top-level descriptor points at this node.
        const ROOT = 1 << 0;
        /// Reached from a global symbol.
        const GLOBAL = 1 << 1;
        /// Forward declaration bound to its definition, or typedef bound to its target.
        const RESOLVED = 1 << 2;
    }
}

bitflags! {
    /// Display format bits of an integer intrinsic.
    #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
    pub struct IntFormat: u8 {
        const SIGNED = 1 << 0;
        const CHAR = 1 << 1;
        const BOOL = 1 << 2;
        const VARARGS = 1 << 3;
    }
}

/// Format tags of a real intrinsic.
pub mod real_format {
    pub const SINGLE: u8 = 1;
    pub const DOUBLE: u8 = 2;
    pub const COMPLEX: u8 = 3;
    pub const DOUBLE_COMPLEX: u8 = 4;
    pub const LONG_DOUBLE_COMPLEX: u8 = 5;
    pub const LONG_DOUBLE: u8 = 6;
}

/// Integer or real.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
#[cfg_attr(feature = "interchange", derive(serde::Serialize, serde::Deserialize))]
pub enum IntrinsicEncoding {
    Int,
    Real,
}

/// Leaf description of an integer or floating point type.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
#[cfg_attr(feature = "interchange", derive(serde::Serialize, serde::Deserialize))]
pub struct Intrinsic {
    pub encoding: IntrinsicEncoding,
    pub signed: bool,
    /// [`IntFormat`] bits for integers, a [`real_format`] tag for reals.
    pub format: u8,
    /// Bit offset within the storage unit (bit-fields).
    pub offset_bits: u8,
    /// Width in bits.
    pub bits: u16,
}

impl Intrinsic {
    pub fn int(bits: u16, signed: bool) -> Self {
        let format = if signed {
            IntFormat::SIGNED
        } else {
            IntFormat::empty()
        };
        Self {
            encoding: IntrinsicEncoding::Int,
            signed,
            format: format.bits(),
            offset_bits: 0,
            bits,
        }
    }

    pub fn char(signed: bool) -> Self {
        let mut this = Self::int(8, signed);
        this.format |= IntFormat::CHAR.bits();
        this
    }

    pub fn boolean() -> Self {
        let mut this = Self::int(8, false);
        this.format = IntFormat::BOOL.bits();
        this
    }

    /// A bit-field slice of an integer.
    pub fn bitfield(bits: u16, offset_bits: u8, signed: bool) -> Self {
        let mut this = Self::int(bits, signed);
        this.offset_bits = offset_bits;
        this
    }

    pub fn real(bits: u16, format: u8) -> Self {
        Self {
            encoding: IntrinsicEncoding::Real,
            signed: true,
            format,
            offset_bits: 0,
            bits,
        }
    }
}

/// Array descriptor.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
#[cfg_attr(feature = "interchange", derive(serde::Serialize, serde::Deserialize))]
pub struct ArrayDef {
    pub contents: TypeId,
    pub index: TypeId,
    pub nelems: u32,
}

/// One struct or union member.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct Member {
    /// `None` for anonymous members.
    pub name: Option<Name>,
    pub ty: TypeId,
    pub offset_bits: u32,
    /// Zero unless the member is a bit-field.
    pub size_bits: u32,
}

/// One enumerator.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct Enumerator {
    pub name: Name,
    pub value: i32,
}

/// Function signature.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct FuncDef {
    pub ret: TypeId,
    pub args: FuncArgs,
    pub variadic: bool,
}

/// Pointer-authentication wrapper.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
#[cfg_attr(feature = "interchange", derive(serde::Serialize, serde::Deserialize))]
pub struct PtrAuth {
    pub ty: TypeId,
    pub key: u8,
    pub discriminator: u16,
    pub discriminated: bool,
}

/// Kind-specific data. Exactly one variant is valid for each [`TypeKind`].
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub enum TypePayload {
    Intrinsic(Intrinsic),
    /// Pointer, typedef, volatile, const, restrict.
    Ref(TypeId),
    PtrAuth(PtrAuth),
    Array(ArrayDef),
    Function(FuncDef),
    /// Struct or union members in declaration order.
    Members(Vec<Member>),
    Enumerators(Vec<Enumerator>),
    Forward(ForwardKind),
    /// Unresolved typedef; its target is bound later by name.
    Unresolved,
}

impl TypePayload {
    /// Whether this payload is the one `kind` carries.
    pub fn fits(&self, kind: TypeKind) -> bool {
        match self {
            TypePayload::Intrinsic(i) => match i.encoding {
                IntrinsicEncoding::Int => kind == TypeKind::Integer,
                IntrinsicEncoding::Real => kind == TypeKind::Real,
            },
            TypePayload::Ref(_) => kind.is_reference(),
            TypePayload::PtrAuth(_) => kind == TypeKind::PtrAuth,
            TypePayload::Array(_) => kind == TypeKind::Array,
            TypePayload::Function(_) => kind == TypeKind::Function,
            TypePayload::Members(_) => kind.is_aggregate(),
            TypePayload::Enumerators(_) => kind == TypeKind::Enum,
            TypePayload::Forward(_) => kind == TypeKind::Forward,
            TypePayload::Unresolved => kind == TypeKind::TypedefUnresolved,
        }
    }

    /// Referenced type IDs in payload order.
    ///
    /// Array: contents then index. Function: return then arguments.
    /// Members in declaration order.
    pub fn children(&self) -> SmallVec<[TypeId; 4]> {
        match self {
            TypePayload::Ref(ty) => smallvec::smallvec![*ty],
            TypePayload::PtrAuth(pa) => smallvec::smallvec![pa.ty],
            TypePayload::Array(ad) => smallvec::smallvec![ad.contents, ad.index],
            TypePayload::Function(fd) => {
                let mut out = SmallVec::with_capacity(fd.args.len() + 1);
                out.push(fd.ret);
                out.extend(fd.args.iter().copied());
                out
            }
            TypePayload::Members(members) => members.iter().map(|m| m.ty).collect(),
            TypePayload::Intrinsic(_)
            | TypePayload::Enumerators(_)
            | TypePayload::Forward(_)
            | TypePayload::Unresolved => SmallVec::new(),
        }
    }

    /// Copy of this payload with every referenced ID passed through `f`.
    pub fn map_children(&self, mut f: impl FnMut(TypeId) -> TypeId) -> TypePayload {
        match self {
            TypePayload::Ref(ty) => TypePayload::Ref(f(*ty)),
            TypePayload::PtrAuth(pa) => TypePayload::PtrAuth(PtrAuth {
                ty: f(pa.ty),
                ..*pa
            }),
            TypePayload::Array(ad) => TypePayload::Array(ArrayDef {
                contents: f(ad.contents),
                index: f(ad.index),
                nelems: ad.nelems,
            }),
            TypePayload::Function(fd) => TypePayload::Function(FuncDef {
                ret: f(fd.ret),
                args: fd.args.iter().map(|&a| f(a)).collect(),
                variadic: fd.variadic,
            }),
            TypePayload::Members(members) => TypePayload::Members(
                members
                    .iter()
                    .map(|m| Member { ty: f(m.ty), ..*m })
                    .collect(),
            ),
            TypePayload::Intrinsic(_)
            | TypePayload::Enumerators(_)
            | TypePayload::Forward(_)
            | TypePayload::Unresolved => self.clone(),
        }
    }
}

/// One node of a type graph.
///
/// `kind` and `payload` are fixed at creation. The only in-place changes are
/// binding an unresolved typedef and redirecting a forward declaration to its
/// definition; both happen through the owning graph so its indexes stay
/// consistent.
pub struct TypeNode {
    id: TypeId,
    name: Option<Name>,
    kind: TypeKind,
    size: u64,
    payload: TypePayload,
    flags: NodeFlags,
    /// Set on a forward declaration once its definition has been merged.
    redirect: Option<TypeId>,
    /// Visitation generation of the last walk that reached this node.
    vgen: AtomicU32,
    /// Equality mark: high half generation, low half counterpart ID.
    emark: AtomicU64,
}

impl TypeNode {
    /// Create a node. Returns `None` when `payload` does not fit `kind`.
    pub fn new(
        id: TypeId,
        name: Option<Name>,
        kind: TypeKind,
        size: u64,
        payload: TypePayload,
    ) -> Option<Self> {
        payload
            .fits(kind)
            .then(|| Self::new_unchecked(id, name, kind, size, payload))
    }

    pub(crate) fn new_unchecked(
        id: TypeId,
        name: Option<Name>,
        kind: TypeKind,
        size: u64,
        payload: TypePayload,
    ) -> Self {
        debug_assert!(payload.fits(kind));
        Self {
            id,
            name,
            kind,
            size,
            payload,
            flags: NodeFlags::empty(),
            redirect: None,
            vgen: AtomicU32::new(0),
            emark: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn id(&self) -> TypeId {
        self.id
    }

    #[inline]
    pub fn name(&self) -> Option<Name> {
        self.name
    }

    #[inline]
    pub fn kind(&self) -> TypeKind {
        self.kind
    }

    /// Size in bytes, 0 when unknown.
    #[inline]
    pub fn size(&self) -> u64 {
        self.size
    }

    #[inline]
    pub fn payload(&self) -> &TypePayload {
        &self.payload
    }

    #[inline]
    pub fn flags(&self) -> NodeFlags {
        self.flags
    }

    /// Definition this forward declaration now stands for.
    #[inline]
    pub fn redirect(&self) -> Option<TypeId> {
        self.redirect
    }

    /// Forward kind, when this node is a forward declaration.
    pub fn forward_kind(&self) -> Option<ForwardKind> {
        match self.payload {
            TypePayload::Forward(fk) => Some(fk),
            _ => None,
        }
    }

    /// The (forward kind, name) pair a tagged definition or forward is known by.
    pub fn tag(&self) -> Option<(ForwardKind, Name)> {
        let name = self.name?;
        match self.forward_kind() {
            Some(fk) => Some((fk, name)),
            None => ForwardKind::of(self.kind).map(|fk| (fk, name)),
        }
    }

    pub fn children(&self) -> SmallVec<[TypeId; 4]> {
        self.payload.children()
    }

    /// A copy of this node under `id` with children remapped through `f`.
    ///
    /// Flags survive; the forward redirect and bookkeeping marks do not.
    pub fn remapped(&self, id: TypeId, f: impl FnMut(TypeId) -> TypeId) -> TypeNode {
        TypeNode {
            id,
            name: self.name,
            kind: self.kind,
            size: self.size,
            payload: self.payload.map_children(f),
            flags: if self.kind == TypeKind::Forward {
                self.flags - NodeFlags::RESOLVED
            } else {
                self.flags
            },
            redirect: None,
            vgen: AtomicU32::new(0),
            emark: AtomicU64::new(0),
        }
    }

    pub(crate) fn insert_flags(&mut self, flags: NodeFlags) {
        self.flags |= flags;
    }

    pub(crate) fn set_redirect(&mut self, def: TypeId) {
        self.redirect = Some(def);
        self.flags |= NodeFlags::RESOLVED;
    }

    pub(crate) fn bind_typedef(&mut self, target: TypeId) {
        self.kind = TypeKind::Typedef;
        self.payload = TypePayload::Ref(target);
        self.flags |= NodeFlags::RESOLVED;
    }

    #[inline]
    pub fn vgen(&self) -> u32 {
        self.vgen.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn set_vgen(&self, generation: u32) {
        self.vgen.store(generation, Ordering::Relaxed);
    }

    /// Generation and counterpart of the last equality mark.
    #[inline]
    pub fn emark(&self) -> (u32, TypeId) {
        let raw = self.emark.load(Ordering::Relaxed);
        #[expect(clippy::cast_possible_truncation, reason = "unpacking two u32 halves")]
        let pair = ((raw >> 32) as u32, TypeId::from_raw(raw as u32));
        pair
    }

    #[inline]
    pub fn set_emark(&self, generation: u32, counterpart: TypeId) {
        let raw = (u64::from(generation) << 32) | u64::from(counterpart.raw());
        self.emark.store(raw, Ordering::Relaxed);
    }
}

impl Clone for TypeNode {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            name: self.name,
            kind: self.kind,
            size: self.size,
            payload: self.payload.clone(),
            flags: self.flags,
            redirect: self.redirect,
            vgen: AtomicU32::new(0),
            emark: AtomicU64::new(0),
        }
    }
}

impl std::fmt::Debug for TypeNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeNode")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("size", &self.size)
            .field("payload", &self.payload)
            .field("flags", &self.flags)
            .field("redirect", &self.redirect)
            .finish_non_exhaustive()
    }
}
