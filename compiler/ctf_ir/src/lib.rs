//! Type graph model for CTF merging.
//!
//! This crate holds everything a merge or an encode pass reads and writes:
//! - Interned names (`Name`, `StringInterner`, `SharedInterner`)
//! - Type IDs and kinds
//! - Type nodes and their payloads, owned by a `TypeGraph` arena
//! - Top-level descriptors (`Item`)
//! - The label ledger
//! - Generation-stamped walks that terminate on cyclic graphs
//!
//! # Design Philosophy
//!
//! - **Arena ownership**: nodes live in their graph; edges are `TypeId`s
//! - **Injected interning**: a graph is built around a `SharedInterner`, never
//!   a global one, so tests and workers stay independent
//! - **Append-only**: IDs are never reused and nodes never move

mod graph;
mod interner;
mod item;
mod kind;
mod label;
mod layout;
mod name;
mod node;
mod traverse;
mod type_id;

#[cfg(feature = "interchange")]
pub mod interchange;

pub use graph::{GraphError, ParentRef, TypeGraph};
pub use interner::{InternError, SharedInterner, StringInterner};
pub use item::{Item, ItemDisplay, ItemFlags, ItemKind, ItemStats};
pub use kind::{ForwardKind, TypeKind};
pub use label::{Label, LabelError, LabelIdx, DEFAULT_LABEL};
pub use layout::layout_hash;
pub use name::Name;
pub use node::{
    real_format, ArrayDef, Enumerator, FuncArgs, FuncDef, IntFormat, Intrinsic, IntrinsicEncoding,
    Member, NodeFlags, PtrAuth, TypeNode, TypePayload, FUNCARG_DEF,
};
pub use traverse::{TypeVisitor, Visit};
pub use type_id::TypeId;

#[cfg(target_pointer_width = "64")]
mod size_asserts {
    use super::{Member, Name, TypeId};
    const _: () = assert!(std::mem::size_of::<Name>() == 4);
    const _: () = assert!(std::mem::size_of::<TypeId>() == 4);
    const _: () = assert!(std::mem::size_of::<Member>() == 20);
}
