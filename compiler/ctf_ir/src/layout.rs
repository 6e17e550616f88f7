//! Structural layout hashing.
//!
//! The layout hash buckets nodes by everything that can be compared without
//! following an edge: kind, name, size, and the scalar parts of the payload.
//! Child type IDs are excluded because they are graph-local, so two
//! structurally equivalent nodes from different graphs always share a bucket.

use std::hash::{Hash, Hasher};

use rustc_hash::FxHasher;

use crate::{TypeNode, TypePayload};

/// Hash of `node`'s shape, independent of the graph it lives in.
///
/// Forward declarations hash by tag kind and name only; they are paired with
/// definitions through the graph's name index, not through this hash.
pub fn layout_hash(node: &TypeNode) -> u64 {
    let mut h = FxHasher::default();
    node.kind().hash(&mut h);
    node.name().hash(&mut h);

    match node.payload() {
        TypePayload::Forward(fk) => {
            fk.hash(&mut h);
            return h.finish();
        }
        _ => node.size().hash(&mut h),
    }

    match node.payload() {
        TypePayload::Intrinsic(intr) => intr.hash(&mut h),
        TypePayload::Array(ad) => ad.nelems.hash(&mut h),
        TypePayload::Function(fd) => {
            fd.args.len().hash(&mut h);
            fd.variadic.hash(&mut h);
        }
        TypePayload::Members(members) => {
            members.len().hash(&mut h);
            for m in members {
                m.name.hash(&mut h);
                m.offset_bits.hash(&mut h);
                m.size_bits.hash(&mut h);
            }
        }
        TypePayload::Enumerators(values) => {
            values.hash(&mut h);
        }
        TypePayload::PtrAuth(pa) => {
            (pa.key, pa.discriminator, pa.discriminated).hash(&mut h);
        }
        TypePayload::Ref(_) | TypePayload::Unresolved | TypePayload::Forward(_) => {}
    }

    h.finish()
}
