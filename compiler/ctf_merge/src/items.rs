//! Top-level descriptor merge.
//!
//! Identity is `(name, kind)` for global functions and variables and
//! `(name, kind, owner)` for statics. Identical descriptors are dropped;
//! differing ones conflict. Parameters and type descriptors never conflict:
//! a differing one is simply kept alongside, since two functions in one file
//! may well name their parameters alike.

use ctf_ir::{Item, ItemKind, TypeGraph, TypeId};

use crate::equiv::equivalent;
use crate::MergeError;

pub(crate) struct ItemMerge {
    /// Remapped descriptors to append, in source order.
    pub(crate) add: Vec<Item>,
    pub(crate) skipped: usize,
}

pub(crate) fn merge_items(
    src: &TypeGraph,
    tgt: &TypeGraph,
    map: &impl Fn(TypeId) -> TypeId,
) -> Result<ItemMerge, MergeError> {
    let mut out = ItemMerge {
        add: Vec::new(),
        skipped: 0,
    };

    for item in src.items() {
        let mut remapped = item.clone();
        remapped.ty = map(item.ty);
        for arg in &mut remapped.args {
            *arg = map(*arg);
        }

        let mut existing = tgt
            .items_named(item.name)
            .chain(out.add.iter())
            .filter(|other| same_identity(other, &remapped));

        let mut conflict = None;
        let duplicate = existing.any(|other| {
            if same_signature(tgt, other, &remapped) {
                true
            } else {
                if conflicts(item.kind) && conflict.is_none() {
                    conflict = Some(other.owner);
                }
                false
            }
        });
        drop(existing);

        if duplicate {
            out.skipped += 1;
            continue;
        }
        if let Some(first_owner) = conflict {
            let interner = tgt.interner();
            return Err(MergeError::StructuralConflict {
                what: format!("{} {}", item.kind, interner.lookup(item.name)),
                first: first_owner.map_or_else(|| tgt.source_str(), |o| interner.lookup(o)).to_owned(),
                second: item
                    .owner
                    .map_or_else(|| src.source_str(), |o| interner.lookup(o))
                    .to_owned(),
            });
        }
        out.add.push(remapped);
    }
    Ok(out)
}

fn conflicts(kind: ItemKind) -> bool {
    kind.is_function() || kind.is_variable()
}

fn same_identity(a: &Item, b: &Item) -> bool {
    a.kind == b.kind && a.name == b.name && (a.kind.is_global() || a.owner == b.owner)
}

/// Whether two descriptors describe the same thing once forwards are
/// followed. Types compare structurally, so a target that holds one type
/// twice still sees the two copies as the same type.
fn same_signature(tgt: &TypeGraph, a: &Item, b: &Item) -> bool {
    a.variadic == b.variadic
        && a.args.len() == b.args.len()
        && same_type(tgt, a.ty, b.ty)
        && a.args.iter().zip(&b.args).all(|(&x, &y)| same_type(tgt, x, y))
}

fn same_type(tgt: &TypeGraph, x: TypeId, y: TypeId) -> bool {
    tgt.resolve(x) == tgt.resolve(y) || equivalent(tgt, x, tgt, y)
}
