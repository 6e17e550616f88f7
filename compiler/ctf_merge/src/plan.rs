//! Matching: the read-only half of a merge.
//!
//! Planning reads the source and the target and decides, for every source
//! node, whether an equivalent target node already exists. Nothing is
//! written to the target, so planning runs under the read side of a
//! session's lock.

use std::mem;

use ctf_ir::{layout_hash, TypeGraph, TypeId, TypeKind};
use rustc_hash::FxHashMap;

use crate::equiv::Equiv;
use crate::MergeError;

/// Matching result for one source graph against one target state.
#[derive(Debug)]
pub(crate) struct Plan {
    /// Source ID to target ID for every matched node.
    pub(crate) assoc: FxHashMap<TypeId, TypeId>,
    /// Source nodes without a counterpart, in source order.
    pub(crate) unmatched: Vec<TypeId>,
    /// Target revision the plan is valid for.
    pub(crate) revision: u64,
}

impl Plan {
    /// Validate `src`, match it against `tgt`, and check that no named
    /// definition clashes with the target's.
    pub(crate) fn compute(src: &TypeGraph, tgt: &TypeGraph) -> Result<Self, MergeError> {
        let plan = Self::matching(src, tgt)?;
        plan.check_conflicts(src, tgt)?;
        Ok(plan)
    }

    /// Validate `src` and match it against `tgt`, without conflict checks.
    pub(crate) fn matching(src: &TypeGraph, tgt: &TypeGraph) -> Result<Self, MergeError> {
        if !src.interner().same(tgt.interner()) {
            return Err(MergeError::InternerMismatch {
                unit: src.source_str().to_owned(),
            });
        }
        check_references(src)?;

        let mut plan = Plan {
            assoc: FxHashMap::default(),
            unmatched: src.nodes().map(|n| n.id()).collect(),
            revision: tgt.revision(),
        };
        plan.match_pending(src, tgt);
        Ok(plan)
    }

    /// Retry every unmatched node against the current target.
    ///
    /// Associations already made stay valid: the target only ever grows.
    pub(crate) fn rematch(&mut self, src: &TypeGraph, tgt: &TypeGraph) -> Result<(), MergeError> {
        self.match_pending(src, tgt);
        self.check_conflicts(src, tgt)
    }

    fn match_pending(&mut self, src: &TypeGraph, tgt: &TypeGraph) {
        let pending = mem::take(&mut self.unmatched);
        for &s in &pending {
            if !self.assoc.contains_key(&s) {
                self.match_node(src, tgt, s);
            }
        }
        self.unmatched = pending
            .into_iter()
            .filter(|s| !self.assoc.contains_key(s))
            .collect();
        self.revision = tgt.revision();
    }

    fn match_node(&mut self, src: &TypeGraph, tgt: &TypeGraph, s: TypeId) {
        let Some(node) = src.get(s) else {
            return;
        };

        if let Some(fk) = node.forward_kind() {
            let Some(name) = node.name() else {
                return;
            };
            let counterpart = tgt.find_definition(fk, name).or_else(|| {
                tgt.named(name)
                    .iter()
                    .copied()
                    .find(|&t| tgt.get(t).and_then(|n| n.forward_kind()) == Some(fk))
            });
            if let Some(t) = counterpart {
                self.assoc.insert(s, tgt.resolve(t));
            }
            return;
        }

        for &candidate in tgt.layout_candidates(layout_hash(node)) {
            if let Some(pairs) = Equiv::new(src, tgt).run(s, candidate) {
                for (a, b) in pairs {
                    self.assoc.entry(a).or_insert(b);
                }
                return;
            }
        }
    }

    /// A named aggregate that found no equivalent while the target already
    /// defines that tag is a conflict.
    fn check_conflicts(&self, src: &TypeGraph, tgt: &TypeGraph) -> Result<(), MergeError> {
        for &s in &self.unmatched {
            let Some(node) = src.get(s) else {
                continue;
            };
            if node.kind() == TypeKind::Forward {
                continue;
            }
            let Some((fk, name)) = node.tag() else {
                continue;
            };
            if let Some(existing) = tgt.find_definition(fk, name) {
                return Err(MergeError::StructuralConflict {
                    what: format!("{} {}", node.kind(), tgt.interner().lookup(name)),
                    first: type_owner(tgt, existing).to_owned(),
                    second: type_owner(src, s).to_owned(),
                });
            }
        }
        Ok(())
    }
}

/// Owning file of a type: the owner of an item describing it, else the
/// graph's source.
pub(crate) fn type_owner(graph: &TypeGraph, id: TypeId) -> &'static str {
    graph
        .items()
        .iter()
        .find(|item| item.owner.is_some() && graph.resolve(item.ty) == id)
        .and_then(|item| item.owner)
        .map_or_else(|| graph.source_str(), |owner| graph.interner().lookup(owner))
}

/// Every edge of `src` must land on void, a node of `src`, or its parent.
fn check_references(src: &TypeGraph) -> Result<(), MergeError> {
    let known = |id: TypeId| id.is_void() || src.contains(id) || src.is_parent_type(id);
    let dangling = |referrer: String, missing: TypeId| MergeError::DanglingReference {
        unit: src.source_str().to_owned(),
        referrer,
        missing,
    };

    for node in src.nodes() {
        if let Some(missing) = node.children().into_iter().find(|&c| !known(c)) {
            return Err(dangling(format!("type {}", node.id()), missing));
        }
    }
    for item in src.items() {
        if let Some(missing) = item.type_refs().find(|&c| !known(c)) {
            return Err(dangling(
                format!("{} {}", item.kind, src.interner().lookup(item.name)),
                missing,
            ));
        }
    }
    Ok(())
}
