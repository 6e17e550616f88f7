//! Structural equivalence between a source node and a target node.
//!
//! # Cycles
//!
//! Before descending into a pair, the source node is stamped with the
//! attempt's equality generation and the target ID it is being compared
//! against. Meeting the same source node again in the same attempt answers
//! "equivalent iff it is the same counterpart" without descending, which
//! closes every cycle. An attempt is a pure conjunction, so a single failure
//! fails the whole attempt; the stale stamps are invalidated by taking a new
//! generation for the next attempt, never by clearing nodes.
//!
//! Only source nodes are stamped. The target may be shared with other
//! readers.

use ctf_ir::{TypeGraph, TypeId, TypeKind, TypeNode, TypePayload};
use ctf_stack::ensure_sufficient_stack;
use smallvec::SmallVec;

/// One equivalence attempt.
pub(crate) struct Equiv<'a> {
    src: &'a TypeGraph,
    tgt: &'a TypeGraph,
    generation: u32,
    /// Pairs proven (coinductively) equivalent during this attempt.
    matched: SmallVec<[(TypeId, TypeId); 8]>,
}

impl<'a> Equiv<'a> {
    pub(crate) fn new(src: &'a TypeGraph, tgt: &'a TypeGraph) -> Self {
        Self {
            src,
            tgt,
            generation: src.next_emark(),
            matched: SmallVec::new(),
        }
    }

    /// Compare `s` (source) with `t` (target). On success, returns every
    /// pair that can be associated: the pair itself plus every descendant
    /// pair visited. A source definition paired with a target forward is
    /// left out; that definition still has to be placed.
    pub(crate) fn run(mut self, s: TypeId, t: TypeId) -> Option<SmallVec<[(TypeId, TypeId); 8]>> {
        self.equiv(s, t).then_some(self.matched)
    }

    fn equiv(&mut self, s: TypeId, t: TypeId) -> bool {
        ensure_sufficient_stack(|| self.equiv_inner(s, t))
    }

    fn equiv_inner(&mut self, s: TypeId, t: TypeId) -> bool {
        let (src, tgt) = (self.src, self.tgt);
        let s = src.resolve(s);
        let t = tgt.resolve(t);
        if s.is_void() || t.is_void() {
            return s == t;
        }
        // References into a shared parent baseline compare by ID.
        if src.is_parent_type(s) || tgt.is_parent_type(t) {
            return s == t;
        }
        let (Some(sn), Some(tn)) = (src.get(s), tgt.get(t)) else {
            return false;
        };

        let (generation, counterpart) = sn.emark();
        if generation == self.generation {
            return counterpart == t;
        }

        if let Some(answer) = self.forward_pair(sn, tn) {
            return answer;
        }

        if !shallow_eq(sn, tn) {
            return false;
        }

        sn.set_emark(self.generation, t);
        self.matched.push((s, t));
        self.payload_eq(sn.payload(), tn.payload())
    }

    /// Forward declarations match any node with the same tag. `None` when
    /// neither side is a forward.
    fn forward_pair(&mut self, sn: &TypeNode, tn: &TypeNode) -> Option<bool> {
        let s_fwd = sn.kind() == TypeKind::Forward;
        let t_fwd = tn.kind() == TypeKind::Forward;
        if !s_fwd && !t_fwd {
            return None;
        }
        let same_tag = sn.tag().is_some() && sn.tag() == tn.tag();
        if same_tag && s_fwd {
            sn.set_emark(self.generation, tn.id());
            self.matched.push((sn.id(), tn.id()));
        }
        Some(same_tag)
    }

    fn payload_eq(&mut self, sp: &'a TypePayload, tp: &'a TypePayload) -> bool {
        match (sp, tp) {
            (TypePayload::Intrinsic(a), TypePayload::Intrinsic(b)) => a == b,
            (TypePayload::Ref(a), TypePayload::Ref(b)) => self.equiv(*a, *b),
            (TypePayload::PtrAuth(a), TypePayload::PtrAuth(b)) => {
                a.key == b.key
                    && a.discriminator == b.discriminator
                    && a.discriminated == b.discriminated
                    && self.equiv(a.ty, b.ty)
            }
            (TypePayload::Array(a), TypePayload::Array(b)) => {
                a.nelems == b.nelems
                    && self.equiv(a.contents, b.contents)
                    && self.equiv(a.index, b.index)
            }
            (TypePayload::Function(a), TypePayload::Function(b)) => {
                a.variadic == b.variadic
                    && a.args.len() == b.args.len()
                    && self.equiv(a.ret, b.ret)
                    && a.args.iter().zip(&b.args).all(|(&x, &y)| self.equiv(x, y))
            }
            (TypePayload::Members(a), TypePayload::Members(b)) => {
                a.len() == b.len()
                    && a.iter().zip(b).all(|(x, y)| {
                        x.name == y.name
                            && x.offset_bits == y.offset_bits
                            && x.size_bits == y.size_bits
                            && self.equiv(x.ty, y.ty)
                    })
            }
            (TypePayload::Enumerators(a), TypePayload::Enumerators(b)) => a == b,
            (TypePayload::Unresolved, TypePayload::Unresolved) => true,
            _ => false,
        }
    }
}

/// Everything about a pair that needs no recursion.
fn shallow_eq(a: &TypeNode, b: &TypeNode) -> bool {
    a.kind() == b.kind() && a.name() == b.name() && a.size() == b.size()
}

/// Whether `s` in `src` is equivalent to `t` in `tgt`.
pub fn equivalent(src: &TypeGraph, s: TypeId, tgt: &TypeGraph, t: TypeId) -> bool {
    Equiv::new(src, tgt).run(s, t).is_some()
}

#[cfg(test)]
mod tests;
