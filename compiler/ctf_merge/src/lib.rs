//! The merge engine: folds per-unit type graphs into one canonical graph.
//!
//! A merge runs in two phases:
//!
//! 1. **Matching** (read-only): every source node is tested for structural
//!    equivalence against target nodes in the same layout bucket. Forward
//!    declarations match definitions of the same tag.
//! 2. **Placement** (writes): unmatched nodes get fresh target IDs and are
//!    appended; open target forwards are bound to newly placed definitions;
//!    descriptors and labels are merged.
//!
//! Every check (dangling references, conflicting definitions, baseline
//! mismatch) runs before the first write, so a failed merge leaves the target
//! as it was.

mod apply;
mod equiv;
mod error;
mod items;
mod labels;
mod plan;
mod session;
mod uniquify;

use ctf_ir::{TypeGraph, TypeId};
use rustc_hash::FxHashMap;

pub use equiv::equivalent;
pub use error::MergeError;
pub use session::MergeSession;
pub use uniquify::uniquify;

/// What one merge did.
#[derive(Clone, Debug, Default)]
pub struct MergeOutcome {
    /// Source ID to target ID, for every source node.
    pub assoc: FxHashMap<TypeId, TypeId>,
    pub types_added: usize,
    pub types_matched: usize,
    pub items_added: usize,
    /// Descriptors identical to one already in the target.
    pub items_skipped: usize,
    pub labels_added: usize,
    /// Target forwards bound to a definition: (forward, definition).
    pub redirects: Vec<(TypeId, TypeId)>,
}

impl MergeOutcome {
    /// Where a source type ended up.
    pub fn target_of(&self, src: TypeId) -> Option<TypeId> {
        if src.is_void() {
            return Some(TypeId::VOID);
        }
        self.assoc.get(&src).copied()
    }
}

/// Fold `src` into `target`. `src` is consumed either way.
pub fn merge_into(src: TypeGraph, target: &mut TypeGraph) -> Result<MergeOutcome, MergeError> {
    let plan = plan::Plan::compute(&src, target)?;
    apply::commit(&src, target, &plan)
}
