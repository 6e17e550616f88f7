//! Concurrent merging into one master graph.
//!
//! Workers call [`MergeSession::add`] from any thread. Matching runs under
//! the read side of the master's lock, so any number of workers can match
//! at once; placement takes the write side. A worker that finds the master
//! changed since it matched re-matches its still-unmatched nodes under the
//! write lock before placing anything, so two workers never place the same
//! type twice.

use ctf_ir::TypeGraph;
use parking_lot::RwLock;
use tracing::trace;

use crate::apply::commit;
use crate::plan::Plan;
use crate::{MergeError, MergeOutcome};

/// A master graph shared by merging workers.
pub struct MergeSession {
    master: RwLock<TypeGraph>,
}

impl MergeSession {
    pub fn new(master: TypeGraph) -> Self {
        Self {
            master: RwLock::new(master),
        }
    }

    /// Fold `unit` into the master. The unit is consumed whether or not the
    /// merge succeeds; on failure the master is unchanged.
    pub fn add(&self, unit: TypeGraph) -> Result<MergeOutcome, MergeError> {
        let mut plan = {
            let master = self.master.read();
            Plan::compute(&unit, &master)?
        };

        let mut master = self.master.write();
        if master.revision() != plan.revision {
            trace!(
                unit = unit.source_str(),
                unmatched = plan.unmatched.len(),
                "master moved while matching, rematching"
            );
            plan.rematch(&unit, &master)?;
        }
        commit(&unit, &mut master, &plan)
    }

    /// End the session and take the master.
    pub fn finish(self) -> TypeGraph {
        self.master.into_inner()
    }
}

impl std::fmt::Debug for MergeSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MergeSession")
            .field("master", &*self.master.read())
            .finish()
    }
}
