//! Merge failures.
//!
//! A failed merge leaves the target untouched: every check runs before the
//! first write.

use ctf_ir::{GraphError, LabelError, TypeId};

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum MergeError {
    /// Two definitions with the same identity differ after remapping.
    #[error("conflicting definitions of {what}: one from {first}, one from {second}")]
    StructuralConflict {
        what: String,
        first: String,
        second: String,
    },

    /// The unit was built against a label the target does not end with.
    #[error("{unit} was built against label `{expected}`, but the target's newest label is `{found}`")]
    BaselineMismatch {
        unit: String,
        expected: String,
        found: String,
    },

    /// The unit references a type it does not contain.
    #[error("{unit}: {referrer} refers to missing type {missing}")]
    DanglingReference {
        unit: String,
        referrer: String,
        missing: TypeId,
    },

    /// Names from different interners cannot be compared by handle.
    #[error("{unit} was built with a different string interner than the target")]
    InternerMismatch { unit: String },

    #[error(transparent)]
    Label(#[from] LabelError),

    #[error(transparent)]
    Graph(#[from] GraphError),
}

impl MergeError {
    /// Conflicts and baseline mismatches only invalidate the offending unit;
    /// everything else means the input or the engine is broken.
    pub fn is_unit_scoped(&self) -> bool {
        matches!(
            self,
            MergeError::StructuralConflict { .. } | MergeError::BaselineMismatch { .. }
        )
    }
}
