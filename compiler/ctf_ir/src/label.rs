//! The label ledger: named checkpoints over a graph's type-ID range.
//!
//! A label closes over every type ID up to and including its `idx`. Labels
//! are kept in ID order; only the newest one may have its watermark moved.

use std::ops::ControlFlow;

use crate::{Name, TypeGraph, TypeId};

/// Label name used when the user does not provide one.
pub const DEFAULT_LABEL: &str = "*** No Label Provided ***";

/// A named checkpoint.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Label {
    pub name: Name,
    /// Highest type ID covered by this label.
    pub idx: TypeId,
}

/// Where a new label closes.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LabelIdx {
    /// Every type the graph holds right now.
    Current,
    /// An explicit ID, for reconstructing historical labels.
    At(TypeId),
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum LabelError {
    #[error("label {name:?} at {idx} precedes the newest label at {top}")]
    OutOfOrder {
        name: Name,
        idx: TypeId,
        top: TypeId,
    },
}

impl TypeGraph {
    /// Append a label.
    pub fn label_add(&mut self, name: &str, idx: LabelIdx) -> Result<Label, LabelError> {
        let name = self.interner().intern(name);
        let idx = match idx {
            LabelIdx::Current => self.max_id(),
            LabelIdx::At(id) => id,
        };
        self.label_append(Label { name, idx })
    }

    /// Append a label whose name is already interned.
    pub fn label_append(&mut self, label: Label) -> Result<Label, LabelError> {
        if let Some(top) = self.label_top() {
            if label.idx < top.idx {
                return Err(LabelError::OutOfOrder {
                    name: label.name,
                    idx: label.idx,
                    top: top.idx,
                });
            }
        }
        tracing::debug!(
            label = self.interner().lookup(label.name),
            idx = %label.idx,
            "label added"
        );
        self.labels.push(label);
        Ok(label)
    }

    /// The most recent label.
    #[inline]
    pub fn label_top(&self) -> Option<Label> {
        self.labels.last().copied()
    }

    /// Visit labels in ID order until `f` breaks; returns the break value.
    pub fn label_iter<B>(&self, mut f: impl FnMut(&Label) -> ControlFlow<B>) -> Option<B> {
        for label in &self.labels {
            if let ControlFlow::Break(b) = f(label) {
                return Some(b);
            }
        }
        None
    }

    /// Move the newest label's watermark to `newmax`.
    ///
    /// No-op without labels. The watermark may not drop below the label
    /// before it.
    pub fn label_newmax(&mut self, newmax: TypeId) -> Result<(), LabelError> {
        let n = self.labels.len();
        let Some(top) = self.labels.last().copied() else {
            return Ok(());
        };
        if let Some(prev) = n.checked_sub(2).map(|i| self.labels[i]) {
            if newmax < prev.idx {
                return Err(LabelError::OutOfOrder {
                    name: top.name,
                    idx: newmax,
                    top: prev.idx,
                });
            }
        }
        self.labels[n - 1].idx = newmax;
        Ok(())
    }
}
