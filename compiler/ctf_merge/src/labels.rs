//! Label merge.

use ctf_ir::{Label, TypeGraph, TypeId};

use crate::MergeError;

/// Labels of `src` to append to `tgt`, with their watermarks moved into the
/// target's ID space.
///
/// A unit built against a baseline must be merged into a target whose newest
/// label is that baseline. Labels the target already has are skipped.
pub(crate) fn merge_labels(
    src: &TypeGraph,
    tgt: &TypeGraph,
    map: &impl Fn(TypeId) -> TypeId,
) -> Result<Vec<Label>, MergeError> {
    let top = tgt.label_top();
    if let Some(expected) = src.parent_label() {
        if top.map(|l| l.name) != Some(expected) {
            let interner = tgt.interner();
            return Err(MergeError::BaselineMismatch {
                unit: src.source_str().to_owned(),
                expected: interner.lookup(expected).to_owned(),
                found: top.map_or("<none>", |l| interner.lookup(l.name)).to_owned(),
            });
        }
    }

    let mut watermark = top.map_or(TypeId::VOID, |l| l.idx);
    let mut out: Vec<Label> = Vec::new();
    for label in src.labels() {
        let known = tgt.labels().iter().chain(&out).any(|l| l.name == label.name);
        if known {
            continue;
        }
        let highest = src
            .nodes()
            .map(|n| n.id())
            .filter(|&id| id <= label.idx)
            .map(map)
            .max()
            .unwrap_or(TypeId::VOID);
        watermark = watermark.max(highest);
        out.push(Label {
            name: label.name,
            idx: watermark,
        });
    }
    Ok(out)
}
