//! Uniquification against a parent baseline.
//!
//! An incremental build keeps a parent graph (say, the kernel's common
//! types) and ships each child with only what the parent lacks. The child
//! refers to shared types by the parent's IDs and allocates its own above
//! the parent's high-water mark.

use ctf_ir::{Label, ParentRef, TypeGraph, DEFAULT_LABEL};
use tracing::debug;

use crate::apply::Placement;
use crate::plan::Plan;
use crate::MergeError;

/// Rebuild `child` with every type `parent` already has replaced by a
/// reference into `parent`.
///
/// Type descriptors (struct/union and typedef items) whose type lives in the
/// parent are dropped. The child's baseline is the parent's newest label.
/// Child labels are carried with their watermarks moved to the highest new
/// ID they cover; a label that covers only shared types is dropped, since
/// the parent already has all of it.
pub fn uniquify(
    child: &TypeGraph,
    parent: &TypeGraph,
    parent_name: &str,
) -> Result<TypeGraph, MergeError> {
    let plan = Plan::matching(child, parent)?;
    let interner = child.interner().clone();

    let label = parent
        .label_top()
        .map_or_else(|| interner.intern(DEFAULT_LABEL), |l| l.name);
    let max_id = parent.max_id();

    let mut out = TypeGraph::new(interner.clone());
    out.set_source(child.source());
    out.set_parent(ParentRef {
        label,
        name: interner.intern(parent_name),
        max_id,
    });
    out.set_parent_label(Some(label));

    let placement = Placement::allocate(&plan, child, max_id.next(), None);
    let mut dropped = 0usize;
    let mut items = Vec::with_capacity(child.items().len());
    for item in child.items() {
        let mut remapped = item.clone();
        remapped.ty = placement.lookup(item.ty);
        for arg in &mut remapped.args {
            *arg = placement.lookup(*arg);
        }
        if item.kind.is_type() && remapped.ty <= max_id {
            dropped += 1;
            continue;
        }
        items.push(remapped);
    }

    let mut labels = Vec::with_capacity(child.labels().len());
    let mut watermark = max_id;
    for label in child.labels() {
        let highest = child
            .nodes()
            .map(|n| n.id())
            .filter(|&id| id <= label.idx)
            .map(|id| placement.lookup(id))
            .filter(|&id| id > max_id)
            .max();
        if let Some(highest) = highest {
            watermark = watermark.max(highest);
            labels.push(Label {
                name: label.name,
                idx: watermark,
            });
        }
    }

    let shared = plan.assoc.len();
    for node in placement.nodes {
        out.insert(node)?;
    }
    // Items flag their nodes, so they go in after the nodes.
    for item in items {
        out.add_item(item);
    }
    let labels_kept = labels.len();
    for label in labels {
        out.label_append(label)?;
    }

    debug!(
        unit = child.source_str(),
        parent = parent_name,
        shared,
        kept = out.len(),
        items_dropped = dropped,
        labels_kept,
        "uniquified against parent"
    );
    Ok(out)
}
