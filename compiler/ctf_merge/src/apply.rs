//! Placement: the writing half of a merge.
//!
//! Placement first computes everything (new IDs, remapped nodes, forward
//! bindings, descriptor and label changes) and runs every check. Only then
//! does it touch the target, and only by appending.

use ctf_ir::{Name, TypeGraph, TypeId, TypeKind, TypeNode, TypePayload};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use tracing::{debug, trace, warn};

use crate::items::merge_items;
use crate::labels::merge_labels;
use crate::plan::Plan;
use crate::{MergeError, MergeOutcome};

/// New IDs and nodes for a plan's unmatched source nodes.
pub(crate) struct Placement {
    /// Source ID to target ID, for every source node.
    pub(crate) map: FxHashMap<TypeId, TypeId>,
    /// Remapped copies of the unmatched nodes, in allocation order.
    pub(crate) nodes: Vec<TypeNode>,
    /// Open target forwards bound by this placement: (forward, definition).
    pub(crate) redirects: Vec<(TypeId, TypeId)>,
    pub(crate) matched: usize,
}

impl Placement {
    /// Allocate target IDs from `first` upward.
    ///
    /// Source forwards whose definition is also in the source collapse onto
    /// that definition instead of being placed, and so does every node
    /// equivalent to one placed before it: a unit may spell a type twice,
    /// the target holds it once. `bind_into` is the graph whose open
    /// forwards get bound to newly placed definitions, if any.
    pub(crate) fn allocate(
        plan: &Plan,
        src: &TypeGraph,
        first: TypeId,
        bind_into: Option<&TypeGraph>,
    ) -> Self {
        let mut map = plan.assoc.clone();
        let mut folded = FxHashMap::default();
        let mut candidates = Vec::with_capacity(plan.unmatched.len());
        for &s in &plan.unmatched {
            let Some(node) = src.get(s) else {
                continue;
            };
            if let Some((fk, name)) = node.forward_kind().zip(node.name()) {
                if let Some(def) = src.find_definition(fk, name) {
                    folded.insert(s, def);
                    continue;
                }
            }
            candidates.push(node);
        }

        let classes = twin_classes(src, &plan.assoc, &folded, &candidates);
        let mut representative: FxHashMap<usize, TypeId> = FxHashMap::default();
        let mut placed = Vec::with_capacity(candidates.len());
        let mut next = first;
        for node in candidates {
            let s = node.id();
            let class = classes.get(&s).copied().unwrap_or(usize::MAX);
            if let Some(t) = representative.get(&class).and_then(|r| map.get(r)).copied() {
                trace!(id = %s, twin = %t, "type repeats within the unit");
                map.insert(s, t);
                continue;
            }
            representative.insert(class, s);
            map.insert(s, next);
            placed.push(node);
            next = next.next();
        }
        for (fwd, def) in folded {
            if let Some(&t) = map.get(&def) {
                map.insert(fwd, t);
            }
        }

        let lookup = |id: TypeId| map.get(&id).copied().unwrap_or(id);
        let nodes: Vec<TypeNode> = placed
            .iter()
            .map(|node| node.remapped(lookup(node.id()), lookup))
            .collect();

        let mut redirects = Vec::new();
        if let Some(graph) = bind_into {
            for node in &nodes {
                if node.forward_kind().is_some() {
                    continue;
                }
                if let Some((fk, name)) = node.tag() {
                    redirects.extend(graph.open_forwards(fk, name).map(|f| (f, node.id())));
                }
            }
        }

        Self {
            matched: plan.assoc.len(),
            map,
            nodes,
            redirects,
        }
    }

    /// Target ID for a source ID. Void and parent-owned IDs map to
    /// themselves.
    pub(crate) fn lookup(&self, id: TypeId) -> TypeId {
        self.map.get(&id).copied().unwrap_or(id)
    }
}

/// Where an edge of a candidate node leads while classifying twins: a
/// candidate's class, or for anything else (void, the parent, a matched
/// node) the fixed target ID.
type Edge = (Option<usize>, TypeId);

type Shape = (TypeKind, Option<Name>, u64, TypePayload);

/// Partition `nodes` into classes of structurally equivalent types.
///
/// Starts from the edge-free shape and splits classes by the classes their
/// edges lead to until nothing splits, so cycles need no special casing.
/// Edges through forwards in `folded` lead to the definition.
fn twin_classes(
    src: &TypeGraph,
    assoc: &FxHashMap<TypeId, TypeId>,
    folded: &FxHashMap<TypeId, TypeId>,
    nodes: &[&TypeNode],
) -> FxHashMap<TypeId, usize> {
    let mut shapes: FxHashMap<Shape, usize> = FxHashMap::default();
    let mut class: FxHashMap<TypeId, usize> = FxHashMap::default();
    for node in nodes {
        let shape = (
            node.kind(),
            node.name(),
            node.size(),
            node.payload().map_children(|_| TypeId::VOID),
        );
        let next = shapes.len();
        class.insert(node.id(), *shapes.entry(shape).or_insert(next));
    }

    let mut count = shapes.len();
    loop {
        let edge = |id: TypeId| -> Edge {
            let id = src.resolve(id);
            let id = folded.get(&id).map_or(id, |&def| src.resolve(def));
            match class.get(&id) {
                Some(&c) => (Some(c), TypeId::VOID),
                None => (None, assoc.get(&id).copied().unwrap_or(id)),
            }
        };
        let mut signatures: FxHashMap<(usize, SmallVec<[Edge; 4]>), usize> = FxHashMap::default();
        let mut refined = FxHashMap::default();
        for node in nodes {
            let edges = node.children().into_iter().map(&edge).collect();
            let next = signatures.len();
            let c = *signatures.entry((class[&node.id()], edges)).or_insert(next);
            refined.insert(node.id(), c);
        }
        let stable = signatures.len() == count;
        count = signatures.len();
        class = refined;
        if stable {
            return class;
        }
    }
}

/// Validate and write a planned merge into `tgt`.
pub(crate) fn commit(
    src: &TypeGraph,
    tgt: &mut TypeGraph,
    plan: &Plan,
) -> Result<MergeOutcome, MergeError> {
    let placement = Placement::allocate(plan, src, tgt.next_id(), Some(&*tgt));
    let lookup = |id: TypeId| placement.lookup(id);
    let items = merge_items(src, tgt, &lookup)?;
    let labels = merge_labels(src, tgt, &lookup)?;

    // Nothing has been written yet; from here on only appends.
    let Placement {
        map,
        nodes,
        redirects,
        matched,
    } = placement;
    let types_added = nodes.len();

    for node in nodes {
        trace!(id = %node.id(), kind = %node.kind(), "placing type");
        let unbound_forward = node.forward_kind().is_some();
        let id = tgt.insert(node)?;
        if unbound_forward {
            warn!(
                unit = src.source_str(),
                name = tgt.name_of(id).unwrap_or_default(),
                "forward declaration has no definition yet"
            );
        }
    }
    for &(fwd, def) in &redirects {
        tgt.redirect_forward(fwd, def)?;
    }
    let items_added = items.add.len();
    for item in items.add {
        tgt.add_item(item);
    }
    let labels_added = labels.len();
    for label in labels {
        tgt.label_append(label)?;
    }

    debug!(
        unit = src.source_str(),
        types_added,
        types_matched = matched,
        items_added,
        items_skipped = items.skipped,
        labels_added,
        forwards_bound = redirects.len(),
        "merged unit"
    );

    Ok(MergeOutcome {
        assoc: map,
        types_added,
        types_matched: matched,
        items_added,
        items_skipped: items.skipped,
        labels_added,
        redirects,
    })
}
