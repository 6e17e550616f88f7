//! Choosing which types to emit and numbering them.
//!
//! Types are collected by a pre-order walk from the kept descriptors, in the
//! order the descriptors are emitted. Numbering follows the walk, so the
//! encoded IDs depend only on the descriptors and the shape of the graph,
//! never on the IDs the merge happened to hand out.
//!
//! Labels split the walk into runs: every type a label covers is numbered
//! before any type of a later label, so each label closes over a contiguous
//! prefix of the encoded IDs.

use std::ops::ControlFlow;

use ctf_ir::{Label, TypeGraph, TypeId, TypeKind, TypeNode, TypeVisitor, Visit};
use rustc_hash::FxHashMap;
use tracing::{debug, trace};

use crate::format::MAX_TYPE_ID;
use crate::EncodeError;

/// Where every kept type of a graph landed in its artifact.
///
/// Keys are canonical graph IDs (forwards resolved).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Numbering {
    /// Canonical graph IDs in emission order.
    order: Vec<TypeId>,
    ids: FxHashMap<TypeId, u32>,
    first: u32,
    /// Encoded watermark of each label, in label order.
    closes: Vec<u32>,
}

impl Numbering {
    /// Encoded ID of the first emitted type.
    #[inline]
    pub fn first(&self) -> u32 {
        self.first
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Encoded ID of a canonical graph ID, if the type was emitted.
    pub fn get(&self, id: TypeId) -> Option<u32> {
        self.ids.get(&id).copied()
    }

    /// Encoded watermark of the `index`th label.
    pub fn label_close(&self, index: usize) -> Option<u32> {
        self.closes.get(index).copied()
    }

    /// `graph` as its artifact numbered it: one node per emitted type under
    /// its encoded ID, children rewritten to encoded IDs, labels at their
    /// encoded watermarks. Void and parent references keep their IDs.
    ///
    /// A later run can build a child against this graph, and the child's
    /// references into it are then the artifact's own IDs.
    pub fn baseline(&self, graph: &TypeGraph) -> Result<TypeGraph, EncodeError> {
        let mut out = TypeGraph::new(graph.interner().clone());
        out.set_source(graph.source());
        if let Some(parent) = graph.parent() {
            out.set_parent(parent);
        }

        let encoded = |id: TypeId| {
            let id = graph.resolve(id);
            self.get(id).map_or(id, TypeId::from_raw)
        };
        for &id in &self.order {
            let node = graph
                .get(id)
                .ok_or(EncodeError::DanglingReference { missing: id })?;
            out.insert(node.remapped(encoded(id), encoded))?;
        }
        for (label, &close) in graph.labels().iter().zip(&self.closes) {
            out.label_append(Label {
                name: label.name,
                idx: TypeId::from_raw(close),
            })?;
        }
        debug!(types = out.len(), labels = out.labels().len(), "built baseline");
        Ok(out)
    }
}

/// Emission order and encoded IDs of every kept type.
pub(crate) struct Burst<'g> {
    graph: &'g TypeGraph,
    pub(crate) numbering: Numbering,
}

struct Collect {
    order: Vec<TypeId>,
    unresolved: Option<TypeId>,
    missing: Option<TypeId>,
}

impl TypeVisitor for Collect {
    fn visit(&mut self, _graph: &TypeGraph, node: &TypeNode) -> Visit {
        if node.kind() == TypeKind::TypedefUnresolved && self.unresolved.is_none() {
            self.unresolved = Some(node.id());
        }
        self.order.push(node.id());
        Visit::Descend
    }

    fn missing(&mut self, id: TypeId) {
        self.missing.get_or_insert(id);
    }
}

impl<'g> Burst<'g> {
    /// Walk `roots` and number what they reach.
    pub(crate) fn build(
        graph: &'g TypeGraph,
        roots: impl IntoIterator<Item = TypeId>,
    ) -> Result<Self, EncodeError> {
        let mut collect = Collect {
            order: Vec::new(),
            unresolved: None,
            missing: None,
        };
        graph.walk(roots, &mut collect);

        if let Some(id) = collect.unresolved {
            return Err(EncodeError::UnresolvedType {
                id,
                name: graph.name_of(id).unwrap_or_default().to_owned(),
            });
        }
        if let Some(missing) = collect.missing {
            return Err(dangling(graph, missing));
        }

        let first = graph.parent().map_or(1, |p| p.max_id.raw().saturating_add(1));
        let count = collect.order.len();
        let fits = u32::try_from(count)
            .ok()
            .and_then(|n| first.checked_add(n))
            .is_some_and(|end| end - 1 <= MAX_TYPE_ID);
        if !fits {
            return Err(EncodeError::TooManyTypes { count });
        }

        // Run k holds the types label k covers and no earlier label does;
        // the run past the last label holds the rest.
        let mut marks = Vec::with_capacity(graph.labels().len());
        graph.label_iter(|label| {
            marks.push(label.idx);
            ControlFlow::<()>::Continue(())
        });
        let run_of = |id: TypeId| marks.partition_point(|&mark| mark < id);
        let mut order = collect.order;
        order.sort_by_key(|&id| run_of(id));

        let mut ids = FxHashMap::default();
        ids.reserve(count);
        let mut next = first;
        for &id in &order {
            trace!(from = %id, to = next, "numbering type");
            ids.insert(id, next);
            next += 1;
        }

        let mut closes = Vec::with_capacity(marks.len());
        let mut covered = 0;
        for run in 0..marks.len() {
            covered += order[covered..]
                .iter()
                .take_while(|&&id| run_of(id) <= run)
                .count();
            #[expect(
                clippy::cast_possible_truncation,
                reason = "the type count was checked against MAX_TYPE_ID"
            )]
            let covered_ids = covered as u32;
            closes.push(first - 1 + covered_ids);
        }

        Ok(Self {
            graph,
            numbering: Numbering {
                order,
                ids,
                first,
                closes,
            },
        })
    }

    /// Canonical graph IDs in emission order.
    #[inline]
    pub(crate) fn order(&self) -> &[TypeId] {
        &self.numbering.order
    }

    #[inline]
    pub(crate) fn first(&self) -> u32 {
        self.numbering.first
    }

    /// Encoded ID of a graph ID. Void is 0; parent types keep their IDs.
    pub(crate) fn encoded(&self, id: TypeId) -> Result<u32, EncodeError> {
        let id = self.graph.resolve(id);
        if id.is_void() || self.graph.is_parent_type(id) {
            return Ok(id.raw());
        }
        self.numbering
            .get(id)
            .ok_or_else(|| dangling(self.graph, id))
    }

    /// Encoded watermark of the `index`th label: the last ID of its run, or
    /// of the nearest earlier non-empty run.
    pub(crate) fn watermark(&self, index: usize) -> u32 {
        self.numbering
            .label_close(index)
            .unwrap_or(self.numbering.first - 1)
    }

    pub(crate) fn len(&self) -> usize {
        self.numbering.len()
    }

    pub(crate) fn into_numbering(self) -> Numbering {
        self.numbering
    }
}

/// A missing ID reached through a bound forward declaration is reported
/// against that forward.
fn dangling(graph: &TypeGraph, missing: TypeId) -> EncodeError {
    let forward = graph
        .nodes()
        .find(|n| n.redirect().is_some() && graph.resolve(n.id()) == missing);
    match forward {
        Some(fwd) => EncodeError::DanglingForward {
            id: fwd.id(),
            name: graph.name_of(fwd.id()).unwrap_or_default().to_owned(),
            target: missing,
        },
        None => EncodeError::DanglingReference { missing },
    }
}
