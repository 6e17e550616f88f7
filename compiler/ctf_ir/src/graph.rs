//! The graph container: every node, item, and label of one compilation unit
//! or of a merge target.
//!
//! # Design
//!
//! - Arena of nodes, addressed through an ID-keyed table (`by_id`)
//! - Layout-keyed buckets (`by_layout`) for equivalence candidates
//! - Name-keyed buckets (`by_name`) for forward/definition pairing
//! - Nodes are only ever appended; a node's slot never moves, so a reader
//!   holding an ID always finds the same node
//! - `revision` increases on every mutation so concurrent mergers can tell
//!   whether the graph moved since they last looked

use std::sync::atomic::{AtomicU32, Ordering};

use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use tracing::trace;

use crate::layout::layout_hash;
use crate::{
    ArrayDef, Enumerator, ForwardKind, FuncDef, Intrinsic, IntrinsicEncoding, Item, ItemKind,
    ItemStats, Label, Member, Name, NodeFlags, PtrAuth, SharedInterner, TypeId, TypeKind, TypeNode,
    TypePayload,
};

/// Errors from building or editing a graph.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    #[error("type {0} is already defined")]
    DuplicateId(TypeId),
    #[error("type {0} does not exist")]
    UnknownType(TypeId),
    #[error("type {id} is {found}, expected {expected}")]
    WrongKind {
        id: TypeId,
        found: TypeKind,
        expected: TypeKind,
    },
    #[error("payload does not fit a {0} node")]
    PayloadMismatch(TypeKind),
    #[error("type {0} is past the end of the ID space")]
    IdOverflow(TypeId),
}

/// The baseline a graph was uniquified against.
///
/// IDs up to and including `max_id` that are absent from the graph belong
/// to the parent.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ParentRef {
    /// Top label of the parent at uniquification time.
    pub label: Name,
    /// Basename of the parent object.
    pub name: Name,
    pub max_id: TypeId,
}

/// All type data for one file, or for several files during merging.
pub struct TypeGraph {
    interner: SharedInterner,
    /// Unit or object this graph was built from.
    source: Option<Name>,
    nodes: Vec<TypeNode>,
    by_id: FxHashMap<TypeId, u32>,
    by_layout: FxHashMap<u64, SmallVec<[TypeId; 2]>>,
    by_name: FxHashMap<Name, SmallVec<[TypeId; 2]>>,
    items: Vec<Item>,
    items_by_name: FxHashMap<Name, SmallVec<[u32; 2]>>,
    pub(crate) labels: Vec<Label>,
    parent: Option<ParentRef>,
    /// Label this unit expects to extend in the merge target.
    parent_label: Option<Name>,
    next_id: TypeId,
    cur_emark: AtomicU32,
    cur_vgen: AtomicU32,
    revision: u64,
}

impl TypeGraph {
    pub fn new(interner: SharedInterner) -> Self {
        Self {
            interner,
            source: None,
            nodes: Vec::new(),
            by_id: FxHashMap::default(),
            by_layout: FxHashMap::default(),
            by_name: FxHashMap::default(),
            items: Vec::new(),
            items_by_name: FxHashMap::default(),
            labels: Vec::new(),
            parent: None,
            parent_label: None,
            next_id: TypeId::FIRST,
            cur_emark: AtomicU32::new(0),
            cur_vgen: AtomicU32::new(0),
            revision: 0,
        }
    }

    /// A graph for the unit named `source`.
    pub fn with_source(interner: SharedInterner, source: &str) -> Self {
        let source = interner.intern(source);
        let mut graph = Self::new(interner);
        graph.source = Some(source);
        graph
    }

    #[inline]
    pub fn interner(&self) -> &SharedInterner {
        &self.interner
    }

    #[inline]
    pub fn source(&self) -> Option<Name> {
        self.source
    }

    pub fn set_source(&mut self, source: Option<Name>) {
        self.source = source;
    }

    /// Source name as a string, `"<unknown>"` when unset.
    pub fn source_str(&self) -> &'static str {
        self.source
            .map_or("<unknown>", |name| self.interner.lookup(name))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes in creation order.
    pub fn nodes(&self) -> impl ExactSizeIterator<Item = &TypeNode> + '_ {
        self.nodes.iter()
    }

    /// The ID the next created node receives.
    #[inline]
    pub fn next_id(&self) -> TypeId {
        self.next_id
    }

    /// Highest ID ever handed out (void for an empty graph).
    #[inline]
    pub fn max_id(&self) -> TypeId {
        self.next_id.prev()
    }

    #[inline]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    #[inline]
    fn touch(&mut self) {
        self.revision += 1;
    }

    #[inline]
    pub fn get(&self, id: TypeId) -> Option<&TypeNode> {
        self.by_id.get(&id).map(|&slot| &self.nodes[slot as usize])
    }

    #[inline]
    pub fn contains(&self, id: TypeId) -> bool {
        self.by_id.contains_key(&id)
    }

    fn get_mut(&mut self, id: TypeId) -> Result<&mut TypeNode, GraphError> {
        let slot = *self.by_id.get(&id).ok_or(GraphError::UnknownType(id))?;
        Ok(&mut self.nodes[slot as usize])
    }

    /// Whether `id` names a type owned by the parent baseline.
    pub fn is_parent_type(&self, id: TypeId) -> bool {
        !id.is_void() && !self.contains(id) && self.parent.is_some_and(|p| id <= p.max_id)
    }

    /// Follow forward-declaration redirects to the canonical node.
    pub fn resolve(&self, mut id: TypeId) -> TypeId {
        // A redirect chain can never be longer than the graph.
        for _ in 0..=self.nodes.len() {
            match self.get(id).and_then(TypeNode::redirect) {
                Some(next) if next != id => id = next,
                _ => break,
            }
        }
        id
    }

    /// Name of a node, if it has one.
    pub fn name_of(&self, id: TypeId) -> Option<&'static str> {
        self.get(id)
            .and_then(TypeNode::name)
            .map(|n| self.interner.lookup(n))
    }

    /// Nodes whose layout hash is `hash`.
    pub fn layout_candidates(&self, hash: u64) -> &[TypeId] {
        self.by_layout.get(&hash).map_or(&[], |ids| ids.as_slice())
    }

    /// Nodes carrying `name`.
    pub fn named(&self, name: Name) -> &[TypeId] {
        self.by_name.get(&name).map_or(&[], |ids| ids.as_slice())
    }

    /// Definition of the tagged type `(fk, name)`.
    pub fn find_definition(&self, fk: ForwardKind, name: Name) -> Option<TypeId> {
        self.definitions(fk, name).next()
    }

    /// Every definition of the tagged type `(fk, name)`, oldest first.
    pub fn definitions(&self, fk: ForwardKind, name: Name) -> impl Iterator<Item = TypeId> + '_ {
        self.named(name)
            .iter()
            .copied()
            .filter(move |&id| self.get(id).is_some_and(|n| n.kind() == fk.kind()))
    }

    /// Forward declarations of `(fk, name)` not yet bound to a definition.
    pub fn open_forwards(&self, fk: ForwardKind, name: Name) -> impl Iterator<Item = TypeId> + '_ {
        self.named(name).iter().copied().filter(move |&id| {
            self.get(id)
                .is_some_and(|n| n.forward_kind() == Some(fk) && n.redirect().is_none())
        })
    }

    /// Add a node built elsewhere (front ends, merges). The node keeps its ID.
    pub fn insert(&mut self, node: TypeNode) -> Result<TypeId, GraphError> {
        let id = node.id();
        if id.is_void() || self.contains(id) {
            return Err(GraphError::DuplicateId(id));
        }
        if !node.payload().fits(node.kind()) {
            return Err(GraphError::PayloadMismatch(node.kind()));
        }
        let after = id.checked_next().ok_or(GraphError::IdOverflow(id))?;
        self.index(node, after);
        Ok(id)
    }

    /// `after` is the ID following the node's.
    fn index(&mut self, node: TypeNode, after: TypeId) {
        let id = node.id();
        #[expect(
            clippy::cast_possible_truncation,
            reason = "IDs are u32, so the arena never exceeds u32 slots"
        )]
        let slot = self.nodes.len() as u32;
        self.by_layout
            .entry(layout_hash(&node))
            .or_default()
            .push(id);
        if let Some(name) = node.name() {
            self.by_name.entry(name).or_default().push(id);
        }
        self.by_id.insert(id, slot);
        self.nodes.push(node);
        if id >= self.next_id {
            self.next_id = after;
        }
        self.touch();
    }

    fn push(
        &mut self,
        name: Option<Name>,
        kind: TypeKind,
        size: u64,
        payload: TypePayload,
    ) -> TypeId {
        let id = self.next_id;
        self.index(
            TypeNode::new_unchecked(id, name, kind, size, payload),
            id.next(),
        );
        id
    }

    pub fn add_intrinsic(&mut self, name: Option<&str>, size: u64, intr: Intrinsic) -> TypeId {
        let kind = match intr.encoding {
            IntrinsicEncoding::Int => TypeKind::Integer,
            IntrinsicEncoding::Real => TypeKind::Real,
        };
        let name = self.interner.intern_opt(name);
        self.push(name, kind, size, TypePayload::Intrinsic(intr))
    }

    pub fn add_pointer(&mut self, target: TypeId, size: u64) -> TypeId {
        self.push(None, TypeKind::Pointer, size, TypePayload::Ref(target))
    }

    pub fn add_const(&mut self, target: TypeId) -> TypeId {
        self.push(None, TypeKind::Const, 0, TypePayload::Ref(target))
    }

    pub fn add_volatile(&mut self, target: TypeId) -> TypeId {
        self.push(None, TypeKind::Volatile, 0, TypePayload::Ref(target))
    }

    pub fn add_restrict(&mut self, target: TypeId) -> TypeId {
        self.push(None, TypeKind::Restrict, 0, TypePayload::Ref(target))
    }

    pub fn add_typedef(&mut self, name: &str, target: TypeId) -> TypeId {
        let name = self.interner.intern(name);
        self.push(Some(name), TypeKind::Typedef, 0, TypePayload::Ref(target))
    }

    /// A typedef whose target will be bound later.
    pub fn add_unresolved_typedef(&mut self, name: &str) -> TypeId {
        let name = self.interner.intern(name);
        self.push(
            Some(name),
            TypeKind::TypedefUnresolved,
            0,
            TypePayload::Unresolved,
        )
    }

    pub fn add_array(&mut self, contents: TypeId, index: TypeId, nelems: u32, size: u64) -> TypeId {
        self.push(
            None,
            TypeKind::Array,
            size,
            TypePayload::Array(ArrayDef {
                contents,
                index,
                nelems,
            }),
        )
    }

    pub fn add_function(
        &mut self,
        ret: TypeId,
        args: impl IntoIterator<Item = TypeId>,
        variadic: bool,
    ) -> TypeId {
        let def = FuncDef {
            ret,
            args: args.into_iter().collect(),
            variadic,
        };
        self.push(None, TypeKind::Function, 0, TypePayload::Function(def))
    }

    pub fn add_struct(&mut self, name: Option<&str>, size: u64, members: Vec<Member>) -> TypeId {
        let name = self.interner.intern_opt(name);
        self.push(name, TypeKind::Struct, size, TypePayload::Members(members))
    }

    pub fn add_union(&mut self, name: Option<&str>, size: u64, members: Vec<Member>) -> TypeId {
        let name = self.interner.intern_opt(name);
        self.push(name, TypeKind::Union, size, TypePayload::Members(members))
    }

    pub fn add_enum<'a>(
        &mut self,
        name: Option<&str>,
        size: u64,
        values: impl IntoIterator<Item = (&'a str, i32)>,
    ) -> TypeId {
        let name = self.interner.intern_opt(name);
        let values = values
            .into_iter()
            .map(|(n, value)| Enumerator {
                name: self.interner.intern(n),
                value,
            })
            .collect();
        self.push(name, TypeKind::Enum, size, TypePayload::Enumerators(values))
    }

    pub fn add_forward(&mut self, name: &str, fk: ForwardKind) -> TypeId {
        let name = self.interner.intern(name);
        self.push(Some(name), TypeKind::Forward, 0, TypePayload::Forward(fk))
    }

    pub fn add_ptrauth(
        &mut self,
        target: TypeId,
        key: u8,
        discriminator: u16,
        discriminated: bool,
    ) -> TypeId {
        let pa = PtrAuth {
            ty: target,
            key,
            discriminator,
            discriminated,
        };
        self.push(None, TypeKind::PtrAuth, 0, TypePayload::PtrAuth(pa))
    }

    /// Build a member with an interned name.
    pub fn member(
        &self,
        name: Option<&str>,
        ty: TypeId,
        offset_bits: u32,
        size_bits: u32,
    ) -> Member {
        Member {
            name: self.interner.intern_opt(name),
            ty,
            offset_bits,
            size_bits,
        }
    }

    /// Bind a forward declaration to the definition it stands for.
    ///
    /// Every holder of `fwd` keeps its ID; `resolve` now leads to `def`.
    pub fn redirect_forward(&mut self, fwd: TypeId, def: TypeId) -> Result<(), GraphError> {
        if !self.contains(def) && !self.is_parent_type(def) {
            return Err(GraphError::UnknownType(def));
        }
        let node = self.get_mut(fwd)?;
        if node.kind() != TypeKind::Forward {
            return Err(GraphError::WrongKind {
                id: fwd,
                found: node.kind(),
                expected: TypeKind::Forward,
            });
        }
        node.set_redirect(def);
        trace!(%fwd, %def, "forward redirected");
        self.touch();
        Ok(())
    }

    /// Turn an unresolved typedef into a typedef of `target`, in place.
    pub fn resolve_typedef(&mut self, id: TypeId, target: TypeId) -> Result<(), GraphError> {
        let node = self.get_mut(id)?;
        if node.kind() != TypeKind::TypedefUnresolved {
            return Err(GraphError::WrongKind {
                id,
                found: node.kind(),
                expected: TypeKind::TypedefUnresolved,
            });
        }
        let old_hash = layout_hash(node);
        node.bind_typedef(target);
        let new_hash = layout_hash(node);

        if let Some(bucket) = self.by_layout.get_mut(&old_hash) {
            bucket.retain(|other| *other != id);
        }
        self.by_layout.entry(new_hash).or_default().push(id);
        self.touch();
        Ok(())
    }

    /// Unresolved typedefs, in creation order.
    pub fn unresolved_typedefs(&self) -> impl Iterator<Item = TypeId> + '_ {
        self.nodes
            .iter()
            .filter(|n| n.kind() == TypeKind::TypedefUnresolved)
            .map(TypeNode::id)
    }

    /// Bind every unresolved typedef whose name picks out exactly one other
    /// node. Definitions win over forward declarations. Returns how many
    /// typedefs were bound.
    pub fn resolve_typedefs_by_name(&mut self) -> usize {
        let pending: Vec<TypeId> = self.unresolved_typedefs().collect();
        let mut bound = 0;
        for id in pending {
            let Some(name) = self.get(id).and_then(TypeNode::name) else {
                continue;
            };
            let target = {
                let candidates: SmallVec<[&TypeNode; 2]> = self
                    .named(name)
                    .iter()
                    .filter(|&&other| other != id)
                    .filter_map(|&other| self.get(other))
                    .filter(|n| {
                        !matches!(n.kind(), TypeKind::TypedefUnresolved | TypeKind::Typedef)
                    })
                    .collect();
                let definitions: SmallVec<[TypeId; 2]> = candidates
                    .iter()
                    .filter(|n| n.kind() != TypeKind::Forward)
                    .map(|n| n.id())
                    .collect();
                match (definitions.as_slice(), candidates.as_slice()) {
                    ([only], _) => Some(*only),
                    ([], [only]) => Some(only.id()),
                    _ => None,
                }
            };
            if let Some(target) = target {
                if self.resolve_typedef(id, target).is_ok() {
                    bound += 1;
                }
            }
        }
        bound
    }

    /// Add an item and mark the node it describes as a root.
    pub fn add_item(&mut self, item: Item) -> usize {
        let mut flags = NodeFlags::ROOT;
        if item.kind.is_global() {
            flags |= NodeFlags::GLOBAL;
        }
        let target = self.resolve(item.ty);
        if let Ok(node) = self.get_mut(target) {
            node.insert_flags(flags);
        }

        let index = self.items.len();
        #[expect(
            clippy::cast_possible_truncation,
            reason = "item counts stay far below u32::MAX"
        )]
        let slot = index as u32;
        self.items_by_name.entry(item.name).or_default().push(slot);
        self.items.push(item);
        self.touch();
        index
    }

    /// Items in insertion order.
    #[inline]
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    /// Flip the used flag of the item at `index`.
    pub fn set_item_used(&mut self, index: usize, used: bool) {
        if let Some(item) = self.items.get_mut(index) {
            item.flags.set(crate::ItemFlags::USED, used);
            self.revision += 1;
        }
    }

    /// Items named `name`, in insertion order.
    pub fn items_named(&self, name: Name) -> impl Iterator<Item = &Item> + '_ {
        self.items_by_name
            .get(&name)
            .into_iter()
            .flatten()
            .map(|&i| &self.items[i as usize])
    }

    /// The item with this identity: `(name, kind)` for globals,
    /// `(name, kind, owner)` for everything else.
    pub fn find_item(&self, kind: ItemKind, name: Name, owner: Option<Name>) -> Option<&Item> {
        self.items_named(name)
            .find(|i| i.kind == kind && (kind.is_global() || i.owner == owner))
    }

    pub fn item_stats(&self) -> ItemStats {
        self.items.iter().collect()
    }

    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    #[inline]
    pub fn parent(&self) -> Option<ParentRef> {
        self.parent
    }

    pub fn set_parent(&mut self, parent: ParentRef) {
        self.parent = Some(parent);
        if parent.max_id >= self.next_id {
            self.next_id = parent.max_id.next();
        }
        self.touch();
    }

    /// The label in the merge target this unit was built to extend.
    #[inline]
    pub fn parent_label(&self) -> Option<Name> {
        self.parent_label
    }

    pub fn set_parent_label(&mut self, label: Option<Name>) {
        self.parent_label = label;
    }

    /// Start a new equality-mark generation. Marks from older generations
    /// become stale without touching any node.
    pub fn next_emark(&self) -> u32 {
        self.cur_emark
            .fetch_add(1, Ordering::Relaxed)
            .wrapping_add(1)
    }

    /// Start a new visitation generation.
    pub fn next_vgen(&self) -> u32 {
        self.cur_vgen
            .fetch_add(1, Ordering::Relaxed)
            .wrapping_add(1)
    }
}

impl Clone for TypeGraph {
    fn clone(&self) -> Self {
        Self {
            interner: self.interner.clone(),
            source: self.source,
            nodes: self.nodes.clone(),
            by_id: self.by_id.clone(),
            by_layout: self.by_layout.clone(),
            by_name: self.by_name.clone(),
            items: self.items.clone(),
            items_by_name: self.items_by_name.clone(),
            labels: self.labels.clone(),
            parent: self.parent,
            parent_label: self.parent_label,
            next_id: self.next_id,
            cur_emark: AtomicU32::new(0),
            cur_vgen: AtomicU32::new(0),
            revision: self.revision,
        }
    }
}

impl std::fmt::Debug for TypeGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeGraph")
            .field("source", &self.source_str())
            .field("types", &self.nodes.len())
            .field("items", &self.items.len())
            .field("labels", &self.labels.len())
            .field("next_id", &self.next_id)
            .field("parent", &self.parent)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]
mod tests;
