//! The unit file a debug-info front end hands to the merger.
//!
//! Names travel as strings; every reader interns them into its own
//! [`SharedInterner`]. The payload is bincode.

use serde::{Deserialize, Serialize};

use crate::{
    ArrayDef, Enumerator, ForwardKind, FuncDef, GraphError, Intrinsic, Item, ItemFlags, ItemKind,
    Label, LabelError, Member, PtrAuth, SharedInterner, TypeGraph, TypeId, TypeKind, TypeNode,
    TypePayload,
};

/// Current unit file version.
pub const UNIT_FILE_VERSION: u32 = 2;

#[derive(Debug, thiserror::Error)]
pub enum InterchangeError {
    #[error("malformed unit file: {0}")]
    Decode(#[from] bincode::Error),
    #[error("unit file version {0} is not supported (expected {UNIT_FILE_VERSION})")]
    UnsupportedVersion(u32),
    #[error("type {id}: payload does not fit a {kind} node")]
    BadPayload { id: TypeId, kind: TypeKind },
    #[error(transparent)]
    Graph(#[from] GraphError),
    #[error(transparent)]
    Label(#[from] LabelError),
}

/// One compilation unit's type graph, serialized.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitFile {
    pub version: u32,
    pub source: String,
    /// Label of the merge target this unit was built against.
    pub parent_label: Option<String>,
    /// Type IDs are those of an encoded artifact, so children can be built
    /// against this unit.
    pub numbered: bool,
    pub types: Vec<UnitType>,
    pub items: Vec<UnitItem>,
    pub labels: Vec<UnitLabel>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitType {
    pub id: TypeId,
    pub name: Option<String>,
    pub kind: TypeKind,
    pub size: u64,
    pub payload: UnitPayload,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnitPayload {
    Intrinsic(Intrinsic),
    Ref(TypeId),
    PtrAuth(PtrAuth),
    Array(ArrayDef),
    Function {
        ret: TypeId,
        args: Vec<TypeId>,
        variadic: bool,
    },
    Members(Vec<UnitMember>),
    Enumerators(Vec<(String, i32)>),
    Forward(ForwardKind),
    Unresolved,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitMember {
    pub name: Option<String>,
    pub ty: TypeId,
    pub offset_bits: u32,
    pub size_bits: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitItem {
    pub kind: ItemKind,
    pub name: String,
    pub ty: TypeId,
    pub owner: Option<String>,
    pub used: bool,
    pub args: Vec<TypeId>,
    pub variadic: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitLabel {
    pub name: String,
    pub idx: TypeId,
}

impl UnitFile {
    /// Snapshot a graph. Forward redirects are not carried; a unit file
    /// describes a graph before merging.
    pub fn from_graph(graph: &TypeGraph) -> Self {
        let interner = graph.interner();
        let s = |name| interner.lookup(name).to_owned();

        let types = graph
            .nodes()
            .map(|node| UnitType {
                id: node.id(),
                name: node.name().map(s),
                kind: node.kind(),
                size: node.size(),
                payload: match node.payload() {
                    TypePayload::Intrinsic(i) => UnitPayload::Intrinsic(*i),
                    TypePayload::Ref(ty) => UnitPayload::Ref(*ty),
                    TypePayload::PtrAuth(pa) => UnitPayload::PtrAuth(*pa),
                    TypePayload::Array(ad) => UnitPayload::Array(*ad),
                    TypePayload::Function(fd) => UnitPayload::Function {
                        ret: fd.ret,
                        args: fd.args.to_vec(),
                        variadic: fd.variadic,
                    },
                    TypePayload::Members(members) => UnitPayload::Members(
                        members
                            .iter()
                            .map(|m| UnitMember {
                                name: m.name.map(s),
                                ty: m.ty,
                                offset_bits: m.offset_bits,
                                size_bits: m.size_bits,
                            })
                            .collect(),
                    ),
                    TypePayload::Enumerators(values) => UnitPayload::Enumerators(
                        values.iter().map(|e| (s(e.name), e.value)).collect(),
                    ),
                    TypePayload::Forward(fk) => UnitPayload::Forward(*fk),
                    TypePayload::Unresolved => UnitPayload::Unresolved,
                },
            })
            .collect();

        let items = graph
            .items()
            .iter()
            .map(|item| UnitItem {
                kind: item.kind,
                name: s(item.name),
                ty: item.ty,
                owner: item.owner.map(s),
                used: item.is_used(),
                args: item.args.to_vec(),
                variadic: item.variadic,
            })
            .collect();

        let labels = graph
            .labels()
            .iter()
            .map(|l| UnitLabel {
                name: s(l.name),
                idx: l.idx,
            })
            .collect();

        UnitFile {
            version: UNIT_FILE_VERSION,
            source: graph.source_str().to_owned(),
            parent_label: graph.parent_label().map(s),
            numbered: false,
            types,
            items,
            labels,
        }
    }

    /// Snapshot a graph numbered the way its artifact was, for use as a
    /// parent by later runs.
    pub fn from_numbered(graph: &TypeGraph) -> Self {
        Self {
            numbered: true,
            ..Self::from_graph(graph)
        }
    }

    /// Rebuild the graph with names interned into `interner`.
    pub fn into_graph(self, interner: SharedInterner) -> Result<TypeGraph, InterchangeError> {
        if self.version != UNIT_FILE_VERSION {
            return Err(InterchangeError::UnsupportedVersion(self.version));
        }
        let mut graph = TypeGraph::with_source(interner.clone(), &self.source);
        graph.set_parent_label(interner.intern_opt(self.parent_label.as_deref()));

        for ty in self.types {
            let payload = match ty.payload {
                UnitPayload::Intrinsic(i) => TypePayload::Intrinsic(i),
                UnitPayload::Ref(id) => TypePayload::Ref(id),
                UnitPayload::PtrAuth(pa) => TypePayload::PtrAuth(pa),
                UnitPayload::Array(ad) => TypePayload::Array(ad),
                UnitPayload::Function {
                    ret,
                    args,
                    variadic,
                } => TypePayload::Function(FuncDef {
                    ret,
                    args: args.into_iter().collect(),
                    variadic,
                }),
                UnitPayload::Members(members) => TypePayload::Members(
                    members
                        .into_iter()
                        .map(|m| Member {
                            name: interner.intern_opt(m.name.as_deref()),
                            ty: m.ty,
                            offset_bits: m.offset_bits,
                            size_bits: m.size_bits,
                        })
                        .collect(),
                ),
                UnitPayload::Enumerators(values) => TypePayload::Enumerators(
                    values
                        .into_iter()
                        .map(|(name, value)| Enumerator {
                            name: interner.intern_owned(name),
                            value,
                        })
                        .collect(),
                ),
                UnitPayload::Forward(fk) => TypePayload::Forward(fk),
                UnitPayload::Unresolved => TypePayload::Unresolved,
            };
            let name = interner.intern_opt(ty.name.as_deref());
            let node = TypeNode::new(ty.id, name, ty.kind, ty.size, payload).ok_or(
                InterchangeError::BadPayload {
                    id: ty.id,
                    kind: ty.kind,
                },
            )?;
            graph.insert(node)?;
        }

        for ui in self.items {
            let mut item = Item::new(ui.kind, interner.intern_owned(ui.name), ui.ty)
                .with_args(ui.args, ui.variadic);
            item.owner = interner.intern_opt(ui.owner.as_deref());
            item.flags.set(ItemFlags::USED, ui.used);
            graph.add_item(item);
        }

        for label in self.labels {
            graph.label_append(Label {
                name: interner.intern_owned(label.name),
                idx: label.idx,
            })?;
        }

        Ok(graph)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, InterchangeError> {
        Ok(bincode::serialize(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, InterchangeError> {
        Ok(bincode::deserialize(bytes)?)
    }
}
