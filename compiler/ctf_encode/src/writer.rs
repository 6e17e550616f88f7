//! Section writers.
//!
//! Each section is written into its own buffer; the string table fills up
//! as names are met, in section order, so identical inputs produce identical
//! string offsets.

use byteorder::{LittleEndian, WriteBytesExt};
use ctf_ir::{Intrinsic, Item, Name, NodeFlags, TypeGraph, TypeId, TypeKind, TypeNode, TypePayload};

use crate::burst::Burst;
use crate::format::{type_info, Header, F_COMPRESSED, MAX_VLEN, VERSION};
use crate::strtab::StringTable;
use crate::symbols::{Association, Bound};
use crate::EncodeError;

type Le = LittleEndian;

/// Everything after the header, plus the header describing it.
pub(crate) struct Sections {
    pub(crate) header: Header,
    pub(crate) data: Vec<u8>,
}

pub(crate) struct Writer<'a> {
    graph: &'a TypeGraph,
    burst: &'a Burst<'a>,
    strings: StringTable,
}

impl<'a> Writer<'a> {
    pub(crate) fn new(graph: &'a TypeGraph, burst: &'a Burst<'a>) -> Self {
        Self {
            graph,
            burst,
            strings: StringTable::new(),
        }
    }

    /// Lay out every section. `symbols` is `None` for a types-only artifact.
    pub(crate) fn finish(
        mut self,
        symbols: Option<&Association>,
        compressed: bool,
    ) -> Result<Sections, EncodeError> {
        let (graph, burst) = (self.graph, self.burst);
        let (parent_label, parent_name) = match graph.parent() {
            Some(p) => (self.name(p.label)?, self.name(p.name)?),
            None => (0, 0),
        };

        let labels = self.labels()?;
        let (objects, functions) = match symbols {
            Some(assoc) => (self.objects(&assoc.objects)?, self.functions(&assoc.functions)?),
            None => (Vec::new(), Vec::new()),
        };
        let mut types = Vec::new();
        for &id in burst.order() {
            let node = graph
                .get(id)
                .ok_or(EncodeError::DanglingReference { missing: id })?;
            self.write_type(&mut types, node)?;
        }

        let offset = |len: usize| {
            u32::try_from(len).map_err(|_| EncodeError::TooLarge { what: "artifact" })
        };
        let label_off = 0;
        let object_off = offset(labels.len())?;
        let function_off = offset(object_off as usize + objects.len())?;
        let type_off = offset(function_off as usize + functions.len())?;
        let str_off = offset(type_off as usize + types.len())?;
        let str_len = offset(self.strings.len())?;

        let header = Header {
            version: VERSION,
            flags: if compressed { F_COMPRESSED } else { 0 },
            parent_label,
            parent_name,
            first_type: burst.first(),
            n_labels: offset(graph.labels().len())?,
            n_objects: offset(symbols.map_or(0, |a| a.objects.len()))?,
            n_functions: offset(symbols.map_or(0, |a| a.functions.len()))?,
            n_types: offset(burst.len())?,
            label_off,
            object_off,
            function_off,
            type_off,
            str_off,
            str_len,
        };

        let mut data = Vec::with_capacity(str_off as usize + str_len as usize);
        data.extend_from_slice(&labels);
        data.extend_from_slice(&objects);
        data.extend_from_slice(&functions);
        data.extend_from_slice(&types);
        data.extend_from_slice(&self.strings.into_bytes());
        Ok(Sections { header, data })
    }

    fn name(&mut self, name: Name) -> Result<u32, EncodeError> {
        self.strings.insert(self.graph.interner().lookup(name))
    }

    fn opt_name(&mut self, name: Option<Name>) -> Result<u32, EncodeError> {
        match name {
            Some(name) => self.name(name),
            None => Ok(0),
        }
    }

    /// `{ name, type_idx }` per label.
    fn labels(&mut self) -> Result<Vec<u8>, EncodeError> {
        let graph = self.graph;
        let mut w = Vec::with_capacity(graph.labels().len() * 8);
        for (index, label) in graph.labels().iter().enumerate() {
            w.write_u32::<Le>(self.name(label.name)?)?;
            w.write_u32::<Le>(self.burst.watermark(index))?;
        }
        Ok(w)
    }

    /// `{ name, symidx, type }` per object.
    fn objects(&mut self, objects: &[Bound]) -> Result<Vec<u8>, EncodeError> {
        let mut w = Vec::with_capacity(objects.len() * 12);
        for bound in objects {
            w.write_u32::<Le>(self.name(bound.item.name)?)?;
            w.write_u32::<Le>(bound.symidx)?;
            w.write_u32::<Le>(self.burst.encoded(bound.item.ty)?)?;
        }
        Ok(w)
    }

    /// `{ name, symidx, info, ret, args[vlen] }` per function. A variadic
    /// function ends its argument list with 0.
    fn functions(&mut self, functions: &[Bound]) -> Result<Vec<u8>, EncodeError> {
        let mut w = Vec::new();
        for bound in functions {
            let item = &bound.item;
            let vlen = vlen(item.ty, item.args.len() + usize::from(item.variadic))?;
            w.write_u32::<Le>(self.name(item.name)?)?;
            w.write_u32::<Le>(bound.symidx)?;
            w.write_u32::<Le>(type_info(TypeKind::Function, false, vlen))?;
            w.write_u32::<Le>(self.burst.encoded(return_type(self.graph, item))?)?;
            for &arg in &item.args {
                w.write_u32::<Le>(self.burst.encoded(arg)?)?;
            }
            if item.variadic {
                w.write_u32::<Le>(0)?;
            }
        }
        Ok(w)
    }

    /// `{ name, info, size }` followed by the kind's data.
    fn write_type(&mut self, w: &mut Vec<u8>, node: &TypeNode) -> Result<(), EncodeError> {
        let id = node.id();
        let burst = self.burst;
        let payload = node.payload();
        let vlen = match payload {
            TypePayload::Function(fd) => vlen(id, fd.args.len() + usize::from(fd.variadic))?,
            TypePayload::Members(members) => vlen(id, members.len())?,
            TypePayload::Enumerators(enums) => vlen(id, enums.len())?,
            _ => 0,
        };
        let root = node.flags().contains(NodeFlags::ROOT);
        let size =
            u32::try_from(node.size()).map_err(|_| EncodeError::Overflow { id, what: "size" })?;

        w.write_u32::<Le>(self.opt_name(node.name())?)?;
        w.write_u32::<Le>(type_info(node.kind(), root, vlen))?;
        w.write_u32::<Le>(size)?;

        match payload {
            TypePayload::Intrinsic(intr) => w.write_u32::<Le>(intrinsic_word(intr))?,
            TypePayload::Ref(target) => w.write_u32::<Le>(burst.encoded(*target)?)?,
            TypePayload::PtrAuth(pa) => {
                w.write_u32::<Le>(burst.encoded(pa.ty)?)?;
                let word = (u32::from(pa.discriminated) << 24)
                    | (u32::from(pa.key) << 16)
                    | u32::from(pa.discriminator);
                w.write_u32::<Le>(word)?;
            }
            TypePayload::Array(ad) => {
                w.write_u32::<Le>(burst.encoded(ad.contents)?)?;
                w.write_u32::<Le>(burst.encoded(ad.index)?)?;
                w.write_u32::<Le>(ad.nelems)?;
            }
            TypePayload::Function(fd) => {
                w.write_u32::<Le>(burst.encoded(fd.ret)?)?;
                for &arg in &fd.args {
                    w.write_u32::<Le>(burst.encoded(arg)?)?;
                }
                if fd.variadic {
                    w.write_u32::<Le>(0)?;
                }
            }
            TypePayload::Members(members) => {
                for m in members {
                    w.write_u32::<Le>(self.opt_name(m.name)?)?;
                    w.write_u32::<Le>(burst.encoded(m.ty)?)?;
                    w.write_u32::<Le>(m.offset_bits)?;
                    w.write_u32::<Le>(m.size_bits)?;
                }
            }
            TypePayload::Enumerators(enums) => {
                for e in enums {
                    w.write_u32::<Le>(self.name(e.name)?)?;
                    w.write_i32::<Le>(e.value)?;
                }
            }
            TypePayload::Forward(fk) => w.write_u32::<Le>(u32::from(fk.kind() as u8))?,
            TypePayload::Unresolved => {
                return Err(EncodeError::UnresolvedType {
                    id,
                    name: self.graph.name_of(id).unwrap_or_default().to_owned(),
                });
            }
        }
        Ok(())
    }
}

/// `format << 24 | offset << 16 | bits`.
fn intrinsic_word(intr: &Intrinsic) -> u32 {
    (u32::from(intr.format) << 24) | (u32::from(intr.offset_bits) << 16) | u32::from(intr.bits)
}

fn vlen(id: TypeId, len: usize) -> Result<u32, EncodeError> {
    u32::try_from(len)
        .ok()
        .filter(|&v| v <= MAX_VLEN)
        .ok_or(EncodeError::Overflow {
            id,
            what: "list length",
        })
}

/// A function descriptor's type is its function node when the front end
/// made one, else the return type itself.
fn return_type(graph: &TypeGraph, item: &Item) -> TypeId {
    match graph.get(graph.resolve(item.ty)).map(TypeNode::payload) {
        Some(TypePayload::Function(fd)) => fd.ret,
        _ => item.ty,
    }
}
