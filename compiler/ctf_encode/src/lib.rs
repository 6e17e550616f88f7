//! Binary CTF encoding.
//!
//! [`encode`] turns a finished type graph into a self-contained, versioned
//! artifact:
//!
//! 1. Function and variable descriptors are bound to symbols
//!    ([`symbols`]) and sorted by name.
//! 2. Every type reachable from a kept descriptor is numbered from 1 (or
//!    from just above the parent's IDs) in walk order, label by label.
//! 3. Labels, objects, functions, types and the string table are written
//!    after a fixed header ([`format`]).
//! 4. With [`CtfFlags::COMPRESS`], everything after the header is deflated.
//!
//! The output depends only on the graph's shape, names and descriptors, so
//! merging the same units in any order encodes to the same bytes.

mod burst;
mod compress;
mod error;
pub mod format;
mod options;
mod strtab;
pub mod symbols;
mod writer;

use ctf_ir::{ItemKind, TypeGraph, TypeId};
use tracing::debug;

pub use burst::Numbering;
pub use compress::decompress_data;
pub use error::{EncodeError, FormatError};
pub use format::{read_header, Header};
pub use options::CtfFlags;
pub use symbols::{flag_unmatched, Binding, Symbol, SymbolKind};

use burst::Burst;
use format::HEADER_LEN;
use symbols::Association;
use writer::Writer;

/// An encoded artifact, ready for the object-file writer.
#[derive(Clone, Debug)]
pub struct Artifact {
    pub bytes: Vec<u8>,
    /// The writer should keep the input's debug sections.
    pub keep_debug_sections: bool,
    pub stats: EncodeStats,
    /// Where each merged type landed.
    pub numbering: Numbering,
}

impl Artifact {
    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// What went into an artifact.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EncodeStats {
    pub types: usize,
    pub objects: usize,
    pub functions: usize,
    pub labels: usize,
    pub string_bytes: usize,
    /// Function and variable descriptors no symbol bound.
    pub unmatched: usize,
    /// Data length before compression.
    pub data_len: usize,
}

/// Encode `graph`.
///
/// `symbols` is the ordered symbol table to bind descriptors to; without one
/// every used descriptor is emitted unbound.
pub fn encode(
    graph: &TypeGraph,
    symbols: Option<&[Symbol]>,
    flags: CtfFlags,
) -> Result<Artifact, EncodeError> {
    let minimize = flags.contains(CtfFlags::MINIMIZE);
    if minimize && flags.contains(CtfFlags::FUZZY_MATCH) {
        debug!("fuzzy matching has no effect on a minimized artifact");
    }

    let assoc = if minimize {
        None
    } else {
        Some(symbols::associate(graph, symbols, flags))
    };
    let burst = Burst::build(graph, roots(graph, assoc.as_ref()))?;
    let sections = Writer::new(graph, &burst).finish(
        assoc.as_ref(),
        flags.contains(CtfFlags::COMPRESS),
    )?;

    let data_len = sections.data.len();
    let payload = if sections.header.is_compressed() {
        compress::compress(&sections.data)?
    } else {
        sections.data
    };
    let mut bytes = Vec::with_capacity(HEADER_LEN + payload.len());
    sections.header.write_to(&mut bytes)?;
    bytes.extend_from_slice(&payload);

    let header = sections.header;
    let stats = EncodeStats {
        types: header.n_types as usize,
        objects: header.n_objects as usize,
        functions: header.n_functions as usize,
        labels: header.n_labels as usize,
        string_bytes: header.str_len as usize,
        unmatched: assoc.as_ref().map_or(0, |a| a.unmatched.len()),
        data_len,
    };
    debug!(
        types = stats.types,
        objects = stats.objects,
        functions = stats.functions,
        bytes = bytes.len(),
        compressed = header.is_compressed(),
        "encoded artifact"
    );

    Ok(Artifact {
        bytes,
        keep_debug_sections: flags.contains(CtfFlags::KEEP_DEBUG_SECTIONS),
        stats,
        numbering: burst.into_numbering(),
    })
}

/// Walk roots in emission order: objects, functions, then the used type
/// descriptors sorted by kind and name. A types-only artifact starts from
/// every used descriptor.
fn roots(graph: &TypeGraph, assoc: Option<&Association>) -> Vec<TypeId> {
    let interner = graph.interner();
    let mut roots = Vec::new();

    let mut rest: Vec<_> = match assoc {
        Some(assoc) => {
            for bound in assoc.objects.iter().chain(&assoc.functions) {
                roots.extend(bound.item.type_refs());
            }
            graph
                .items()
                .iter()
                .filter(|i| i.is_used() && (i.kind.is_type() || i.kind == ItemKind::Param))
                .collect()
        }
        None => graph.items().iter().filter(|i| i.is_used()).collect(),
    };
    rest.sort_by_cached_key(|i| {
        (
            i.kind,
            interner.lookup(i.name),
            i.owner.map_or("", |o| interner.lookup(o)),
        )
    });
    for item in rest {
        roots.extend(item.type_refs());
    }
    roots
}
