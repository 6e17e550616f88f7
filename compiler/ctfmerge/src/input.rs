//! Reading unit files and symbol tables.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use ctf_encode::{Binding, Symbol, SymbolKind};
use ctf_ir::interchange::{InterchangeError, UnitFile};
use ctf_ir::{SharedInterner, TypeGraph};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

/// Current symbol file version.
pub const SYMBOL_FILE_VERSION: u32 = 1;

#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("{}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{}: {source}", path.display())]
    Unit {
        path: PathBuf,
        #[source]
        source: InterchangeError,
    },

    #[error("{}: not a parent unit; write one with -u", path.display())]
    NotNumbered { path: PathBuf },

    #[error("{}: malformed symbol file: {source}", path.display())]
    Symbols {
        path: PathBuf,
        #[source]
        source: bincode::Error,
    },

    #[error("{}: symbol file version {found} is not supported (expected {SYMBOL_FILE_VERSION})", path.display())]
    SymbolVersion { path: PathBuf, found: u32 },
}

/// An object file's symbol table, in ordinal order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolFile {
    pub version: u32,
    pub symbols: Vec<SymbolRecord>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolRecord {
    pub name: String,
    pub function: bool,
    pub binding: RecordBinding,
    pub file: Option<String>,
    pub dynamic: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordBinding {
    Local,
    Global,
    Weak,
}

impl SymbolFile {
    pub fn new(symbols: Vec<SymbolRecord>) -> Self {
        Self {
            version: SYMBOL_FILE_VERSION,
            symbols,
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(self)
    }

    /// The table as the encoder sees it.
    pub fn into_symbols(self) -> Vec<Symbol> {
        self.symbols.into_iter().map(Symbol::from).collect()
    }
}

impl From<SymbolRecord> for Symbol {
    fn from(record: SymbolRecord) -> Self {
        Symbol {
            name: record.name,
            kind: if record.function {
                SymbolKind::Function
            } else {
                SymbolKind::Object
            },
            binding: match record.binding {
                RecordBinding::Local => Binding::Local,
                RecordBinding::Global => Binding::Global,
                RecordBinding::Weak => Binding::Weak,
            },
            file: record.file,
            dynamic: record.dynamic,
        }
    }
}

fn read(path: &Path) -> Result<Vec<u8>, InputError> {
    fs::read(path).map_err(|source| InputError::Read {
        path: path.to_owned(),
        source,
    })
}

fn read_unit_file(path: &Path) -> Result<UnitFile, InputError> {
    let bytes = read(path)?;
    UnitFile::from_bytes(&bytes).map_err(|source| InputError::Unit {
        path: path.to_owned(),
        source,
    })
}

fn into_graph(
    path: &Path,
    file: UnitFile,
    interner: &SharedInterner,
) -> Result<TypeGraph, InputError> {
    file.into_graph(interner.clone())
        .map_err(|source| InputError::Unit {
            path: path.to_owned(),
            source,
        })
}

/// Load one unit file into a graph over `interner`, with its typedefs bound
/// by name where the unit left them open.
pub fn read_unit(path: &Path, interner: &SharedInterner) -> Result<TypeGraph, InputError> {
    let file = read_unit_file(path)?;
    let mut graph = into_graph(path, file, interner)?;

    let bound = graph.resolve_typedefs_by_name();
    trace!(unit = %path.display(), bound, "bound typedefs by name");
    debug!(
        unit = %path.display(),
        types = graph.len(),
        items = graph.items().len(),
        "read unit"
    );
    Ok(graph)
}

/// Load a parent unit: one written with artifact numbering by an earlier
/// run, so its type IDs are the ones that run's artifact used.
pub fn read_parent(path: &Path, interner: &SharedInterner) -> Result<TypeGraph, InputError> {
    let file = read_unit_file(path)?;
    if !file.numbered {
        return Err(InputError::NotNumbered {
            path: path.to_owned(),
        });
    }
    let graph = into_graph(path, file, interner)?;
    debug!(parent = %path.display(), types = graph.len(), "read parent unit");
    Ok(graph)
}

pub fn read_symbols(path: &Path) -> Result<Vec<Symbol>, InputError> {
    let bytes = read(path)?;
    let file: SymbolFile = bincode::deserialize(&bytes).map_err(|source| InputError::Symbols {
        path: path.to_owned(),
        source,
    })?;
    if file.version != SYMBOL_FILE_VERSION {
        return Err(InputError::SymbolVersion {
            path: path.to_owned(),
            found: file.version,
        });
    }
    debug!(path = %path.display(), symbols = file.symbols.len(), "read symbol table");
    Ok(file.into_symbols())
}
