use ctf_ir::{GraphError, LabelError, TypeId};

/// Why a graph could not be encoded. Every variant is fatal for the
/// artifact; nothing is written.
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    #[error("typedef {name} (type {id}) was never resolved")]
    UnresolvedType { id: TypeId, name: String },

    #[error("forward declaration {name} (type {id}) is bound to missing type {target}")]
    DanglingForward {
        id: TypeId,
        name: String,
        target: TypeId,
    },

    #[error("type {missing} is referenced but not defined")]
    DanglingReference { missing: TypeId },

    #[error("{count} types do not fit the type ID space")]
    TooManyTypes { count: usize },

    #[error("type {id} does not fit its encoding: {what}")]
    Overflow { id: TypeId, what: &'static str },

    #[error("{what} exceeds 4 GiB")]
    TooLarge { what: &'static str },

    #[error("cannot rebuild the numbered graph: {0}")]
    Graph(#[from] GraphError),

    #[error("cannot rebuild the numbered labels: {0}")]
    Label(#[from] LabelError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Why an encoded artifact could not be read back.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum FormatError {
    #[error("bad magic {0:#06x}")]
    BadMagic(u16),

    #[error("unsupported format version {0}")]
    UnsupportedVersion(u8),

    #[error("truncated: need {needed} bytes, have {len}")]
    Truncated { needed: usize, len: usize },

    #[error("corrupt artifact: {0}")]
    Corrupt(String),
}
