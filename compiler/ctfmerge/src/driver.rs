//! One merge run: read, merge in parallel, label, uniquify, encode, write.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use ctf_encode::{encode, flag_unmatched, EncodeError, EncodeStats};
use ctf_ir::interchange::{InterchangeError, UnitFile};
use ctf_ir::{ItemStats, LabelError, LabelIdx, SharedInterner, TypeGraph};
use ctf_merge::{uniquify, MergeError, MergeOutcome, MergeSession};
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::config::MergeConfig;
use crate::input::{read_parent, read_symbols, read_unit, InputError};

/// A unit that was rejected by the merge.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnitFailure {
    pub unit: PathBuf,
    pub error: MergeError,
}

#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    #[error(transparent)]
    Input(#[from] InputError),

    #[error("{}: {source}", unit.display())]
    Merge {
        unit: PathBuf,
        #[source]
        source: MergeError,
    },

    /// Units conflicted and the run was not asked to keep going.
    #[error("{} unit(s) could not be merged", failures.len())]
    UnitsFailed { failures: Vec<UnitFailure> },

    #[error("cannot label the merged types: {0}")]
    Label(#[from] LabelError),

    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error("cannot serialize the parent unit: {0}")]
    ParentUnit(#[from] InterchangeError),

    #[error("cannot write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// What a successful run did.
#[derive(Clone, Debug, Default)]
pub struct RunSummary {
    pub units: usize,
    /// Units skipped under `--keep-going`.
    pub skipped: Vec<UnitFailure>,
    pub types_added: usize,
    pub types_matched: usize,
    pub items_added: usize,
    /// Descriptors in the final graph, by kind.
    pub items: ItemStats,
    /// Descriptors dropped for lack of a symbol.
    pub unmatched: usize,
    pub encode: EncodeStats,
    pub bytes: usize,
}

impl RunSummary {
    fn absorb(&mut self, outcome: &MergeOutcome) {
        self.units += 1;
        self.types_added += outcome.types_added;
        self.types_matched += outcome.types_matched;
        self.items_added += outcome.items_added;
    }
}

type UnitResult = Result<MergeOutcome, DriverError>;

fn merge_unit(path: &Path, session: &MergeSession, interner: &SharedInterner) -> UnitResult {
    let unit = read_unit(path, interner)?;
    session.add(unit).map_err(|source| DriverError::Merge {
        unit: path.to_owned(),
        source,
    })
}

/// Merge every input into `session`, in parallel when a pool can be built.
///
/// Results come back in input order.
fn merge_all(
    config: &MergeConfig,
    session: &MergeSession,
    interner: &SharedInterner,
) -> Vec<(PathBuf, UnitResult)> {
    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(threads) = config.threads {
        builder = builder.num_threads(threads);
    }
    let inputs = &config.inputs;
    builder
        .build_scoped(rayon::ThreadBuilder::run, |pool| {
            pool.install(|| {
                inputs
                    .par_iter()
                    .map(|path| (path.clone(), merge_unit(path, session, interner)))
                    .collect::<Vec<_>>()
            })
        })
        .unwrap_or_else(|e| {
            warn!("failed to create thread pool ({e}), merging sequentially");
            inputs
                .iter()
                .map(|path| (path.clone(), merge_unit(path, session, interner)))
                .collect()
        })
}

/// Run one merge as configured.
///
/// Conflicting units fail the run, all of them reported together, unless
/// `keep_going` is set; then they are skipped. Unreadable inputs and engine
/// errors always fail. Nothing is written unless the whole run succeeds.
pub fn run(config: &MergeConfig) -> Result<RunSummary, DriverError> {
    let interner = SharedInterner::new();
    let parent = config
        .parent
        .as_deref()
        .map(|path| read_parent(path, &interner))
        .transpose()?;

    let session = MergeSession::new(TypeGraph::new(interner.clone()));
    let mut summary = RunSummary::default();
    let mut failures = Vec::new();
    for (unit, result) in merge_all(config, &session, &interner) {
        match result {
            Ok(outcome) => summary.absorb(&outcome),
            Err(DriverError::Merge { unit, source }) if source.is_unit_scoped() => {
                failures.push(UnitFailure {
                    unit,
                    error: source,
                });
            }
            Err(e) => {
                debug!(unit = %unit.display(), "fatal error while merging");
                return Err(e);
            }
        }
    }

    if !failures.is_empty() {
        if !config.keep_going {
            return Err(DriverError::UnitsFailed { failures });
        }
        for failure in &failures {
            warn!(unit = %failure.unit.display(), error = %failure.error, "skipping unit");
        }
        summary.skipped = failures;
    }

    let mut graph = session.finish();
    if let (Some(parent), Some(path)) = (&parent, &config.parent) {
        let parent_name = path
            .file_name()
            .map_or_else(|| path.to_string_lossy(), |n| n.to_string_lossy());
        graph = uniquify(&graph, parent, &parent_name).map_err(|source| DriverError::Merge {
            unit: path.clone(),
            source,
        })?;
    }
    close_label(&mut graph, &config.label)?;

    let symbols = config.symbols.as_deref().map(read_symbols).transpose()?;
    if let Some(symbols) = &symbols {
        summary.unmatched = flag_unmatched(&mut graph, symbols, config.flags);
    }

    let artifact = encode(&graph, symbols.as_deref(), config.flags)?;
    write_atomically(&config.output, &artifact.bytes)?;
    if let Some(path) = &config.emit_parent {
        let numbered = artifact.numbering.baseline(&graph)?;
        write_atomically(path, &UnitFile::from_numbered(&numbered).to_bytes()?)?;
        debug!(path = %path.display(), types = numbered.len(), "wrote parent unit");
    }

    summary.items = graph.item_stats();
    summary.encode = artifact.stats;
    summary.bytes = artifact.bytes.len();
    info!(
        output = %config.output.display(),
        units = summary.units,
        skipped = summary.skipped.len(),
        types = summary.encode.types,
        bytes = summary.bytes,
        "wrote artifact"
    );
    Ok(summary)
}

/// Close `name` over every type in `graph`. A newest label of the same
/// name, carried in by the units, is moved up instead of repeated.
fn close_label(graph: &mut TypeGraph, name: &str) -> Result<(), LabelError> {
    let interned = graph.interner().intern(name);
    match graph.label_top() {
        Some(top) if top.name == interned => graph.label_newmax(graph.max_id()),
        _ => graph.label_add(name, LabelIdx::Current).map(drop),
    }
}

/// Write through a temporary file in the destination directory, so a
/// failed run never leaves a partial artifact behind.
fn write_atomically(path: &Path, bytes: &[u8]) -> Result<(), DriverError> {
    let fail = |source| DriverError::Write {
        path: path.to_owned(),
        source,
    };
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let mut file = tempfile::NamedTempFile::new_in(dir).map_err(fail)?;
    file.write_all(bytes).map_err(fail)?;
    file.persist(path).map_err(|e| fail(e.error))?;
    Ok(())
}
