//! Command-line configuration.

use std::path::PathBuf;

use ctf_encode::CtfFlags;
use ctf_ir::DEFAULT_LABEL;

pub const USAGE: &str = "\
Usage: ctfmerge -o <output> [options] <unit>...

Options:
  -o <path>       Write the artifact to <path>
  -l <label>      Label for the merged types (default: \"*** No Label Provided ***\")
  -d <unit>       Uniquify against the parent unit <unit>, as written by -u
  -u <path>       Also write a parent unit numbered like the artifact to <path>
  -s <path>       Bind descriptors to the symbols in <path>
  -F              Let local symbols fall back to global descriptors
  --dynsym        Only bind dynamic symbols
  -c              Compress the artifact
  -k              Keep the input's debug sections
  -m              Types only, no object or function sections
  -j <n>          Merge with <n> threads (default: all cores)
  --keep-going    Skip units that conflict instead of failing
  --stats         Print merge and encode statistics
  -h, --help      Show this help";

/// Everything one run needs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MergeConfig {
    pub output: PathBuf,
    pub label: String,
    /// Numbered parent unit to uniquify against.
    pub parent: Option<PathBuf>,
    /// Where to write this run's numbered types as a parent unit.
    pub emit_parent: Option<PathBuf>,
    pub symbols: Option<PathBuf>,
    pub flags: CtfFlags,
    /// Worker threads; `None` uses every core.
    pub threads: Option<usize>,
    /// Skip units that fail with a unit-scoped error.
    pub keep_going: bool,
    pub stats: bool,
    pub inputs: Vec<PathBuf>,
}

impl MergeConfig {
    pub fn new(output: impl Into<PathBuf>) -> Self {
        Self {
            output: output.into(),
            label: DEFAULT_LABEL.to_owned(),
            parent: None,
            emit_parent: None,
            symbols: None,
            flags: CtfFlags::empty(),
            threads: None,
            keep_going: false,
            stats: false,
            inputs: Vec::new(),
        }
    }
}

/// What the command line asked for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Merge(MergeConfig),
    Help,
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("option {0} needs a value")]
    MissingValue(String),
    #[error("unknown option {0}")]
    UnknownOption(String),
    #[error("-j expects a positive thread count, got `{0}`")]
    BadThreads(String),
    #[error("no output file given (-o)")]
    NoOutput,
    #[error("no input units given")]
    NoInputs,
}

/// Parse arguments, program name excluded.
pub fn parse_args(args: &[String]) -> Result<Command, ConfigError> {
    let mut output = None;
    let mut config = MergeConfig::new(PathBuf::new());
    let mut args = args.iter();

    while let Some(arg) = args.next() {
        let mut value = || {
            args.next()
                .cloned()
                .ok_or_else(|| ConfigError::MissingValue(arg.clone()))
        };
        match arg.as_str() {
            "-h" | "--help" => return Ok(Command::Help),
            "-o" => output = Some(PathBuf::from(value()?)),
            "-l" => config.label = value()?,
            "-d" => config.parent = Some(PathBuf::from(value()?)),
            "-u" => config.emit_parent = Some(PathBuf::from(value()?)),
            "-s" => config.symbols = Some(PathBuf::from(value()?)),
            "-j" => {
                let n = value()?;
                match n.parse::<usize>() {
                    Ok(threads) if threads > 0 => config.threads = Some(threads),
                    _ => return Err(ConfigError::BadThreads(n)),
                }
            }
            "-F" => config.flags |= CtfFlags::FUZZY_MATCH,
            "--dynsym" => config.flags |= CtfFlags::USE_DYNSYM,
            "-c" => config.flags |= CtfFlags::COMPRESS,
            "-k" => config.flags |= CtfFlags::KEEP_DEBUG_SECTIONS,
            "-m" => config.flags |= CtfFlags::MINIMIZE,
            "--keep-going" => config.keep_going = true,
            "--stats" => config.stats = true,
            "--" => config.inputs.extend(args.by_ref().map(PathBuf::from)),
            other if other.starts_with('-') && other.len() > 1 => {
                return Err(ConfigError::UnknownOption(other.to_owned()));
            }
            input => config.inputs.push(PathBuf::from(input)),
        }
    }

    config.output = output.ok_or(ConfigError::NoOutput)?;
    if config.inputs.is_empty() {
        return Err(ConfigError::NoInputs);
    }
    Ok(Command::Merge(config))
}
