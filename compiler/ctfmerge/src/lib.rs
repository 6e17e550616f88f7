//! The `ctfmerge` driver.
//!
//! Reads per-unit type graphs (see [`ctf_ir::interchange`]), merges them
//! into one master graph on a thread pool, labels the result, optionally
//! uniquifies it against a parent, and writes one encoded artifact.

pub mod config;
pub mod driver;
pub mod input;

use std::sync::Once;

pub use config::{parse_args, Command, ConfigError, MergeConfig, USAGE};
pub use driver::{run, DriverError, RunSummary, UnitFailure};
pub use input::{
    read_parent, read_symbols, read_unit, InputError, RecordBinding, SymbolFile, SymbolRecord,
};

static TRACING_INIT: Once = Once::new();

/// Install a stderr subscriber filtered by `RUST_LOG`. Does nothing when
/// `RUST_LOG` is unset, or on every call after the first.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        if std::env::var("RUST_LOG").is_ok() {
            let filter = EnvFilter::from_default_env();
            tracing_subscriber::registry()
                .with(
                    fmt::layer()
                        .with_writer(std::io::stderr)
                        .with_target(true)
                        .with_level(true),
                )
                .with(filter)
                .init();
        }
    });
}
