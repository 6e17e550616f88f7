//! `ctfmerge` command line.

use std::process::ExitCode;

use ctfmerge::{init_tracing, parse_args, run, Command, DriverError, RunSummary, USAGE};

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let config = match parse_args(&args) {
        Ok(Command::Merge(config)) => config,
        Ok(Command::Help) => {
            println!("{USAGE}");
            return ExitCode::SUCCESS;
        }
        Err(e) => {
            eprintln!("ctfmerge: {e}");
            eprintln!();
            eprintln!("{USAGE}");
            return ExitCode::from(2);
        }
    };

    init_tracing();

    match run(&config) {
        Ok(summary) => {
            for skipped in &summary.skipped {
                eprintln!(
                    "ctfmerge: warning: skipped {}: {}",
                    skipped.unit.display(),
                    skipped.error
                );
            }
            if config.stats {
                print_stats(&summary);
            }
            ExitCode::SUCCESS
        }
        Err(DriverError::UnitsFailed { failures }) => {
            for failure in &failures {
                eprintln!("ctfmerge: {}: {}", failure.unit.display(), failure.error);
            }
            eprintln!(
                "ctfmerge: {} unit(s) could not be merged; no output written",
                failures.len()
            );
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("ctfmerge: {e}");
            ExitCode::FAILURE
        }
    }
}

fn print_stats(summary: &RunSummary) {
    let s = &summary.encode;
    eprintln!("units merged:     {}", summary.units);
    eprintln!("units skipped:    {}", summary.skipped.len());
    eprintln!("types added:      {}", summary.types_added);
    eprintln!("types matched:    {}", summary.types_matched);
    eprintln!("items added:      {}", summary.items_added);
    eprintln!("unmatched items:  {}", summary.unmatched.max(s.unmatched));
    eprintln!("types encoded:    {}", s.types);
    eprintln!("objects:          {}", s.objects);
    eprintln!("functions:        {}", s.functions);
    eprintln!("labels:           {}", s.labels);
    eprintln!("string bytes:     {}", s.string_bytes);
    eprintln!("data bytes:       {}", s.data_len);
    eprintln!("artifact bytes:   {}", summary.bytes);
    eprintln!("descriptors:");
    eprintln!("{}", summary.items);
}
