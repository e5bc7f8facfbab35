//! Transaction reconciler CLI
//!
//! Command-line interface for reconciling an internal transaction export
//! against a payment provider's export.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- internal.csv provider.csv > report.csv
//! cargo run -- --strategy sync internal.csv provider.csv > report.csv
//! cargo run -- --output mismatched internal.csv provider.csv > mismatched.csv
//! cargo run -- --output summary --batch-size 1000 --workers 4 internal.csv provider.csv
//! ```
//!
//! Both files are validated before anything is matched. If either file has
//! any validation error, every error of the first failing file is printed to
//! stderr and nothing is written to stdout.
//!
//! Logging goes to stderr and is controlled with `RUST_LOG` (default `info`).
//!
//! # Exit Codes
//!
//! - 0: Success
//! - 1: Error (unreadable input, validation errors, write failure)

use rust_payments_reconciler::cli;
use rust_payments_reconciler::io::SourceFile;
use rust_payments_reconciler::pipeline::ProgressUpdate;
use rust_payments_reconciler::strategy;
use rust_payments_reconciler::types::RunError;
use std::process;
use tracing::{debug, Level};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with_writer(std::io::stderr)
        .init();

    let args = cli::parse_args();

    let load = |path: &std::path::Path| {
        SourceFile::from_path(path).unwrap_or_else(|e| {
            eprintln!("Error: {}", e);
            process::exit(1);
        })
    };
    let internal = load(&args.internal_file);
    let provider = load(&args.provider_file);

    let strategy = strategy::create_strategy(args.strategy, args.to_config());
    let sink = |update: &ProgressUpdate| {
        debug!(run = %update.run, percent = update.percent, "{}", update.label);
    };

    let result = match strategy.reconcile(internal, provider, &sink) {
        Ok(result) => result,
        Err(e) => {
            report_failure(&e);
            process::exit(1);
        }
    };

    let mut output = std::io::stdout();
    if let Err(e) = args.output.write(&result, &mut output) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn report_failure(error: &RunError) {
    eprintln!("Error: {}", error);
    for validation_error in error.validation_errors() {
        eprintln!("  {}", validation_error);
    }
}
