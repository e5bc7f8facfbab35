use crate::config::ReconcilerConfig;
use crate::io::{write_category_csv, write_report_csv, write_summary_csv};
use crate::types::{Category, ReconError, ReconciliationResult};
use clap::{Parser, ValueEnum};
use std::io::Write;
use std::path::PathBuf;

/// Reconcile internal transaction records against a payment provider export
#[derive(Parser, Debug)]
#[command(name = "reconciler")]
#[command(about = "Reconcile internal transactions against a provider export", long_about = None)]
pub struct CliArgs {
    /// Internal ledger CSV file
    #[arg(value_name = "INTERNAL", help = "Path to the internal transactions CSV file")]
    pub internal_file: PathBuf,

    /// Provider settlement CSV file
    #[arg(value_name = "PROVIDER", help = "Path to the provider transactions CSV file")]
    pub provider_file: PathBuf,

    /// Execution strategy
    #[arg(
        long = "strategy",
        value_name = "STRATEGY",
        default_value = "async",
        help = "Execution strategy: 'sync' runs inline, 'async' runs each stage on its own task"
    )]
    pub strategy: StrategyType,

    /// Rows per batch while parsing and matching
    #[arg(
        long = "batch-size",
        value_name = "SIZE",
        help = "Rows per cooperative batch (default: 500)"
    )]
    pub batch_size: Option<usize>,

    /// Per-source byte ceiling
    #[arg(
        long = "max-file-size",
        value_name = "BYTES",
        help = "Maximum size of each input file in bytes (default: 52428800)"
    )]
    pub max_file_size: Option<u64>,

    /// Worker threads for the async strategy
    #[arg(
        long = "workers",
        value_name = "COUNT",
        help = "Worker threads for the async strategy (default: CPU cores)"
    )]
    pub workers: Option<usize>,

    /// What to write to stdout
    #[arg(
        long = "output",
        value_name = "OUTPUT",
        default_value = "report",
        help = "Output written to stdout"
    )]
    pub output: OutputKind,

    /// Accept repeated references within the provider file
    #[arg(
        long = "allow-duplicate-references",
        help = "Accept repeated provider references; the last row per reference wins"
    )]
    pub allow_duplicate_references: bool,
}

/// Available execution strategies
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum StrategyType {
    Sync,
    Async,
}

/// CSV written to stdout after a successful run
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputKind {
    /// Every classified record, one row each
    Report,
    /// The summary counts
    Summary,
    Matched,
    Mismatched,
    InternalOnly,
    ProviderOnly,
}

impl OutputKind {
    /// Write the selected view of `result`
    pub fn write(&self, result: &ReconciliationResult, output: &mut dyn Write) -> Result<(), ReconError> {
        match self {
            OutputKind::Report => write_report_csv(result, output),
            OutputKind::Summary => write_summary_csv(result, output),
            OutputKind::Matched => write_category_csv(result, Category::Matched, output),
            OutputKind::Mismatched => write_category_csv(result, Category::Mismatched, output),
            OutputKind::InternalOnly => write_category_csv(result, Category::InternalOnly, output),
            OutputKind::ProviderOnly => write_category_csv(result, Category::ProviderOnly, output),
        }
    }
}

impl CliArgs {
    /// Build a ReconcilerConfig from CLI arguments
    ///
    /// Unset options keep their defaults; zero values fall back to defaults
    /// with a warning.
    pub fn to_config(&self) -> ReconcilerConfig {
        let mut config = ReconcilerConfig::default()
            .with_reject_duplicate_references(!self.allow_duplicate_references);

        if let Some(batch_size) = self.batch_size {
            config = config.with_batch_size(batch_size);
        }
        if let Some(max_file_size) = self.max_file_size {
            config = config.with_max_file_size(max_file_size);
        }
        if let Some(workers) = self.workers {
            config = config.with_worker_threads(workers);
        }

        config
    }
}
