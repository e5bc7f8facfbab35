//! Reconciler configuration
//!
//! Controls the ingestion ceiling, batch sizes for cooperative yielding, the
//! worker thread count for the async strategy and the duplicate-reference
//! policy. Zero values are invalid and fall back to defaults.

use tracing::warn;

/// Default per-source byte ceiling (50 MiB)
pub const DEFAULT_MAX_FILE_SIZE: u64 = 50 * 1024 * 1024;

/// Default rows per parsing batch
pub const DEFAULT_PARSE_BATCH_SIZE: usize = 500;

/// Default internal records per matching batch
pub const DEFAULT_MATCH_BATCH_SIZE: usize = 500;

/// Configuration shared by the parser, the matching engine and the strategies
#[derive(Clone, Debug, PartialEq)]
pub struct ReconcilerConfig {
    /// Maximum accepted size of one source, in bytes
    pub max_file_size: u64,
    /// Rows parsed between two yields of the async parser
    pub parse_batch_size: usize,
    /// Internal records matched between two yields of the engine
    pub match_batch_size: usize,
    /// Worker threads of the async strategy's runtime
    pub worker_threads: usize,
    /// Report repeated provider references as row errors
    ///
    /// Repeated internal references are rejected regardless.
    pub reject_duplicate_references: bool,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            parse_batch_size: DEFAULT_PARSE_BATCH_SIZE,
            match_batch_size: DEFAULT_MATCH_BATCH_SIZE,
            worker_threads: num_cpus::get(),
            reject_duplicate_references: true,
        }
    }
}

impl ReconcilerConfig {
    /// Set the per-source byte ceiling
    pub fn with_max_file_size(mut self, max_file_size: u64) -> Self {
        self.max_file_size = or_default(
            "max_file_size",
            max_file_size,
            DEFAULT_MAX_FILE_SIZE,
        );
        self
    }

    /// Set both parse and match batch sizes
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.parse_batch_size = or_default("parse_batch_size", batch_size, DEFAULT_PARSE_BATCH_SIZE);
        self.match_batch_size = or_default("match_batch_size", batch_size, DEFAULT_MATCH_BATCH_SIZE);
        self
    }

    /// Set the async runtime worker count
    pub fn with_worker_threads(mut self, worker_threads: usize) -> Self {
        self.worker_threads = or_default("worker_threads", worker_threads, num_cpus::get());
        self
    }

    /// Choose the duplicate-reference policy
    pub fn with_reject_duplicate_references(mut self, reject: bool) -> Self {
        self.reject_duplicate_references = reject;
        self
    }
}

fn or_default<T>(field: &str, value: T, default: T) -> T
where
    T: PartialEq + Default + std::fmt::Display + Copy,
{
    if value == T::default() {
        warn!(field, %value, %default, "invalid configuration value, using default");
        default
    } else {
        value
    }
}
