//! Types module
//!
//! Contains core data structures used throughout the application.
//! This module organizes types into logical submodules:
//! - `transaction`: Transaction records, statuses and source labels
//! - `result`: Reconciliation output (categories, pairs, summary)
//! - `run`: Correlation identifiers for runs
//! - `error`: Error types for ingestion and runs

pub mod error;
pub mod result;
pub mod run;
pub mod transaction;

pub use error::{ReconError, RunError, ValidationError};
pub use result::{
    Categories, Category, Differences, MismatchedPair, ReconciliationResult,
    ReconciliationSummary,
};
pub use run::RunId;
pub use transaction::{Reference, Source, Transaction, TransactionStatus};
