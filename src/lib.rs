//! Rust Payments Reconciler Library
//! # Overview
//!
//! This library reconciles an internal transaction export against a payment
//! provider's export, classifying every record as matched, mismatched,
//! internal-only or provider-only. It ships a synchronous and an
//! asynchronous, stage-isolated execution strategy.
//!
//! # Architecture
//!
//! The system is organized into several key components:
//!
//! - [`types`] - Core data types (Transaction, ReconciliationResult, errors)
//! - [`cli`] - CLI arguments parsing
//! - [`config`] - Limits, batch sizes and the duplicate-reference policy
//! - [`io`] - Record parser (sync and batched async) and CSV export
//! - [`core`] - Matching engine:
//!   - [`core::matcher`] - Provider index and per-batch classification
//!   - [`core::engine`] - Batched reconciliation with progress reporting
//! - [`pipeline`] - Run coordinator: isolated stages, progress, cancellation
//! - [`strategy`] - Runtime-selectable sync and async strategies
//!
//! # Matching Rules
//!
//! Records are joined on `reference`. A pair matches when the amounts differ
//! by strictly less than `0.01` and the statuses are equal; otherwise it is a
//! mismatched pair with per-field difference flags.
//!
//! # Validation
//!
//! A source is rejected as a whole if it is oversized, not a CSV file,
//! undecodable or missing a required column. Otherwise each failing row is
//! reported with its row number. Any validation error blocks the run.

pub mod cli;
pub mod config;
pub mod core;
pub mod io;
pub mod pipeline;
pub mod strategy;
pub mod types;

pub use config::ReconcilerConfig;
pub use crate::core::MatchingEngine;
pub use io::{RecordParser, SourceFile};
pub use pipeline::{ProgressSink, ProgressUpdate, Reconciler};
pub use types::{
    MismatchedPair, ReconciliationResult, ReconciliationSummary, RunError, Source, Transaction,
    TransactionStatus, ValidationError,
};
