//! Reconciliation matching engine
//!
//! This module provides the [`MatchingEngine`] that classifies two validated
//! transaction lists into matched, mismatched, internal-only and
//! provider-only categories with a single linear join:
//!
//! 1. Index provider records by reference (last write wins)
//! 2. Walk internal records once, in batches, marking consumed references
//! 3. Sweep provider records for references never consumed
//! 4. Assemble the summary from the category sizes
//!
//! The engine has no failure path; it is a total function over its inputs.
//! Batching only controls when the async variant yields and reports
//! progress, never what it returns.

use crate::core::matcher::Matcher;
use crate::types::{ReconciliationResult, Transaction};
use tracing::debug;

/// Progress of the batched internal-record walk
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatchProgress {
    /// Batches completed so far
    pub batches_done: usize,
    /// Total number of batches
    pub total_batches: usize,
    /// Internal records classified so far
    pub records_done: usize,
    /// Total internal records
    pub total_records: usize,
}

impl BatchProgress {
    /// Completion in percent (0..=100)
    pub fn percent(&self) -> f64 {
        if self.total_batches == 0 {
            100.0
        } else {
            self.batches_done as f64 / self.total_batches as f64 * 100.0
        }
    }
}

struct BatchTracker {
    progress: BatchProgress,
}

impl BatchTracker {
    fn new(total_records: usize, batch_size: usize) -> Self {
        Self {
            progress: BatchProgress {
                batches_done: 0,
                total_batches: total_records.div_ceil(batch_size),
                records_done: 0,
                total_records,
            },
        }
    }

    fn advance(&mut self, records: usize) -> BatchProgress {
        self.progress.batches_done += 1;
        self.progress.records_done += records;
        self.progress
    }

    /// The single completed update owed when there was nothing to walk
    fn empty(&self) -> Option<BatchProgress> {
        (self.progress.total_batches == 0).then_some(self.progress)
    }
}

/// Matching engine
///
/// # Examples
///
/// ```
/// use rust_decimal::Decimal;
/// use rust_payments_reconciler::core::MatchingEngine;
/// use rust_payments_reconciler::types::{Transaction, TransactionStatus};
///
/// let internal = vec![Transaction::new("T1", Decimal::new(10000, 2), TransactionStatus::Completed)];
/// let provider = internal.clone();
///
/// let result = MatchingEngine::new(500).reconcile(&internal, &provider);
/// assert_eq!(result.summary.matched, 1);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct MatchingEngine {
    batch_size: usize,
}

impl Default for MatchingEngine {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_MATCH_BATCH_SIZE)
    }
}

impl MatchingEngine {
    /// Create an engine walking `batch_size` internal records per batch
    ///
    /// A zero batch size is treated as one.
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size: batch_size.max(1),
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Classify both lists without yielding
    pub fn reconcile(&self, internal: &[Transaction], provider: &[Transaction]) -> ReconciliationResult {
        self.reconcile_reporting(internal, provider, |_| {})
    }

    /// Classify both lists on the calling thread, reporting after every batch
    ///
    /// Reports exactly what [`MatchingEngine::reconcile_with_progress`]
    /// reports, without ever yielding.
    pub fn reconcile_reporting<F>(
        &self,
        internal: &[Transaction],
        provider: &[Transaction],
        mut on_progress: F,
    ) -> ReconciliationResult
    where
        F: FnMut(BatchProgress),
    {
        let mut matcher = Matcher::new(provider);
        let mut tracker = BatchTracker::new(internal.len(), self.batch_size);

        for batch in internal.chunks(self.batch_size) {
            matcher.process_batch(batch);
            on_progress(tracker.advance(batch.len()));
        }
        if let Some(done) = tracker.empty() {
            on_progress(done);
        }

        matcher.finish()
    }

    /// Classify both lists, yielding to the scheduler between batches
    ///
    /// # Arguments
    ///
    /// * `internal` - Validated internal records
    /// * `provider` - Validated provider records
    /// * `on_progress` - Called after every batch; when `internal` is empty it
    ///   is called once with a completed progress
    ///
    /// # Returns
    ///
    /// Exactly what [`MatchingEngine::reconcile`] returns for the same input.
    pub async fn reconcile_with_progress<F>(
        &self,
        internal: &[Transaction],
        provider: &[Transaction],
        mut on_progress: F,
    ) -> ReconciliationResult
    where
        F: FnMut(BatchProgress),
    {
        let mut matcher = Matcher::new(provider);
        let mut tracker = BatchTracker::new(internal.len(), self.batch_size);
        debug!(
            internal = internal.len(),
            provider = provider.len(),
            total_batches = tracker.progress.total_batches,
            "provider index built"
        );

        for batch in internal.chunks(self.batch_size) {
            matcher.process_batch(batch);
            on_progress(tracker.advance(batch.len()));
            tokio::task::yield_now().await;
        }
        if let Some(done) = tracker.empty() {
            on_progress(done);
        }

        matcher.finish()
    }
}
