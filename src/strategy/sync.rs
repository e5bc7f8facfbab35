//! Synchronous reconciliation strategy
//!
//! Runs the three stages inline on the calling thread:
//!
//! ```text
//! RecordParser(internal) → accept_parsed → RecordParser(provider)
//!     → accept_parsed → MatchingEngine::reconcile_reporting
//! ```
//!
//! There is no isolation and nothing to cancel; a run always completes or
//! fails. Progress uses the same slices and labels as the async strategy,
//! with one update at the end of each parse.

use crate::config::ReconcilerConfig;
use crate::core::MatchingEngine;
use crate::io::{RecordParser, SourceFile};
use crate::pipeline::{accept_parsed, ProgressSink, ProgressUpdate, RunState, StageKind};
use crate::strategy::ReconcileStrategy;
use crate::types::{ReconciliationResult, RunError, RunId, Source, Transaction};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::info;

/// Synchronous reconciliation strategy
///
/// # Examples
///
/// ```
/// use rust_payments_reconciler::config::ReconcilerConfig;
/// use rust_payments_reconciler::io::SourceFile;
/// use rust_payments_reconciler::pipeline::no_progress;
/// use rust_payments_reconciler::strategy::{ReconcileStrategy, SyncStrategy};
///
/// let strategy = SyncStrategy::new(ReconcilerConfig::default());
/// let internal = SourceFile::new("internal.csv", "reference,amount,status\nT1,10,completed\n");
/// let provider = SourceFile::new("provider.csv", "reference,amount,status\nT1,10.00,completed\n");
///
/// let result = strategy.reconcile(internal, provider, &no_progress).unwrap();
/// assert_eq!(result.summary.matched, 1);
/// ```
#[derive(Debug)]
pub struct SyncStrategy {
    config: ReconcilerConfig,
    last_run: AtomicU64,
}

impl SyncStrategy {
    pub fn new(config: ReconcilerConfig) -> Self {
        Self {
            config,
            last_run: AtomicU64::new(0),
        }
    }

    fn parse(
        &self,
        run: RunId,
        side: Source,
        source: &SourceFile,
        sink: &dyn ProgressSink,
    ) -> Result<Vec<Transaction>, RunError> {
        let kind = StageKind::parse(side);
        let state = match side {
            Source::Internal => RunState::ParsingInternal,
            Source::Provider => RunState::ParsingProvider,
        };
        let started = Instant::now();

        let outcome = RecordParser::new(&self.config).parse(source, side);
        let records = accept_parsed(side, outcome)?;

        report(sink, run, kind.slice().end, state, state.label());
        info!(
            run = %run,
            stage = %kind,
            records = records.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "stage finished"
        );
        Ok(records)
    }
}

impl ReconcileStrategy for SyncStrategy {
    fn reconcile(
        &self,
        internal: SourceFile,
        provider: SourceFile,
        sink: &dyn ProgressSink,
    ) -> Result<ReconciliationResult, RunError> {
        let run = RunId(self.last_run.fetch_add(1, Ordering::SeqCst) + 1);
        info!(run = %run, strategy = self.name(), "reconciliation started");

        let internal = self.parse(run, Source::Internal, &internal, sink)?;
        let provider = self.parse(run, Source::Provider, &provider, sink)?;

        let slice = StageKind::Reconcile.slice();
        let started = Instant::now();
        let result = MatchingEngine::new(self.config.match_batch_size).reconcile_reporting(
            &internal,
            &provider,
            |batch| {
                let label = format!(
                    "{}: {}/{}",
                    RunState::Reconciling.label(),
                    batch.records_done,
                    batch.total_records
                );
                report(sink, run, slice.scale(batch.percent()), RunState::Reconciling, &label);
            },
        );
        info!(
            run = %run,
            stage = %StageKind::Reconcile,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "stage finished"
        );

        report(sink, run, 100.0, RunState::Complete, RunState::Complete.label());
        Ok(result)
    }

    fn name(&self) -> &'static str {
        "sync"
    }
}

fn report(sink: &dyn ProgressSink, run: RunId, percent: f64, state: RunState, label: &str) {
    sink.report(&ProgressUpdate {
        run,
        percent,
        state,
        label: label.to_string(),
    });
}
