//! Pipeline coordinator
//!
//! The [`Reconciler`] drives one run through its three stages, strictly one
//! after another:
//!
//! ```text
//! reconcile(internal, provider)
//!     ├── begin_run: new RunId, cancel the previous run
//!     ├── parse-internal stage → fail fast on any ValidationError
//!     ├── parse-provider stage → fail fast on any ValidationError
//!     ├── reconcile stage      → ReconciliationResult
//!     └── end_run
//! ```
//!
//! The only state shared across runs is which run is current. Messages from
//! a stage are forwarded only while their run is current; a cancelled or
//! superseded run aborts its active stage and never reports again.

use crate::config::ReconcilerConfig;
use crate::io::{ParseOutcome, SourceFile};
use crate::pipeline::progress::{ProgressSink, ProgressUpdate};
use crate::pipeline::protocol::{StageKind, StageMessage, StageRequest};
use crate::pipeline::stage::spawn_stage;
use crate::pipeline::state::RunState;
use crate::types::{ReconError, ReconciliationResult, RunError, RunId, Source, Transaction};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Turn a parse outcome into a validated record set, failing fast
///
/// # Errors
///
/// * `RunError::Rejected` with every ValidationError when there are any
/// * `RunError::Rejected` with a single `EmptySource` error when the source
///   has no valid rows
pub fn accept_parsed(side: Source, outcome: ParseOutcome) -> Result<Vec<Transaction>, RunError> {
    if !outcome.errors.is_empty() {
        return Err(RunError::Rejected {
            side,
            errors: outcome.errors,
        });
    }
    if outcome.records.is_empty() {
        return Err(RunError::structural(side, &ReconError::EmptySource));
    }
    Ok(outcome.records)
}

#[derive(Debug)]
struct ActiveRun {
    id: RunId,
    token: CancellationToken,
}

#[derive(Debug)]
struct Shared {
    config: ReconcilerConfig,
    last_run: AtomicU64,
    current: Mutex<Option<ActiveRun>>,
}

/// Coordinates reconciliation runs
///
/// Cloning is cheap; clones share the notion of the current run, so starting
/// a run on any clone supersedes a run in flight on another.
#[derive(Debug, Clone)]
pub struct Reconciler {
    shared: Arc<Shared>,
}

/// Per-run progress forwarding
struct RunProgress<'a> {
    run: RunId,
    token: &'a CancellationToken,
    sink: &'a dyn ProgressSink,
    state: RunState,
    percent: f64,
}

impl RunProgress<'_> {
    fn report(&mut self, percent: f64, label: &str) {
        if self.token.is_cancelled() {
            return;
        }
        // never move backwards within a run
        self.percent = self.percent.max(percent);
        self.sink.report(&ProgressUpdate {
            run: self.run,
            percent: self.percent,
            state: self.state,
            label: label.to_string(),
        });
    }

    fn transition(&mut self, state: RunState) {
        debug!(run = %self.run, from = %self.state, to = %state, "run state changed");
        self.state = state;
    }
}

impl Reconciler {
    pub fn new(config: ReconcilerConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                config,
                last_run: AtomicU64::new(0),
                current: Mutex::new(None),
            }),
        }
    }

    pub fn config(&self) -> &ReconcilerConfig {
        &self.shared.config
    }

    /// Reconcile two raw sources
    ///
    /// Starting a run cancels any run still in flight on this reconciler.
    ///
    /// # Arguments
    ///
    /// * `internal` - The internal ledger export
    /// * `provider` - The provider settlement export
    /// * `sink` - Receives overall progress (0-100) while this run is current
    ///
    /// # Returns
    ///
    /// * `Ok(ReconciliationResult)` when both sources are clean
    /// * `Err(RunError::Rejected)` with the first failing side's errors
    /// * `Err(RunError::StageFailed)` if a stage's execution context fails
    /// * `Err(RunError::Cancelled)` if the run was cancelled or superseded
    pub async fn reconcile(
        &self,
        internal: SourceFile,
        provider: SourceFile,
        sink: &dyn ProgressSink,
    ) -> Result<ReconciliationResult, RunError> {
        let (run, token) = self.begin_run();
        let started = Instant::now();
        let mut progress = RunProgress {
            run,
            token: &token,
            sink,
            state: RunState::Idle,
            percent: 0.0,
        };

        let outcome = self.drive(&mut progress, internal, provider).await;
        let outcome = if token.is_cancelled() {
            Err(RunError::Cancelled { run })
        } else {
            outcome
        };

        match &outcome {
            Ok(result) => info!(
                run = %run,
                elapsed_ms = started.elapsed().as_millis() as u64,
                matched = result.summary.matched,
                mismatched = result.summary.mismatched,
                internal_only = result.summary.internal_only,
                provider_only = result.summary.provider_only,
                "reconciliation complete"
            ),
            Err(RunError::Cancelled { .. }) => info!(run = %run, "reconciliation cancelled"),
            Err(e) => warn!(run = %run, error = %e, "reconciliation failed"),
        }

        self.end_run(run);
        outcome
    }

    /// Cancel the run in flight, if any
    ///
    /// # Returns
    ///
    /// The id of the cancelled run.
    pub fn cancel(&self) -> Option<RunId> {
        let active = self.current().take()?;
        active.token.cancel();
        info!(run = %active.id, "cancellation requested");
        Some(active.id)
    }

    /// The run whose messages are currently forwarded
    pub fn current_run(&self) -> Option<RunId> {
        self.current().as_ref().map(|active| active.id)
    }

    /// True if messages tagged with `run` should reach the caller
    pub fn accepts(&self, run: RunId) -> bool {
        self.current_run() == Some(run)
    }

    fn current(&self) -> MutexGuard<'_, Option<ActiveRun>> {
        self.shared
            .current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn begin_run(&self) -> (RunId, CancellationToken) {
        let run = RunId(self.shared.last_run.fetch_add(1, Ordering::SeqCst) + 1);
        let token = CancellationToken::new();

        let previous = self.current().replace(ActiveRun {
            id: run,
            token: token.clone(),
        });
        if let Some(previous) = previous {
            info!(run = %previous.id, by = %run, "run superseded");
            previous.token.cancel();
        }

        info!(run = %run, "reconciliation started");
        (run, token)
    }

    fn end_run(&self, run: RunId) {
        let mut current = self.current();
        if current.as_ref().is_some_and(|active| active.id == run) {
            *current = None;
        }
    }

    async fn drive(
        &self,
        progress: &mut RunProgress<'_>,
        internal: SourceFile,
        provider: SourceFile,
    ) -> Result<ReconciliationResult, RunError> {
        let run = progress.run;

        progress.transition(RunState::Idle.next());
        let internal = self.parse(progress, Source::Internal, internal).await?;

        progress.transition(progress.state.next());
        let provider = self.parse(progress, Source::Provider, provider).await?;

        progress.transition(progress.state.next());
        let request = StageRequest::Reconcile {
            run,
            internal,
            provider,
        };
        let result = match self.run_stage(progress, request).await {
            Ok(StageMessage::Reconciled { result, .. }) => result,
            Ok(other) => {
                let error = unexpected(StageKind::Reconcile, other);
                return Err(self.fail(progress, StageKind::Reconcile, error));
            }
            Err(e) => return Err(self.fail(progress, StageKind::Reconcile, e)),
        };

        progress.transition(progress.state.next());
        progress.report(100.0, RunState::Complete.label());
        Ok(result)
    }

    async fn parse(
        &self,
        progress: &mut RunProgress<'_>,
        side: Source,
        source: SourceFile,
    ) -> Result<Vec<Transaction>, RunError> {
        let kind = StageKind::parse(side);
        let request = StageRequest::Parse {
            run: progress.run,
            side,
            source,
        };

        let accepted = match self.run_stage(progress, request).await {
            Ok(StageMessage::Parsed { outcome, .. }) => accept_parsed(side, outcome),
            Ok(other) => Err(unexpected(kind, other)),
            Err(e) => Err(e),
        };
        accepted.map_err(|e| self.fail(progress, kind, e))
    }

    fn fail(&self, progress: &mut RunProgress<'_>, kind: StageKind, error: RunError) -> RunError {
        let state = if error.is_cancelled() {
            progress.state.cancel()
        } else {
            progress.state.fail()
        };
        progress.transition(state);
        debug!(run = %progress.run, stage = %kind, error = %error, "stage did not succeed");
        error
    }

    /// Run one stage to its terminal message
    ///
    /// Progress messages are rescaled into the stage's slice and forwarded;
    /// messages for any other run are dropped. Cancellation aborts the stage.
    async fn run_stage(
        &self,
        progress: &mut RunProgress<'_>,
        request: StageRequest,
    ) -> Result<StageMessage, RunError> {
        let run = progress.run;
        let kind = request.kind();
        let slice = kind.slice();
        let started = Instant::now();
        let token = progress.token.clone();

        let mut stage = spawn_stage(request, &self.shared.config);
        loop {
            let message = tokio::select! {
                biased;
                _ = token.cancelled() => {
                    stage.abort();
                    return Err(RunError::Cancelled { run });
                }
                message = stage.next_message() => message,
            };

            let Some(message) = message else {
                return Err(stage_failed(kind, "stage exited without a result"));
            };
            if message.run() != run || !self.accepts(run) {
                debug!(run = %message.run(), current = %run, stage = %kind, "stale message discarded");
                continue;
            }

            match message {
                StageMessage::Progress { percent, label, .. } => {
                    progress.report(slice.scale(percent), &label);
                }
                StageMessage::Failed { error, .. } => {
                    return Err(stage_failed(kind, error_message(error)));
                }
                terminal => {
                    info!(
                        run = %run,
                        stage = %kind,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "stage finished"
                    );
                    return Ok(terminal);
                }
            }
        }
    }
}

fn stage_failed(kind: StageKind, message: impl Into<String>) -> RunError {
    RunError::StageFailed {
        stage: kind.name().to_string(),
        message: message.into(),
    }
}

fn error_message(error: ReconError) -> String {
    match error {
        ReconError::StageFailed { message, .. } => message,
        other => other.to_string(),
    }
}

fn unexpected(kind: StageKind, message: StageMessage) -> RunError {
    stage_failed(kind, format!("unexpected terminal message {:?}", message))
}
