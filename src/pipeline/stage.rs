//! Stage workers
//!
//! Each stage runs on its own tokio task. The task owns its input (moved in
//! with the [`StageRequest`]) and shares nothing with the coordinator except
//! the sending half of an unbounded channel. A panic inside the stage is
//! caught and reported as a [`StageMessage::Failed`], so the coordinator
//! always sees exactly one terminal message unless the task is aborted.

use crate::config::ReconcilerConfig;
use crate::core::MatchingEngine;
use crate::io::AsyncRecordParser;
use crate::pipeline::protocol::{StageKind, StageMessage, StageRequest};
use crate::pipeline::state::RunState;
use crate::types::{ReconError, RunId, Source};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::debug;

/// Coordinator-side handle on a running stage
///
/// Dropping the handle aborts the stage task.
#[derive(Debug)]
pub struct StageHandle {
    kind: StageKind,
    messages: UnboundedReceiver<StageMessage>,
    task: JoinHandle<()>,
}

impl StageHandle {
    pub fn kind(&self) -> StageKind {
        self.kind
    }

    /// Next message from the stage, `None` once the stage has exited
    pub async fn next_message(&mut self) -> Option<StageMessage> {
        self.messages.recv().await
    }

    /// Stop the stage, discarding any in-flight work
    pub fn abort(&self) {
        self.task.abort();
    }
}

impl Drop for StageHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Spawn a stage worker for `request` on the current tokio runtime
pub fn spawn_stage(request: StageRequest, config: &ReconcilerConfig) -> StageHandle {
    let kind = request.kind();
    let run = request.run();
    let config = config.clone();
    let (sender, messages) = mpsc::unbounded_channel();

    let task = tokio::spawn(async move {
        let outcome = AssertUnwindSafe(execute(request, &config, &sender))
            .catch_unwind()
            .await;

        let terminal = match outcome {
            Ok(message) => message,
            Err(panic) => StageMessage::Failed {
                run,
                error: ReconError::stage_failed(kind.name(), panic_message(panic.as_ref())),
            },
        };
        // the coordinator may already have stopped listening
        let _ = sender.send(terminal);
    });

    StageHandle {
        kind,
        messages,
        task,
    }
}

async fn execute(
    request: StageRequest,
    config: &ReconcilerConfig,
    sender: &UnboundedSender<StageMessage>,
) -> StageMessage {
    match request {
        StageRequest::Parse { run, side, source } => {
            let label = match side {
                Source::Internal => RunState::ParsingInternal.label(),
                Source::Provider => RunState::ParsingProvider.label(),
            };
            debug!(run = %run, side = %side, bytes = source.len(), "parse stage started");

            let outcome = AsyncRecordParser::new(config)
                .parse(&source, side, |percent| {
                    progress(sender, run, percent, label.to_string())
                })
                .await;

            StageMessage::Parsed { run, outcome }
        }
        StageRequest::Reconcile {
            run,
            internal,
            provider,
        } => {
            debug!(
                run = %run,
                internal = internal.len(),
                provider = provider.len(),
                "reconcile stage started"
            );

            let result = MatchingEngine::new(config.match_batch_size)
                .reconcile_with_progress(&internal, &provider, |batch| {
                    let label = format!(
                        "{}: {}/{}",
                        RunState::Reconciling.label(),
                        batch.records_done,
                        batch.total_records
                    );
                    progress(sender, run, batch.percent(), label)
                })
                .await;

            StageMessage::Reconciled { run, result }
        }
    }
}

fn progress(sender: &UnboundedSender<StageMessage>, run: RunId, percent: f64, label: String) {
    let _ = sender.send(StageMessage::Progress {
        run,
        percent,
        label,
    });
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "stage panicked".to_string()
    }
}
