//! Messages exchanged between the coordinator and stage workers
//!
//! A stage receives exactly one [`StageRequest`] carrying its input by value
//! and answers with zero or more [`StageMessage::Progress`] messages followed
//! by exactly one terminal message. Every message carries the [`RunId`] of
//! the run that issued the request.

use crate::io::{ParseOutcome, SourceFile};
use crate::pipeline::progress::StageSlice;
use crate::types::{ReconError, ReconciliationResult, RunId, Source, Transaction};
use std::fmt;

/// The three stages of a run, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageKind {
    ParseInternal,
    ParseProvider,
    Reconcile,
}

impl StageKind {
    /// The parse stage for one side
    pub fn parse(side: Source) -> Self {
        match side {
            Source::Internal => StageKind::ParseInternal,
            Source::Provider => StageKind::ParseProvider,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            StageKind::ParseInternal => "parse-internal",
            StageKind::ParseProvider => "parse-provider",
            StageKind::Reconcile => "reconcile",
        }
    }

    /// Portion of the overall 0-100 scale owned by this stage
    pub fn slice(&self) -> StageSlice {
        match self {
            StageKind::ParseInternal => StageSlice::INTERNAL_PARSE,
            StageKind::ParseProvider => StageSlice::PROVIDER_PARSE,
            StageKind::Reconcile => StageSlice::RECONCILE,
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Work handed to a stage worker
#[derive(Debug, Clone)]
pub enum StageRequest {
    /// Parse one raw source
    Parse {
        run: RunId,
        side: Source,
        source: SourceFile,
    },
    /// Match two validated record sets
    Reconcile {
        run: RunId,
        internal: Vec<Transaction>,
        provider: Vec<Transaction>,
    },
}

impl StageRequest {
    pub fn run(&self) -> RunId {
        match self {
            StageRequest::Parse { run, .. } | StageRequest::Reconcile { run, .. } => *run,
        }
    }

    pub fn kind(&self) -> StageKind {
        match self {
            StageRequest::Parse { side, .. } => StageKind::parse(*side),
            StageRequest::Reconcile { .. } => StageKind::Reconcile,
        }
    }
}

/// Message sent by a stage worker back to the coordinator
#[derive(Debug, Clone)]
pub enum StageMessage {
    /// Stage-local progress, 0..=100
    Progress {
        run: RunId,
        percent: f64,
        label: String,
    },
    /// Terminal: a parse stage finished
    Parsed { run: RunId, outcome: ParseOutcome },
    /// Terminal: the reconcile stage finished
    Reconciled {
        run: RunId,
        result: ReconciliationResult,
    },
    /// Terminal: the stage's execution context failed
    Failed { run: RunId, error: ReconError },
}

impl StageMessage {
    /// Correlation id of the run this message belongs to
    pub fn run(&self) -> RunId {
        match self {
            StageMessage::Progress { run, .. }
            | StageMessage::Parsed { run, .. }
            | StageMessage::Reconciled { run, .. }
            | StageMessage::Failed { run, .. } => *run,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, StageMessage::Progress { .. })
    }
}
