//! Run state machine
//!
//! ```text
//! Idle → ParsingInternal → ParsingProvider → Reconciling → Complete
//!          │                 │                 │
//!          └──────→ Error ←──┴─────────────────┘
//!
//! any non-terminal state → Cancelled
//! ```

use serde::Serialize;
use std::fmt;

/// Lifecycle state of one reconciliation run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Idle,
    ParsingInternal,
    ParsingProvider,
    Reconciling,
    Complete,
    Error,
    Cancelled,
}

impl RunState {
    /// State after the current one succeeds
    ///
    /// Terminal states have no successor and return themselves.
    pub fn next(self) -> RunState {
        match self {
            RunState::Idle => RunState::ParsingInternal,
            RunState::ParsingInternal => RunState::ParsingProvider,
            RunState::ParsingProvider => RunState::Reconciling,
            RunState::Reconciling => RunState::Complete,
            terminal => terminal,
        }
    }

    /// State after the current stage fails
    pub fn fail(self) -> RunState {
        if self.is_terminal() {
            self
        } else {
            RunState::Error
        }
    }

    /// State after a cancellation request
    pub fn cancel(self) -> RunState {
        if self.is_terminal() {
            self
        } else {
            RunState::Cancelled
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, RunState::Complete | RunState::Error | RunState::Cancelled)
    }

    /// Progress label shown to the caller while in this state
    pub fn label(self) -> &'static str {
        match self {
            RunState::Idle => "Waiting for input",
            RunState::ParsingInternal => "Parsing internal transactions",
            RunState::ParsingProvider => "Parsing provider transactions",
            RunState::Reconciling => "Processing transactions",
            RunState::Complete => "Reconciliation complete",
            RunState::Error => "Reconciliation failed",
            RunState::Cancelled => "Reconciliation cancelled",
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunState::Idle => "idle",
            RunState::ParsingInternal => "parsing_internal",
            RunState::ParsingProvider => "parsing_provider",
            RunState::Reconciling => "reconciling",
            RunState::Complete => "complete",
            RunState::Error => "error",
            RunState::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}
