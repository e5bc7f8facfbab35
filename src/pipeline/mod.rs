//! Pipeline coordination
//!
//! This module runs a reconciliation as three isolated stages that talk to
//! the coordinator only through messages:
//! - `protocol` - Stage requests and messages, tagged with the run's `RunId`
//! - `progress` - Progress sinks and the fixed per-stage progress slices
//! - `state` - The per-run state machine
//! - `stage` - Stage workers on their own tokio tasks
//! - `coordinator` - The `Reconciler`: fail-fast sequencing, cancellation
//!   and stale-message discard

pub mod coordinator;
pub mod progress;
pub mod protocol;
pub mod stage;
pub mod state;

pub use coordinator::{accept_parsed, Reconciler};
pub use progress::{no_progress, ProgressSink, ProgressUpdate, StageSlice};
pub use protocol::{StageKind, StageMessage, StageRequest};
pub use state::RunState;
