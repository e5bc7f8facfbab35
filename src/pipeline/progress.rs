//! Progress reporting
//!
//! Every stage reports its own progress on a 0-100 scale. The coordinator
//! rescales it into the stage's fixed [`StageSlice`] of the overall scale
//! before handing a [`ProgressUpdate`] to the caller's [`ProgressSink`].

use crate::pipeline::state::RunState;
use crate::types::RunId;

/// One progress notification delivered to the caller
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressUpdate {
    pub run: RunId,
    /// Overall completion, 0..=100, never decreasing within a run
    pub percent: f64,
    pub state: RunState,
    pub label: String,
}

/// Receiver of progress updates
///
/// Implemented for every `Fn(&ProgressUpdate) + Send + Sync` closure.
pub trait ProgressSink: Send + Sync {
    fn report(&self, update: &ProgressUpdate);
}

impl<F> ProgressSink for F
where
    F: Fn(&ProgressUpdate) + Send + Sync,
{
    fn report(&self, update: &ProgressUpdate) {
        self(update)
    }
}

/// A sink that drops every update
pub fn no_progress(_: &ProgressUpdate) {}

/// A stage's portion of the overall progress scale
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StageSlice {
    pub start: f64,
    pub end: f64,
}

impl StageSlice {
    pub const INTERNAL_PARSE: StageSlice = StageSlice {
        start: 0.0,
        end: 25.0,
    };
    pub const PROVIDER_PARSE: StageSlice = StageSlice {
        start: 25.0,
        end: 50.0,
    };
    pub const RECONCILE: StageSlice = StageSlice {
        start: 50.0,
        end: 100.0,
    };

    /// Map stage-local progress (0..=100) into this slice
    ///
    /// Out-of-range input is clamped.
    pub fn scale(&self, percent: f64) -> f64 {
        let local = if percent.is_nan() {
            0.0
        } else {
            percent.clamp(0.0, 100.0)
        };
        self.start + (self.end - self.start) * local / 100.0
    }
}
