//! Execution strategy module for reconciliation runs
//!
//! This module defines the Strategy pattern for complete reconciliation
//! pipelines, from raw sources to a classified result. Both strategies honor
//! the same contract (fail-fast staging, the same progress scale and
//! labels, identical results for identical input) and can be selected at
//! runtime.

use crate::cli::StrategyType;
use crate::config::ReconcilerConfig;
use crate::io::SourceFile;
use crate::pipeline::ProgressSink;
use crate::types::{ReconciliationResult, RunError};

pub mod r#async;
pub mod sync;

pub use self::r#async::AsyncStrategy;
pub use sync::SyncStrategy;

/// Reconciliation strategy trait
///
/// Each strategy parses both sources, fails fast on the first side with any
/// validation error, and matches the two validated record sets.
pub trait ReconcileStrategy: Send + Sync {
    /// Reconcile two raw sources
    ///
    /// # Arguments
    ///
    /// * `internal` - The internal ledger export
    /// * `provider` - The provider settlement export
    /// * `sink` - Receives overall progress on a 0-100 scale
    ///
    /// # Returns
    ///
    /// * `Ok(ReconciliationResult)` when both sources are clean
    /// * `Err(RunError)` with every validation error of the first failing
    ///   side, or the reason the run could not complete
    fn reconcile(
        &self,
        internal: SourceFile,
        provider: SourceFile,
        sink: &dyn ProgressSink,
    ) -> Result<ReconciliationResult, RunError>;

    /// Short name used in logs
    fn name(&self) -> &'static str;
}

/// Create a reconciliation strategy based on the specified strategy type
///
/// # Arguments
///
/// * `strategy_type` - The type of strategy to create (Sync or Async)
/// * `config` - Configuration shared by the parser, engine and runtime
///
/// # Returns
///
/// A boxed trait object implementing the ReconcileStrategy trait
pub fn create_strategy(
    strategy_type: StrategyType,
    config: ReconcilerConfig,
) -> Box<dyn ReconcileStrategy> {
    match strategy_type {
        StrategyType::Sync => Box::new(SyncStrategy::new(config)),
        StrategyType::Async => Box::new(AsyncStrategy::new(config)),
    }
}
