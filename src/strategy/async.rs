//! Asynchronous reconciliation strategy
//!
//! Runs the [`Reconciler`] coordinator on a multi-threaded tokio runtime.
//! Each stage executes on its own task and reports back over a channel.
//!
//! # Architecture
//!
//! ```text
//! AsyncStrategy
//!     ├── tokio runtime (worker_threads)
//!     └── Reconciler (run ids, cancellation)
//!         ├── parse-internal task (AsyncRecordParser)
//!         ├── parse-provider task (AsyncRecordParser)
//!         └── reconcile task (MatchingEngine)
//! ```

use crate::config::ReconcilerConfig;
use crate::io::SourceFile;
use crate::pipeline::{ProgressSink, Reconciler};
use crate::strategy::ReconcileStrategy;
use crate::types::{ReconciliationResult, RunError};

/// Asynchronous, stage-isolated reconciliation strategy
#[derive(Debug, Clone)]
pub struct AsyncStrategy {
    reconciler: Reconciler,
}

impl AsyncStrategy {
    pub fn new(config: ReconcilerConfig) -> Self {
        Self {
            reconciler: Reconciler::new(config),
        }
    }

    /// The coordinator driving this strategy's runs
    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }
}

impl ReconcileStrategy for AsyncStrategy {
    fn reconcile(
        &self,
        internal: SourceFile,
        provider: SourceFile,
        sink: &dyn ProgressSink,
    ) -> Result<ReconciliationResult, RunError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(self.reconciler.config().worker_threads)
            .build()
            .map_err(|e| RunError::StageFailed {
                stage: "runtime".to_string(),
                message: format!("Failed to create tokio runtime: {}", e),
            })?;

        runtime.block_on(self.reconciler.reconcile(internal, provider, sink))
    }

    fn name(&self) -> &'static str {
        "async"
    }
}
