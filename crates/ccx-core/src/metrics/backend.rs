use std::sync::Arc;

use ccx_model::Strategy;

/// Result of one reconcile pass, for metrics classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Nothing to do (not pending, already processed, namespace excluded).
    Skipped,
    /// Left unmarked until missing labels show up.
    Deferred,
    /// Conflicting runs cancelled and the run marked processed.
    Admitted,
    /// Permanent misconfiguration; will not be retried.
    Rejected,
    /// Transient failure; expected to be retried.
    Failed,
}

impl ReconcileOutcome {
    /// Return label value for metrics.
    #[inline]
    pub fn as_label(&self) -> &'static str {
        match self {
            ReconcileOutcome::Skipped => "skipped",
            ReconcileOutcome::Deferred => "deferred",
            ReconcileOutcome::Admitted => "admitted",
            ReconcileOutcome::Rejected => "rejected",
            ReconcileOutcome::Failed => "failed",
        }
    }
}

/// Result of applying a transition to one conflicting run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelOutcome {
    /// Transition written.
    Applied,
    /// Target no longer exists.
    Gone,
    /// Store rejected the transition.
    Failed,
}

impl CancelOutcome {
    /// Return label value for metrics.
    #[inline]
    pub fn as_label(&self) -> &'static str {
        match self {
            CancelOutcome::Applied => "applied",
            CancelOutcome::Gone => "gone",
            CancelOutcome::Failed => "failed",
        }
    }
}

/// Backend metrics collection interface.
pub trait MetricsBackend: Send + Sync + 'static {
    /// Record a finished reconcile pass.
    ///
    /// # Arguments
    /// - `outcome`: How the pass ended
    /// - `duration_ms`: Wall time of the pass in milliseconds
    fn record_reconcile(&self, outcome: ReconcileOutcome, duration_ms: u64);
    /// Record a single cancellation attempt.
    ///
    /// Called once per conflicting run, from the fan-out task that handled it.
    fn record_cancellation(&self, strategy: Strategy, outcome: CancelOutcome);
}

/// Shared handle to metrics backend.
pub type MetricsHandle = Arc<dyn MetricsBackend>;
