use ccx_model::Strategy;

use crate::metrics::backend::{CancelOutcome, MetricsBackend, ReconcileOutcome};

/// Metrics backend that records nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpMetrics;

impl MetricsBackend for NoOpMetrics {
    #[inline(always)]
    fn record_reconcile(&self, _: ReconcileOutcome, _: u64) {}

    #[inline(always)]
    fn record_cancellation(&self, _: Strategy, _: CancelOutcome) {}
}
