//! Metrics collection abstraction for concurrency controls.
//!
//! Backends (prometheus, statsd, etc) implement [`MetricsBackend`] and are handed to the
//! [`crate::Reconciler`] and [`crate::CancelExecutor`] as a [`MetricsHandle`].
mod backend;
pub use backend::{CancelOutcome, MetricsBackend, MetricsHandle, ReconcileOutcome};

mod noop;
pub use noop::NoOpMetrics;

use std::sync::Arc;

/// Create a no-op metrics handle.
#[inline]
pub fn noop_metrics() -> MetricsHandle {
    Arc::new(NoOpMetrics)
}
