use std::sync::Arc;

use prometheus::{
    CounterVec, Encoder, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder,
    proto::MetricFamily,
};

use ccx_core::{CancelOutcome, MetricsBackend, ReconcileOutcome};
use ccx_model::Strategy;

/// Prometheus metrics backend for the reconciler.
///
/// ## Label cardinality
/// All labels are bounded:
/// - `outcome` (reconcile): "skipped", "deferred", "admitted", "rejected", "failed"
/// - `strategy`: "Cancel", "GracefullyCancel", "GracefullyStop"
/// - `outcome` (cancellation): "applied", "gone", "failed"
#[derive(Clone)]
pub struct PrometheusMetrics {
    reconciles: CounterVec,
    reconcile_duration: HistogramVec,
    cancellations: CounterVec,
    registry: Arc<Registry>,
}

impl PrometheusMetrics {
    /// Create a backend registering its metrics in `registry`.
    pub fn new_with_registry(registry: Arc<Registry>) -> Result<Self, prometheus::Error> {
        let reconciles = CounterVec::new(
            Opts::new("reconciles_total", "Total number of reconcile passes").namespace("ccx"),
            &["outcome"],
        )?;
        registry.register(Box::new(reconciles.clone()))?;

        let reconcile_duration = HistogramVec::new(
            HistogramOpts::new(
                "reconcile_duration_seconds",
                "Reconcile pass duration in seconds",
            )
            .namespace("ccx")
            .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
            &["outcome"],
        )?;
        registry.register(Box::new(reconcile_duration.clone()))?;

        let cancellations = CounterVec::new(
            Opts::new(
                "cancellations_total",
                "Total number of transitions applied to conflicting runs",
            )
            .namespace("ccx"),
            &["strategy", "outcome"],
        )?;
        registry.register(Box::new(cancellations.clone()))?;

        Ok(Self {
            reconciles,
            reconcile_duration,
            cancellations,
            registry,
        })
    }

    /// Create a backend with its own registry.
    pub fn new() -> Result<Self, prometheus::Error> {
        Self::new_with_registry(Arc::new(Registry::new()))
    }

    /// Gather all metrics for exposition.
    pub fn gather(&self) -> Vec<MetricFamily> {
        self.registry.gather()
    }

    /// Render every metric in the Prometheus text exposition format.
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let mut buf = Vec::new();
        TextEncoder::new().encode(&self.gather(), &mut buf)?;
        String::from_utf8(buf).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

impl MetricsBackend for PrometheusMetrics {
    fn record_reconcile(&self, outcome: ReconcileOutcome, duration_ms: u64) {
        let label = outcome.as_label();
        self.reconciles.with_label_values(&[label]).inc();
        self.reconcile_duration
            .with_label_values(&[label])
            .observe(duration_ms as f64 / 1000.0);
    }

    fn record_cancellation(&self, strategy: Strategy, outcome: CancelOutcome) {
        self.cancellations
            .with_label_values(&[strategy.as_str(), outcome.as_label()])
            .inc();
    }
}
