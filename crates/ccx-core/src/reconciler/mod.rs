//! Admission orchestrator.
//!
//! A [`Reconciler`] evaluates one pending run against the concurrency policies of its
//! namespace. It cancels the conflicting runs of the run's concurrency group, then marks
//! the run as processed and lifts the admission hold.
//!
//! A pass either completes or fails as a whole. It is safe to repeat: runs that were
//! already cancelled or removed are a no-op, and a marked run is skipped outright.
//! Retries and backoff belong to the caller, guided by [`GateError::is_permanent`].
mod outcome;
pub use outcome::{Outcome, SkipReason};

use std::{collections::BTreeSet, sync::Arc, time::Instant};

use tracing::{debug, info, instrument};

use ccx_model::{LABEL_CONCURRENCY_APPLIED, LABEL_START_ON_ADMISSION, Run, RunName, SpecStatus};

use crate::{
    cancel::{CancelExecutor, TransitionPayloads},
    config::GateConfig,
    error::GateError,
    group::group_selector,
    metrics::{MetricsHandle, ReconcileOutcome, noop_metrics},
    resolver::resolve,
    store::{PolicyStore, RunStore},
};

/// Applies concurrency policies to pending runs.
#[derive(Clone)]
pub struct Reconciler {
    policies: Arc<dyn PolicyStore>,
    runs: Arc<dyn RunStore>,
    executor: CancelExecutor,
    config: GateConfig,
    metrics: MetricsHandle,
}

impl Reconciler {
    /// Create a reconciler. `payloads` is built once per process and shared.
    pub fn new(
        policies: Arc<dyn PolicyStore>,
        runs: Arc<dyn RunStore>,
        payloads: Arc<TransitionPayloads>,
        config: GateConfig,
    ) -> Self {
        let executor = CancelExecutor::new(Arc::clone(&runs), payloads);
        Self {
            policies,
            runs,
            executor,
            config,
            metrics: noop_metrics(),
        }
    }

    /// Replace the metrics backend (also used by the cancellation fan-out).
    pub fn with_metrics(mut self, metrics: MetricsHandle) -> Self {
        self.executor = self.executor.with_metrics(Arc::clone(&metrics));
        self.metrics = metrics;
        self
    }

    /// Run one reconcile pass for `run`.
    #[instrument(level = "debug", skip(self, run), fields(run = %run.key()))]
    pub async fn reconcile(&self, run: &Run) -> Result<Outcome, GateError> {
        let started = Instant::now();
        let res = self.evaluate(run).await;

        let outcome = match &res {
            Ok(outcome) => outcome.metric(),
            Err(e) if e.is_permanent() => ReconcileOutcome::Rejected,
            Err(_) => ReconcileOutcome::Failed,
        };
        let elapsed = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        self.metrics.record_reconcile(outcome, elapsed);
        res
    }

    async fn evaluate(&self, run: &Run) -> Result<Outcome, GateError> {
        if !self.config.allows(&run.namespace) {
            debug!(namespace = %run.namespace, "namespace not subject to concurrency controls");
            return Ok(Outcome::Skipped(SkipReason::NamespaceNotAllowed));
        }
        if !run.is_pending() {
            return Ok(Outcome::Skipped(SkipReason::NotPending));
        }
        if run.concurrency_applied() {
            debug!("concurrency controls already applied");
            return Ok(Outcome::Skipped(SkipReason::AlreadyApplied));
        }

        let policies = self.policies.list_policies(&run.namespace).await?;
        let resolution = resolve(run, &policies)?;

        let Some(strategy) = resolution.strategy else {
            if resolution.awaiting_labels() {
                info!(
                    undetermined = resolution.undetermined.len(),
                    "no policy matches yet, leaving run unmarked"
                );
                return Ok(Outcome::Deferred);
            }
            debug!("no matching policies");
            let released = self.mark_applied(run).await?;
            return Ok(Outcome::Admitted {
                cancelled: Vec::new(),
                released,
            });
        };

        // All selectors first: a bad groupBy must not leave a half-cancelled group.
        let selectors = resolution
            .matching
            .iter()
            .map(|policy| group_selector(policy, run))
            .collect::<Result<Vec<_>, _>>()?;

        let mut targets = BTreeSet::new();
        for selector in &selectors {
            for other in self.runs.list_runs(&run.namespace, selector).await? {
                if other.name == run.name || other.is_done() {
                    continue;
                }
                targets.insert(other.name);
            }
        }
        let cancelled: Vec<RunName> = targets.into_iter().collect();

        if !cancelled.is_empty() {
            info!(%strategy, targets = ?cancelled, "canceling runs in concurrency group");
            self.executor
                .cancel(&run.namespace, &cancelled, strategy)
                .await?;
        }

        let released = self.mark_applied(run).await?;
        Ok(Outcome::Admitted {
            cancelled,
            released,
        })
    }

    /// Set the idempotency marker on a fresh copy of the run, lifting the admission hold
    /// if the run is still held by it. Returns `true` if the hold was lifted.
    ///
    /// A run that left `Pending` in the meantime (e.g. cancelled by a sibling's pass)
    /// keeps its status.
    async fn mark_applied(&self, run: &Run) -> Result<bool, GateError> {
        let mut latest = self.runs.get_run(&run.namespace, &run.name).await?;
        latest.labels.insert(LABEL_CONCURRENCY_APPLIED, "true");

        let released = latest.held_by_admission() && latest.is_pending();
        if latest.held_by_admission() && !released {
            debug!(status = %latest.spec_status, "run no longer pending, keeping its status");
        }
        if released {
            latest.labels.remove(LABEL_START_ON_ADMISSION);
            latest.spec_status = SpecStatus::None;
        }

        self.runs.update_run(&latest).await?;
        if released {
            info!("admission hold released");
        }
        Ok(released)
    }
}
