use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{Instrument, debug, info, instrument, warn};

use ccx_model::{RunName, Strategy};

use crate::{
    cancel::{TransitionPayload, TransitionPayloads},
    error::GateError,
    metrics::{CancelOutcome, MetricsHandle, noop_metrics},
    store::{RunStore, StoreError},
};

/// Applies a strategy's transition to many runs at once.
///
/// One task is spawned per target and all of them are awaited before returning:
/// a failing target never stops the others from being attempted.
/// A target that no longer exists counts as cancelled.
#[derive(Clone)]
pub struct CancelExecutor {
    store: Arc<dyn RunStore>,
    payloads: Arc<TransitionPayloads>,
    metrics: MetricsHandle,
}

impl CancelExecutor {
    /// Create an executor writing through `store`.
    pub fn new(store: Arc<dyn RunStore>, payloads: Arc<TransitionPayloads>) -> Self {
        Self {
            store,
            payloads,
            metrics: noop_metrics(),
        }
    }

    /// Replace the metrics backend.
    pub fn with_metrics(mut self, metrics: MetricsHandle) -> Self {
        self.metrics = metrics;
        self
    }

    /// Transition every run in `names` according to `strategy`.
    ///
    /// Returns the error of the first failed target in `names` order, after every
    /// target has been attempted.
    #[instrument(level = "debug", skip(self, names), fields(targets = names.len()))]
    pub async fn cancel(
        &self,
        namespace: &str,
        names: &[RunName],
        strategy: Strategy,
    ) -> Result<(), GateError> {
        if names.is_empty() {
            return Ok(());
        }
        let payload = self.payloads.get(strategy);

        let mut set = JoinSet::new();
        for (idx, name) in names.iter().enumerate() {
            let store = Arc::clone(&self.store);
            let metrics = Arc::clone(&self.metrics);
            let payload = payload.clone();
            let namespace = namespace.to_string();
            let name = name.clone();

            set.spawn(
                async move {
                    info!(run = %name, %namespace, %strategy, "canceling run");
                    let res = cancel_one(store.as_ref(), &namespace, &name, &payload).await;
                    match &res {
                        Ok(outcome) => metrics.record_cancellation(strategy, *outcome),
                        Err(_) => metrics.record_cancellation(strategy, CancelOutcome::Failed),
                    }
                    (idx, res)
                }
                .in_current_span(),
            );
        }

        let mut first: Option<(usize, GateError)> = None;
        while let Some(joined) = set.join_next().await {
            let (idx, err) = match joined {
                Ok((_, Ok(_))) => continue,
                Ok((idx, Err(source))) => (
                    idx,
                    GateError::Cancel {
                        namespace: namespace.to_string(),
                        name: names[idx].clone(),
                        strategy,
                        source,
                    },
                ),
                Err(join) => (usize::MAX, GateError::Internal(join.to_string())),
            };

            warn!(error = %err, "cancellation failed");
            if first.as_ref().is_none_or(|(seen, _)| idx < *seen) {
                first = Some((idx, err));
            }
        }

        match first {
            Some((_, err)) => Err(err),
            None => Ok(()),
        }
    }
}

async fn cancel_one(
    store: &dyn RunStore,
    namespace: &str,
    name: &str,
    payload: &TransitionPayload,
) -> Result<CancelOutcome, StoreError> {
    match store
        .apply_transition(namespace, name, payload.as_bytes())
        .await
    {
        Ok(()) => Ok(CancelOutcome::Applied),
        // Deleted between listing and canceling.
        Err(e) if e.is_not_found() => {
            debug!(run = %name, %namespace, "run already gone, nothing to cancel");
            Ok(CancelOutcome::Gone)
        }
        Err(e) => Err(e),
    }
}
