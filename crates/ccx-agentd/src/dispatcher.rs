//! Retry envelope around the reconciler.
//!
//! Triggers arrive on an mpsc queue. Each one is handled by its own task, so independent
//! runs reconcile concurrently. A trigger is resolved to the run's current state before
//! every attempt. Transient failures are retried after a [`BackoffStrategy`] delay.
//! Permanent failures are logged and dropped.
//!
//! The dispatcher stops when the token is cancelled, or when the queue is closed and no
//! attempt or scheduled retry is left.
use std::{sync::Arc, time::Duration};

use tokio::{sync::mpsc, task::JoinSet, time};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use ccx_core::{GateError, Outcome, Reconciler, RunStore};
use ccx_model::{BackoffStrategy, Run};

/// Request to reconcile one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trigger {
    pub namespace: String,
    pub name: String,
    /// Failed attempts so far.
    failures: u32,
}

impl Trigger {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            failures: 0,
        }
    }

    pub fn for_run(run: &Run) -> Self {
        Self::new(run.namespace.clone(), run.name.clone())
    }

    fn key(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }
}

/// Counters over the dispatcher's lifetime.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchStats {
    pub admitted: usize,
    pub deferred: usize,
    pub skipped: usize,
    /// Run disappeared before it could be evaluated.
    pub gone: usize,
    /// Dropped on a permanent error.
    pub rejected: usize,
    /// Retries scheduled.
    pub retried: usize,
    /// Dropped after exhausting retries.
    pub abandoned: usize,
}

enum Verdict {
    Done(Outcome),
    Gone,
    Rejected,
    Retry(Trigger, Duration),
    Abandoned,
    Cancelled,
}

pub struct Dispatcher {
    reconciler: Reconciler,
    runs: Arc<dyn RunStore>,
    retry: BackoffStrategy,
}

impl Dispatcher {
    pub fn new(reconciler: Reconciler, runs: Arc<dyn RunStore>, retry: BackoffStrategy) -> Self {
        Self {
            reconciler,
            runs,
            retry,
        }
    }

    /// Process triggers until shutdown. In-flight attempts are aborted on cancellation.
    pub async fn run(
        self,
        mut rx: mpsc::Receiver<Trigger>,
        token: CancellationToken,
    ) -> DispatchStats {
        let this = Arc::new(self);
        let mut set: JoinSet<Verdict> = JoinSet::new();
        let mut stats = DispatchStats::default();
        let mut closed = false;

        loop {
            if closed && set.is_empty() {
                debug!("trigger queue drained");
                break;
            }
            tokio::select! {
                _ = token.cancelled() => {
                    info!(in_flight = set.len(), "dispatcher cancelled");
                    break;
                }
                maybe = rx.recv(), if !closed => match maybe {
                    Some(trigger) => {
                        set.spawn(Arc::clone(&this).attempt(trigger, Duration::ZERO, token.child_token()));
                    }
                    None => closed = true,
                },
                Some(joined) = set.join_next(), if !set.is_empty() => {
                    let verdict = match joined {
                        Ok(verdict) => verdict,
                        Err(e) => {
                            error!(error = %e, "reconcile task failed");
                            continue;
                        }
                    };
                    match verdict {
                        Verdict::Done(Outcome::Admitted { .. }) => stats.admitted += 1,
                        Verdict::Done(Outcome::Deferred) => stats.deferred += 1,
                        Verdict::Done(Outcome::Skipped(_)) => stats.skipped += 1,
                        Verdict::Gone => stats.gone += 1,
                        Verdict::Rejected => stats.rejected += 1,
                        Verdict::Abandoned => stats.abandoned += 1,
                        Verdict::Retry(trigger, delay) => {
                            stats.retried += 1;
                            set.spawn(Arc::clone(&this).attempt(trigger, delay, token.child_token()));
                        }
                        Verdict::Cancelled => {}
                    }
                }
            }
        }

        set.shutdown().await;
        stats
    }

    async fn attempt(
        self: Arc<Self>,
        trigger: Trigger,
        delay: Duration,
        token: CancellationToken,
    ) -> Verdict {
        if !delay.is_zero() {
            tokio::select! {
                _ = time::sleep(delay) => {}
                _ = token.cancelled() => return Verdict::Cancelled,
            }
        }

        let run = match self.runs.get_run(&trigger.namespace, &trigger.name).await {
            Ok(run) => run,
            Err(e) if e.is_not_found() => {
                debug!(run = %trigger.key(), "run no longer exists");
                return Verdict::Gone;
            }
            Err(e) => return self.retry_or_abandon(trigger, GateError::from(e)),
        };

        match self.reconciler.reconcile(&run).await {
            Ok(outcome) => {
                debug!(run = %trigger.key(), ?outcome, "reconciled");
                Verdict::Done(outcome)
            }
            Err(e) if e.is_permanent() => {
                error!(run = %trigger.key(), error = %e, kind = e.as_label(), "not retrying");
                Verdict::Rejected
            }
            Err(e) => self.retry_or_abandon(trigger, e),
        }
    }

    fn retry_or_abandon(&self, mut trigger: Trigger, err: GateError) -> Verdict {
        trigger.failures += 1;
        if !self.retry.allows(trigger.failures) {
            error!(
                run = %trigger.key(),
                attempts = trigger.failures,
                error = %err,
                "giving up"
            );
            return Verdict::Abandoned;
        }

        let delay = self.retry.delay(trigger.failures);
        warn!(
            run = %trigger.key(),
            attempt = trigger.failures,
            delay_ms = delay.as_millis() as u64,
            error = %err,
            "reconcile failed, retrying"
        );
        Verdict::Retry(trigger, delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;
    use ccx_core::{GateConfig, MemoryStore, StoreError, TransitionPayloads};
    use ccx_model::{
        ConcurrencyPolicy, LABEL_START_ON_ADMISSION, Selector, SpecStatus,
    };

    /// Fails the first `failures` reads, then delegates.
    struct Flaky {
        inner: Arc<MemoryStore>,
        failures: AtomicU32,
    }

    #[async_trait]
    impl RunStore for Flaky {
        async fn list_runs(&self, ns: &str, sel: &Selector) -> Result<Vec<Run>, StoreError> {
            self.inner.list_runs(ns, sel).await
        }

        async fn get_run(&self, ns: &str, name: &str) -> Result<Run, StoreError> {
            let left = self.failures.load(Ordering::SeqCst);
            if left > 0 {
                self.failures.store(left - 1, Ordering::SeqCst);
                return Err(StoreError::Backend("unavailable".into()));
            }
            self.inner.get_run(ns, name).await
        }

        async fn update_run(&self, run: &Run) -> Result<Run, StoreError> {
            self.inner.update_run(run).await
        }

        async fn apply_transition(
            &self,
            ns: &str,
            name: &str,
            patch: &[u8],
        ) -> Result<(), StoreError> {
            self.inner.apply_transition(ns, name, patch).await
        }
    }

    fn fast_retry(max_attempts: u32) -> BackoffStrategy {
        BackoffStrategy {
            first_ms: 1,
            max_ms: 5,
            factor: 2.0,
            max_attempts,
        }
    }

    fn held(name: &str) -> Run {
        Run::new("ns", name)
            .with_status(SpecStatus::Pending)
            .with_label(LABEL_START_ON_ADMISSION, "true")
    }

    async fn dispatch(
        store: Arc<MemoryStore>,
        runs: Arc<dyn RunStore>,
        retry: BackoffStrategy,
        triggers: Vec<Trigger>,
    ) -> DispatchStats {
        let payloads = Arc::new(TransitionPayloads::new().unwrap());
        let reconciler = Reconciler::new(store, Arc::clone(&runs), payloads, GateConfig::default());
        let dispatcher = Dispatcher::new(reconciler, runs, retry);

        let (tx, rx) = mpsc::channel(16);
        for trigger in triggers {
            tx.send(trigger).await.unwrap();
        }
        drop(tx);
        time::timeout(
            Duration::from_secs(5),
            dispatcher.run(rx, CancellationToken::new()),
        )
        .await
        .expect("dispatcher must stop once the queue is drained")
    }

    #[tokio::test]
    async fn closed_empty_queue_stops_dispatcher() {
        let store = Arc::new(MemoryStore::new());
        let stats = dispatch(store.clone(), store, fast_retry(0), Vec::new()).await;
        assert_eq!(stats, DispatchStats::default());
    }

    #[tokio::test]
    async fn drained_queue_stops_dispatcher_after_last_attempt() {
        let store = Arc::new(MemoryStore::new());
        store.insert_run(held("r1")).await;

        let stats = dispatch(
            store.clone(),
            store.clone(),
            fast_retry(0),
            vec![Trigger::new("ns", "r1")],
        )
        .await;

        assert_eq!(stats.admitted, 1);
        assert!(store.run("ns", "r1").await.unwrap().concurrency_applied());
    }

    #[tokio::test]
    async fn transient_failures_are_retried() {
        let store = Arc::new(MemoryStore::new());
        store.insert_policy(ConcurrencyPolicy::new("ns", "p1", "Cancel")).await;
        store.insert_run(Run::new("ns", "r0")).await;
        store.insert_run(held("r1")).await;

        let runs = Arc::new(Flaky {
            inner: store.clone(),
            failures: AtomicU32::new(2),
        });
        let stats = dispatch(store.clone(), runs, fast_retry(0), vec![Trigger::new("ns", "r1")]).await;

        assert_eq!(stats.retried, 2);
        assert_eq!(stats.admitted, 1);
        assert_eq!(
            store.run("ns", "r0").await.unwrap().spec_status,
            SpecStatus::Cancelled
        );
    }

    #[tokio::test]
    async fn retries_stop_after_max_attempts() {
        let store = Arc::new(MemoryStore::new());
        store.insert_run(held("r1")).await;

        let runs = Arc::new(Flaky {
            inner: store.clone(),
            failures: AtomicU32::new(u32::MAX),
        });
        let stats = dispatch(store, runs, fast_retry(3), vec![Trigger::new("ns", "r1")]).await;

        assert_eq!(stats.retried, 2);
        assert_eq!(stats.abandoned, 1);
        assert_eq!(stats.admitted, 0);
    }

    #[tokio::test]
    async fn permanent_errors_are_not_retried() {
        let store = Arc::new(MemoryStore::new());
        store.insert_policy(ConcurrencyPolicy::new("ns", "p1", "Cancel")).await;
        store
            .insert_policy(ConcurrencyPolicy::new("ns", "p2", "GracefullyStop"))
            .await;
        store.insert_run(held("r1")).await;

        let stats = dispatch(
            store.clone(),
            store.clone(),
            fast_retry(0),
            vec![Trigger::new("ns", "r1")],
        )
        .await;

        assert_eq!(stats.rejected, 1);
        assert_eq!(stats.retried, 0);
        assert!(store.run("ns", "r1").await.unwrap().is_pending());
    }

    #[tokio::test]
    async fn each_trigger_is_accounted_for() {
        let store = Arc::new(MemoryStore::new());
        store
            .insert_policy(
                ConcurrencyPolicy::new("ns", "p1", "Cancel")
                    .with_selector(Selector::everything().require("pipeline", "build")),
            )
            .await;
        store.insert_run(held("waiting")).await;
        store.insert_run(Run::new("ns", "running")).await;
        store
            .insert_run(held("build").with_label("pipeline", "build"))
            .await;

        let triggers = ["waiting", "running", "build", "missing"]
            .into_iter()
            .map(|name| Trigger::new("ns", name))
            .collect();
        let stats = dispatch(store.clone(), store, fast_retry(0), triggers).await;

        assert_eq!(
            stats,
            DispatchStats {
                admitted: 1,
                deferred: 1,
                skipped: 1,
                gone: 1,
                ..Default::default()
            }
        );
    }

    #[tokio::test]
    async fn cancellation_drops_scheduled_retries() {
        let store = Arc::new(MemoryStore::new());
        store.insert_run(held("r1")).await;
        let runs: Arc<dyn RunStore> = Arc::new(Flaky {
            inner: store.clone(),
            failures: AtomicU32::new(u32::MAX),
        });

        let payloads = Arc::new(TransitionPayloads::new().unwrap());
        let reconciler = Reconciler::new(store, Arc::clone(&runs), payloads, GateConfig::default());
        let slow = BackoffStrategy {
            first_ms: 60_000,
            max_ms: 60_000,
            factor: 1.0,
            max_attempts: 0,
        };
        let dispatcher = Dispatcher::new(reconciler, runs, slow);

        let (tx, rx) = mpsc::channel(4);
        tx.send(Trigger::new("ns", "r1")).await.unwrap();
        let token = CancellationToken::new();
        let worker = tokio::spawn(dispatcher.run(rx, token.clone()));

        time::sleep(Duration::from_millis(50)).await;
        token.cancel();

        let stats = time::timeout(Duration::from_secs(5), worker)
            .await
            .expect("dispatcher must stop on cancellation")
            .unwrap();
        assert_eq!(stats.retried, 1);
        drop(tx);
    }
}
