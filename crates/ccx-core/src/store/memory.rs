use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::trace;

use ccx_model::{ConcurrencyPolicy, Run, Selector, SpecStatus};

use super::{PolicyStore, RunStore, StoreError};
use crate::cancel::PatchOperation;

/// JSON pointer of the only field transitions are allowed to touch.
const SPEC_STATUS_PATH: &str = "/spec/status";

/// Operation recorded by [`MemoryStore`], in call order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreOp {
    ListPolicies {
        namespace: String,
    },
    ListRuns {
        namespace: String,
        selector: Selector,
    },
    GetRun {
        namespace: String,
        name: String,
    },
    UpdateRun {
        namespace: String,
        name: String,
    },
    ApplyTransition {
        namespace: String,
        name: String,
    },
}

type Key = (String, String);

#[derive(Default)]
struct Inner {
    runs: BTreeMap<Key, Run>,
    policies: BTreeMap<Key, ConcurrencyPolicy>,
    journal: Option<Vec<StoreOp>>,
    version: u64,
}

impl Inner {
    fn record(&mut self, op: StoreOp) {
        if let Some(journal) = self.journal.as_mut() {
            journal.push(op);
        }
    }

    fn next_version(&mut self) -> u64 {
        self.version += 1;
        self.version
    }
}

/// In-process store implementing both [`PolicyStore`] and [`RunStore`].
///
/// Behaves like an optimistic object store:
/// - every write bumps the run's `resource_version`;
/// - `update_run` with a stale version fails with [`StoreError::Conflict`];
/// - transitions accept JSON patches that `add`/`replace` `/spec/status`.
///
/// A store built with [`MemoryStore::recording`] also appends every trait call to a
/// journal, which makes it usable as a recording fake. [`MemoryStore::new`] records nothing.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store that journals every trait call.
    pub fn recording() -> Self {
        Self {
            inner: RwLock::new(Inner {
                journal: Some(Vec::new()),
                ..Inner::default()
            }),
        }
    }

    /// Insert or replace a run. The stored copy gets a fresh `resource_version`.
    pub async fn insert_run(&self, mut run: Run) -> Run {
        let mut inner = self.inner.write().await;
        run.resource_version = inner.next_version();
        inner
            .runs
            .insert((run.namespace.clone(), run.name.clone()), run.clone());
        run
    }

    /// Insert or replace a policy.
    pub async fn insert_policy(&self, policy: ConcurrencyPolicy) {
        let mut inner = self.inner.write().await;
        inner
            .policies
            .insert((policy.namespace.clone(), policy.name.clone()), policy);
    }

    /// Current copy of a run, without touching the journal.
    pub async fn run(&self, namespace: &str, name: &str) -> Option<Run> {
        let inner = self.inner.read().await;
        inner
            .runs
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
    }

    /// Every run currently held (across namespaces), ordered by namespace then name.
    pub async fn runs(&self) -> Vec<Run> {
        self.inner.read().await.runs.values().cloned().collect()
    }

    /// Snapshot of recorded operations. Always empty unless built with [`MemoryStore::recording`].
    pub async fn journal(&self) -> Vec<StoreOp> {
        self.inner.read().await.journal.clone().unwrap_or_default()
    }

    /// Forget recorded operations.
    pub async fn clear_journal(&self) {
        if let Some(journal) = self.inner.write().await.journal.as_mut() {
            journal.clear();
        }
    }
}

#[async_trait]
impl PolicyStore for MemoryStore {
    async fn list_policies(&self, namespace: &str) -> Result<Vec<ConcurrencyPolicy>, StoreError> {
        let mut inner = self.inner.write().await;
        inner.record(StoreOp::ListPolicies {
            namespace: namespace.to_string(),
        });

        Ok(inner
            .policies
            .values()
            .filter(|p| p.namespace == namespace)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl RunStore for MemoryStore {
    async fn list_runs(
        &self,
        namespace: &str,
        selector: &Selector,
    ) -> Result<Vec<Run>, StoreError> {
        let mut inner = self.inner.write().await;
        inner.record(StoreOp::ListRuns {
            namespace: namespace.to_string(),
            selector: selector.clone(),
        });

        Ok(inner
            .runs
            .values()
            .filter(|r| r.namespace == namespace && selector.matches(&r.labels))
            .cloned()
            .collect())
    }

    async fn get_run(&self, namespace: &str, name: &str) -> Result<Run, StoreError> {
        let mut inner = self.inner.write().await;
        inner.record(StoreOp::GetRun {
            namespace: namespace.to_string(),
            name: name.to_string(),
        });

        inner
            .runs
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
            .ok_or_else(|| StoreError::run_not_found(namespace, name))
    }

    async fn update_run(&self, run: &Run) -> Result<Run, StoreError> {
        let mut inner = self.inner.write().await;
        inner.record(StoreOp::UpdateRun {
            namespace: run.namespace.clone(),
            name: run.name.clone(),
        });

        let key = (run.namespace.clone(), run.name.clone());
        let current = inner
            .runs
            .get(&key)
            .map(|r| r.resource_version)
            .ok_or_else(|| StoreError::run_not_found(&run.namespace, &run.name))?;

        if current != run.resource_version {
            return Err(StoreError::Conflict {
                namespace: run.namespace.clone(),
                name: run.name.clone(),
                reason: format!(
                    "resource version {} is stale (current {current})",
                    run.resource_version
                ),
            });
        }

        let mut stored = run.clone();
        stored.resource_version = inner.next_version();
        inner.runs.insert(key, stored.clone());
        trace!(run = %stored.key(), version = stored.resource_version, "run updated");
        Ok(stored)
    }

    async fn apply_transition(
        &self,
        namespace: &str,
        name: &str,
        patch: &[u8],
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        inner.record(StoreOp::ApplyTransition {
            namespace: namespace.to_string(),
            name: name.to_string(),
        });

        let status = spec_status_from_patch(patch)?;
        let version = inner.next_version();
        let run = inner
            .runs
            .get_mut(&(namespace.to_string(), name.to_string()))
            .ok_or_else(|| StoreError::run_not_found(namespace, name))?;

        run.spec_status = status;
        run.resource_version = version;
        trace!(run = %run.key(), status = %status, "transition applied");
        Ok(())
    }
}

/// Extract the spec status written by a transition patch.
///
/// Only `add`/`replace` on `/spec/status` are understood; anything else is rejected.
fn spec_status_from_patch(patch: &[u8]) -> Result<SpecStatus, StoreError> {
    let ops: Vec<PatchOperation> =
        serde_json::from_slice(patch).map_err(|e| StoreError::InvalidPatch(e.to_string()))?;

    let mut status = None;
    for op in ops {
        if !matches!(op.op.as_str(), "add" | "replace") || op.path != SPEC_STATUS_PATH {
            return Err(StoreError::InvalidPatch(format!(
                "unsupported operation {} on {}",
                op.op, op.path
            )));
        }
        let value = op
            .value
            .as_str()
            .ok_or_else(|| StoreError::InvalidPatch("status must be a string".into()))?;
        status = Some(
            value
                .parse::<SpecStatus>()
                .map_err(|e| StoreError::InvalidPatch(e.to_string()))?,
        );
    }
    status.ok_or_else(|| StoreError::InvalidPatch("empty patch".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn list_runs_filters_by_namespace_and_selector() {
        let store = MemoryStore::new();
        store.insert_run(Run::new("ns", "a").with_label("app", "foo")).await;
        store.insert_run(Run::new("ns", "b").with_label("app", "bar")).await;
        store.insert_run(Run::new("other", "c").with_label("app", "foo")).await;

        let sel = Selector::everything().require("app", "foo");
        let runs = store.list_runs("ns", &sel).await.unwrap();

        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].name, "a");
    }

    #[tokio::test]
    async fn stale_update_is_rejected() {
        let store = MemoryStore::new();
        let stored = store.insert_run(Run::new("ns", "r1")).await;

        let fresh = store.update_run(&stored).await.unwrap();
        assert!(fresh.resource_version > stored.resource_version);

        let err = store.update_run(&stored).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict { .. }));
    }

    #[tokio::test]
    async fn transition_sets_spec_status() {
        let store = MemoryStore::new();
        store.insert_run(Run::new("ns", "r0")).await;

        let patch = br#"[{"op":"add","path":"/spec/status","value":"CancelledRunFinally"}]"#;
        store.apply_transition("ns", "r0", patch).await.unwrap();

        let run = store.run("ns", "r0").await.unwrap();
        assert_eq!(run.spec_status, SpecStatus::CancelledRunFinally);
    }

    #[tokio::test]
    async fn transition_on_missing_run_is_not_found() {
        let store = MemoryStore::recording();
        let patch = br#"[{"op":"add","path":"/spec/status","value":"Cancelled"}]"#;

        let err = store.apply_transition("ns", "gone", patch).await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(
            store.journal().await,
            vec![StoreOp::ApplyTransition {
                namespace: "ns".into(),
                name: "gone".into()
            }]
        );
    }

    #[tokio::test]
    async fn transition_rejects_other_paths() {
        let store = MemoryStore::new();
        store.insert_run(Run::new("ns", "r0")).await;

        let patch = br#"[{"op":"remove","path":"/metadata/labels","value":null}]"#;
        let err = store.apply_transition("ns", "r0", patch).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidPatch(_)));
    }

    #[tokio::test]
    async fn plain_store_keeps_no_journal() {
        let store = MemoryStore::new();
        store.insert_run(Run::new("ns", "r0")).await;

        for _ in 0..3 {
            store.get_run("ns", "r0").await.unwrap();
            store.list_policies("ns").await.unwrap();
        }
        assert!(store.journal().await.is_empty());
        assert!(store.inner.read().await.journal.is_none());
    }

    #[tokio::test]
    async fn recording_store_journals_in_call_order() {
        let store = MemoryStore::recording();
        store.insert_run(Run::new("ns", "r0")).await;

        store.get_run("ns", "r0").await.unwrap();
        store.list_policies("ns").await.unwrap();
        assert_eq!(
            store.journal().await,
            vec![
                StoreOp::GetRun {
                    namespace: "ns".into(),
                    name: "r0".into()
                },
                StoreOp::ListPolicies {
                    namespace: "ns".into()
                },
            ]
        );

        store.clear_journal().await;
        assert!(store.journal().await.is_empty());
    }
}
