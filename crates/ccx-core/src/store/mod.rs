//! Capabilities the reconciler consumes to read policies and runs and to write them back.
//!
//! Implementations wrap the real object store (API server, database, ...).
//! They must report a missing object as [`StoreError::NotFound`] so callers can tell
//! "already gone" apart from real failures, and must reject stale updates with
//! [`StoreError::Conflict`].
mod error;
pub use error::StoreError;

mod memory;
pub use memory::{MemoryStore, StoreOp};

use async_trait::async_trait;
use ccx_model::{ConcurrencyPolicy, Run, Selector};

/// Read access to concurrency policies.
#[async_trait]
pub trait PolicyStore: Send + Sync + 'static {
    /// List every policy declared in `namespace`.
    async fn list_policies(&self, namespace: &str) -> Result<Vec<ConcurrencyPolicy>, StoreError>;
}

/// Read and write access to runs.
#[async_trait]
pub trait RunStore: Send + Sync + 'static {
    /// List runs of `namespace` whose labels satisfy `selector`.
    async fn list_runs(&self, namespace: &str, selector: &Selector)
    -> Result<Vec<Run>, StoreError>;

    /// Fetch the current version of a run.
    async fn get_run(&self, namespace: &str, name: &str) -> Result<Run, StoreError>;

    /// Replace a run. Fails with [`StoreError::Conflict`] if `run.resource_version` is stale.
    async fn update_run(&self, run: &Run) -> Result<Run, StoreError>;

    /// Apply a JSON patch document to a run.
    async fn apply_transition(
        &self,
        namespace: &str,
        name: &str,
        patch: &[u8],
    ) -> Result<(), StoreError>;
}
