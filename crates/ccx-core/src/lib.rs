pub mod cancel;
pub mod config;
pub mod error;
pub mod group;
pub mod matcher;
pub mod metrics;
pub mod reconciler;
pub mod resolver;
pub mod store;

pub use cancel::{CancelExecutor, PatchOperation, TransitionPayload, TransitionPayloads};
pub use config::GateConfig;
pub use error::GateError;
pub use group::group_selector;
pub use matcher::{Classification, classify, matches};
pub use metrics::{
    CancelOutcome, MetricsBackend, MetricsHandle, NoOpMetrics, ReconcileOutcome, noop_metrics,
};
pub use reconciler::{Outcome, Reconciler, SkipReason};
pub use resolver::{Resolution, resolve};
pub use store::{MemoryStore, PolicyStore, RunStore, StoreError, StoreOp};
