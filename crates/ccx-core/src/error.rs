use thiserror::Error;

use ccx_model::{ModelError, Strategy};

use crate::store::StoreError;

/// Errors produced by a reconcile pass.
///
/// Errors are split into two classes (see [`GateError::is_permanent`]):
/// - permanent: a policy misconfiguration; retrying the same pass cannot fix it;
/// - transient: store failures; the caller is expected to retry with backoff.
#[derive(Debug, Error)]
pub enum GateError {
    #[error(
        "found multiple concurrency strategies for run {run}: {first} (policy {first_policy}) and {second} (policy {second_policy}); skipping concurrency controls"
    )]
    StrategyConflict {
        run: String,
        first_policy: String,
        first: String,
        second_policy: String,
        second: String,
    },

    #[error("run {run} missing label {key} required by groupBy of policy {policy}")]
    MissingGroupLabel {
        run: String,
        policy: String,
        key: String,
    },

    #[error("policy {policy} declares an unsupported strategy: {source}")]
    InvalidStrategy {
        policy: String,
        #[source]
        source: ModelError,
    },

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("error canceling run {namespace}/{name} using strategy {strategy}: {source}")]
    Cancel {
        namespace: String,
        name: String,
        strategy: Strategy,
        #[source]
        source: StoreError,
    },

    #[error("failed to build transition payload: {0}")]
    Payload(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl GateError {
    /// Returns `true` if retrying the pass cannot succeed without a policy or label change.
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            GateError::StrategyConflict { .. }
                | GateError::MissingGroupLabel { .. }
                | GateError::InvalidStrategy { .. }
        )
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            GateError::StrategyConflict { .. } => "strategy_conflict",
            GateError::MissingGroupLabel { .. } => "missing_group_label",
            GateError::InvalidStrategy { .. } => "invalid_strategy",
            GateError::Store(_) => "store",
            GateError::Cancel { .. } => "cancel",
            GateError::Payload(_) => "payload",
            GateError::Internal(_) => "internal",
        }
    }
}
