use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("{kind} {namespace}/{name} not found")]
    NotFound {
        kind: &'static str,
        namespace: String,
        name: String,
    },

    #[error("conflict updating {namespace}/{name}: {reason}")]
    Conflict {
        namespace: String,
        name: String,
        reason: String,
    },

    #[error("invalid patch: {0}")]
    InvalidPatch(String),

    #[error("store backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Shortcut for a missing run.
    pub fn run_not_found(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        StoreError::NotFound {
            kind: "run",
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Returns `true` if the target object does not exist (any more).
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}
