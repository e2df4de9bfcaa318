use std::fmt;

use ccx_model::RunName;

use crate::metrics::ReconcileOutcome;

/// Why a pass did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The run's namespace is outside the configured allowlist.
    NamespaceNotAllowed,
    /// The run is not held in `Pending`.
    NotPending,
    /// The run already carries the idempotency marker.
    AlreadyApplied,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::NamespaceNotAllowed => "namespace_not_allowed",
            SkipReason::NotPending => "not_pending",
            SkipReason::AlreadyApplied => "already_applied",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a successful reconcile pass did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Nothing was read or written.
    Skipped(SkipReason),
    /// No policy matched but some may once the run gains labels; the run was left unmarked.
    Deferred,
    /// Conflicting runs were transitioned and the run was marked.
    Admitted {
        /// Runs the effective strategy was applied to, sorted by name.
        cancelled: Vec<RunName>,
        /// `true` if the admission hold was lifted.
        released: bool,
    },
}

impl Outcome {
    /// Metrics classification of this outcome.
    pub fn metric(&self) -> ReconcileOutcome {
        match self {
            Outcome::Skipped(_) => ReconcileOutcome::Skipped,
            Outcome::Deferred => ReconcileOutcome::Deferred,
            Outcome::Admitted { .. } => ReconcileOutcome::Admitted,
        }
    }
}
