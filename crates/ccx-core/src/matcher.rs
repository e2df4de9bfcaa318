//! Policy-to-run matching.
//!
//! Only equality selectors are supported; set-based match expressions are not.
use ccx_model::{ConcurrencyPolicy, Run};

/// How a policy relates to a run, given the run's labels right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Every selector pair is present on the run.
    Matching,
    /// Every selector key is present but some value differs. Final.
    NonMatching,
    /// Some selector key is absent. The label may still be added by another
    /// controller, so the policy could match later.
    Undetermined,
}

/// Returns `true` if the run is selected by the policy's selector.
/// An empty selector always matches.
pub fn matches(run: &Run, policy: &ConcurrencyPolicy) -> bool {
    policy.selector.matches(&run.labels)
}

/// Classify a policy against a run.
pub fn classify(run: &Run, policy: &ConcurrencyPolicy) -> Classification {
    if matches(run, policy) {
        Classification::Matching
    } else if policy.selector.keys_present(&run.labels) {
        Classification::NonMatching
    } else {
        Classification::Undetermined
    }
}
