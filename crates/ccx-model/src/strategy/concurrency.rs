use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::{
    SpecStatus,
    error::{ModelError, ModelResult},
};

/// Defines what happens to the other runs of a concurrency group when a new run is admitted.
///
/// Strategies:
/// - `Cancel`: Stop conflicting runs immediately, skipping any finalization.
/// - `GracefullyCancel`: Cancel conflicting runs but let their finalization steps run.
/// - `GracefullyStop`: Start no new work in conflicting runs, wait for what is running,
///   then run finalization steps.
///
/// Each strategy maps onto exactly one [`SpecStatus`] written to every conflicting run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Strategy {
    /// Immediate cancellation.
    Cancel,
    /// Cancellation with finalization.
    GracefullyCancel,
    /// Stop scheduling new work, then finalize.
    GracefullyStop,
}

impl Strategy {
    /// All strategies, in declaration order.
    pub const ALL: [Strategy; 3] = [
        Strategy::Cancel,
        Strategy::GracefullyCancel,
        Strategy::GracefullyStop,
    ];

    /// Canonical name as declared on a policy.
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Cancel => "Cancel",
            Strategy::GracefullyCancel => "GracefullyCancel",
            Strategy::GracefullyStop => "GracefullyStop",
        }
    }

    /// Status a conflicting run is moved to under this strategy.
    pub fn target_status(&self) -> SpecStatus {
        match self {
            Strategy::Cancel => SpecStatus::Cancelled,
            Strategy::GracefullyCancel => SpecStatus::CancelledRunFinally,
            Strategy::GracefullyStop => SpecStatus::StoppedRunFinally,
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = ModelError;
    fn from_str(s: &str) -> ModelResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cancel" => Ok(Strategy::Cancel),
            "gracefullycancel" | "gracefully-cancel" => Ok(Strategy::GracefullyCancel),
            "gracefullystop" | "gracefully-stop" => Ok(Strategy::GracefullyStop),
            _ => Err(ModelError::UnknownStrategy(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_declared_and_kebab_names() {
        assert_eq!("Cancel".parse::<Strategy>().unwrap(), Strategy::Cancel);
        assert_eq!(
            "GracefullyCancel".parse::<Strategy>().unwrap(),
            Strategy::GracefullyCancel
        );
        assert_eq!(
            " gracefully-stop ".parse::<Strategy>().unwrap(),
            Strategy::GracefullyStop
        );
    }

    #[test]
    fn rejects_unknown_strategy() {
        for bad in ["", "stop", "Replace", "gracefully_cancel"] {
            let err = bad.parse::<Strategy>().unwrap_err();
            assert!(matches!(err, ModelError::UnknownStrategy(_)), "{bad:?}");
        }
    }

    #[test]
    fn display_roundtrips_through_from_str() {
        for s in Strategy::ALL {
            assert_eq!(s.to_string().parse::<Strategy>().unwrap(), s);
        }
    }

    #[test]
    fn each_strategy_has_a_distinct_target_status() {
        assert_eq!(Strategy::Cancel.target_status(), SpecStatus::Cancelled);
        assert_eq!(
            Strategy::GracefullyCancel.target_status(),
            SpecStatus::CancelledRunFinally
        );
        assert_eq!(
            Strategy::GracefullyStop.target_status(),
            SpecStatus::StoppedRunFinally
        );
    }
}
