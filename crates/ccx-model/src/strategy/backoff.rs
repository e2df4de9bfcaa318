use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Exponential backoff used when a reconcile pass fails with a retryable error.
///
/// The delay before attempt `n` (1-based) is `first_ms * factor^(n-1)`, capped at `max_ms`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BackoffStrategy {
    /// Delay before the first retry.
    pub first_ms: u64,
    /// Upper bound for any single delay.
    pub max_ms: u64,
    /// Multiplier applied after each failed attempt.
    pub factor: f64,
    /// Give up after this many attempts. `0` retries forever.
    pub max_attempts: u32,
}

impl BackoffStrategy {
    /// Delay to wait before retry number `attempt` (1-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let factor = if self.factor.is_finite() && self.factor >= 1.0 {
            self.factor
        } else {
            1.0
        };

        let raw = self.first_ms as f64 * factor.powi(exp);
        let capped = raw.min(self.max_ms as f64).max(0.0);
        Duration::from_millis(capped as u64)
    }

    /// Returns `true` if another attempt is allowed after `attempt` failures.
    pub fn allows(&self, attempt: u32) -> bool {
        self.max_attempts == 0 || attempt < self.max_attempts
    }
}

impl Default for BackoffStrategy {
    fn default() -> Self {
        Self {
            first_ms: 500,
            max_ms: 30_000,
            factor: 2.0,
            max_attempts: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_grows_and_is_capped() {
        let b = BackoffStrategy {
            first_ms: 100,
            max_ms: 1_000,
            factor: 2.0,
            max_attempts: 0,
        };

        assert_eq!(b.delay(1), Duration::from_millis(100));
        assert_eq!(b.delay(2), Duration::from_millis(200));
        assert_eq!(b.delay(4), Duration::from_millis(800));
        assert_eq!(b.delay(5), Duration::from_millis(1_000));
        assert_eq!(b.delay(60), Duration::from_millis(1_000));
    }

    #[test]
    fn factor_below_one_is_treated_as_constant() {
        let b = BackoffStrategy {
            first_ms: 250,
            max_ms: 10_000,
            factor: 0.5,
            max_attempts: 0,
        };
        assert_eq!(b.delay(3), Duration::from_millis(250));
    }

    #[test]
    fn max_attempts_bounds_retries() {
        let unbounded = BackoffStrategy::default();
        assert!(unbounded.allows(10_000));

        let bounded = BackoffStrategy {
            max_attempts: 3,
            ..Default::default()
        };
        assert!(bounded.allows(2));
        assert!(!bounded.allows(3));
    }

    #[test]
    fn serde_fills_missing_fields_with_defaults() {
        let b: BackoffStrategy = serde_json::from_str(r#"{"firstMs": 10}"#).unwrap();
        assert_eq!(b.first_ms, 10);
        assert_eq!(b.max_ms, BackoffStrategy::default().max_ms);
        assert_eq!(b.factor, 2.0);
    }
}
