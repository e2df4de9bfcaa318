use serde::{Deserialize, Serialize};

use crate::{
    Selector, Strategy,
    domain::Namespace,
    error::ModelResult,
};

/// Declared mutual-exclusion rule over the runs of one namespace.
///
/// - `selector` picks the runs the policy applies to (empty selects every run).
/// - `group_by` splits those runs into independent groups by label value:
///   only runs sharing the same value for every key conflict with each other.
/// - `strategy` says how conflicting runs are stopped.
///
/// `strategy` is kept as declared. Two policies agree on a run only when their
/// declared strategies are textually identical; the string is parsed into
/// [`Strategy`] only when a transition has to be chosen.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConcurrencyPolicy {
    /// Namespace the policy lives in.
    pub namespace: Namespace,
    /// Policy name.
    pub name: String,
    /// Runs the policy applies to.
    #[serde(default)]
    pub selector: Selector,
    /// Label keys partitioning matched runs into groups.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub group_by: Vec<String>,
    /// Declared strategy name.
    pub strategy: String,
}

impl ConcurrencyPolicy {
    /// Create a policy selecting every run of the namespace.
    pub fn new(
        namespace: impl Into<Namespace>,
        name: impl Into<String>,
        strategy: impl Into<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            selector: Selector::everything(),
            group_by: Vec::new(),
            strategy: strategy.into(),
        }
    }

    /// Builder-style selector setter.
    pub fn with_selector(mut self, selector: Selector) -> Self {
        self.selector = selector;
        self
    }

    /// Append a group-by key. Keys already present are ignored, keeping order stable.
    pub fn with_group_by(mut self, key: impl Into<String>) -> Self {
        let key = key.into();
        if !self.group_by.contains(&key) {
            self.group_by.push(key);
        }
        self
    }

    /// Parse the declared strategy.
    pub fn parsed_strategy(&self) -> ModelResult<Strategy> {
        self.strategy.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_by_keeps_first_occurrence_order() {
        let p = ConcurrencyPolicy::new("ns", "p1", "Cancel")
            .with_group_by("team")
            .with_group_by("env")
            .with_group_by("team");

        assert_eq!(p.group_by, vec!["team".to_string(), "env".to_string()]);
    }

    #[test]
    fn deserializes_with_defaults() {
        let json = r#"{"namespace":"ns","name":"p1","strategy":"GracefullyStop"}"#;
        let p: ConcurrencyPolicy = serde_json::from_str(json).unwrap();

        assert!(p.selector.is_empty());
        assert!(p.group_by.is_empty());
        assert_eq!(p.parsed_strategy().unwrap(), Strategy::GracefullyStop);
    }

    #[test]
    fn unknown_strategy_surfaces_on_parse_only() {
        let p = ConcurrencyPolicy::new("ns", "p1", "Replace");
        assert!(p.parsed_strategy().is_err());
    }
}
