use std::{collections::BTreeMap, fmt};

use serde::{Deserialize, Serialize};

use crate::Labels;

/// Equality-based label selector.
///
/// A selector is a set of required `key=value` pairs. A label set satisfies the
/// selector when every pair is present with exactly the same value.
/// The empty selector is satisfied by every label set.
///
/// Set-based expressions (`in`, `notin`, `exists`) are not supported.
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Selector(BTreeMap<String, String>);

impl Selector {
    /// Selector matching everything.
    pub fn everything() -> Self {
        Self(BTreeMap::new())
    }

    /// Returns `true` if the selector has no requirements.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Add (or replace) the requirement `key=value`.
    pub fn require<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Required value for `key`, if the selector constrains it.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(|s| s.as_str())
    }

    /// Label keys constrained by this selector.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(|k| k.as_str())
    }

    /// Iterate requirements as `(key, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Returns `true` if `labels` carry every required pair.
    pub fn matches(&self, labels: &Labels) -> bool {
        self.iter().all(|(k, v)| labels.get(k) == Some(v))
    }

    /// Returns `true` if `labels` carry every constrained key, regardless of value.
    pub fn keys_present(&self, labels: &Labels) -> bool {
        self.keys().all(|k| labels.contains_key(k))
    }
}

impl<K, V> FromIterator<(K, V)> for Selector
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Renders as `k1=v1,k2=v2`, keys in lexical order.
impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (k, v) in self.iter() {
            if !first {
                f.write_str(",")?;
            }
            write!(f, "{k}={v}")?;
            first = false;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(pairs: &[(&str, &str)]) -> Labels {
        pairs.iter().copied().collect()
    }

    #[test]
    fn empty_selector_matches_any_labels() {
        let sel = Selector::everything();
        assert!(sel.matches(&Labels::new()));
        assert!(sel.matches(&labels(&[("app", "foo")])));
    }

    #[test]
    fn matches_requires_every_pair() {
        let sel = Selector::everything()
            .require("app", "foo")
            .require("env", "prod");

        assert!(sel.matches(&labels(&[("app", "foo"), ("env", "prod"), ("x", "y")])));
        assert!(!sel.matches(&labels(&[("app", "foo")])));
        assert!(!sel.matches(&labels(&[("app", "foo"), ("env", "dev")])));
    }

    #[test]
    fn keys_present_ignores_values() {
        let sel = Selector::everything().require("app", "foo");
        assert!(sel.keys_present(&labels(&[("app", "bar")])));
        assert!(!sel.keys_present(&labels(&[("team", "a")])));
    }

    #[test]
    fn display_orders_keys() {
        let sel = Selector::everything()
            .require("env", "prod")
            .require("app", "foo");
        assert_eq!(sel.to_string(), "app=foo,env=prod");
        assert_eq!(Selector::everything().to_string(), "");
    }
}
