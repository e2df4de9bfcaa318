use std::{collections::BTreeSet, str::FromStr};

use serde::{Deserialize, Serialize};

/// Process-wide settings for the reconciler.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GateConfig {
    /// Namespaces concurrency controls apply to. Empty means every namespace.
    pub allowed_namespaces: BTreeSet<String>,
}

impl GateConfig {
    /// Returns `true` if runs of `namespace` are subject to concurrency controls.
    pub fn allows(&self, namespace: &str) -> bool {
        self.allowed_namespaces.is_empty() || self.allowed_namespaces.contains(namespace)
    }
}

/// Parses a comma-separated namespace list, e.g. `"ci, release"`.
impl FromStr for GateConfig {
    type Err = std::convert::Infallible;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self {
            allowed_namespaces: s
                .split(',')
                .map(str::trim)
                .filter(|ns| !ns.is_empty())
                .map(String::from)
                .collect(),
        })
    }
}
