use std::{collections::BTreeSet, path::Path};

use serde::Deserialize;
use tracing::info;

use ccx_core::MemoryStore;
use ccx_model::{ConcurrencyPolicy, Run};

use crate::error::AgentError;

/// Seed document for the in-memory store.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Fixture {
    pub policies: Vec<ConcurrencyPolicy>,
    pub runs: Vec<Run>,
}

impl Fixture {
    pub fn load(path: &Path) -> Result<Self, AgentError> {
        let raw = std::fs::read_to_string(path).map_err(|source| AgentError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let fixture: Self = serde_json::from_str(&raw).map_err(|source| AgentError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        fixture.validate().map_err(|reason| AgentError::InvalidFixture {
            path: path.to_path_buf(),
            reason,
        })?;
        Ok(fixture)
    }

    fn validate(&self) -> Result<(), String> {
        let mut seen = BTreeSet::new();
        for run in &self.runs {
            if !seen.insert((run.namespace.as_str(), run.name.as_str())) {
                return Err(format!("duplicate run {}", run.key()));
            }
        }
        let mut seen = BTreeSet::new();
        for policy in &self.policies {
            if !seen.insert((policy.namespace.as_str(), policy.name.as_str())) {
                return Err(format!(
                    "duplicate policy {}/{}",
                    policy.namespace, policy.name
                ));
            }
        }
        Ok(())
    }

    /// Insert everything into `store`, returning the stored pending runs, oldest first.
    pub async fn seed(self, store: &MemoryStore) -> Vec<Run> {
        info!(
            policies = self.policies.len(),
            runs = self.runs.len(),
            "seeding store"
        );
        for policy in self.policies {
            store.insert_policy(policy).await;
        }

        let mut pending = Vec::new();
        for run in self.runs {
            let stored = store.insert_run(run).await;
            if stored.is_pending() {
                pending.push(stored);
            }
        }
        pending.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        pending
    }
}
