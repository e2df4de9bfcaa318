use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use ccx_core::GateConfig;
use ccx_model::BackoffStrategy;
use ccx_observe::LoggerConfig;

use crate::error::AgentError;

/// Agent settings, read from a JSON file. Every section is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AgentConfig {
    pub logger: LoggerConfig,
    pub gate: GateConfig,
    /// Backoff between attempts of a pass that failed with a transient error.
    pub retry: BackoffStrategy,
    /// Policies and runs to seed the in-memory store with.
    pub fixture: Option<PathBuf>,
}

impl AgentConfig {
    /// Load from `path`, or defaults when no path is given.
    /// Logger settings are then overridden from the environment.
    pub fn load(path: Option<&Path>) -> Result<Self, AgentError> {
        let cfg = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        Ok(Self {
            logger: cfg.logger.clone().with_env()?,
            ..cfg
        })
    }

    fn from_file(path: &Path) -> Result<Self, AgentError> {
        let raw = std::fs::read_to_string(path).map_err(|source| AgentError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut cfg: Self = serde_json::from_str(&raw).map_err(|source| AgentError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        // Relative fixture paths are resolved against the config file.
        if let (Some(fixture), Some(dir)) = (cfg.fixture.as_mut(), path.parent())
            && fixture.is_relative()
        {
            *fixture = dir.join(&*fixture);
        }
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ccx_observe::LoggerFormat;

    #[test]
    fn empty_document_is_default() {
        let cfg: AgentConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg, AgentConfig::default());
        assert!(cfg.gate.allows("any"));
    }

    #[test]
    fn sections_are_camel_case() {
        let cfg: AgentConfig = serde_json::from_str(
            r#"{
                "logger": { "format": "json", "level": "ccx_core=debug,info" },
                "gate": { "allowedNamespaces": ["ci"] },
                "retry": { "firstMs": 10, "maxMs": 100, "factor": 3.0, "maxAttempts": 4 },
                "fixture": "fixtures/sample.json"
            }"#,
        )
        .unwrap();

        assert_eq!(cfg.logger.format, LoggerFormat::Json);
        assert!(!cfg.gate.allows("dev"));
        assert_eq!(cfg.retry.max_attempts, 4);
        assert_eq!(cfg.fixture, Some(PathBuf::from("fixtures/sample.json")));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let err = AgentConfig::from_file(Path::new("/nonexistent/ccx.json")).unwrap_err();
        assert!(matches!(err, AgentError::Read { .. }));
    }

    #[test]
    fn fixture_is_resolved_next_to_config() {
        let dir = std::env::temp_dir().join(format!("ccx-agentd-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("agent.json");
        std::fs::write(&path, r#"{"fixture": "seed.json"}"#).unwrap();

        let cfg = AgentConfig::from_file(&path).unwrap();
        assert_eq!(cfg.fixture, Some(dir.join("seed.json")));

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
