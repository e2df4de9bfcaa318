use std::path::PathBuf;

use thiserror::Error;

use ccx_core::GateError;
use ccx_observe::LoggerError;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("fixture {path} is invalid: {reason}")]
    InvalidFixture { path: PathBuf, reason: String },

    #[error(transparent)]
    Logger(#[from] LoggerError),

    #[error(transparent)]
    Gate(#[from] GateError),

    #[error("metrics: {0}")]
    Metrics(String),
}
