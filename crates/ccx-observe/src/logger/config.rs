use serde::{Deserialize, Serialize};
use std::io::IsTerminal;

use crate::logger::{LoggerError, LoggerFormat, LoggerLevel};

/// Environment variable overriding [`LoggerConfig::level`].
pub const ENV_LOG: &str = "CCX_LOG";
/// Environment variable overriding [`LoggerConfig::format`].
pub const ENV_LOG_FORMAT: &str = "CCX_LOG_FORMAT";

/// Logger configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    /// Output format.
    pub format: LoggerFormat,
    /// Filter expression (e.g., "info", "ccx_core=debug,info").
    pub level: LoggerLevel,
    /// Whether to include module/target names in log output.
    pub with_targets: bool,
    /// Whether to use colored output.
    pub use_color: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            format: LoggerFormat::default(),
            level: LoggerLevel::default(),
            with_targets: true,
            use_color: true,
        }
    }
}

impl LoggerConfig {
    /// Defaults overridden by `CCX_LOG` / `CCX_LOG_FORMAT`.
    pub fn from_env() -> Result<Self, LoggerError> {
        Self::default().with_env()
    }

    /// Apply `CCX_LOG` / `CCX_LOG_FORMAT` on top of `self`.
    pub fn with_env(self) -> Result<Self, LoggerError> {
        self.with_vars(|key| std::env::var(key).ok())
    }

    fn with_vars(mut self, var: impl Fn(&str) -> Option<String>) -> Result<Self, LoggerError> {
        if let Some(level) = var(ENV_LOG).filter(|v| !v.trim().is_empty()) {
            self.level = level.parse()?;
        }
        if let Some(format) = var(ENV_LOG_FORMAT).filter(|v| !v.trim().is_empty()) {
            self.format = format.parse()?;
        }
        Ok(self)
    }

    /// Color only when enabled and stdout is a terminal.
    pub fn should_use_color(&self) -> bool {
        self.use_color && std::io::stdout().is_terminal()
    }
}
