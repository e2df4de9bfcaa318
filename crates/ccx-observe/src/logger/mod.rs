mod config;
mod error;
mod format;
mod init;
mod level;
mod timer;

pub use config::{ENV_LOG, ENV_LOG_FORMAT, LoggerConfig};
pub use error::{LoggerError, LoggerResult};
pub use format::LoggerFormat;
pub use level::LoggerLevel;
pub use timer::UtcRfc3339;

/// Install the global tracing subscriber described by `cfg`.
///
/// Fails with [`LoggerError::AlreadyInitialized`] if a global subscriber is already set.
///
/// # Examples
/// ```rust
/// use ccx_observe::{LoggerConfig, init_logger};
///
/// let config = LoggerConfig::from_env().unwrap_or_default();
/// init_logger(&config).expect("failed to initialize logger");
///
/// tracing::info!("logger initialized");
/// ```
pub fn init_logger(cfg: &LoggerConfig) -> LoggerResult<()> {
    match cfg.format {
        LoggerFormat::Text => init::logger_text(cfg),
        LoggerFormat::Json => init::logger_json(cfg),
        LoggerFormat::Journald => init::logger_journald(cfg),
    }
}
