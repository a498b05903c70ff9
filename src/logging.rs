//! Structured logging via `tracing`.
//!
//! Level precedence, highest first: the `ROWFS_LOG` environment filter, the level given
//! on the command line, the `logging` section of the configuration document, `info`.
//! Output always goes to stderr so it never mixes with `--list` output on stdout.

use serde::{Deserialize, Serialize};
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::{EnvFilter, Registry, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::errors::RowFsError;

pub const LOG_ENV: &str = "ROWFS_LOG";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Whether logging is enabled (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// trace, debug, info, warn, error, off
    #[serde(default = "default_log_level")]
    pub level: String,

    /// json or text
    #[serde(default = "default_format")]
    pub format: String,

    /// Colored text output
    #[serde(default = "default_true")]
    pub color: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_format() -> String {
    "text".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            level: default_log_level(),
            format: default_format(),
            color: default_true(),
        }
    }
}

pub fn init_logging(
    config: &LoggingConfig,
    level_override: Option<&str>,
) -> Result<(), RowFsError> {
    if !config.enabled {
        return Registry::default()
            .with(EnvFilter::new("off"))
            .with(fmt::layer().with_writer(std::io::sink))
            .try_init()
            .map_err(|e| RowFsError::config(format!("cannot install logger: {e}")));
    }

    let filter = build_env_filter(level_override.unwrap_or(&config.level))?;
    let base = Registry::default().with(filter);
    let installed = match parse_format(&config.format)? {
        LogFormat::Json => base
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_writer(std::io::stderr),
            )
            .try_init(),
        LogFormat::Text => base
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_ansi(config.color)
                    .with_writer(std::io::stderr),
            )
            .try_init(),
    };
    installed.map_err(|e| RowFsError::config(format!("cannot install logger: {e}")))
}

fn build_env_filter(level: &str) -> Result<EnvFilter, RowFsError> {
    if let Ok(filter) = EnvFilter::try_from_env(LOG_ENV) {
        return Ok(filter);
    }
    EnvFilter::try_new(level)
        .map_err(|e| RowFsError::config(format!("invalid log level {level:?}: {e}")))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LogFormat {
    Json,
    Text,
}

fn parse_format(format: &str) -> Result<LogFormat, RowFsError> {
    match format {
        "json" => Ok(LogFormat::Json),
        "text" => Ok(LogFormat::Text),
        other => Err(RowFsError::config(format!(
            "invalid log format: {other} (must be 'json' or 'text')"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_logging_config() {
        let config = LoggingConfig::default();
        assert!(config.enabled);
        assert_eq!(config.level, "info");
        assert_eq!(config.format, "text");
        assert!(config.color);
    }

    #[test]
    fn test_parse_format() {
        assert_eq!(parse_format("json").unwrap(), LogFormat::Json);
        assert_eq!(parse_format("text").unwrap(), LogFormat::Text);
        assert!(parse_format("yaml").is_err());
    }

    #[test]
    fn test_partial_section_keeps_defaults() {
        let config: LoggingConfig = serde_json::from_str(r#"{"level": "debug"}"#).unwrap();
        assert_eq!(config.level, "debug");
        assert_eq!(config.format, "text");
        assert!(config.enabled);
    }
}
