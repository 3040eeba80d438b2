//! Configuration schema definitions.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct YiriConfig {
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Individual bot configurations.
    #[serde(default)]
    pub bots: Vec<BotConfig>,
}

impl YiriConfig {
    /// Returns only the enabled bots.
    pub fn enabled_bots(&self) -> impl Iterator<Item = &BotConfig> {
        self.bots.iter().filter(|b| b.enabled)
    }
}

// =============================================================================
// Logging
// =============================================================================

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Global log level.
    pub level: LogLevel,

    /// Output format.
    pub format: LogFormat,

    /// Output destination.
    pub output: LogOutput,

    /// Log file, required when `output` is `file`.
    pub file_path: Option<PathBuf>,

    /// How often the log file is rolled over.
    pub rotation: LogRotation,

    /// Include thread ids in every line.
    pub thread_ids: bool,

    /// Include source file and line in every line.
    pub file_location: bool,

    /// Per-target levels, e.g. `yiri_adapter_mirai: debug`.
    pub filters: HashMap<String, LogLevel>,

    /// Which span lifecycle events are logged.
    pub span_events: SpanEventConfig,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Compact,
            output: LogOutput::Stdout,
            file_path: None,
            rotation: LogRotation::Never,
            thread_ids: false,
            file_location: false,
            filters: HashMap::new(),
            span_events: SpanEventConfig::default(),
        }
    }
}

/// Log verbosity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Returns the level as a filter directive.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    /// Converts to a `tracing::Level`.
    pub fn to_tracing_level(self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Log line format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Full,
    Pretty,
    /// Newline-delimited JSON. Needs the `json-log` feature.
    Json,
}

/// Log destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[default]
    Stdout,
    Stderr,
    File,
}

/// Log file rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    #[default]
    Never,
    Hourly,
    Daily,
}

/// Span lifecycle events to log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SpanEventConfig {
    pub new: bool,
    pub enter: bool,
    pub exit: bool,
    pub close: bool,
}

// =============================================================================
// Bots
// =============================================================================

/// Individual bot configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BotConfig {
    /// Unique identifier for this bot instance.
    pub id: String,

    /// Account number to log in as.
    pub qq: i64,

    /// Adapter name (default: "mirai-http").
    #[serde(default = "default_adapter")]
    pub adapter: String,

    /// Whether this bot is started by the runtime.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Adapter-specific settings, passed to the adapter untouched.
    #[serde(default)]
    pub settings: Value,
}

impl BotConfig {
    /// Creates an enabled bot entry with empty settings.
    pub fn new(id: impl Into<String>, qq: i64, adapter: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            qq,
            adapter: adapter.into(),
            enabled: true,
            settings: Value::Null,
        }
    }
}

fn default_adapter() -> String {
    "mirai-http".to_string()
}

fn default_enabled() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_yaml() {
        let yaml = r#"
logging:
  level: debug
  format: pretty
  filters:
    yiri_adapter_mirai: trace
bots:
  - id: main
    qq: 12345678
    settings:
      verify_key: secret
      port: 8080
  - id: spare
    qq: 87654321
    adapter: mirai-http
    enabled: false
"#;
        let config: YiriConfig = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.logging.level, LogLevel::Debug);
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert_eq!(config.logging.output, LogOutput::Stdout);
        assert_eq!(
            config.logging.filters.get("yiri_adapter_mirai"),
            Some(&LogLevel::Trace)
        );

        assert_eq!(config.bots.len(), 2);
        assert_eq!(config.bots[0].adapter, "mirai-http");
        assert_eq!(config.bots[0].settings["verify_key"], "secret");
        assert!(config.bots[1].settings.is_null());

        let enabled: Vec<_> = config.enabled_bots().map(|b| b.id.as_str()).collect();
        assert_eq!(enabled, vec!["main"]);
    }

    #[test]
    fn test_log_level() {
        assert_eq!(LogLevel::Warn.as_str(), "warn");
        assert_eq!(LogLevel::Error.to_tracing_level(), tracing::Level::ERROR);
        assert_eq!(LogLevel::default().to_string(), "info");
    }
}
