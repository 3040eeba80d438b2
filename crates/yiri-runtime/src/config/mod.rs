//! Configuration for the Yiri runtime.
//!
//! Configuration is layered from defaults, TOML/YAML files and `YIRI_*`
//! environment variables by [`ConfigLoader`], then validated before use.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, Profile, load_config, load_config_from_file};
pub use schema::{
    BotConfig, LogFormat, LogLevel, LogOutput, LogRotation, LoggingConfig, SpanEventConfig,
    YiriConfig,
};
pub use validation::validate_config;
