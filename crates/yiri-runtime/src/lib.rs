//! Yiri Runtime - orchestration layer of the Yiri bot SDK.
//!
//! This crate provides:
//! - Layered configuration from TOML/YAML files and `YIRI_*` variables ([`ConfigLoader`])
//! - Logging setup on top of `tracing-subscriber` ([`LoggingBuilder`])
//! - Bot lifecycle management ([`BotRegistry`])
//! - The runtime tying bots to one shared event bus ([`YiriRuntime`])
//!
//! ```ignore
//! use std::sync::Arc;
//! use yiri_adapter_mirai::{ADAPTER_NAME, MiraiBot};
//! use yiri_runtime::YiriRuntime;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let runtime = YiriRuntime::new();
//!     runtime.register_factory(ADAPTER_NAME, |bot, bus| {
//!         Ok(Arc::new(MiraiBot::from_settings(&bot.id, bot.qq, &bot.settings, bus)?))
//!     });
//!
//!     // Run until Ctrl+C
//!     runtime.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! A minimal `yiri.toml`:
//!
//! ```toml
//! [logging]
//! level = "debug"
//!
//! [[bots]]
//! id = "main"
//! qq = 10001
//! adapter = "mirai-http"
//! settings = { verify_key = "INITKEY", port = 8080 }
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod registry;
pub mod runtime;

// Re-exports
pub use config::{
    BotConfig, ConfigError, ConfigLoader, ConfigResult, LoggingConfig, YiriConfig, load_config,
    load_config_from_file,
};
pub use error::{RuntimeError, RuntimeResult};
pub use logging::{LoggingBuilder, SpanEvents};
pub use registry::{BotRegistry, RegistryStats};
pub use runtime::{BotFactory, RuntimeBuilder, RuntimeStats, YiriRuntime};

// Re-export tracing for use by other crates
pub use tracing;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use tracing::{Level, debug, error, info, instrument, span, trace, warn};
}
