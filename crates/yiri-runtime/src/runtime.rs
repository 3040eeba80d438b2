//! Runtime orchestration.
//!
//! The runtime turns each enabled `bots` entry of the configuration into a
//! running bot. Protocol crates plug in through bot factories keyed by adapter
//! name, so the runtime itself never depends on a protocol.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use yiri_adapter_mirai::{ADAPTER_NAME, MiraiBot};
//! use yiri_runtime::YiriRuntime;
//!
//! // Auto-loads yiri.toml / yiri.yaml from the current directory
//! let runtime = YiriRuntime::new();
//!
//! runtime.register_factory(ADAPTER_NAME, |bot, bus| {
//!     Ok(Arc::new(MiraiBot::from_settings(&bot.id, bot.qq, &bot.settings, bus)?))
//! });
//!
//! runtime.run().await?;
//! ```

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;
use tokio::signal;
use tracing::{debug, info, warn};
use yiri_core::{AdapterResult, BoxedBot, EventBus};

use crate::config::{BotConfig, ConfigLoader, ConfigResult, YiriConfig};
use crate::error::{RuntimeError, RuntimeResult};
use crate::logging;
use crate::registry::{BotRegistry, RegistryStats};

/// Builds a bot from its configuration entry.
pub type BotFactory =
    Arc<dyn Fn(&BotConfig, Arc<EventBus>) -> AdapterResult<BoxedBot> + Send + Sync>;

/// The Yiri runtime: one event bus shared by every configured bot.
///
/// ```rust,ignore
/// // Load from a specific file
/// let runtime = YiriRuntime::builder()
///     .config_file("config/production.toml")
///     .profile("production")
///     .build()?;
///
/// runtime.bus().on::<GroupMessage>(0, |event| async move { /* ... */ });
/// runtime.run().await?;
/// ```
pub struct YiriRuntime {
    config: YiriConfig,
    bus: Arc<EventBus>,
    registry: BotRegistry,
    factories: RwLock<HashMap<String, BotFactory>>,
    running: AtomicBool,
}

impl YiriRuntime {
    /// Creates a new runtime with automatic configuration loading.
    ///
    /// If no configuration can be loaded, default settings are used.
    pub fn new() -> Self {
        let config = ConfigLoader::new()
            .with_current_dir()
            .load()
            .unwrap_or_else(|e| {
                eprintln!("Warning: Failed to load config ({e}), using defaults");
                YiriConfig::default()
            });

        Self::from_config(&config)
    }

    /// Creates a runtime builder for custom configuration.
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Creates a runtime from configuration and installs logging.
    pub fn from_config(config: &YiriConfig) -> Self {
        logging::init_from_config(&config.logging);

        info!(
            log_level = %config.logging.level,
            log_format = ?config.logging.format,
            bots = config.bots.len(),
            "Runtime initialized from configuration"
        );

        Self {
            config: config.clone(),
            bus: Arc::new(EventBus::new()),
            registry: BotRegistry::new(),
            factories: RwLock::new(HashMap::new()),
            running: AtomicBool::new(false),
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &YiriConfig {
        &self.config
    }

    /// Returns the event bus shared by all bots.
    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    /// Returns the bot registry.
    pub fn registry(&self) -> &BotRegistry {
        &self.registry
    }

    /// Returns whether the runtime is currently running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    // =========================================================================
    // Bot Management
    // =========================================================================

    /// Registers the factory used for bots whose `adapter` is `adapter`.
    ///
    /// A later registration for the same name replaces the earlier one.
    pub fn register_factory<F>(&self, adapter: impl Into<String>, factory: F)
    where
        F: Fn(&BotConfig, Arc<EventBus>) -> AdapterResult<BoxedBot> + Send + Sync + 'static,
    {
        let adapter = adapter.into();
        debug!(adapter = %adapter, "Registered bot factory");
        self.factories.write().insert(adapter, Arc::new(factory));
    }

    /// Adds a bot built outside the configuration.
    ///
    /// It is started with the others, or right away if the runtime is running.
    pub async fn register_bot(&self, bot: BoxedBot) -> RuntimeResult<()> {
        self.registry.register(bot.clone()).await?;
        if self.is_running() {
            bot.start().await?;
        }
        Ok(())
    }

    fn create_bot(&self, config: &BotConfig) -> RuntimeResult<BoxedBot> {
        let factory = self
            .factories
            .read()
            .get(&config.adapter)
            .cloned()
            .ok_or_else(|| RuntimeError::UnknownAdapter(config.adapter.clone()))?;

        Ok(factory(config, Arc::clone(&self.bus))?)
    }

    /// Creates every enabled bot of the configuration that is not registered
    /// yet.
    pub async fn init(&self) -> RuntimeResult<()> {
        let mut created = 0;

        for bot_config in self.config.enabled_bots() {
            if self.registry.get(&bot_config.id).await.is_some() {
                continue;
            }

            let bot = self.create_bot(bot_config)?;
            self.registry.register(bot).await?;
            created += 1;
        }

        let disabled = self.config.bots.len() - self.config.enabled_bots().count();
        if disabled > 0 {
            debug!("Skipped {disabled} disabled bot(s)");
        }
        info!("Runtime initialized with {created} new bot(s)");

        Ok(())
    }

    /// Starts every registered bot.
    ///
    /// Bots that fail to start are logged and stay idle.
    pub async fn start(&self) -> RuntimeResult<()> {
        if self.running.swap(true, Ordering::AcqRel) {
            warn!("Runtime is already running");
            return Ok(());
        }

        info!("Starting Yiri runtime");

        let failures = self.registry.start_all().await;
        if !failures.is_empty() {
            warn!("{} bot(s) failed to start", failures.len());
        }

        info!("Runtime started: {}", self.registry.stats().await);

        Ok(())
    }

    /// Stops every running bot.
    pub async fn stop(&self) -> RuntimeResult<()> {
        if !self.running.swap(false, Ordering::AcqRel) {
            warn!("Runtime is not running");
            return Ok(());
        }

        info!("Stopping Yiri runtime");
        self.registry.shutdown_all().await;
        info!("Runtime stopped");

        Ok(())
    }

    /// Runs the runtime until Ctrl+C or SIGTERM is received.
    pub async fn run(&self) -> RuntimeResult<()> {
        self.init().await?;
        self.start().await?;

        info!("Yiri runtime is now running. Press Ctrl+C to stop.");

        let signal = wait_for_shutdown().await;
        self.stop().await?;

        signal
    }

    /// Runs the runtime until `shutdown` completes.
    pub async fn run_until<F>(&self, shutdown: F) -> RuntimeResult<()>
    where
        F: Future<Output = ()>,
    {
        self.init().await?;
        self.start().await?;

        shutdown.await;

        self.stop().await
    }

    /// Returns runtime statistics.
    pub async fn stats(&self) -> RuntimeStats {
        RuntimeStats {
            running: self.is_running(),
            bots: self.registry.stats().await,
            factories: self.factories.read().len(),
        }
    }
}

impl Default for YiriRuntime {
    fn default() -> Self {
        Self::new()
    }
}

/// Waits for shutdown signals (Ctrl+C or SIGTERM).
async fn wait_for_shutdown() -> RuntimeResult<()> {
    #[cfg(unix)]
    {
        let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())?;

        tokio::select! {
            result = signal::ctrl_c() => {
                result?;
                info!("Received Ctrl+C, shutting down");
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down");
            }
        }
    }

    #[cfg(not(unix))]
    {
        signal::ctrl_c().await?;
        info!("Received Ctrl+C, shutting down");
    }

    Ok(())
}

/// Runtime statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeStats {
    /// Whether the runtime is running.
    pub running: bool,
    /// Bot counts by status.
    pub bots: RegistryStats,
    /// Number of registered bot factories.
    pub factories: usize,
}

impl std::fmt::Display for RuntimeStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = if self.running { "running" } else { "stopped" };
        write!(f, "Runtime {state}, {}, {} factories", self.bots, self.factories)
    }
}

// =============================================================================
// RuntimeBuilder
// =============================================================================

/// Builder for creating a [`YiriRuntime`] with custom configuration.
pub struct RuntimeBuilder {
    config_loader: ConfigLoader,
}

impl RuntimeBuilder {
    /// Creates a builder searching the current directory.
    pub fn new() -> Self {
        Self {
            config_loader: ConfigLoader::new().with_current_dir(),
        }
    }

    /// Sets a specific configuration file to load.
    pub fn config_file<P: AsRef<std::path::Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.file(path);
        self
    }

    /// Sets the configuration profile (e.g., "development", "production").
    pub fn profile(mut self, profile: impl AsRef<str>) -> Self {
        self.config_loader = self.config_loader.profile(profile);
        self
    }

    /// Adds a search path for configuration files.
    pub fn search_path<P: AsRef<std::path::Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.search_path(path);
        self
    }

    /// Also searches the user configuration directory.
    pub fn with_user_config_dir(mut self) -> Self {
        self.config_loader = self.config_loader.with_user_config_dir();
        self
    }

    /// Disables loading environment variables.
    pub fn without_env(mut self) -> Self {
        self.config_loader = self.config_loader.without_env();
        self
    }

    /// Merges additional configuration programmatically.
    pub fn merge(mut self, config: YiriConfig) -> Self {
        self.config_loader = self.config_loader.merge(config);
        self
    }

    /// Builds the runtime.
    pub fn build(self) -> ConfigResult<YiriRuntime> {
        let config = self.config_loader.load()?;
        Ok(YiriRuntime::from_config(&config))
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}
