//! Bot registry.
//!
//! Holds every bot the runtime manages, keyed by the id from its
//! configuration entry.

use std::collections::HashMap;

use futures::future::join_all;
use tokio::sync::RwLock;
use tracing::{debug, error, info};
use yiri_core::{AdapterError, BotStatus, BoxedBot};

use crate::error::{RuntimeError, RuntimeResult};

/// Registry of running and idle bots.
#[derive(Default)]
pub struct BotRegistry {
    bots: RwLock<HashMap<String, BoxedBot>>,
}

impl BotRegistry {
    /// Creates a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a bot. Fails if its id is taken.
    pub async fn register(&self, bot: BoxedBot) -> RuntimeResult<()> {
        let id = bot.id().to_string();
        let mut bots = self.bots.write().await;

        if bots.contains_key(&id) {
            return Err(RuntimeError::BotExists(id));
        }

        info!(bot_id = %id, qq = bot.account(), adapter = bot.adapter_name(), "Registered bot");
        bots.insert(id, bot);
        Ok(())
    }

    /// Removes a bot, shutting it down first if it is running.
    ///
    /// A bot whose shutdown fails stays registered.
    pub async fn unregister(&self, id: &str) -> RuntimeResult<BoxedBot> {
        let bot = self
            .get(id)
            .await
            .ok_or_else(|| RuntimeError::BotNotFound(id.to_string()))?;

        if bot.status() == BotStatus::Running {
            bot.shutdown().await?;
        }
        self.bots.write().await.remove(id);
        info!(bot_id = %id, "Unregistered bot");
        Ok(bot)
    }

    /// Gets a bot by id.
    pub async fn get(&self, id: &str) -> Option<BoxedBot> {
        self.bots.read().await.get(id).cloned()
    }

    /// Returns all bot ids, sorted.
    pub async fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.bots.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Returns the number of registered bots.
    pub async fn count(&self) -> usize {
        self.bots.read().await.len()
    }

    async fn snapshot(&self) -> Vec<BoxedBot> {
        self.bots.read().await.values().cloned().collect()
    }

    /// Starts every bot that is not running, concurrently.
    ///
    /// A bot that fails to start is logged and left idle; the failures are
    /// returned by bot id.
    pub async fn start_all(&self) -> Vec<(String, AdapterError)> {
        let pending: Vec<BoxedBot> = self
            .snapshot()
            .await
            .into_iter()
            .filter(|bot| bot.status() != BotStatus::Running)
            .collect();

        let results = join_all(pending.iter().map(|bot| bot.start())).await;

        pending
            .iter()
            .zip(results)
            .filter_map(|(bot, result)| match result {
                Ok(()) => None,
                Err(e) => {
                    error!(bot_id = %bot.id(), error = %e, "Failed to start bot");
                    Some((bot.id().to_string(), e))
                }
            })
            .collect()
    }

    /// Shuts every running bot down, concurrently.
    pub async fn shutdown_all(&self) {
        let running: Vec<BoxedBot> = self
            .snapshot()
            .await
            .into_iter()
            .filter(|bot| bot.status() == BotStatus::Running)
            .collect();

        info!("Shutting down {} bot(s)", running.len());

        let results = join_all(running.iter().map(|bot| bot.shutdown())).await;
        for (bot, result) in running.iter().zip(results) {
            match result {
                Ok(()) => debug!(bot_id = %bot.id(), "Bot shut down"),
                Err(e) => error!(bot_id = %bot.id(), error = %e, "Error during bot shutdown"),
            }
        }
    }

    /// Gets the status of all bots.
    pub async fn status_all(&self) -> HashMap<String, BotStatus> {
        self.bots
            .read()
            .await
            .iter()
            .map(|(id, bot)| (id.clone(), bot.status()))
            .collect()
    }

    /// Returns statistics about the registry.
    pub async fn stats(&self) -> RegistryStats {
        let bots = self.bots.read().await;
        let mut stats = RegistryStats {
            total: bots.len(),
            ..RegistryStats::default()
        };

        for bot in bots.values() {
            match bot.status() {
                BotStatus::Idle => stats.idle += 1,
                BotStatus::Running => stats.running += 1,
                BotStatus::Stopped => stats.stopped += 1,
            }
        }
        stats
    }
}

/// Statistics about the bot registry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegistryStats {
    /// Total number of bots.
    pub total: usize,
    /// Bots never started, or whose start failed.
    pub idle: usize,
    /// Bots receiving events.
    pub running: usize,
    /// Bots shut down.
    pub stopped: usize,
}

impl std::fmt::Display for RegistryStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Bots: {} total ({} running, {} idle, {} stopped)",
            self.total, self.running, self.idle, self.stopped
        )
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::Value;
    use std::any::Any;
    use std::sync::{Arc, Mutex};
    use yiri_core::{AdapterResult, ApiMethod, Bot};

    /// A bot that only tracks its status.
    pub(crate) struct StubBot {
        id: String,
        fail_start: bool,
        fail_shutdown: bool,
        status: Mutex<BotStatus>,
    }

    impl StubBot {
        pub(crate) fn boxed(id: &str, fail_start: bool) -> BoxedBot {
            Arc::new(Self {
                id: id.to_string(),
                fail_start,
                fail_shutdown: false,
                status: Mutex::new(BotStatus::Idle),
            })
        }

        fn stuck(id: &str) -> BoxedBot {
            Arc::new(Self {
                id: id.to_string(),
                fail_start: false,
                fail_shutdown: true,
                status: Mutex::new(BotStatus::Idle),
            })
        }
    }

    #[async_trait]
    impl Bot for StubBot {
        fn id(&self) -> &str {
            &self.id
        }

        fn account(&self) -> i64 {
            10001
        }

        fn adapter_name(&self) -> &str {
            "stub"
        }

        fn status(&self) -> BotStatus {
            *self.status.lock().unwrap()
        }

        async fn start(&self) -> AdapterResult<()> {
            if self.fail_start {
                return Err(AdapterError::network("connection refused"));
            }
            *self.status.lock().unwrap() = BotStatus::Running;
            Ok(())
        }

        async fn shutdown(&self) -> AdapterResult<()> {
            if self.fail_shutdown {
                return Err(AdapterError::network("release failed"));
            }
            *self.status.lock().unwrap() = BotStatus::Stopped;
            Ok(())
        }

        async fn call_api(&self, _: &str, _: ApiMethod, _: Value) -> AdapterResult<Value> {
            Ok(Value::Null)
        }

        fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
            self
        }
    }

    #[tokio::test]
    async fn test_register_and_unregister() {
        let registry = BotRegistry::new();
        registry.register(StubBot::boxed("a", false)).await.unwrap();

        let err = registry.register(StubBot::boxed("a", false)).await.unwrap_err();
        assert!(matches!(err, RuntimeError::BotExists(id) if id == "a"));
        assert_eq!(registry.count().await, 1);

        registry.start_all().await;
        let bot = registry.unregister("a").await.unwrap();
        assert_eq!(bot.status(), BotStatus::Stopped);

        assert!(matches!(
            registry.unregister("a").await,
            Err(RuntimeError::BotNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_unregister_keeps_bot_when_shutdown_fails() {
        let registry = BotRegistry::new();
        registry.register(StubBot::stuck("a")).await.unwrap();
        registry.start_all().await;

        assert!(registry.unregister("a").await.is_err());
        let bot = registry.get("a").await.unwrap();
        assert_eq!(bot.status(), BotStatus::Running);
        assert_eq!(registry.count().await, 1);
    }

    #[tokio::test]
    async fn test_start_all_reports_failures() {
        let registry = BotRegistry::new();
        registry.register(StubBot::boxed("good", false)).await.unwrap();
        registry.register(StubBot::boxed("bad", true)).await.unwrap();

        let failures = registry.start_all().await;
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0, "bad");

        let stats = registry.stats().await;
        assert_eq!(
            stats,
            RegistryStats {
                total: 2,
                idle: 1,
                running: 1,
                stopped: 0
            }
        );

        registry.shutdown_all().await;
        let statuses = registry.status_all().await;
        assert_eq!(statuses["good"], BotStatus::Stopped);
        assert_eq!(statuses["bad"], BotStatus::Idle);
        assert_eq!(registry.ids().await, vec!["bad", "good"]);
    }
}
