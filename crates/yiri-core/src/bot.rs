//! Bot trait and related types.
//!
//! A bot is one logged-in account: it drives an [`Adapter`](crate::Adapter),
//! turns raw events into typed events, and hands them to the
//! [`EventBus`](crate::EventBus).

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::adapter::ApiMethod;
use crate::error::AdapterResult;

/// Lifecycle state of a bot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BotStatus {
    /// Created but never started, or start failed.
    #[default]
    Idle,
    /// Logged in and receiving events.
    Running,
    /// Shut down.
    Stopped,
}

impl fmt::Display for BotStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::Running => write!(f, "Running"),
            Self::Stopped => write!(f, "Stopped"),
        }
    }
}

/// The core Bot trait.
///
/// Concrete bots (e.g. `MiraiBot`) add strongly-typed send methods on top of
/// [`call_api`](Bot::call_api).
#[async_trait]
pub trait Bot: Send + Sync {
    /// Returns the bot's unique identifier.
    fn id(&self) -> &str;

    /// Returns the account number the bot logs in as.
    fn account(&self) -> i64;

    /// Returns the adapter name this bot uses.
    fn adapter_name(&self) -> &str;

    /// Returns the current lifecycle state.
    fn status(&self) -> BotStatus;

    /// Logs in and starts receiving events.
    async fn start(&self) -> AdapterResult<()>;

    /// Stops receiving events and releases the session.
    async fn shutdown(&self) -> AdapterResult<()>;

    /// Calls a raw API with JSON parameters.
    async fn call_api(&self, api: &str, method: ApiMethod, params: Value) -> AdapterResult<Value>;

    /// Converts to `Arc<dyn Any>` for downcasting to the concrete bot type.
    fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

/// A shared bot trait object.
pub type BoxedBot = Arc<dyn Bot>;

/// Downcasts a shared bot to its concrete type.
pub fn downcast_bot<B: Bot + 'static>(bot: BoxedBot) -> Option<Arc<B>> {
    bot.as_any().downcast::<B>().ok()
}
