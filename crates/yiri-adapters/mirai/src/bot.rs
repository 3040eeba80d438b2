//! The mirai bot.
//!
//! [`MiraiBot`] logs one account in through an [`Adapter`], decodes every raw
//! event the adapter delivers into a [`MiraiEvent`] and emits it on the shared
//! [`EventBus`]. On top of [`Bot::call_api`] it offers typed methods for the
//! common APIs and [`invoke`](MiraiBot::invoke) for everything in the
//! [`api`](crate::api) table.
//!
//! ```rust,ignore
//! let bus = Arc::new(EventBus::new());
//! let bot = Arc::new(MiraiBot::from_settings("main", 12345678, &settings, Arc::clone(&bus))?);
//!
//! let replier = Arc::clone(&bot);
//! bus.on(0, move |msg: FriendMessage| {
//!     let bot = Arc::clone(&replier);
//!     async move {
//!         let _ = bot.send_friend_message(msg.sender.id, &msg.message_chain).await;
//!     }
//! });
//!
//! bot.start().await?;
//! ```

use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};
use yiri_core::{
    AdapterError, AdapterResult, ApiMethod, Bot, BotStatus, BoxedAdapter, EventBus,
};

use crate::adapter::HttpAdapter;
use crate::api;
use crate::config::MiraiConfig;
use crate::model::{Friend, Group, GroupMember, MessageChain, MiraiEvent, Subject, SubjectKind};
#[cfg(feature = "webhook")]
use crate::webhook::WebhookAdapter;

/// Capacity of the channel between the adapter and the event pump.
const EVENT_BUFFER: usize = 256;

// =============================================================================
// MiraiBot
// =============================================================================

/// One account connected to mirai-api-http.
pub struct MiraiBot {
    id: String,
    qq: i64,
    adapter: BoxedAdapter,
    bus: Arc<EventBus>,
    status: RwLock<BotStatus>,
    pump: Mutex<Option<JoinHandle<()>>>,
}

impl MiraiBot {
    /// Creates a bot driving `adapter`.
    pub fn new(id: impl Into<String>, qq: i64, adapter: BoxedAdapter, bus: Arc<EventBus>) -> Self {
        Self {
            id: id.into(),
            qq,
            adapter,
            bus,
            status: RwLock::new(BotStatus::Idle),
            pump: Mutex::new(None),
        }
    }

    /// Creates a bot with an [`HttpAdapter`] configured from a bot entry's
    /// `settings` value.
    ///
    /// With a `webhook` table the bot receives events through a
    /// `WebhookAdapter` and calls APIs over HTTP.
    pub fn from_settings(
        id: impl Into<String>,
        qq: i64,
        settings: &Value,
        bus: Arc<EventBus>,
    ) -> AdapterResult<Self> {
        let mut config = MiraiConfig::from_settings(settings)?;
        let webhook = config.webhook.take();
        let http = HttpAdapter::new(config)?;
        let adapter: BoxedAdapter = match webhook {
            #[cfg(feature = "webhook")]
            Some(webhook) => Arc::new(WebhookAdapter::new(webhook).with_api(http)),
            #[cfg(not(feature = "webhook"))]
            Some(_) => {
                return Err(AdapterError::InvalidConfig(
                    "webhook settings need the `webhook` feature".to_string(),
                ));
            }
            None => Arc::new(http),
        };
        Ok(Self::new(id, qq, adapter, bus))
    }

    /// Returns the bus events are emitted on.
    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    fn spawn_pump(&self, mut events: mpsc::Receiver<Value>) -> JoinHandle<()> {
        let bus = Arc::clone(&self.bus);
        let bot_id = self.id.clone();
        let qq = self.qq;

        tokio::spawn(async move {
            while let Some(raw) = events.recv().await {
                match MiraiEvent::from_value(raw) {
                    Ok(event) => {
                        let event = event.received_by(qq);
                        trace!(bot_id = %bot_id, event = event.type_name(), "Dispatching event");
                        bus.emit(event.into_boxed()).await;
                    }
                    Err(e) => warn!(bot_id = %bot_id, error = %e, "Dropped undecodable event"),
                }
            }
            debug!(bot_id = %bot_id, "Event pump stopped");
        })
    }

    // -------------------------------------------------------------------------
    // API table
    // -------------------------------------------------------------------------

    /// Calls an API from the [`api`](crate::api) table by wire name or alias.
    ///
    /// Required parameters are checked before anything is sent. RESTful APIs
    /// are read; use [`update`](Self::update) to write them.
    pub async fn invoke(&self, name: &str, params: Value) -> AdapterResult<Value> {
        let spec = lookup(name)?;
        spec.validate(&params)?;
        self.adapter.call_api(spec.name, spec.method, params).await
    }

    /// Writes a RESTful API such as `groupConfig` or `memberInfo`.
    pub async fn update(&self, name: &str, params: Value) -> AdapterResult<Value> {
        let spec = lookup(name)?;
        spec.validate(&params)?;
        self.adapter
            .call_api(spec.name, spec.write_method(), params)
            .await
    }

    async fn invoke_as<T: DeserializeOwned>(&self, name: &str, params: Value) -> AdapterResult<T> {
        let data = self.invoke(name, params).await?;
        Ok(serde_json::from_value(data)?)
    }

    // -------------------------------------------------------------------------
    // Messages
    // -------------------------------------------------------------------------

    async fn send_message(
        &self,
        api: &str,
        mut params: Value,
        chain: &MessageChain,
    ) -> AdapterResult<i64> {
        params["messageChain"] = chain.to_outgoing_json()?;
        let reply = self.invoke(api, params).await?;
        reply
            .get("messageId")
            .and_then(Value::as_i64)
            .ok_or_else(|| AdapterError::decode(format!("{api} response has no messageId")))
    }

    /// Sends a message to a friend. Returns the new message id.
    pub async fn send_friend_message(
        &self,
        target: i64,
        chain: &MessageChain,
    ) -> AdapterResult<i64> {
        self.send_message("sendFriendMessage", json!({ "target": target }), chain)
            .await
    }

    /// Sends a message to a group, optionally quoting an earlier message.
    pub async fn send_group_message(
        &self,
        target: i64,
        chain: &MessageChain,
        quote: Option<i64>,
    ) -> AdapterResult<i64> {
        let mut params = json!({ "target": target });
        if let Some(quote) = quote {
            params["quote"] = json!(quote);
        }
        self.send_message("sendGroupMessage", params, chain).await
    }

    /// Sends a temporary message to a group member.
    pub async fn send_temp_message(
        &self,
        qq: i64,
        group: i64,
        chain: &MessageChain,
    ) -> AdapterResult<i64> {
        self.send_message("sendTempMessage", json!({ "qq": qq, "group": group }), chain)
            .await
    }

    /// Recalls a message.
    pub async fn recall(&self, message_id: i64) -> AdapterResult<()> {
        self.invoke("recall", json!({ "target": message_id })).await?;
        Ok(())
    }

    /// Nudges `target` in a friend chat or group.
    pub async fn send_nudge(&self, target: i64, subject: &Subject) -> AdapterResult<()> {
        let kind = match subject.kind {
            SubjectKind::Friend => "Friend",
            SubjectKind::Group => "Group",
            SubjectKind::Stranger => "Stranger",
        };
        self.invoke(
            "sendNudge",
            json!({ "target": target, "subject": subject.id, "kind": kind }),
        )
        .await?;
        Ok(())
    }

    /// Looks a cached message up by id.
    pub async fn message_from_id(&self, message_id: i64) -> AdapterResult<MiraiEvent> {
        let data = self.invoke("messageFromId", json!({ "id": message_id })).await?;
        Ok(MiraiEvent::from_value(data)?.received_by(self.qq))
    }

    // -------------------------------------------------------------------------
    // Information
    // -------------------------------------------------------------------------

    /// Returns the plugin information reported by the server.
    pub async fn about(&self) -> AdapterResult<Value> {
        self.invoke("about", Value::Null).await
    }

    /// Returns the friend list.
    pub async fn friend_list(&self) -> AdapterResult<Vec<Friend>> {
        self.invoke_as("friendList", Value::Null).await
    }

    /// Returns the group list.
    pub async fn group_list(&self) -> AdapterResult<Vec<Group>> {
        self.invoke_as("groupList", Value::Null).await
    }

    /// Returns the members of a group.
    pub async fn member_list(&self, group: i64) -> AdapterResult<Vec<GroupMember>> {
        self.invoke_as("memberList", json!({ "target": group })).await
    }
}

fn lookup(name: &str) -> AdapterResult<&'static api::ApiSpec> {
    api::lookup(name).ok_or_else(|| AdapterError::InvalidParams(format!("unknown API: {name}")))
}

// =============================================================================
// Bot Trait Implementation
// =============================================================================

#[async_trait]
impl Bot for MiraiBot {
    fn id(&self) -> &str {
        &self.id
    }

    fn account(&self) -> i64 {
        self.qq
    }

    fn adapter_name(&self) -> &str {
        self.adapter.name()
    }

    fn status(&self) -> BotStatus {
        *self.status.read()
    }

    async fn start(&self) -> AdapterResult<()> {
        if self.status() == BotStatus::Running {
            debug!(bot_id = %self.id, "Bot already running");
            return Ok(());
        }

        self.adapter.login(self.qq).await?;

        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        self.adapter.start(tx).await?;

        let pump = self.spawn_pump(rx);
        if let Some(old) = self.pump.lock().replace(pump) {
            old.abort();
        }

        *self.status.write() = BotStatus::Running;
        info!(bot_id = %self.id, qq = self.qq, adapter = self.adapter.name(), "Bot started");
        Ok(())
    }

    async fn shutdown(&self) -> AdapterResult<()> {
        let result = self.adapter.shutdown().await;

        let pump = self.pump.lock().take();
        if let Some(pump) = pump
            && let Err(e) = pump.await
        {
            warn!(bot_id = %self.id, error = %e, "Event pump ended abnormally");
        }

        *self.status.write() = BotStatus::Stopped;
        info!(bot_id = %self.id, "Bot stopped");
        result
    }

    async fn call_api(&self, api: &str, method: ApiMethod, params: Value) -> AdapterResult<Value> {
        self.adapter.call_api(api, method, params).await
    }

    fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::sync::oneshot;
    use yiri_core::{Adapter, ApiError, downcast_bot};

    use crate::model::FriendMessage;

    type Call = (String, ApiMethod, Value);

    /// Records API calls and lets the test push raw events.
    #[derive(Default)]
    struct FakeAdapter {
        calls: Mutex<Vec<Call>>,
        events: Mutex<Option<mpsc::Sender<Value>>>,
        logins: Mutex<Vec<i64>>,
    }

    impl FakeAdapter {
        fn sender(&self) -> mpsc::Sender<Value> {
            self.events.lock().clone().unwrap()
        }
    }

    #[async_trait]
    impl Adapter for FakeAdapter {
        fn name(&self) -> &'static str {
            "fake"
        }

        async fn login(&self, qq: i64) -> AdapterResult<()> {
            self.logins.lock().push(qq);
            Ok(())
        }

        async fn start(&self, events: mpsc::Sender<Value>) -> AdapterResult<()> {
            *self.events.lock() = Some(events);
            Ok(())
        }

        async fn call_api(
            &self,
            api: &str,
            method: ApiMethod,
            params: Value,
        ) -> AdapterResult<Value> {
            self.calls.lock().push((api.to_string(), method, params));
            match api {
                "groupList" => Ok(json!([{"id": 20002, "name": "Chat", "permission": "OWNER"}])),
                "recall" => Err(ApiError::new(5, None).into()),
                _ => Ok(json!({"code": 0, "msg": "success", "messageId": 77})),
            }
        }

        async fn shutdown(&self) -> AdapterResult<()> {
            self.events.lock().take();
            Ok(())
        }
    }

    fn fixture() -> (Arc<MiraiBot>, Arc<FakeAdapter>) {
        let adapter = Arc::new(FakeAdapter::default());
        let bus = Arc::new(EventBus::new());
        let bot = MiraiBot::new("main", 10001, adapter.clone(), bus);
        (Arc::new(bot), adapter)
    }

    fn last_call(adapter: &FakeAdapter) -> Call {
        adapter.calls.lock().last().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_start_pumps_events_to_bus() {
        let (bot, adapter) = fixture();
        let (tx, rx) = oneshot::channel();
        let tx = Mutex::new(Some(tx));

        bot.bus().on(0, move |msg: FriendMessage| {
            let tx = tx.lock().take();
            async move {
                if let Some(tx) = tx {
                    let _ = tx.send(msg);
                }
            }
        });

        bot.start().await.unwrap();
        assert_eq!(bot.status(), BotStatus::Running);
        assert_eq!(*adapter.logins.lock(), vec![10001]);

        let sender = adapter.sender();
        sender.send(json!({"type": "NoSuchEvent"})).await.unwrap();
        sender.send(json!({"type": "FriendMessage"})).await.unwrap();
        sender
            .send(json!({
                "type": "FriendMessage",
                "sender": {"id": 30003, "nickname": "Alice", "remark": ""},
                "messageChain": [
                    {"type": "Source", "id": 9, "time": 0},
                    {"type": "Plain", "text": "hello"}
                ]
            }))
            .await
            .unwrap();
        drop(sender);

        let msg = tokio::time::timeout(Duration::from_secs(5), rx)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(msg.sender.id, 30003);
        assert_eq!(msg.received_by, Some(10001));
        assert_eq!(msg.message_chain.message_id(), 9);
        assert_eq!(msg.message_chain.plain_text(), "hello");

        bot.shutdown().await.unwrap();
        assert_eq!(bot.status(), BotStatus::Stopped);
    }

    #[tokio::test]
    async fn test_send_group_message_with_quote() {
        let (bot, adapter) = fixture();
        let chain = MessageChain::builder().at(30003).text(" hi").build().unwrap();

        let id = bot.send_group_message(20002, &chain, Some(9)).await.unwrap();
        assert_eq!(id, 77);

        let (api, method, params) = last_call(&adapter);
        assert_eq!(api, "sendGroupMessage");
        assert_eq!(method, ApiMethod::Post);
        assert_eq!(params["target"], 20002);
        assert_eq!(params["quote"], 9);
        assert_eq!(
            params["messageChain"],
            json!([
                {"type": "At", "target": 30003},
                {"type": "Plain", "text": " hi"}
            ])
        );
    }

    #[tokio::test]
    async fn test_invoke_checks_table() {
        let (bot, adapter) = fixture();

        let err = bot.invoke("sendGuildMessage", json!({})).await.unwrap_err();
        assert!(matches!(err, AdapterError::InvalidParams(_)));

        let err = bot.invoke("mute", json!({"target": 1})).await.unwrap_err();
        assert!(matches!(err, AdapterError::InvalidParams(_)));
        assert!(adapter.calls.lock().is_empty());

        bot.invoke("member_info", json!({"target": 1, "memberId": 2}))
            .await
            .unwrap();
        assert_eq!(last_call(&adapter).1, ApiMethod::RestGet);

        bot.update("memberInfo", json!({"target": 1, "memberId": 2, "info": {"name": "x"}}))
            .await
            .unwrap();
        let (api, method, _) = last_call(&adapter);
        assert_eq!(api, "memberInfo");
        assert_eq!(method, ApiMethod::RestPost);
    }

    #[tokio::test]
    async fn test_typed_queries_and_errors() {
        let (bot, _adapter) = fixture();

        let groups = bot.group_list().await.unwrap();
        assert_eq!(groups[0].name, "Chat");

        let err = bot.recall(123).await.unwrap_err();
        assert!(matches!(err, AdapterError::Api(ApiError { code: 5, .. })));
    }

    #[tokio::test]
    async fn test_downcast_from_boxed_bot() {
        let (bot, _adapter) = fixture();
        let boxed: yiri_core::BoxedBot = bot;
        assert_eq!(boxed.adapter_name(), "fake");

        let bot = downcast_bot::<MiraiBot>(boxed).unwrap();
        assert_eq!(bot.account(), 10001);
    }

    #[cfg(feature = "webhook")]
    #[test]
    fn test_from_settings_picks_adapter() {
        let bus = Arc::new(EventBus::new());
        let bot = MiraiBot::from_settings("main", 10001, &Value::Null, Arc::clone(&bus)).unwrap();
        assert_eq!(bot.adapter_name(), crate::ADAPTER_NAME);

        let settings = json!({"verify_key": "k", "webhook": {"port": 0}});
        let bot = MiraiBot::from_settings("hook", 10001, &settings, bus).unwrap();
        assert_eq!(bot.adapter_name(), crate::WEBHOOK_ADAPTER_NAME);
    }
}
