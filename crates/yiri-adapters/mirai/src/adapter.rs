//! HTTP polling adapter for mirai-api-http.
//!
//! The adapter talks to the `http` adapter of mirai-api-http:
//!
//! - `login` verifies the key (`POST /verify`) and binds the account to the
//!   session (`POST /bind`) unless the server runs in single mode
//! - `start` spawns a task that asks `GET /countMessage` every poll interval
//!   and pulls pending events with `GET /fetchMessage`
//! - `call_api` sends GET parameters as a query string and POST parameters as
//!   a JSON body, always with the `sessionKey` header
//! - `shutdown` stops polling and releases the session (`POST /release`)
//!
//! ```rust,ignore
//! let adapter = HttpAdapter::new(MiraiConfig::default())?;
//! adapter.login(12345678).await?;
//! let about = adapter.call_api("about", ApiMethod::Get, Value::Null).await?;
//! ```

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use reqwest::{Client, ClientBuilder, Url};
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};
use uuid::Uuid;
use yiri_core::{Adapter, AdapterError, AdapterResult, ApiError, ApiMethod};

use crate::config::MiraiConfig;

/// Name reported by [`HttpAdapter::name`](Adapter::name).
pub const ADAPTER_NAME: &str = "mirai-http";

#[derive(Debug, Clone)]
struct Session {
    key: String,
    qq: i64,
}

/// State shared between the adapter and its poll task.
struct Inner {
    config: MiraiConfig,
    base_url: String,
    client: Client,
    session: RwLock<Option<Session>>,
}

struct Poller {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// The mirai-api-http HTTP polling adapter.
pub struct HttpAdapter {
    inner: Arc<Inner>,
    poller: Mutex<Option<Poller>>,
}

impl HttpAdapter {
    /// Creates an adapter with its own HTTP client.
    pub fn new(config: MiraiConfig) -> AdapterResult<Self> {
        let client = ClientBuilder::new()
            .timeout(config.timeout())
            .build()
            .map_err(|e| AdapterError::internal(format!("failed to create HTTP client: {e}")))?;
        Self::with_client(config, client)
    }

    /// Creates an adapter on top of an existing HTTP client.
    ///
    /// The client's own timeout applies instead of
    /// [`MiraiConfig::timeout_ms`].
    pub fn with_client(config: MiraiConfig, client: Client) -> AdapterResult<Self> {
        let base_url = config.base_url()?;
        Ok(Self {
            inner: Arc::new(Inner {
                config,
                base_url,
                client,
                session: RwLock::new(None),
            }),
            poller: Mutex::new(None),
        })
    }

    /// Returns the adapter configuration.
    pub fn config(&self) -> &MiraiConfig {
        &self.inner.config
    }

    /// Returns the server base url.
    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    /// Returns the current session key, if logged in.
    pub fn session_key(&self) -> Option<String> {
        self.inner.session_key()
    }

    /// Returns whether the poll task is running.
    pub fn is_polling(&self) -> bool {
        self.poller
            .lock()
            .as_ref()
            .is_some_and(|poller| !poller.handle.is_finished())
    }
}

impl Inner {
    fn session_key(&self) -> Option<String> {
        self.session.read().as_ref().map(|s| s.key.clone())
    }

    fn url(&self, api: &str) -> AdapterResult<Url> {
        let raw = format!("{}/{}", self.base_url, api.trim_start_matches('/'));
        Url::parse(&raw).map_err(|e| AdapterError::InvalidConfig(format!("bad url {raw}: {e}")))
    }

    async fn request(&self, method: ApiMethod, api: &str, params: &Value) -> AdapterResult<Value> {
        let mut url = self.url(api)?;

        let request = if method.is_query() {
            if let Some(params) = params.as_object().filter(|p| !p.is_empty()) {
                let mut pairs = url.query_pairs_mut();
                for (key, value) in params {
                    if !value.is_null() {
                        pairs.append_pair(key, &query_value(value));
                    }
                }
            }
            self.client.get(url)
        } else {
            self.client.post(url).json(params)
        };

        let request = match self.session_key() {
            Some(key) => request.header("sessionKey", key),
            None => request,
        };

        let response = request.send().await.map_err(http_error)?;
        let status = response.status();
        debug!(api, %method, status = status.as_u16(), "[HTTP] Request sent");

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(AdapterError::network(format!(
                "HTTP {} from {api}: {text}",
                status.as_u16()
            )));
        }

        let body: Value = response.json().await.map_err(http_error)?;
        unwrap_response(body)
    }

    /// Pulls pending events once. Returns `false` when the receiver is gone.
    async fn poll(&self, events: &mpsc::Sender<Value>) -> AdapterResult<bool> {
        let count = self
            .request(ApiMethod::Get, "countMessage", &Value::Null)
            .await?
            .as_u64()
            .ok_or_else(|| AdapterError::decode("countMessage did not return a number"))?;

        if count == 0 {
            return Ok(true);
        }

        let count = count.min(u64::from(self.config.fetch_count.max(1)));
        let data = self
            .request(ApiMethod::Get, "fetchMessage", &json!({ "count": count }))
            .await?;
        let Value::Array(list) = data else {
            return Err(AdapterError::decode("fetchMessage did not return a list"));
        };

        trace!(count = list.len(), "[HTTP] Fetched events");
        for event in list {
            if events.send(event).await.is_err() {
                return Ok(false);
            }
        }
        Ok(true)
    }

    async fn poll_loop(self: Arc<Self>, events: mpsc::Sender<Value>, cancel: CancellationToken) {
        let period = self.config.poll_interval().max(Duration::from_millis(1));
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let result = tokio::select! {
                _ = cancel.cancelled() => break,
                result = self.poll(&events) => result,
            };

            match result {
                Ok(true) => {}
                Ok(false) => {
                    debug!("[HTTP] Event receiver dropped");
                    break;
                }
                Err(e) => warn!(error = %e, "[HTTP] Poll failed"),
            }
        }

        debug!("[HTTP] Poll loop stopped");
    }
}

#[async_trait]
impl Adapter for HttpAdapter {
    fn name(&self) -> &'static str {
        ADAPTER_NAME
    }

    async fn login(&self, qq: i64) -> AdapterResult<()> {
        let inner = &self.inner;

        let key = match &inner.config.verify_key {
            Some(verify_key) => {
                let body = inner
                    .request(ApiMethod::Post, "verify", &json!({ "verifyKey": verify_key }))
                    .await?;
                body.get("session")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .ok_or_else(|| AdapterError::decode("verify response has no session"))?
            }
            None => Uuid::new_v4().simple().to_string(),
        };

        if !inner.config.single_mode {
            inner
                .request(ApiMethod::Post, "bind", &json!({ "sessionKey": key, "qq": qq }))
                .await?;
        }

        *inner.session.write() = Some(Session { key, qq });
        info!(qq, url = %inner.base_url, "[HTTP] Logged in");
        Ok(())
    }

    async fn start(&self, events: mpsc::Sender<Value>) -> AdapterResult<()> {
        if self.inner.session.read().is_none() {
            return Err(AdapterError::NotLoggedIn);
        }

        let mut poller = self.poller.lock();
        if let Some(old) = poller.take() {
            old.cancel.cancel();
        }

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(Arc::clone(&self.inner).poll_loop(events, cancel.clone()));
        *poller = Some(Poller { cancel, handle });

        info!(
            interval_ms = self.inner.config.poll_interval_ms,
            "[HTTP] Polling started"
        );
        Ok(())
    }

    async fn call_api(&self, api: &str, method: ApiMethod, params: Value) -> AdapterResult<Value> {
        if self.inner.session.read().is_none() {
            return Err(AdapterError::NotLoggedIn);
        }
        self.inner.request(method, api, &params).await
    }

    async fn shutdown(&self) -> AdapterResult<()> {
        let poller = self.poller.lock().take();
        if let Some(poller) = poller {
            poller.cancel.cancel();
            if let Err(e) = poller.handle.await {
                warn!(error = %e, "[HTTP] Poll task ended abnormally");
            }
        }

        let session = self.inner.session.write().take();
        let Some(session) = session else {
            return Ok(());
        };

        if !self.inner.config.single_mode {
            let params = json!({ "sessionKey": session.key, "qq": session.qq });
            self.inner.request(ApiMethod::Post, "release", &params).await?;
        }

        info!(qq = session.qq, "[HTTP] Logged out");
        Ok(())
    }
}

/// Maps a transport failure onto [`AdapterError`].
fn http_error(err: reqwest::Error) -> AdapterError {
    if err.is_timeout() {
        AdapterError::network(format!("request timed out: {err}"))
    } else if err.is_decode() {
        AdapterError::decode(err.to_string())
    } else {
        AdapterError::network(err.to_string())
    }
}

/// Checks the status code of a response body and extracts its `data`.
fn unwrap_response(mut body: Value) -> AdapterResult<Value> {
    let code = body.get("code").and_then(Value::as_i64).unwrap_or(0);
    if code != 0 {
        let msg = body.get("msg").and_then(Value::as_str);
        return Err(ApiError::new(code, msg).into());
    }

    match body.get_mut("data").map(Value::take) {
        Some(data) => Ok(data),
        None => Ok(body),
    }
}

fn query_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::State;
    use axum::http::{HeaderMap, Method, Uri};
    use axum::{Json, Router};
    use tokio::net::TcpListener;

    #[derive(Debug, Clone)]
    struct Recorded {
        method: String,
        target: String,
        session_key: Option<String>,
        body: Option<Value>,
    }

    type Log = Arc<Mutex<Vec<Recorded>>>;

    #[derive(Clone)]
    struct Mock {
        route: Arc<dyn Fn(&str) -> Value + Send + Sync>,
        log: Log,
    }

    async fn record(
        State(mock): State<Mock>,
        method: Method,
        uri: Uri,
        headers: HeaderMap,
        body: Option<Json<Value>>,
    ) -> Json<Value> {
        let session_key = headers
            .get("sessionkey")
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        mock.log.lock().push(Recorded {
            method: method.to_string(),
            target: uri.to_string(),
            session_key,
            body: body.map(|Json(body)| body),
        });
        Json((mock.route)(uri.path()))
    }

    /// Serves canned JSON bodies chosen by request path.
    async fn mock_server<F>(route: F) -> (MiraiConfig, Log)
    where
        F: Fn(&str) -> Value + Send + Sync + 'static,
    {
        let log: Log = Arc::default();
        let mock = Mock {
            route: Arc::new(route),
            log: Arc::clone(&log),
        };
        let app = Router::new().fallback(record).with_state(mock);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move { axum::serve(listener, app).await });

        let config = MiraiConfig {
            host: "127.0.0.1".to_string(),
            port,
            poll_interval_ms: 10,
            ..MiraiConfig::default()
        };
        (config, log)
    }

    fn adapter(config: MiraiConfig) -> HttpAdapter {
        let client = Client::builder().no_proxy().build().unwrap();
        HttpAdapter::with_client(config, client).unwrap()
    }

    fn targets(log: &Log) -> Vec<String> {
        log.lock().iter().map(|r| r.target.clone()).collect()
    }

    #[test]
    fn test_unwrap_response() {
        assert_eq!(
            unwrap_response(json!({"code": 0, "data": [1, 2]})).unwrap(),
            json!([1, 2])
        );
        assert_eq!(
            unwrap_response(json!({"code": 0, "messageId": 7})).unwrap(),
            json!({"code": 0, "messageId": 7})
        );

        let err = unwrap_response(json!({"code": 10, "msg": ""})).unwrap_err();
        assert!(matches!(err, AdapterError::Api(ApiError { code: 10, .. })));
    }

    #[tokio::test]
    async fn test_login_verifies_and_binds() {
        let (mut config, log) = mock_server(|path| match path {
            "/verify" => json!({"code": 0, "session": "S1"}),
            _ => json!({"code": 0, "msg": "success"}),
        })
        .await;
        config.verify_key = Some("key".to_string());

        let adapter = adapter(config);
        adapter.login(10001).await.unwrap();
        assert_eq!(adapter.session_key().as_deref(), Some("S1"));

        let log = log.lock().clone();
        assert_eq!(log[0].target, "/verify");
        assert_eq!(log[0].body, Some(json!({"verifyKey": "key"})));
        assert_eq!(log[1].target, "/bind");
        assert_eq!(log[1].body, Some(json!({"sessionKey": "S1", "qq": 10001})));
    }

    #[tokio::test]
    async fn test_login_single_mode_without_key() {
        let (mut config, log) = mock_server(|_| json!({"code": 0})).await;
        config.single_mode = true;

        let adapter = adapter(config);
        adapter.login(10001).await.unwrap();
        assert!(adapter.session_key().is_some());
        assert!(log.lock().is_empty());

        adapter.shutdown().await.unwrap();
        assert!(log.lock().is_empty());
        assert!(adapter.session_key().is_none());
    }

    #[tokio::test]
    async fn test_login_rejected() {
        let (mut config, _log) = mock_server(|_| json!({"code": 1, "msg": "wrong key"})).await;
        config.verify_key = Some("bad".to_string());

        let err = adapter(config).login(10001).await.unwrap_err();
        assert!(matches!(err, AdapterError::Api(ApiError { code: 1, .. })));
    }

    #[tokio::test]
    async fn test_call_api_get_and_post() {
        let (mut config, log) = mock_server(|path| match path {
            "/memberList" => json!({"code": 0, "data": [{"id": 1}]}),
            "/sendGroupMessage" => json!({"code": 0, "messageId": 42}),
            _ => json!({"code": 0}),
        })
        .await;
        config.single_mode = true;

        let adapter = adapter(config);
        let err = adapter
            .call_api("about", ApiMethod::Get, Value::Null)
            .await
            .unwrap_err();
        assert!(matches!(err, AdapterError::NotLoggedIn));

        adapter.login(10001).await.unwrap();
        let key = adapter.session_key();

        let data = adapter
            .call_api("memberList", ApiMethod::Get, json!({"target": 20002, "name": "a b"}))
            .await
            .unwrap();
        assert_eq!(data, json!([{"id": 1}]));

        let body = json!({"target": 20002, "messageChain": [{"type": "Plain", "text": "hi"}]});
        let reply = adapter
            .call_api("sendGroupMessage", ApiMethod::Post, body.clone())
            .await
            .unwrap();
        assert_eq!(reply["messageId"], 42);

        let log = log.lock().clone();
        assert_eq!(log[0].method, "GET");
        assert_eq!(log[0].body, None);
        let url = Url::parse(&format!("http://mirai{}", log[0].target)).unwrap();
        assert_eq!(url.path(), "/memberList");
        let mut pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        pairs.sort();
        assert_eq!(
            pairs,
            vec![
                ("name".to_string(), "a b".to_string()),
                ("target".to_string(), "20002".to_string()),
            ]
        );
        assert_eq!(log[0].session_key, key);
        assert_eq!(log[1].method, "POST");
        assert_eq!(log[1].body, Some(body));
        assert_eq!(log[1].session_key, key);
    }

    #[tokio::test]
    async fn test_polling_delivers_events() {
        let (mut config, log) = mock_server(|path| match path {
            "/countMessage" => json!({"code": 0, "data": 2}),
            "/fetchMessage" => json!({"code": 0, "data": [
                {"type": "FriendMessage", "n": 1},
                {"type": "FriendMessage", "n": 2}
            ]}),
            _ => json!({"code": 0}),
        })
        .await;
        config.fetch_count = 2;

        let adapter = adapter(config);
        adapter.login(10001).await.unwrap();

        let (tx, mut rx) = mpsc::channel(8);
        adapter.start(tx).await.unwrap();
        assert!(adapter.is_polling());

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert_eq!(first["n"], 1);
        assert_eq!(second["n"], 2);

        adapter.shutdown().await.unwrap();
        assert!(!adapter.is_polling());

        let targets = targets(&log);
        assert!(targets.contains(&"/fetchMessage?count=2".to_string()));
        assert_eq!(targets.last().map(String::as_str), Some("/release"));
    }

    #[tokio::test]
    async fn test_start_requires_login() {
        let (config, _log) = mock_server(|_| json!({"code": 0})).await;
        let (tx, _rx) = mpsc::channel(1);
        let err = adapter(config).start(tx).await.unwrap_err();
        assert!(matches!(err, AdapterError::NotLoggedIn));
    }
}
