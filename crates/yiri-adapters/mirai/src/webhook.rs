//! Webhook adapter for mirai-api-http.
//!
//! Instead of polling, the adapter runs an HTTP server that the `webhook`
//! adapter of mirai-api-http posts events to:
//!
//! - requests whose `bot` header is not the logged-in account get `404`
//! - requests missing one of the configured extra headers get `401`
//! - every accepted event is forwarded to the bot and answered with an empty
//!   command, `{"command": "", "content": {}}`
//!
//! The webhook cannot call APIs by itself. Give it an [`HttpAdapter`] with
//! [`with_api`](WebhookAdapter::with_api) to send messages.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use parking_lot::{Mutex, RwLock};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};
use yiri_core::{Adapter, AdapterError, AdapterResult, ApiMethod};

use crate::adapter::HttpAdapter;
use crate::config::WebhookConfig;

/// Name reported by [`WebhookAdapter::name`](Adapter::name).
pub const WEBHOOK_ADAPTER_NAME: &str = "mirai-webhook";

struct Server {
    addr: SocketAddr,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// State shared by the request handlers.
#[derive(Clone)]
struct Endpoint {
    qq: i64,
    /// Lowercased header names and values.
    extra_headers: Arc<BTreeMap<String, String>>,
    events: mpsc::Sender<Value>,
}

impl Endpoint {
    /// Checks the extra headers. A value may also arrive wrapped in brackets.
    fn authorized(&self, headers: &HeaderMap) -> bool {
        self.extra_headers.iter().all(|(name, expected)| {
            let got = headers
                .get(name.as_str())
                .and_then(|value| value.to_str().ok())
                .map(str::to_lowercase)
                .unwrap_or_default();
            got == *expected || got == format!("[{expected}]")
        })
    }
}

/// The mirai-api-http webhook adapter.
pub struct WebhookAdapter {
    config: WebhookConfig,
    api: Option<HttpAdapter>,
    qq: RwLock<Option<i64>>,
    server: Mutex<Option<Server>>,
}

impl WebhookAdapter {
    /// Creates a webhook adapter that cannot call APIs.
    pub fn new(config: WebhookConfig) -> Self {
        Self {
            config,
            api: None,
            qq: RwLock::new(None),
            server: Mutex::new(None),
        }
    }

    /// Routes API calls, login and logout through `api`.
    pub fn with_api(mut self, api: HttpAdapter) -> Self {
        self.api = Some(api);
        self
    }

    /// Returns the webhook configuration.
    pub fn config(&self) -> &WebhookConfig {
        &self.config
    }

    /// Returns the address the server listens on, once started.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.server.lock().as_ref().map(|server| server.addr)
    }

    fn endpoint(&self, qq: i64, events: mpsc::Sender<Value>) -> Endpoint {
        let extra_headers = self
            .config
            .extra_headers
            .iter()
            .map(|(name, value)| (name.to_lowercase(), value.to_lowercase()))
            .collect();
        Endpoint {
            qq,
            extra_headers: Arc::new(extra_headers),
            events,
        }
    }
}

async fn receive(
    State(endpoint): State<Endpoint>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let bot = headers
        .get("bot")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<i64>().ok());
    if bot != Some(endpoint.qq) {
        debug!(?bot, "[Webhook] Ignoring event for another account");
        return StatusCode::NOT_FOUND.into_response();
    }

    if !endpoint.authorized(&headers) {
        warn!(qq = endpoint.qq, "[Webhook] Rejected request with wrong headers");
        let body = Json(json!({"error": "Unauthorized"}));
        return (StatusCode::UNAUTHORIZED, body).into_response();
    }

    let event: Value = match serde_json::from_slice(&body) {
        Ok(event) => event,
        Err(e) => {
            warn!(qq = endpoint.qq, error = %e, "[Webhook] Received malformed event");
            return StatusCode::BAD_REQUEST.into_response();
        }
    };
    trace!(qq = endpoint.qq, len = body.len(), "[Webhook] Received event");

    if endpoint.events.send(event).await.is_err() {
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }
    Json(json!({"command": "", "content": {}})).into_response()
}

#[async_trait]
impl Adapter for WebhookAdapter {
    fn name(&self) -> &'static str {
        WEBHOOK_ADAPTER_NAME
    }

    async fn login(&self, qq: i64) -> AdapterResult<()> {
        if let Some(api) = &self.api {
            api.login(qq).await?;
        }
        *self.qq.write() = Some(qq);
        info!(qq, "[Webhook] Logged in");
        Ok(())
    }

    async fn start(&self, events: mpsc::Sender<Value>) -> AdapterResult<()> {
        let qq = (*self.qq.read()).ok_or(AdapterError::NotLoggedIn)?;
        if self.server.lock().is_some() {
            debug!(qq, "[Webhook] Server already running");
            return Ok(());
        }

        let route = self.config.normalized_route();
        let router = Router::new()
            .route(&route, post(receive))
            .with_state(self.endpoint(qq, events));

        let bind = (self.config.host.as_str(), self.config.port);
        let listener = TcpListener::bind(bind).await.map_err(|e| {
            AdapterError::network(format!(
                "failed to listen on {}:{}: {e}",
                self.config.host, self.config.port
            ))
        })?;
        let addr = listener
            .local_addr()
            .map_err(|e| AdapterError::network(e.to_string()))?;

        let cancel = CancellationToken::new();
        let stopped = cancel.clone();
        let handle = tokio::spawn(async move {
            let server = axum::serve(listener, router)
                .with_graceful_shutdown(async move { stopped.cancelled().await });
            if let Err(e) = server.await {
                error!(error = %e, "[Webhook] Server error");
            }
        });

        info!(qq, %addr, route = %route, "[Webhook] Listening for events");
        *self.server.lock() = Some(Server {
            addr,
            cancel,
            handle,
        });
        Ok(())
    }

    async fn call_api(&self, api: &str, method: ApiMethod, params: Value) -> AdapterResult<Value> {
        match &self.api {
            Some(http) => http.call_api(api, method, params).await,
            None => Err(AdapterError::InvalidConfig(format!(
                "cannot call {api}: the webhook adapter has no HTTP adapter for API calls"
            ))),
        }
    }

    async fn shutdown(&self) -> AdapterResult<()> {
        let server = self.server.lock().take();
        if let Some(server) = server {
            server.cancel.cancel();
            if let Err(e) = server.handle.await {
                warn!(error = %e, "[Webhook] Server task ended abnormally");
            }
        }

        let result = match &self.api {
            Some(api) => api.shutdown().await,
            None => Ok(()),
        };
        if let Some(qq) = self.qq.write().take() {
            info!(qq, "[Webhook] Logged out");
        }
        result
    }
}
