//! Adapter trait.
//!
//! An adapter owns the connection to one protocol server. It logs an account
//! in, forwards every raw event it receives into a channel, and performs raw
//! API calls. Decoding raw events into typed events is left to the bot that
//! drives the adapter.
//!
//! ```rust,ignore
//! let (tx, mut rx) = tokio::sync::mpsc::channel(64);
//! adapter.login(10001).await?;
//! adapter.start(tx).await?;
//! while let Some(raw) = rx.recv().await {
//!     println!("{raw}");
//! }
//! ```

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;

use crate::error::AdapterResult;

/// How an API is invoked over the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiMethod {
    /// Parameters are sent as a query string.
    Get,
    /// Parameters are sent as a JSON body.
    Post,
    /// RESTful read; parameters are sent as a query string.
    RestGet,
    /// RESTful write; parameters are sent as a JSON body.
    RestPost,
}

impl ApiMethod {
    /// Returns true if parameters travel in the query string.
    pub fn is_query(self) -> bool {
        matches!(self, ApiMethod::Get | ApiMethod::RestGet)
    }
}

impl fmt::Display for ApiMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ApiMethod::Get => "GET",
            ApiMethod::Post => "POST",
            ApiMethod::RestGet => "RESTGET",
            ApiMethod::RestPost => "RESTPOST",
        };
        f.write_str(name)
    }
}

/// The core adapter trait.
#[async_trait]
pub trait Adapter: Send + Sync {
    /// Returns the adapter name (e.g. `"mirai-http"`).
    fn name(&self) -> &'static str;

    /// Authenticates and binds `qq` to a new session.
    async fn login(&self, qq: i64) -> AdapterResult<()>;

    /// Starts delivering raw events into `events`.
    ///
    /// Must return once the background work is spawned; delivery stops after
    /// [`shutdown`](Adapter::shutdown) or when the receiver is dropped.
    async fn start(&self, events: mpsc::Sender<Value>) -> AdapterResult<()>;

    /// Calls an API and returns the `data` part of the response (or the whole
    /// body when the response has no `data` field).
    async fn call_api(&self, api: &str, method: ApiMethod, params: Value) -> AdapterResult<Value>;

    /// Stops event delivery and releases the session.
    async fn shutdown(&self) -> AdapterResult<()>;
}

/// A shared adapter trait object.
pub type BoxedAdapter = Arc<dyn Adapter>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_method() {
        assert!(ApiMethod::Get.is_query());
        assert!(ApiMethod::RestGet.is_query());
        assert!(!ApiMethod::Post.is_query());
        assert_eq!(ApiMethod::RestPost.to_string(), "RESTPOST");
        assert_eq!(
            serde_json::to_string(&ApiMethod::RestGet).unwrap(),
            r#""restget""#
        );
    }
}
