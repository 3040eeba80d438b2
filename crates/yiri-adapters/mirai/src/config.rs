//! Configuration for the mirai-api-http adapter.
//!
//! The adapter reads its settings from the `settings` table of a bot entry
//! in the runtime configuration file:
//!
//! ```yaml
//! bots:
//!   - id: main
//!     qq: 12345678
//!     adapter: mirai-http
//!     settings:
//!       verify_key: ${MIRAI_KEY:-}
//!       host: localhost
//!       port: 8080
//!       poll_interval_ms: 1000
//!       single_mode: false
//!       # Receive events through mirai-api-http's webhook instead of polling.
//!       webhook:
//!         port: 8081
//!         route: /events
//!         extra_headers: { x-token: secret }
//! ```

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use yiri_core::{AdapterError, AdapterResult};

/// HTTP polling adapter configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MiraiConfig {
    /// The `verifyKey` configured in mirai-api-http. `None` when
    /// verification is disabled on the server.
    pub verify_key: Option<String>,

    /// Server host (default: "localhost"). `http://` is added when missing.
    pub host: String,

    /// Server port (default: 8080).
    pub port: u16,

    /// Delay between two polls, in milliseconds.
    pub poll_interval_ms: u64,

    /// Upper bound for the number of events pulled by one poll.
    pub fetch_count: u32,

    /// Whether the server runs in single mode, where sessions are neither
    /// bound nor released.
    pub single_mode: bool,

    /// Per-request timeout, in milliseconds.
    pub timeout_ms: u64,

    /// Receive events through a webhook server instead of polling. API calls
    /// still go through HTTP.
    pub webhook: Option<WebhookConfig>,
}

impl Default for MiraiConfig {
    fn default() -> Self {
        Self {
            verify_key: None,
            host: "localhost".to_string(),
            port: 8080,
            poll_interval_ms: 1000,
            fetch_count: 100,
            single_mode: false,
            timeout_ms: 60_000,
            webhook: None,
        }
    }
}

/// Webhook server configuration.
///
/// mirai-api-http posts every event to `http://{host}:{port}{route}` with
/// the account in the `bot` header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebhookConfig {
    /// Address to listen on (default: "0.0.0.0").
    pub host: String,

    /// Port to listen on (default: 8081). 0 picks a free port.
    pub port: u16,

    /// Path the events are posted to (default: "/").
    pub route: String,

    /// Headers every request must carry, as configured in mirai-api-http.
    /// Names and values are compared case-insensitively.
    pub extra_headers: BTreeMap<String, String>,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8081,
            route: "/".to_string(),
            extra_headers: BTreeMap::new(),
        }
    }
}

impl WebhookConfig {
    /// Returns the route with a leading slash.
    pub fn normalized_route(&self) -> String {
        if self.route.starts_with('/') {
            self.route.clone()
        } else {
            format!("/{}", self.route)
        }
    }
}

impl MiraiConfig {
    /// Deserializes the config from a bot entry's `settings` value.
    ///
    /// `null` yields the defaults.
    pub fn from_settings(settings: &Value) -> AdapterResult<Self> {
        if settings.is_null() {
            return Ok(Self::default());
        }
        serde_json::from_value(settings.clone())
            .map_err(|e| AdapterError::InvalidConfig(e.to_string()))
    }

    /// Returns the server base url, `http://{host}:{port}` without a trailing
    /// slash.
    ///
    /// HTTPS is not supported by mirai-api-http and is rejected.
    pub fn base_url(&self) -> AdapterResult<String> {
        let host = self.host.trim();
        let host = if host.starts_with("//") {
            format!("http:{host}")
        } else if host.starts_with("https://") {
            return Err(AdapterError::InvalidConfig(
                "HTTPS is not supported by mirai-api-http".to_string(),
            ));
        } else if !host.starts_with("http://") {
            format!("http://{host}")
        } else {
            host.to_string()
        };

        Ok(format!("{}:{}", host.trim_end_matches('/'), self.port))
    }

    /// Returns the poll interval.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Returns the per-request timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults_from_partial_yaml() {
        let yaml = r#"
verify_key: secret
port: 8081
"#;
        let config: MiraiConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.verify_key.as_deref(), Some("secret"));
        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, 8081);
        assert_eq!(config.poll_interval(), Duration::from_secs(1));
        assert_eq!(config.timeout(), Duration::from_secs(60));
        assert!(!config.single_mode);
    }

    #[test]
    fn test_from_settings() {
        let config = MiraiConfig::from_settings(&Value::Null).unwrap();
        assert_eq!(config, MiraiConfig::default());

        let config = MiraiConfig::from_settings(&json!({"single_mode": true})).unwrap();
        assert!(config.single_mode);
        assert!(config.webhook.is_none());

        let settings = json!({"webhook": {"route": "events", "extra_headers": {"X-Token": "t"}}});
        let webhook = MiraiConfig::from_settings(&settings).unwrap().webhook.unwrap();
        assert_eq!(webhook.port, 8081);
        assert_eq!(webhook.normalized_route(), "/events");
        assert_eq!(webhook.extra_headers["X-Token"], "t");

        let err = MiraiConfig::from_settings(&json!({"port": "eighty"})).unwrap_err();
        assert!(matches!(err, AdapterError::InvalidConfig(_)));
    }

    #[test]
    fn test_base_url_normalization() {
        let with_host = |host: &str| MiraiConfig {
            host: host.to_string(),
            ..MiraiConfig::default()
        };

        assert_eq!(with_host("localhost").base_url().unwrap(), "http://localhost:8080");
        assert_eq!(with_host("//10.0.0.2").base_url().unwrap(), "http://10.0.0.2:8080");
        assert_eq!(with_host("http://example.com/").base_url().unwrap(), "http://example.com:8080");
        assert!(matches!(
            with_host("https://example.com").base_url(),
            Err(AdapterError::InvalidConfig(_))
        ));
    }
}
