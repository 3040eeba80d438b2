//! Error types shared by adapters and bots.
//!
//! Protocol crates map their transport failures onto [`AdapterError`] so the
//! runtime can report them without knowing which HTTP client produced them.

use std::fmt;

use thiserror::Error;

// =============================================================================
// API Errors
// =============================================================================

/// A non-zero status code returned by the bot protocol server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    /// The status code from the response body.
    pub code: i64,
    /// The message sent by the server, or the canonical description of `code`.
    pub message: String,
}

impl ApiError {
    /// Creates an API error, falling back to the canonical description when
    /// the server did not send a message.
    pub fn new(code: i64, message: Option<&str>) -> Self {
        let message = match message {
            Some(msg) if !msg.is_empty() => msg.to_string(),
            _ => Self::describe(code).to_string(),
        };
        Self { code, message }
    }

    /// Returns the canonical description of a status code.
    pub fn describe(code: i64) -> &'static str {
        match code {
            0 => "正常",
            1 => "Verify Key 错误",
            2 => "指定的 Bot 不存在",
            3 => "Session 失效或不存在",
            4 => "Session 未认证或未激活",
            5 => "发送消息目标不存在，或指定对象不存在",
            6 => "指定文件不存在",
            10 => "Bot 无对应操作的权限",
            20 => "Bot 被禁言",
            30 => "消息过长",
            400 => "参数错误",
            500 => "mirai 内部错误",
            _ => "未知错误",
        }
    }

    /// Whether the error means the session has to be re-established.
    pub fn is_session_error(&self) -> bool {
        matches!(self.code, 3 | 4)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "API error ({}): {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

// =============================================================================
// Adapter Errors
// =============================================================================

/// Errors that can occur in adapter operations.
#[derive(Debug, Clone, Error)]
pub enum AdapterError {
    /// The request never produced a usable response.
    #[error("network error: {0}")]
    Network(String),

    /// The server answered with a non-zero status code.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// The response body could not be decoded.
    #[error("failed to decode response: {reason}")]
    Decode {
        /// Reason for failure.
        reason: String,
    },

    /// An API was called before `login`.
    #[error("adapter is not logged in")]
    NotLoggedIn,

    /// The parameters of an API call are incomplete.
    #[error("invalid API parameters: {0}")]
    InvalidParams(String),

    /// The adapter configuration is unusable.
    #[error("invalid adapter configuration: {0}")]
    InvalidConfig(String),

    /// Internal adapter error.
    #[error("adapter error: {0}")]
    Internal(String),
}

impl AdapterError {
    /// Creates a network error.
    pub fn network(msg: impl Into<String>) -> Self {
        Self::Network(msg.into())
    }

    /// Creates a decode error.
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode { reason: msg.into() }
    }

    /// Creates an internal adapter error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

impl From<serde_json::Error> for AdapterError {
    fn from(err: serde_json::Error) -> Self {
        Self::decode(err.to_string())
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for adapter operations.
pub type AdapterResult<T> = Result<T, AdapterError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_uses_canonical_message() {
        let err = ApiError::new(5, None);
        assert_eq!(err.message, "发送消息目标不存在，或指定对象不存在");
        assert_eq!(
            err.to_string(),
            "API error (5): 发送消息目标不存在，或指定对象不存在"
        );

        let err = ApiError::new(5, Some(""));
        assert_eq!(err.message, "发送消息目标不存在，或指定对象不存在");
    }

    #[test]
    fn test_api_error_keeps_server_message() {
        let err = ApiError::new(400, Some("missing target"));
        assert_eq!(err.message, "missing target");
        assert!(!err.is_session_error());
        assert!(ApiError::new(3, None).is_session_error());
    }

    #[test]
    fn test_adapter_error_from_api_error() {
        let err: AdapterError = ApiError::new(20, None).into();
        assert!(matches!(err, AdapterError::Api(ApiError { code: 20, .. })));
    }
}
