//! # Yiri Adapter for mirai-api-http
//!
//! This crate connects the Yiri bot SDK to a mirai-api-http server and
//! provides the mirai message model.
//!
//! ## Message Chains
//!
//! A [`MessageChain`] is an ordered list of [`MessageComponent`]s. Chains are
//! built from components, plain strings or raw JSON objects, rendered as
//! `[mirai:...]` code strings and queried like slices:
//!
//! ```rust,ignore
//! use yiri_adapter_mirai::{chain, ComponentKind, MessageComponent};
//!
//! let chain = chain!["Hello ", MessageComponent::at(12345678), "!"]?;
//! assert_eq!(chain.to_code_string(), "Hello [mirai:at:12345678]!");
//! assert!(chain.contains_kind(ComponentKind::At));
//! ```
//!
//! ## Bots
//!
//! A [`MiraiBot`] polls the server through an [`HttpAdapter`], or receives
//! events through a `WebhookAdapter` with the `webhook` feature, and emits
//! every event on a shared [`EventBus`](yiri_core::EventBus):
//!
//! ```text
//! MiraiEvent
//! ├── FriendMessage, GroupMessage, TempMessage,
//! │   StrangerMessage, OtherClientMessage          (MessageEvent)
//! ├── FriendRecallEvent, GroupRecallEvent, NudgeEvent
//! └── Unknown
//! ```

pub mod adapter;
pub mod api;
pub mod bot;
pub mod config;
pub mod error;
pub mod model;
#[cfg(feature = "webhook")]
pub mod webhook;

pub use adapter::{ADAPTER_NAME, HttpAdapter};
pub use api::ApiSpec;
pub use bot::MiraiBot;
pub use config::{MiraiConfig, WebhookConfig};
pub use error::{
    ChainError, ChainResult, ConstructionError, DecodingError, FetchError, ParseError,
    ParseErrorKind,
};
pub use model::*;
#[cfg(feature = "webhook")]
pub use webhook::{WEBHOOK_ADAPTER_NAME, WebhookAdapter};
