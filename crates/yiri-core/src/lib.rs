//! # Yiri Core
//!
//! Protocol-neutral building blocks of the Yiri bot SDK:
//!
//! - **Events**: type-erased events with a name hierarchy ([`Event`], [`BoxedEvent`])
//! - **Event bus**: priority-ordered, hierarchy-aware dispatch ([`EventBus`], [`Propagation`])
//! - **Adapters**: the connection seam to a protocol server ([`Adapter`], [`ApiMethod`])
//! - **Bots**: one logged-in account driving an adapter ([`Bot`], [`BotStatus`])
//! - **Messages**: protocol-neutral text extraction ([`Message`], [`MessageSegment`])
//!
//! ```text
//! ┌─────────────┐  raw JSON  ┌───────┐  BoxedEvent  ┌──────────┐     ┌─────────┐
//! │   Adapter   │──────────▶│  Bot  │─────────────▶│ EventBus │────▶│ Handler │
//! │ (HTTP poll) │◀──────────│       │              └──────────┘────▶│ Handler │
//! └─────────────┘  call_api  └───────┘                               └─────────┘
//! ```

pub mod adapter;
pub mod bot;
pub mod bus;
pub mod error;
pub mod event;
pub mod message;

pub use adapter::{Adapter, ApiMethod, BoxedAdapter};
pub use bot::{Bot, BotStatus, BoxedBot, downcast_bot};
pub use bus::{BoxFuture, EventBus, EventHandler, Propagation, SubscriptionId};
pub use error::{AdapterError, AdapterResult, ApiError};
pub use event::{BoxedEvent, Event, ROOT_EVENT, TypedEvent};
pub use message::{Message, MessageSegment};

/// Prelude for common imports.
pub mod prelude {
    pub use super::{
        Adapter, ApiMethod, Bot, BoxedEvent, Event, EventBus, Message, MessageSegment,
        Propagation, TypedEvent,
    };
}
