//! Event system for the Yiri SDK.
//!
//! Every event knows its own name plus the names of the event families it
//! belongs to. The [`EventBus`](crate::bus::EventBus) walks that list from
//! the most specific name to the root, so a handler subscribed to
//! `"MessageEvent"` also sees every `"FriendMessage"` and `"GroupMessage"`.
//!
//! ```rust,ignore
//! use yiri_core::{BoxedEvent, Event};
//!
//! #[derive(Clone)]
//! struct Ping;
//!
//! impl Event for Ping {
//!     fn event_name(&self) -> &'static str { "Ping" }
//!     fn event_chain(&self) -> &'static [&'static str] { &["Ping", "Event"] }
//!     fn as_any(&self) -> &dyn std::any::Any { self }
//! }
//!
//! let event = BoxedEvent::new(Ping);
//! assert!(event.is::<Ping>());
//! ```

use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// The name every event chain ends with.
pub const ROOT_EVENT: &str = "Event";

// ============================================================================
// Core Event Trait
// ============================================================================

/// The base trait for all events.
///
/// Events are type-erased as `dyn Event` and can be downcast back to their
/// concrete type through [`as_any`](Event::as_any).
pub trait Event: Any + Send + Sync {
    /// Returns the name of this event type.
    fn event_name(&self) -> &'static str;

    /// Returns the names this event is delivered under, most specific first.
    ///
    /// The first entry should equal [`event_name`](Event::event_name) and the
    /// last should be [`ROOT_EVENT`].
    fn event_chain(&self) -> &'static [&'static str];

    /// Returns a reference to self as `Any` for downcasting.
    fn as_any(&self) -> &dyn Any;

    /// Returns the account the event was received by, if known.
    fn bot_id(&self) -> Option<i64> {
        None
    }

    /// Returns the plain text carried by the event.
    ///
    /// Message events return the concatenation of their text segments; all
    /// other events return an empty string.
    fn plain_text(&self) -> String {
        String::new()
    }
}

/// An event type whose name is known at compile time.
///
/// Used by [`EventBus::on`](crate::bus::EventBus::on) to subscribe with a
/// typed handler.
pub trait TypedEvent: Event + Clone {
    /// The name this type is registered under.
    const NAME: &'static str;
}

// ============================================================================
// Boxed Event
// ============================================================================

/// A type-erased, cheaply clonable event.
#[derive(Clone)]
pub struct BoxedEvent {
    inner: Arc<dyn Event>,
}

impl BoxedEvent {
    /// Creates a new `BoxedEvent` from any type implementing `Event`.
    pub fn new<E: Event>(event: E) -> Self {
        Self {
            inner: Arc::new(event),
        }
    }

    /// Returns the inner `Arc<dyn Event>`.
    pub fn inner(&self) -> &Arc<dyn Event> {
        &self.inner
    }

    /// Attempts to downcast to a concrete event type.
    pub fn downcast_ref<E: Event>(&self) -> Option<&E> {
        self.inner.as_any().downcast_ref()
    }

    /// Returns whether the wrapped event is of type `E`.
    pub fn is<E: Event>(&self) -> bool {
        self.inner.as_any().is::<E>()
    }

    /// Returns whether the event is delivered under `name`.
    pub fn belongs_to(&self, name: &str) -> bool {
        self.inner.event_chain().contains(&name)
    }
}

impl std::ops::Deref for BoxedEvent {
    type Target = dyn Event;

    fn deref(&self) -> &Self::Target {
        self.inner.as_ref()
    }
}

impl fmt::Debug for BoxedEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoxedEvent")
            .field("event_name", &self.event_name())
            .field("event_chain", &self.event_chain())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone)]
    struct Greeting(&'static str);

    impl Event for Greeting {
        fn event_name(&self) -> &'static str {
            "Greeting"
        }

        fn event_chain(&self) -> &'static [&'static str] {
            &["Greeting", "MessageEvent", ROOT_EVENT]
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn plain_text(&self) -> String {
            self.0.to_string()
        }
    }

    struct Other;

    impl Event for Other {
        fn event_name(&self) -> &'static str {
            "Other"
        }

        fn event_chain(&self) -> &'static [&'static str] {
            &["Other", ROOT_EVENT]
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[test]
    fn test_downcast() {
        let event = BoxedEvent::new(Greeting("hi"));
        assert!(event.is::<Greeting>());
        assert!(!event.is::<Other>());
        assert_eq!(event.downcast_ref::<Greeting>().map(|g| g.0), Some("hi"));
        assert_eq!(event.plain_text(), "hi");
    }

    #[test]
    fn test_belongs_to() {
        let event = BoxedEvent::new(Greeting("hi"));
        assert!(event.belongs_to("MessageEvent"));
        assert!(event.belongs_to(ROOT_EVENT));
        assert!(!event.belongs_to("Other"));
        assert_eq!(BoxedEvent::new(Other).plain_text(), "");
    }
}
