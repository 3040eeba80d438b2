//! Priority-ordered event bus.
//!
//! Handlers subscribe to an event name with an integer priority; lower values
//! run first. When an event is emitted the bus walks the event's
//! [`event_chain`](crate::Event::event_chain) and, for every name, runs each
//! priority group in ascending order. Handlers within one group run
//! concurrently.
//!
//! The value a handler returns steers the rest of the dispatch:
//!
//! | [`Propagation`]     | effect                                                  |
//! |---------------------|---------------------------------------------------------|
//! | `Continue`          | nothing                                                 |
//! | `StopExecution`     | skip the remaining groups of the current event name     |
//! | `StopPropagation`   | stop the dispatch entirely                              |
//!
//! Because a group runs concurrently, its other handlers still complete even
//! when one of them asks to stop.
//!
//! ```rust,ignore
//! let bus = EventBus::new();
//! bus.subscribe("MessageEvent", 0, |event: BoxedEvent| async move {
//!     tracing::info!(text = %event.plain_text(), "message");
//! });
//! bus.emit(BoxedEvent::new(friend_message)).await;
//! ```

use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::future::join_all;
use parking_lot::RwLock;
use tracing::{Instrument, debug, debug_span, warn};

use crate::event::{BoxedEvent, TypedEvent};

/// A boxed future that is `Send`.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A type-erased event handler.
pub type EventHandler = Arc<dyn Fn(BoxedEvent) -> BoxFuture<'static, Propagation> + Send + Sync>;

// ============================================================================
// Propagation
// ============================================================================

/// What the bus should do after a handler finishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Propagation {
    /// Keep dispatching.
    #[default]
    Continue,
    /// Skip the lower-priority handlers of the current event name, then
    /// continue with the parent names.
    StopExecution,
    /// Stop dispatching this event.
    StopPropagation,
}

impl From<()> for Propagation {
    fn from(_: ()) -> Self {
        Propagation::Continue
    }
}

/// Identifies a subscription so it can be removed later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

fn boxed<Fut, R>(fut: Fut) -> BoxFuture<'static, Propagation>
where
    Fut: Future<Output = R> + Send + 'static,
    R: Into<Propagation>,
{
    Box::pin(async move { fut.await.into() })
}

type PriorityGroups = BTreeMap<i32, Vec<(SubscriptionId, EventHandler)>>;

// ============================================================================
// EventBus
// ============================================================================

/// Dispatches events to subscribed handlers.
///
/// `EventBus` is `Send + Sync`; share it behind an `Arc`. Subscribing from
/// inside a handler is allowed and takes effect for the next emitted event.
#[derive(Default)]
pub struct EventBus {
    subscribers: RwLock<HashMap<String, PriorityGroups>>,
    next_id: AtomicU64,
}

impl EventBus {
    /// Creates an empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes `handler` to `event_name` at the given priority.
    pub fn subscribe<F, Fut, R>(
        &self,
        event_name: impl Into<String>,
        priority: i32,
        handler: F,
    ) -> SubscriptionId
    where
        F: Fn(BoxedEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: Into<Propagation>,
    {
        let handler: EventHandler = Arc::new(move |event: BoxedEvent| boxed(handler(event)));
        self.subscribe_boxed(event_name.into(), priority, handler)
    }

    /// Subscribes a handler that receives the concrete event type.
    ///
    /// The handler is registered under [`TypedEvent::NAME`]; events of other
    /// types delivered under the same name are ignored.
    pub fn on<E, F, Fut, R>(&self, priority: i32, handler: F) -> SubscriptionId
    where
        E: TypedEvent,
        F: Fn(E) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: Into<Propagation>,
    {
        let handler: EventHandler = Arc::new(move |event: BoxedEvent| {
            match event.downcast_ref::<E>().cloned() {
                Some(typed) => boxed(handler(typed)),
                None => boxed(async {}),
            }
        });
        self.subscribe_boxed(E::NAME.to_string(), priority, handler)
    }

    fn subscribe_boxed(
        &self,
        event_name: String,
        priority: i32,
        handler: EventHandler,
    ) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        debug!(event = %event_name, priority, id = id.0, "Subscribed handler");
        self.subscribers
            .write()
            .entry(event_name)
            .or_default()
            .entry(priority)
            .or_default()
            .push((id, handler));
        id
    }

    /// Removes a subscription. Returns `false` if it was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers.write();
        let mut removed = false;

        for groups in subscribers.values_mut() {
            for handlers in groups.values_mut() {
                let before = handlers.len();
                handlers.retain(|(sid, _)| *sid != id);
                removed |= handlers.len() != before;
            }
            groups.retain(|_, handlers| !handlers.is_empty());
        }
        subscribers.retain(|_, groups| !groups.is_empty());

        if !removed {
            warn!(id = id.0, "Tried to remove a handler that is not subscribed");
        }
        removed
    }

    /// Returns the number of handlers subscribed directly to `event_name`.
    pub fn subscriber_count(&self, event_name: &str) -> usize {
        self.subscribers
            .read()
            .get(event_name)
            .map(|groups| groups.values().map(Vec::len).sum())
            .unwrap_or(0)
    }

    /// Snapshot of the handler groups for one name, in priority order.
    fn groups_for(&self, event_name: &str) -> Vec<Vec<EventHandler>> {
        let subscribers = self.subscribers.read();
        subscribers
            .get(event_name)
            .map(|groups| {
                groups
                    .values()
                    .map(|handlers| handlers.iter().map(|(_, h)| Arc::clone(h)).collect())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Dispatches an event. Returns the number of handlers that ran.
    pub async fn emit(&self, event: BoxedEvent) -> usize {
        let span = debug_span!("emit", event = event.event_name());

        async move {
            let mut called = 0;

            'names: for name in event.event_chain() {
                for group in self.groups_for(name) {
                    called += group.len();
                    let results = join_all(group.iter().map(|h| h(event.clone()))).await;

                    if results.contains(&Propagation::StopPropagation) {
                        debug!(at = %name, "Propagation stopped");
                        break 'names;
                    }
                    if results.contains(&Propagation::StopExecution) {
                        debug!(at = %name, "Execution stopped");
                        continue 'names;
                    }
                }
            }

            called
        }
        .instrument(span)
        .await
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let subscribers = self.subscribers.read();
        f.debug_struct("EventBus")
            .field("event_names", &subscribers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{Event, ROOT_EVENT};
    use parking_lot::Mutex;
    use std::any::Any;

    #[derive(Clone)]
    struct Hello;

    impl Event for Hello {
        fn event_name(&self) -> &'static str {
            "Hello"
        }

        fn event_chain(&self) -> &'static [&'static str] {
            &["Hello", "Greeting", ROOT_EVENT]
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    impl TypedEvent for Hello {
        const NAME: &'static str = "Hello";
    }

    fn recorder(
        bus: &EventBus,
        log: &Arc<Mutex<Vec<&'static str>>>,
        name: &str,
        priority: i32,
        tag: &'static str,
        result: Propagation,
    ) -> SubscriptionId {
        let log = Arc::clone(log);
        bus.subscribe(name, priority, move |_| {
            let log = Arc::clone(&log);
            async move {
                log.lock().push(tag);
                result
            }
        })
    }

    #[tokio::test]
    async fn test_priority_order_and_hierarchy() {
        let bus = EventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        recorder(&bus, &log, ROOT_EVENT, 0, "root", Propagation::Continue);
        recorder(&bus, &log, "Hello", 5, "late", Propagation::Continue);
        recorder(&bus, &log, "Hello", -1, "early", Propagation::Continue);
        recorder(&bus, &log, "Greeting", 0, "parent", Propagation::Continue);

        let called = bus.emit(BoxedEvent::new(Hello)).await;
        assert_eq!(called, 4);
        assert_eq!(*log.lock(), vec!["early", "late", "parent", "root"]);
    }

    #[tokio::test]
    async fn test_stop_execution_moves_to_parent() {
        let bus = EventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        recorder(&bus, &log, "Hello", 0, "first", Propagation::StopExecution);
        recorder(&bus, &log, "Hello", 1, "skipped", Propagation::Continue);
        recorder(&bus, &log, "Greeting", 0, "parent", Propagation::Continue);

        bus.emit(BoxedEvent::new(Hello)).await;
        assert_eq!(*log.lock(), vec!["first", "parent"]);
    }

    #[tokio::test]
    async fn test_stop_propagation_finishes_group() {
        let bus = EventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        recorder(&bus, &log, "Hello", 0, "stopper", Propagation::StopPropagation);
        recorder(&bus, &log, "Hello", 0, "sibling", Propagation::Continue);
        recorder(&bus, &log, ROOT_EVENT, 0, "root", Propagation::Continue);

        let called = bus.emit(BoxedEvent::new(Hello)).await;
        assert_eq!(called, 2);

        let mut seen = log.lock().clone();
        seen.sort_unstable();
        assert_eq!(seen, vec!["sibling", "stopper"]);
    }

    #[tokio::test]
    async fn test_unsubscribe() {
        let bus = EventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        let id = recorder(&bus, &log, "Hello", 0, "gone", Propagation::Continue);
        assert_eq!(bus.subscriber_count("Hello"), 1);
        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
        assert_eq!(bus.subscriber_count("Hello"), 0);

        assert_eq!(bus.emit(BoxedEvent::new(Hello)).await, 0);
        assert!(log.lock().is_empty());
    }

    #[tokio::test]
    async fn test_typed_handler() {
        let bus = EventBus::new();
        let hits = Arc::new(AtomicU64::new(0));

        let counter = Arc::clone(&hits);
        bus.on(0, move |_: Hello| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });

        bus.emit(BoxedEvent::new(Hello)).await;
        bus.emit(BoxedEvent::new(Hello)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }
}
