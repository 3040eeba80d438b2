//! mirai-api-http events.
//!
//! # Hierarchy
//!
//! ```text
//! Event
//! ├── MessageEvent
//! │   ├── FriendMessage
//! │   ├── GroupMessage
//! │   ├── TempMessage
//! │   ├── StrangerMessage
//! │   └── OtherClientMessage
//! ├── GroupEvent
//! │   └── GroupRecallEvent
//! ├── FriendRecallEvent
//! ├── NudgeEvent
//! └── UnknownEvent          ← any other `type`
//! ```
//!
//! Subscribing to `"MessageEvent"` on the bus receives all five message
//! events. Message chains inside events are decoded leniently: components of
//! an unsupported type become `Unknown` instead of failing the event.

use std::any::Any;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use yiri_core::{BoxedEvent, Event, ROOT_EVENT, TypedEvent};

use crate::error::DecodingError;
use crate::model::chain::{MessageChain, deserialize_lenient};
use crate::model::entities::{Client, Friend, Group, GroupMember, Subject};

macro_rules! impl_event {
    ($ty:ident, [$($parent:literal),*]) => {
        impl_event!(@impl $ty, [$($parent),*], |_: &$ty| String::new());
    };
    ($ty:ident, [$($parent:literal),*], message) => {
        impl_event!(@impl $ty, [$($parent),*], |e: &$ty| e.message_chain.plain_text());

        impl MessageEvent for $ty {
            fn message_chain(&self) -> &MessageChain {
                &self.message_chain
            }

            fn sender_id(&self) -> i64 {
                self.sender.id
            }
        }
    };
    (@impl $ty:ident, [$($parent:literal),*], $text:expr) => {
        impl Event for $ty {
            fn event_name(&self) -> &'static str {
                stringify!($ty)
            }

            fn event_chain(&self) -> &'static [&'static str] {
                &[stringify!($ty), $($parent,)* ROOT_EVENT]
            }

            fn as_any(&self) -> &dyn Any {
                self
            }

            fn bot_id(&self) -> Option<i64> {
                self.received_by
            }

            fn plain_text(&self) -> String {
                ($text)(self)
            }
        }

        impl TypedEvent for $ty {
            const NAME: &'static str = stringify!($ty);
        }
    };
}

/// Common accessors of message events.
pub trait MessageEvent: Event {
    /// The received message.
    fn message_chain(&self) -> &MessageChain;

    /// The account that sent the message.
    fn sender_id(&self) -> i64;

    /// The message id, or `-1` if the chain has no source.
    fn message_id(&self) -> i64 {
        self.message_chain().message_id()
    }
}

// ============================================================================
// Message Events
// ============================================================================

/// A message from a friend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FriendMessage {
    pub sender: Friend,
    #[serde(deserialize_with = "deserialize_lenient")]
    pub message_chain: MessageChain,
    /// Account of the bot that received the event.
    #[serde(skip)]
    pub received_by: Option<i64>,
}

/// A message in a group.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupMessage {
    pub sender: GroupMember,
    #[serde(deserialize_with = "deserialize_lenient")]
    pub message_chain: MessageChain,
    #[serde(skip)]
    pub received_by: Option<i64>,
}

impl GroupMessage {
    /// The group the message was sent in.
    pub fn group(&self) -> &Group {
        &self.sender.group
    }
}

/// A private message from a group member who is not a friend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TempMessage {
    pub sender: GroupMember,
    #[serde(deserialize_with = "deserialize_lenient")]
    pub message_chain: MessageChain,
    #[serde(skip)]
    pub received_by: Option<i64>,
}

/// A message from a stranger.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrangerMessage {
    pub sender: Friend,
    #[serde(deserialize_with = "deserialize_lenient")]
    pub message_chain: MessageChain,
    #[serde(skip)]
    pub received_by: Option<i64>,
}

/// A message from another client of the bot account.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OtherClientMessage {
    pub sender: Client,
    #[serde(deserialize_with = "deserialize_lenient")]
    pub message_chain: MessageChain,
    #[serde(skip)]
    pub received_by: Option<i64>,
}

impl_event!(FriendMessage, ["MessageEvent"], message);
impl_event!(GroupMessage, ["MessageEvent"], message);
impl_event!(TempMessage, ["MessageEvent"], message);
impl_event!(StrangerMessage, ["MessageEvent"], message);
impl_event!(OtherClientMessage, ["MessageEvent"], message);

// ============================================================================
// Notice Events
// ============================================================================

/// A friend message was recalled.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FriendRecallEvent {
    pub author_id: i64,
    pub message_id: i64,
    pub time: i64,
    /// The friend or the bot.
    pub operator: i64,
    #[serde(skip)]
    pub received_by: Option<i64>,
}

/// A group message was recalled.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupRecallEvent {
    pub author_id: i64,
    pub message_id: i64,
    pub time: i64,
    pub group: Group,
    /// `None` when the bot recalled it.
    #[serde(default)]
    pub operator: Option<GroupMember>,
    #[serde(skip)]
    pub received_by: Option<i64>,
}

/// Someone nudged an avatar.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NudgeEvent {
    pub from_id: i64,
    pub target: i64,
    pub subject: Subject,
    pub action: String,
    pub suffix: String,
    #[serde(skip)]
    pub received_by: Option<i64>,
}

/// An event this crate has no type for.
#[derive(Debug, Clone)]
pub struct UnknownEvent {
    /// The `type` field of the event.
    pub type_name: String,
    /// The event as received.
    pub raw: Value,
    pub received_by: Option<i64>,
}

impl_event!(FriendRecallEvent, []);
impl_event!(GroupRecallEvent, ["GroupEvent"]);
impl_event!(NudgeEvent, []);
impl_event!(UnknownEvent, []);

// ============================================================================
// Decoding
// ============================================================================

/// Any event delivered by mirai-api-http.
#[derive(Debug, Clone)]
pub enum MiraiEvent {
    FriendMessage(FriendMessage),
    GroupMessage(GroupMessage),
    TempMessage(TempMessage),
    StrangerMessage(StrangerMessage),
    OtherClientMessage(OtherClientMessage),
    FriendRecallEvent(FriendRecallEvent),
    GroupRecallEvent(GroupRecallEvent),
    NudgeEvent(NudgeEvent),
    Unknown(UnknownEvent),
}

impl MiraiEvent {
    /// Decodes a raw event object.
    ///
    /// Events with an unrecognised `type` become [`MiraiEvent::Unknown`].
    pub fn from_value(value: Value) -> Result<Self, DecodingError> {
        let Some(type_name) = value.get("type").and_then(Value::as_str).map(str::to_string)
        else {
            return Err(DecodingError::MissingType {
                raw: value.to_string(),
            });
        };

        fn decode<T: serde::de::DeserializeOwned>(
            type_name: &str,
            value: Value,
        ) -> Result<T, DecodingError> {
            serde_json::from_value(value).map_err(|source| DecodingError::InvalidEvent {
                type_name: type_name.to_string(),
                source,
            })
        }

        let event = match type_name.as_str() {
            "FriendMessage" => Self::FriendMessage(decode(&type_name, value)?),
            "GroupMessage" => Self::GroupMessage(decode(&type_name, value)?),
            "TempMessage" => Self::TempMessage(decode(&type_name, value)?),
            "StrangerMessage" => Self::StrangerMessage(decode(&type_name, value)?),
            "OtherClientMessage" => Self::OtherClientMessage(decode(&type_name, value)?),
            "FriendRecallEvent" => Self::FriendRecallEvent(decode(&type_name, value)?),
            "GroupRecallEvent" => Self::GroupRecallEvent(decode(&type_name, value)?),
            "NudgeEvent" => Self::NudgeEvent(decode(&type_name, value)?),
            _ => Self::Unknown(UnknownEvent {
                type_name,
                raw: value,
                received_by: None,
            }),
        };
        Ok(event)
    }

    /// Records which bot account received the event.
    pub fn received_by(mut self, qq: i64) -> Self {
        let slot = match &mut self {
            Self::FriendMessage(e) => &mut e.received_by,
            Self::GroupMessage(e) => &mut e.received_by,
            Self::TempMessage(e) => &mut e.received_by,
            Self::StrangerMessage(e) => &mut e.received_by,
            Self::OtherClientMessage(e) => &mut e.received_by,
            Self::FriendRecallEvent(e) => &mut e.received_by,
            Self::GroupRecallEvent(e) => &mut e.received_by,
            Self::NudgeEvent(e) => &mut e.received_by,
            Self::Unknown(e) => &mut e.received_by,
        };
        *slot = Some(qq);
        self
    }

    /// Returns the wire name of the event.
    pub fn type_name(&self) -> &str {
        match self {
            Self::Unknown(e) => &e.type_name,
            other => other.as_event().event_name(),
        }
    }

    fn as_event(&self) -> &dyn Event {
        match self {
            Self::FriendMessage(e) => e,
            Self::GroupMessage(e) => e,
            Self::TempMessage(e) => e,
            Self::StrangerMessage(e) => e,
            Self::OtherClientMessage(e) => e,
            Self::FriendRecallEvent(e) => e,
            Self::GroupRecallEvent(e) => e,
            Self::NudgeEvent(e) => e,
            Self::Unknown(e) => e,
        }
    }

    /// Type-erases the event for the bus.
    pub fn into_boxed(self) -> BoxedEvent {
        match self {
            Self::FriendMessage(e) => BoxedEvent::new(e),
            Self::GroupMessage(e) => BoxedEvent::new(e),
            Self::TempMessage(e) => BoxedEvent::new(e),
            Self::StrangerMessage(e) => BoxedEvent::new(e),
            Self::OtherClientMessage(e) => BoxedEvent::new(e),
            Self::FriendRecallEvent(e) => BoxedEvent::new(e),
            Self::GroupRecallEvent(e) => BoxedEvent::new(e),
            Self::NudgeEvent(e) => BoxedEvent::new(e),
            Self::Unknown(e) => BoxedEvent::new(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::component::{ComponentKind, MessageComponent};
    use serde_json::json;

    fn group_message() -> Value {
        json!({
            "type": "GroupMessage",
            "sender": {
                "id": 10001,
                "memberName": "Alice",
                "permission": "MEMBER",
                "group": {"id": 20002, "name": "Chat", "permission": "ADMINISTRATOR"}
            },
            "messageChain": [
                {"type": "Source", "id": 7, "time": 1700000000},
                {"type": "At", "target": 30003, "display": "@bot"},
                {"type": "Plain", "text": " hello"},
                {"type": "Hologram", "x": 1}
            ]
        })
    }

    #[test]
    fn test_decode_group_message() {
        let event = MiraiEvent::from_value(group_message()).unwrap().received_by(30003);
        assert_eq!(event.type_name(), "GroupMessage");

        let MiraiEvent::GroupMessage(message) = event.clone() else {
            panic!("expected a group message");
        };
        assert_eq!(message.group().id, 20002);
        assert_eq!(message.sender_id(), 10001);
        assert_eq!(message.message_id(), 7);
        assert_eq!(message.message_chain.at_targets(), vec![30003]);
        assert_eq!(message.message_chain.len(), 3);
        assert!(message.message_chain.contains_kind(ComponentKind::Unknown));

        let boxed = event.into_boxed();
        assert!(boxed.belongs_to("MessageEvent"));
        assert_eq!(boxed.bot_id(), Some(30003));
        assert_eq!(boxed.plain_text(), " hello");
        assert_eq!(
            boxed.event_chain(),
            &["GroupMessage", "MessageEvent", ROOT_EVENT]
        );
    }

    #[test]
    fn test_decode_friend_message() {
        let event = MiraiEvent::from_value(json!({
            "type": "FriendMessage",
            "sender": {"id": 1, "nickname": "bob", "remark": ""},
            "messageChain": [{"type": "Plain", "text": "hi"}]
        }))
        .unwrap();

        let MiraiEvent::FriendMessage(message) = event else {
            panic!("expected a friend message");
        };
        assert_eq!(message.message_chain[0], MessageComponent::plain("hi"));
        assert_eq!(message.message_id(), -1);
    }

    #[test]
    fn test_unknown_and_invalid_events() {
        let event = MiraiEvent::from_value(json!({"type": "BotOnlineEvent", "qq": 1})).unwrap();
        assert_eq!(event.type_name(), "BotOnlineEvent");
        let boxed = event.into_boxed();
        assert!(boxed.is::<UnknownEvent>());
        assert_eq!(boxed.event_name(), "UnknownEvent");

        let err = MiraiEvent::from_value(json!({"type": "FriendMessage"})).unwrap_err();
        assert!(matches!(err, DecodingError::InvalidEvent { .. }));

        let err = MiraiEvent::from_value(json!({"qq": 1})).unwrap_err();
        assert!(matches!(err, DecodingError::MissingType { .. }));
    }

    #[test]
    fn test_decode_nudge_and_recall() {
        let nudge = MiraiEvent::from_value(json!({
            "type": "NudgeEvent",
            "fromId": 1,
            "target": 2,
            "subject": {"id": 3, "kind": "Group"},
            "action": "戳了戳",
            "suffix": "的脸"
        }))
        .unwrap();
        assert!(nudge.into_boxed().is::<NudgeEvent>());

        let recall = MiraiEvent::from_value(json!({
            "type": "GroupRecallEvent",
            "authorId": 1,
            "messageId": 9,
            "time": 1700000000,
            "group": {"id": 3, "name": "g", "permission": "OWNER"},
            "operator": null
        }))
        .unwrap();
        let boxed = recall.into_boxed();
        assert!(boxed.belongs_to("GroupEvent"));
        assert!(boxed.downcast_ref::<GroupRecallEvent>().unwrap().operator.is_none());
    }
}
