//! Message chains.
//!
//! A [`MessageChain`] is an immutable, ordered list of
//! [`MessageComponent`]s plus the optional `Source` and `Quote` metadata that
//! mirai puts in front of received messages.
//!
//! # Building
//!
//! ```rust,ignore
//! use yiri_adapter_mirai::chain;
//! use yiri_adapter_mirai::model::{MessageChain, MessageComponent};
//!
//! // From items: components, strings and raw JSON objects can be mixed.
//! let chain = chain![MessageComponent::at_all(), "Hello World!"]?;
//!
//! // With the builder.
//! let chain = MessageChain::builder().at(10001).text(" hi").build()?;
//!
//! // From a code string.
//! let chain: MessageChain = "[mirai:atall]Hello World!".parse()?;
//! ```
//!
//! # Querying
//!
//! ```rust,ignore
//! let at = MessageChain::new([MessageComponent::at(123), "hi".into()])?;
//! assert!(at <= chain);
//! assert!(chain.contains_kind(ComponentKind::At));
//! let images = chain.components_of_type(ComponentKind::Image);
//! ```

use std::cmp::Ordering;
use std::fmt;
use std::ops::Deref;
use std::str::FromStr;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use tracing::debug;
use yiri_core::Message;

use crate::error::{ChainError, ChainResult, ConstructionError, ParseError};
use crate::model::code;
use crate::model::component::{
    ComponentKind, ImageData, MessageComponent, PokeName, QuoteData, SourceData,
};

// ============================================================================
// Construction Input
// ============================================================================

/// What to do with an element whose `type` cannot be decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DecodePolicy {
    /// Fail the whole chain.
    #[default]
    Strict,
    /// Drop the element.
    Skip,
    /// Replace the element with `Unknown { text: <raw json> }`.
    Placeholder,
}

/// One input element for [`MessageChain::new`].
#[derive(Debug, Clone)]
pub enum ChainItem {
    /// An already built component.
    Component(MessageComponent),
    /// Text, wrapped as `Plain`.
    Text(String),
    /// A JSON object with a `type` field.
    Raw(Value),
}

impl From<MessageComponent> for ChainItem {
    fn from(component: MessageComponent) -> Self {
        Self::Component(component)
    }
}

impl From<String> for ChainItem {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for ChainItem {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<Value> for ChainItem {
    fn from(value: Value) -> Self {
        Self::Raw(value)
    }
}

/// Builds a [`MessageChain`] from a list of items convertible into
/// [`ChainItem`].
///
/// ```rust,ignore
/// let chain = chain![MessageComponent::at(10001), " hello"]?;
/// ```
#[macro_export]
macro_rules! chain {
    () => {
        $crate::model::MessageChain::new(::std::iter::empty::<$crate::model::ChainItem>())
    };
    ($($item:expr),+ $(,)?) => {
        $crate::model::MessageChain::new([$($crate::model::ChainItem::from($item)),+])
    };
}

// ============================================================================
// MessageChain
// ============================================================================

/// An ordered rich-text message.
///
/// Chains never change after construction; every operation that "modifies"
/// a chain returns a new one. A chain holding a `Voice` holds nothing else.
#[derive(Debug, Clone, Default)]
pub struct MessageChain {
    components: Vec<MessageComponent>,
    source: Option<SourceData>,
    quote: Option<Box<QuoteData>>,
}

impl MessageChain {
    // --------------------------------
    // Construction
    // --------------------------------

    /// Creates an empty chain.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Creates a chain holding a single text component.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            components: vec![MessageComponent::plain(text)],
            ..Default::default()
        }
    }

    /// Creates a builder.
    pub fn builder() -> MessageChainBuilder {
        MessageChainBuilder::default()
    }

    /// Builds a chain from mixed items, failing on undecodable JSON.
    pub fn new<I, T>(items: I) -> ChainResult<Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<ChainItem>,
    {
        Self::with_policy(items, DecodePolicy::Strict)
    }

    /// Builds a chain from mixed items with the given decode policy.
    pub fn with_policy<I, T>(items: I, policy: DecodePolicy) -> ChainResult<Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<ChainItem>,
    {
        let mut components = Vec::new();

        for item in items {
            let value = match item.into() {
                ChainItem::Component(component) => {
                    components.push(component);
                    continue;
                }
                ChainItem::Text(text) | ChainItem::Raw(Value::String(text)) => {
                    components.push(MessageComponent::plain(text));
                    continue;
                }
                ChainItem::Raw(value) => value,
            };

            let raw = (policy == DecodePolicy::Placeholder).then(|| value.to_string());
            match MessageComponent::from_value(value) {
                Ok(component) => components.push(component),
                Err(err) => match policy {
                    DecodePolicy::Strict => return Err(err.into()),
                    DecodePolicy::Skip => debug!(error = %err, "Skipping undecodable component"),
                    DecodePolicy::Placeholder => {
                        debug!(error = %err, "Substituting undecodable component");
                        components.push(MessageComponent::unknown(raw.unwrap_or_default()));
                    }
                },
            }
        }

        Ok(Self::from_components(components)?)
    }

    /// Builds a chain from components.
    ///
    /// A leading `Source` is lifted into [`source`](Self::source), then a
    /// leading `Quote` into [`quote`](Self::quote).
    pub fn from_components(
        components: impl IntoIterator<Item = MessageComponent>,
    ) -> Result<Self, ConstructionError> {
        let mut components = components.into_iter().peekable();

        let source = match components.next_if(|c| c.is(ComponentKind::Source)) {
            Some(MessageComponent::Source(source)) => Some(source),
            _ => None,
        };
        let quote = match components.next_if(|c| c.is(ComponentKind::Quote)) {
            Some(MessageComponent::Quote(quote)) => Some(Box::new(quote)),
            _ => None,
        };

        let chain = Self {
            components: components.collect(),
            source,
            quote,
        };
        chain.check()?;
        Ok(chain)
    }

    /// Decodes a chain from its JSON array.
    pub fn from_json(value: Value, policy: DecodePolicy) -> ChainResult<Self> {
        match value {
            Value::Array(items) => Self::with_policy(items, policy),
            other => Err(ChainError::Decoding(
                crate::error::DecodingError::MissingType {
                    raw: other.to_string(),
                },
            )),
        }
    }

    /// Parses a code string.
    pub fn parse_code_string(input: &str) -> Result<Self, ParseError> {
        Ok(Self {
            components: code::parse(input)?,
            ..Default::default()
        })
    }

    fn check(&self) -> Result<(), ConstructionError> {
        if self.components.len() > 1 && self.contains_kind(ComponentKind::Voice) {
            return Err(ConstructionError::VoiceNotAlone);
        }
        let empty_face = |c: &MessageComponent| match c {
            MessageComponent::Face(face) => face.face_id.is_none() && face.name.is_none(),
            _ => false,
        };
        if self.components.iter().any(empty_face) {
            return Err(ConstructionError::EmptyFace);
        }
        Ok(())
    }

    fn derive(&self, components: Vec<MessageComponent>) -> Result<Self, ConstructionError> {
        let chain = Self {
            components,
            source: self.source.clone(),
            quote: self.quote.clone(),
        };
        chain.check()?;
        Ok(chain)
    }

    // --------------------------------
    // Metadata
    // --------------------------------

    /// Returns the components, without source and quote.
    pub fn components(&self) -> &[MessageComponent] {
        &self.components
    }

    /// Consumes the chain and returns its components.
    pub fn into_components(self) -> Vec<MessageComponent> {
        self.components
    }

    /// Returns the source metadata of a received message.
    pub fn source(&self) -> Option<&SourceData> {
        self.source.as_ref()
    }

    /// Returns the quote of a received reply.
    pub fn quote(&self) -> Option<&QuoteData> {
        self.quote.as_deref()
    }

    /// Returns the message id, or `-1` when the chain has no source.
    pub fn message_id(&self) -> i64 {
        self.source.as_ref().map_or(-1, |source| source.id)
    }

    /// Returns a copy with the given source.
    pub fn with_source(mut self, source: SourceData) -> Self {
        self.source = Some(source);
        self
    }

    // --------------------------------
    // Typed indexing
    // --------------------------------

    /// Returns every component of `kind`, in order.
    pub fn components_of_type(&self, kind: ComponentKind) -> Vec<&MessageComponent> {
        self.components.iter().filter(|c| c.is(kind)).collect()
    }

    /// Returns every component whose kind is in `kinds`, in order.
    pub fn components_of_types(&self, kinds: &[ComponentKind]) -> Vec<&MessageComponent> {
        self.components
            .iter()
            .filter(|c| kinds.contains(&c.kind()))
            .collect()
    }

    /// Returns at most `n` leading components of `kind`.
    pub fn first_n_of_type(&self, kind: ComponentKind, n: usize) -> Vec<&MessageComponent> {
        self.components.iter().filter(|c| c.is(kind)).take(n).collect()
    }

    /// Returns the first component of `kind`.
    pub fn get_first(&self, kind: ComponentKind) -> Option<&MessageComponent> {
        self.components.iter().find(|c| c.is(kind))
    }

    /// Returns a new chain holding only the components of the given kinds.
    pub fn select(&self, kinds: &[ComponentKind]) -> Self {
        Self {
            components: self
                .components_of_types(kinds)
                .into_iter()
                .cloned()
                .collect(),
            ..Default::default()
        }
    }

    /// Returns the accounts mentioned by `At` components.
    pub fn at_targets(&self) -> Vec<i64> {
        self.components.iter().filter_map(MessageComponent::at_target).collect()
    }

    /// Returns the data of every `Image` and `FlashImage`.
    pub fn images(&self) -> Vec<&ImageData> {
        self.components.iter().filter_map(MessageComponent::as_image).collect()
    }

    /// Returns the position of the first match in `range`.
    ///
    /// The range is clamped to the chain length.
    pub fn index_of<'a>(
        &self,
        needle: impl Into<Pattern<'a>>,
        range: impl std::ops::RangeBounds<usize>,
    ) -> Option<usize> {
        use std::ops::Bound;

        let needle = needle.into();
        let len = self.components.len();
        let start = match range.start_bound() {
            Bound::Included(&s) => s,
            Bound::Excluded(&s) => s + 1,
            Bound::Unbounded => 0,
        };
        let end = match range.end_bound() {
            Bound::Included(&e) => e + 1,
            Bound::Excluded(&e) => e,
            Bound::Unbounded => len,
        }
        .min(len);

        (start..end).find(|&i| needle.matches(&self.components[i]))
    }

    /// Counts the components matching `needle`.
    pub fn count<'a>(&self, needle: impl Into<Pattern<'a>>) -> usize {
        let needle = needle.into();
        self.components.iter().filter(|c| needle.matches(c)).count()
    }

    // --------------------------------
    // Containment
    // --------------------------------

    /// Whether a component equal to `component` is present.
    pub fn contains_component(&self, component: &MessageComponent) -> bool {
        self.components.iter().any(|c| c == component)
    }

    /// Whether any component of `kind` is present.
    pub fn contains_kind(&self, kind: ComponentKind) -> bool {
        self.components.iter().any(|c| c.is(kind))
    }

    /// Whether `sub` occurs as a contiguous run of components.
    ///
    /// Components are compared whole, so `Plain("h")` does not match inside
    /// `Plain("hi")`. The empty chain is contained in every chain.
    pub fn contains_chain(&self, sub: &MessageChain) -> bool {
        if sub.components.is_empty() {
            return true;
        }
        self.components
            .windows(sub.components.len())
            .any(|window| window == sub.components.as_slice())
    }

    /// Whether `text` occurs in the code string of the chain.
    pub fn contains_text(&self, text: &str) -> bool {
        self.to_code_string().contains(text)
    }

    /// Dispatches to the matching `contains_*` method.
    pub fn has<'a>(&self, needle: impl Into<Needle<'a>>) -> bool {
        match needle.into() {
            Needle::Component(component) => self.contains_component(component),
            Needle::Kind(kind) => self.contains_kind(kind),
            Needle::Chain(chain) => self.contains_chain(chain),
            Needle::Text(text) => self.contains_text(text),
        }
    }

    /// Whether this chain is a sub-chain of `other`.
    pub fn is_sub_chain_of(&self, other: &MessageChain) -> bool {
        other.contains_chain(self)
    }

    // --------------------------------
    // Derived chains
    // --------------------------------

    /// Returns a copy with `item` appended.
    pub fn with(&self, item: impl Into<MessageComponent>) -> Result<Self, ConstructionError> {
        let mut components = self.components.clone();
        components.push(item.into());
        self.derive(components)
    }

    /// Returns a copy with `item` prepended.
    pub fn prepend(&self, item: impl Into<MessageComponent>) -> Result<Self, ConstructionError> {
        let mut components = Vec::with_capacity(self.components.len() + 1);
        components.push(item.into());
        components.extend(self.components.iter().cloned());
        self.derive(components)
    }

    /// Returns `self` followed by `other`. Metadata is taken from `self`.
    pub fn concat(&self, other: &MessageChain) -> Result<Self, ConstructionError> {
        let mut components = self.components.clone();
        components.extend(other.components.iter().cloned());
        self.derive(components)
    }

    /// Returns the components repeated `times` times.
    pub fn repeat(&self, times: usize) -> Result<Self, ConstructionError> {
        self.derive(
            std::iter::repeat_n(&self.components, times)
                .flatten()
                .cloned()
                .collect(),
        )
    }

    /// Joins several chains into one without separators.
    pub fn join<'a>(
        chains: impl IntoIterator<Item = &'a MessageChain>,
    ) -> Result<Self, ConstructionError> {
        Self::from_components(
            chains
                .into_iter()
                .flat_map(|chain| chain.components.iter().cloned()),
        )
    }

    /// Returns a copy without the components matching `needle`.
    ///
    /// At most `limit` matches are removed; `None` removes all of them.
    pub fn exclude<'a>(&self, needle: impl Into<Pattern<'a>>, limit: Option<usize>) -> Self {
        let needle = needle.into();
        let mut remaining = limit.unwrap_or(usize::MAX);
        let components = self
            .components
            .iter()
            .filter(|c| {
                if remaining > 0 && needle.matches(c) {
                    remaining -= 1;
                    false
                } else {
                    true
                }
            })
            .cloned()
            .collect();

        Self {
            components,
            source: self.source.clone(),
            quote: self.quote.clone(),
        }
    }

    // --------------------------------
    // Rendering
    // --------------------------------

    /// Renders the chain as a code string.
    pub fn to_code_string(&self) -> String {
        self.components.iter().map(code::encode).collect()
    }

    /// Renders the chain for display. Does not round-trip.
    pub fn to_display_string(&self) -> String {
        self.components.iter().map(MessageComponent::display).collect()
    }

    /// Concatenates the text of all `Plain` components.
    pub fn plain_text(&self) -> String {
        self.components
            .iter()
            .filter_map(MessageComponent::as_plain)
            .collect()
    }

    /// Builds the JSON array sent to the server.
    ///
    /// Source and quote are left out and attachments carry only the field
    /// chosen by [`resolve_source`](crate::model::AttachmentSource).
    pub fn to_outgoing_json(&self) -> Result<Value, ConstructionError> {
        self.components
            .iter()
            .map(crate::model::attachment::outgoing_json)
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array)
    }
}

// ============================================================================
// Needles
// ============================================================================

/// What [`MessageChain::has`] looks for.
#[derive(Debug, Clone, Copy)]
pub enum Needle<'a> {
    Component(&'a MessageComponent),
    Kind(ComponentKind),
    Chain(&'a MessageChain),
    Text(&'a str),
}

impl<'a> From<&'a MessageComponent> for Needle<'a> {
    fn from(component: &'a MessageComponent) -> Self {
        Self::Component(component)
    }
}

impl From<ComponentKind> for Needle<'_> {
    fn from(kind: ComponentKind) -> Self {
        Self::Kind(kind)
    }
}

impl<'a> From<&'a MessageChain> for Needle<'a> {
    fn from(chain: &'a MessageChain) -> Self {
        Self::Chain(chain)
    }
}

impl<'a> From<&'a str> for Needle<'a> {
    fn from(text: &'a str) -> Self {
        Self::Text(text)
    }
}

/// A component or a kind, used by [`MessageChain::index_of`],
/// [`count`](MessageChain::count) and [`exclude`](MessageChain::exclude).
#[derive(Debug, Clone, Copy)]
pub enum Pattern<'a> {
    Component(&'a MessageComponent),
    Kind(ComponentKind),
}

impl Pattern<'_> {
    fn matches(&self, component: &MessageComponent) -> bool {
        match self {
            Self::Component(needle) => component == *needle,
            Self::Kind(kind) => component.is(*kind),
        }
    }
}

impl<'a> From<&'a MessageComponent> for Pattern<'a> {
    fn from(component: &'a MessageComponent) -> Self {
        Self::Component(component)
    }
}

impl From<ComponentKind> for Pattern<'_> {
    fn from(kind: ComponentKind) -> Self {
        Self::Kind(kind)
    }
}

// ============================================================================
// Trait Implementations
// ============================================================================

impl PartialEq for MessageChain {
    fn eq(&self, other: &Self) -> bool {
        self.components == other.components
    }
}

/// Sub-chain ordering: `a <= b` when `a` occurs contiguously in `b`.
impl PartialOrd for MessageChain {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        if self == other {
            Some(Ordering::Equal)
        } else if other.contains_chain(self) {
            Some(Ordering::Less)
        } else if self.contains_chain(other) {
            Some(Ordering::Greater)
        } else {
            None
        }
    }
}

impl Deref for MessageChain {
    type Target = [MessageComponent];

    fn deref(&self) -> &Self::Target {
        &self.components
    }
}

impl<'a> IntoIterator for &'a MessageChain {
    type Item = &'a MessageComponent;
    type IntoIter = std::slice::Iter<'a, MessageComponent>;

    fn into_iter(self) -> Self::IntoIter {
        self.components.iter()
    }
}

impl IntoIterator for MessageChain {
    type Item = MessageComponent;
    type IntoIter = std::vec::IntoIter<MessageComponent>;

    fn into_iter(self) -> Self::IntoIter {
        self.components.into_iter()
    }
}

impl Message for MessageChain {
    type Segment = MessageComponent;

    fn as_slice(&self) -> &[MessageComponent] {
        &self.components
    }
}

impl fmt::Display for MessageChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for component in &self.components {
            f.write_str(&component.display())?;
        }
        Ok(())
    }
}

impl FromStr for MessageChain {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_code_string(s)
    }
}

impl From<MessageComponent> for MessageChain {
    fn from(component: MessageComponent) -> Self {
        Self {
            components: vec![component],
            ..Default::default()
        }
    }
}

impl Serialize for MessageChain {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeSeq;

        let len = self.components.len()
            + usize::from(self.source.is_some())
            + usize::from(self.quote.is_some());
        let mut seq = serializer.serialize_seq(Some(len))?;
        if let Some(source) = &self.source {
            seq.serialize_element(&MessageComponent::Source(source.clone()))?;
        }
        if let Some(quote) = &self.quote {
            seq.serialize_element(&MessageComponent::Quote(QuoteData::clone(quote)))?;
        }
        for component in &self.components {
            seq.serialize_element(component)?;
        }
        seq.end()
    }
}

impl<'de> Deserialize<'de> for MessageChain {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let items = Vec::<Value>::deserialize(deserializer)?;
        MessageChain::new(items).map_err(D::Error::custom)
    }
}

/// Deserializes a chain, substituting placeholders for unknown components.
///
/// Used for incoming events so one unsupported component does not drop the
/// whole event.
pub fn deserialize_lenient<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<MessageChain, D::Error> {
    let items = Vec::<Value>::deserialize(deserializer)?;
    MessageChain::with_policy(items, DecodePolicy::Placeholder).map_err(D::Error::custom)
}

/// Optional variant of [`deserialize_lenient`] for nested chains.
pub fn deserialize_lenient_opt<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<MessageChain>, D::Error> {
    Option::<Vec<Value>>::deserialize(deserializer)?
        .map(|items| MessageChain::with_policy(items, DecodePolicy::Placeholder))
        .transpose()
        .map_err(D::Error::custom)
}

// ============================================================================
// Builder
// ============================================================================

/// Builder for [`MessageChain`].
#[derive(Debug, Clone, Default)]
pub struct MessageChainBuilder {
    components: Vec<MessageComponent>,
}

impl MessageChainBuilder {
    // --------------------------------
    // Text
    // --------------------------------

    /// Appends text.
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.components.push(MessageComponent::plain(text));
        self
    }

    // --------------------------------
    // Mentions
    // --------------------------------

    /// Appends a mention.
    pub fn at(mut self, target: i64) -> Self {
        self.components.push(MessageComponent::at(target));
        self
    }

    /// Appends a mention of everyone.
    pub fn at_all(mut self) -> Self {
        self.components.push(MessageComponent::at_all());
        self
    }

    // --------------------------------
    // Media
    // --------------------------------

    /// Appends a face.
    pub fn face(mut self, face_id: i64) -> Self {
        self.components.push(MessageComponent::face(face_id));
        self
    }

    /// Appends an image by url.
    pub fn image_url(mut self, url: impl Into<String>) -> Self {
        self.components.push(MessageComponent::image_url(url));
        self
    }

    /// Appends an image by id.
    pub fn image_id(mut self, image_id: impl Into<String>) -> Self {
        self.components.push(MessageComponent::image_id(image_id));
        self
    }

    /// Appends a dice.
    pub fn dice(mut self, value: u8) -> Self {
        self.components.push(MessageComponent::dice(value));
        self
    }

    /// Appends a poke.
    pub fn poke(mut self, name: PokeName) -> Self {
        self.components.push(MessageComponent::poke(name));
        self
    }

    // --------------------------------
    // Generic
    // --------------------------------

    /// Appends any component.
    pub fn component(mut self, component: MessageComponent) -> Self {
        self.components.push(component);
        self
    }

    /// Builds the chain.
    pub fn build(self) -> Result<MessageChain, ConstructionError> {
        MessageChain::from_components(self.components)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DecodingError;
    use crate::model::component::{FaceData, VoiceData};
    use serde_json::json;

    fn sample() -> MessageChain {
        MessageChain::new([
            ChainItem::from("pre "),
            MessageComponent::at(123).into(),
            "hi".into(),
            " post".into(),
        ])
        .unwrap()
    }

    #[test]
    fn test_atall_example() {
        let chain = chain![MessageComponent::at_all(), "Hello World!"].unwrap();
        assert_eq!(chain.to_code_string(), "[mirai:atall]Hello World!");

        let decoded = MessageChain::new([
            json!({"type": "AtAll"}),
            json!({"type": "Plain", "text": "Hello World!"}),
        ])
        .unwrap();
        assert_eq!(chain, decoded);

        let parsed: MessageChain = "[mirai:atall]Hello World!".parse().unwrap();
        assert_eq!(parsed, chain);
    }

    #[test]
    fn test_sub_chain_example() {
        let chain = sample();
        let sub = chain![MessageComponent::at(123), "hi"].unwrap();
        let partial = chain![MessageComponent::at(123), "h"].unwrap();

        assert!(sub <= chain);
        assert!(chain >= sub);
        assert!(!(partial <= chain));
        assert_eq!(partial.partial_cmp(&chain), None);
        assert!(chain.has(&sub));
    }

    #[test]
    fn test_plain_is_atomic() {
        let split = chain!["ab", "cd"].unwrap();
        let joined = chain!["abcd"].unwrap();
        assert_ne!(split, joined);
        assert_eq!(split.plain_text(), joined.plain_text());
        assert!(split.contains_text("abcd"));
    }

    #[test]
    fn test_ordering_laws() {
        let a = chain![MessageComponent::at(123)].unwrap();
        let b = chain![MessageComponent::at(123), "hi"].unwrap();
        let c = sample();

        assert!(c <= c);
        assert!(a <= b && b <= c);
        assert!(a <= c);
        assert!(MessageChain::empty() <= a);
    }

    #[test]
    fn test_voice_must_be_alone() {
        let voice = MessageComponent::Voice(VoiceData {
            path: Some("a.silk".into()),
            ..Default::default()
        });

        let err = chain![voice.clone(), "x"].unwrap_err();
        assert!(matches!(
            err,
            ChainError::Construction(ConstructionError::VoiceNotAlone)
        ));

        let alone = chain![voice.clone()].unwrap();
        assert!(matches!(alone.with("x"), Err(ConstructionError::VoiceNotAlone)));
        assert!(matches!(alone.repeat(2), Err(ConstructionError::VoiceNotAlone)));
        assert!(alone.repeat(1).is_ok());

        let json = json!([{"type": "Voice", "url": "http://x"}, {"type": "Plain", "text": "x"}]);
        assert!(serde_json::from_value::<MessageChain>(json).is_err());
    }

    #[test]
    fn test_typed_indexing() {
        let chain = chain![
            "a",
            MessageComponent::at(1),
            "b",
            MessageComponent::at(2),
            MessageComponent::at(3)
        ]
        .unwrap();

        let ats = chain.components_of_type(ComponentKind::At);
        assert_eq!(ats.len(), 3);
        assert!(ats.len() <= chain.len());
        assert!(ats.iter().all(|c| c.is(ComponentKind::At)));

        for n in 0..5 {
            let first = chain.first_n_of_type(ComponentKind::At, n);
            assert_eq!(first.len(), n.min(3));
            assert_eq!(first.as_slice(), &ats[..n.min(3)]);
        }

        assert!(chain.components_of_type(ComponentKind::Image).is_empty());
        assert_eq!(chain.at_targets(), vec![1, 2, 3]);
        assert_eq!(chain.get_first(ComponentKind::Plain), Some(&MessageComponent::plain("a")));
        assert_eq!(
            chain.components_of_types(&[ComponentKind::Plain, ComponentKind::At]).len(),
            5
        );
    }

    #[test]
    fn test_source_and_quote_are_lifted() {
        let chain: MessageChain = serde_json::from_value(json!([
            {"type": "Source", "id": 42, "time": 1700000000},
            {"type": "Quote", "id": 41, "groupId": 1, "senderId": 2, "targetId": 1,
             "origin": [{"type": "Plain", "text": "earlier"}]},
            {"type": "Plain", "text": "reply"}
        ]))
        .unwrap();

        assert_eq!(chain.len(), 1);
        assert_eq!(chain.message_id(), 42);
        let quote = chain.quote().unwrap();
        assert_eq!(quote.id, Some(41));
        assert_eq!(quote.origin.plain_text(), "earlier");
        assert!(chain.components_of_type(ComponentKind::Source).is_empty());

        let value = serde_json::to_value(&chain).unwrap();
        assert_eq!(value.as_array().map(Vec::len), Some(3));
        assert_eq!(MessageChain::empty().message_id(), -1);

        let decoded: MessageChain = serde_json::from_value(value).unwrap();
        assert_eq!(decoded.quote(), chain.quote());
        assert_eq!(decoded, chain);
    }

    #[test]
    fn test_nested_chains_decode_leniently() {
        let chain: MessageChain = serde_json::from_value(json!([
            {"type": "Quote", "id": 41, "origin": [
                {"type": "Plain", "text": "earlier"},
                {"type": "Hologram", "id": 1}
            ]},
            {"type": "Forward", "nodeList": [
                {"senderId": 2, "senderName": "b", "messageChain": [
                    {"type": "Hologram"},
                    {"type": "Plain", "text": "inner"}
                ]}
            ]}
        ]))
        .unwrap();

        let quote = chain.quote().unwrap();
        assert_eq!(quote.origin.len(), 2);
        assert_eq!(quote.origin.plain_text(), "earlier");
        assert!(matches!(quote.origin[1], MessageComponent::Unknown(_)));

        match &chain[0] {
            MessageComponent::Forward(forward) => {
                let inner = forward.node_list[0].message_chain.as_ref().unwrap();
                assert_eq!(inner.len(), 2);
                assert_eq!(inner.plain_text(), "inner");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_decode_policies() {
        let items = || {
            vec![
                json!({"type": "Plain", "text": "a"}),
                json!({"type": "Hologram", "x": 1}),
            ]
        };

        let err = MessageChain::new(items()).unwrap_err();
        assert!(matches!(
            err,
            ChainError::Decoding(DecodingError::UnknownType { .. })
        ));

        let skipped = MessageChain::with_policy(items(), DecodePolicy::Skip).unwrap();
        assert_eq!(skipped.len(), 1);

        let placeholder = MessageChain::with_policy(items(), DecodePolicy::Placeholder).unwrap();
        assert_eq!(placeholder.len(), 2);
        match &placeholder[1] {
            MessageComponent::Unknown(data) => assert!(data.text.contains("Hologram")),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_code_string_roundtrip() {
        let chains = [
            chain![
                "line\none, [two]: \\",
                MessageComponent::at(10001),
                MessageComponent::at_all(),
                MessageComponent::face(178),
                MessageComponent::face_named("123"),
                MessageComponent::face_named("微笑"),
                "x",
                MessageComponent::image_id("{01E9451B-70ED-EAE3-B37C-101F1EEBF5B5}.jpg"),
                MessageComponent::flash_image_id("/abc"),
                MessageComponent::app(r#"{"prompt":"[卡片]"}"#),
                MessageComponent::poke(PokeName::ZhuaYiXia),
                MessageComponent::dice(4)
            ]
            .unwrap(),
            MessageChain::empty(),
            MessageChain::text("just text"),
        ];

        for chain in chains {
            let encoded = chain.to_code_string();
            let decoded = MessageChain::parse_code_string(&encoded).unwrap();
            assert_eq!(decoded, chain, "{encoded}");
        }

        let empty_face = MessageComponent::Face(FaceData {
            face_id: None,
            name: None,
        });
        assert!(matches!(
            MessageChain::from_components([MessageComponent::plain("a"), empty_face.clone()]),
            Err(ConstructionError::EmptyFace)
        ));
        assert!(MessageChain::text("a").with(empty_face).is_err());
    }

    #[test]
    fn test_index_count_exclude() {
        let chain = chain!["a", MessageComponent::at(1), "a", MessageComponent::at(2)].unwrap();
        let a = MessageComponent::plain("a");

        assert_eq!(chain.index_of(&a, ..), Some(0));
        assert_eq!(chain.index_of(&a, 1..), Some(2));
        assert_eq!(chain.index_of(ComponentKind::At, 2..), Some(3));
        assert_eq!(chain.index_of(ComponentKind::Dice, ..), None);
        assert_eq!(chain.index_of(&a, 3..100), None);
        assert_eq!(chain.count(&a), 2);
        assert_eq!(chain.count(ComponentKind::At), 2);

        let once = chain.exclude(ComponentKind::At, Some(1));
        assert_eq!(once, chain!["a", "a", MessageComponent::at(2)].unwrap());
        let all = chain.exclude(&a, None);
        assert_eq!(all.at_targets(), vec![1, 2]);
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn test_concat_and_join() {
        let left = chain!["a"].unwrap();
        let right = chain![MessageComponent::at(1)].unwrap();

        let both = left.concat(&right).unwrap();
        assert_eq!(both.len(), 2);
        assert_eq!(MessageChain::join([&left, &right, &left]).unwrap().len(), 3);
        assert_eq!(left.prepend(MessageComponent::at_all()).unwrap()[0], MessageComponent::AtAll);
        assert_eq!(left.repeat(3).unwrap().plain_text(), "aaa");

        let repeated = both.repeat(2).unwrap();
        assert_eq!(repeated.len(), 4);
        assert_eq!(repeated[3], MessageComponent::at(1));
        assert!(both.repeat(0).unwrap().is_empty());
    }

    #[test]
    fn test_display_and_text() {
        let chain = MessageChain::builder()
            .at(10001)
            .text(" look ")
            .image_url("http://example.com/a.png")
            .dice(2)
            .build()
            .unwrap();

        assert_eq!(chain.to_display_string(), "@10001 look [图片][骰子2]");
        assert_eq!(chain.to_string(), chain.to_display_string());
        assert_eq!(chain.plain_text(), " look ");
        assert_eq!(chain.extract_plain_text(), " look ");
        assert!(chain.has(ComponentKind::Dice));
        assert!(chain.has("[mirai:at:10001]"));
        assert!(chain.has(&MessageComponent::at(10001)));
    }
}
