//! Protocol-neutral message traits.
//!
//! - [`MessageSegment`]: one unit of content (text, image, mention, ...)
//! - [`Message`]: an ordered sequence of segments
//!
//! Adapters implement both so handlers can pull text out of a message without
//! depending on the protocol crate.

use std::fmt::Debug;

// ============================================================================
// Message Segment Trait
// ============================================================================

/// A single unit of message content.
///
/// ```rust,ignore
/// use yiri_core::MessageSegment;
///
/// fn describe<S: MessageSegment>(segment: &S) -> String {
///     match segment.as_text() {
///         Some(text) => format!("text: {text}"),
///         None => format!("{}: {}", segment.segment_type(), segment.display()),
///     }
/// }
/// ```
pub trait MessageSegment: Debug + Clone + Send + Sync + 'static {
    /// Returns the wire name of this segment's type (e.g. `"Plain"`, `"At"`).
    fn segment_type(&self) -> &str;

    /// Returns true if this is a plain text segment.
    fn is_text(&self) -> bool {
        self.as_text().is_some()
    }

    /// Returns the text content if this is a text segment.
    fn as_text(&self) -> Option<&str>;

    /// Returns a human-readable rendering of the segment.
    fn display(&self) -> String;
}

// ============================================================================
// Message Trait
// ============================================================================

/// A complete message composed of segments.
pub trait Message: Debug + Clone + Send + Sync + 'static {
    /// The segment type used by this message.
    type Segment: MessageSegment;

    /// Returns the segments as a slice.
    fn as_slice(&self) -> &[Self::Segment];

    /// Returns an iterator over the segments.
    fn iter(&self) -> std::slice::Iter<'_, Self::Segment> {
        self.as_slice().iter()
    }

    /// Returns the number of segments.
    fn len(&self) -> usize {
        self.as_slice().len()
    }

    /// Returns true if the message has no segments.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Concatenates the content of every text segment.
    fn extract_plain_text(&self) -> String {
        self.iter().filter_map(MessageSegment::as_text).collect()
    }

    /// Concatenates the display form of every segment.
    fn display(&self) -> String {
        self.iter().map(MessageSegment::display).collect()
    }
}
