//! Errors raised by the message chain model.
//!
//! Every failure path of decoding, parsing, building or downloading has its
//! own type; [`ChainError`] wraps the three that can occur while building a
//! chain so callers can use a single `?`.

use std::io;
use std::path::PathBuf;

use thiserror::Error;
use yiri_core::AdapterError;

use crate::model::ComponentKind;

// =============================================================================
// Decoding
// =============================================================================

/// A JSON component or event could not be decoded.
#[derive(Debug, Error)]
pub enum DecodingError {
    /// The object has no string `type` field.
    #[error("object has no `type` field: {raw}")]
    MissingType {
        /// The offending JSON, serialized.
        raw: String,
    },

    /// The `type` is not one of the registered component kinds.
    #[error("unknown message component type `{type_name}`")]
    UnknownType {
        /// The `type` value that was found.
        type_name: String,
    },

    /// The `type` is known but the fields do not match it.
    #[error("invalid `{kind}` component: {source}")]
    Invalid {
        /// Kind named by the `type` field.
        kind: ComponentKind,
        /// Underlying serde failure.
        #[source]
        source: serde_json::Error,
    },

    /// An event with a known `type` has unexpected fields.
    #[error("invalid `{type_name}` event: {source}")]
    InvalidEvent {
        /// The event type.
        type_name: String,
        /// Underlying serde failure.
        #[source]
        source: serde_json::Error,
    },
}

// =============================================================================
// Code string parsing
// =============================================================================

/// A code string could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid code string at byte {offset}: {kind}")]
pub struct ParseError {
    /// Byte offset of the offending input.
    pub offset: usize,
    /// What went wrong.
    pub kind: ParseErrorKind,
}

impl ParseError {
    pub(crate) fn new(offset: usize, kind: ParseErrorKind) -> Self {
        Self { offset, kind }
    }
}

/// The reason a code string was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseErrorKind {
    #[error("escape character at end of input")]
    DanglingEscape,

    #[error("invalid escape sequence `\\{0}`")]
    InvalidEscape(char),

    #[error("code is not closed by `]`")]
    Unterminated,

    #[error("code does not start with `mirai:`")]
    MissingPrefix,

    #[error("unknown code `{0}`")]
    UnknownCode(String),

    #[error("invalid argument for `{code}`: {reason}")]
    InvalidArgument {
        /// Code name, e.g. `at`.
        code: String,
        /// Human readable reason.
        reason: String,
    },

    #[error("unexpected `]` outside of a code")]
    UnexpectedClose,
}

// =============================================================================
// Construction
// =============================================================================

/// A component or chain could not be built.
#[derive(Debug, Error)]
pub enum ConstructionError {
    /// A chain with a voice message may hold nothing else.
    #[error("a chain containing Voice cannot contain other components")]
    VoiceNotAlone,

    /// A face has neither an id nor a name.
    #[error("Face needs a face id or a name")]
    EmptyFace,

    /// A local path does not point at an existing file.
    #[error("无效路径: {}", path.display())]
    InvalidPath {
        /// The path as given.
        path: PathBuf,
        /// Why resolving it failed.
        #[source]
        source: io::Error,
    },

    /// An attachment has none of id, url, path or base64 set.
    #[error("{kind} needs one of id, url, path or base64 to be sent")]
    MissingSource {
        /// Attachment kind.
        kind: ComponentKind,
    },

    /// A component could not be turned into JSON.
    #[error("failed to serialize component: {0}")]
    Serialize(#[source] serde_json::Error),
}

// =============================================================================
// Fetching
// =============================================================================

/// An attachment could not be downloaded.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The attachment carries no url.
    #[error("{kind} has no url to download from")]
    MissingUrl {
        /// Attachment kind.
        kind: ComponentKind,
    },

    /// The component is not an image or voice.
    #[error("{kind} is not a downloadable attachment")]
    NotDownloadable {
        /// Component kind.
        kind: ComponentKind,
    },

    /// The request failed before a response arrived.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("server responded with status {0}")]
    Status(u16),

    /// Writing the file failed.
    #[error(transparent)]
    Storage(#[from] io::Error),
}

// =============================================================================
// Umbrella
// =============================================================================

/// Any error that can occur while building a chain.
#[derive(Debug, Error)]
pub enum ChainError {
    #[error(transparent)]
    Decoding(#[from] DecodingError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Construction(#[from] ConstructionError),
}

/// Result type for chain operations.
pub type ChainResult<T> = Result<T, ChainError>;

impl From<ConstructionError> for AdapterError {
    fn from(err: ConstructionError) -> Self {
        AdapterError::internal(err.to_string())
    }
}

impl From<DecodingError> for AdapterError {
    fn from(err: DecodingError) -> Self {
        AdapterError::decode(err.to_string())
    }
}
