//! Message components of mirai-api-http.
//!
//! A message chain is an ordered list of components. Every component is a
//! JSON object whose `type` field names its kind:
//!
//! ```json
//! [{"type": "At", "target": 10001}, {"type": "Plain", "text": " hello"}]
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use yiri_adapter_mirai::model::{MessageComponent, PokeName};
//!
//! let at = MessageComponent::at(10001);
//! let text = MessageComponent::plain(" hello");
//! let poke = MessageComponent::poke(PokeName::ChuoYiChuo);
//! ```

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use yiri_core::MessageSegment;

use crate::error::{ConstructionError, DecodingError};
use crate::model::chain::{MessageChain, deserialize_lenient, deserialize_lenient_opt};

// ============================================================================
// Component Kind
// ============================================================================

/// The `type` of a component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ComponentKind {
    Source,
    Quote,
    Plain,
    At,
    AtAll,
    Face,
    MarketFace,
    Image,
    FlashImage,
    Voice,
    Xml,
    Json,
    App,
    Poke,
    Dice,
    MusicShare,
    Forward,
    File,
    MiraiCode,
    Unknown,
}

impl ComponentKind {
    /// Every registered kind.
    pub const ALL: [ComponentKind; 20] = [
        Self::Source,
        Self::Quote,
        Self::Plain,
        Self::At,
        Self::AtAll,
        Self::Face,
        Self::MarketFace,
        Self::Image,
        Self::FlashImage,
        Self::Voice,
        Self::Xml,
        Self::Json,
        Self::App,
        Self::Poke,
        Self::Dice,
        Self::MusicShare,
        Self::Forward,
        Self::File,
        Self::MiraiCode,
        Self::Unknown,
    ];

    /// Returns the wire name used in the `type` field.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Source => "Source",
            Self::Quote => "Quote",
            Self::Plain => "Plain",
            Self::At => "At",
            Self::AtAll => "AtAll",
            Self::Face => "Face",
            Self::MarketFace => "MarketFace",
            Self::Image => "Image",
            Self::FlashImage => "FlashImage",
            Self::Voice => "Voice",
            Self::Xml => "Xml",
            Self::Json => "Json",
            Self::App => "App",
            Self::Poke => "Poke",
            Self::Dice => "Dice",
            Self::MusicShare => "MusicShare",
            Self::Forward => "Forward",
            Self::File => "File",
            Self::MiraiCode => "MiraiCode",
            Self::Unknown => "Unknown",
        }
    }

    /// Looks a kind up by its wire name.
    pub fn from_type_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == name)
    }

    /// Whether the kind has a form in the code string.
    pub fn has_code(self) -> bool {
        matches!(
            self,
            Self::Plain
                | Self::At
                | Self::AtAll
                | Self::Face
                | Self::Image
                | Self::FlashImage
                | Self::App
                | Self::Poke
                | Self::Dice
                | Self::MiraiCode
        )
    }

    /// Whether the kind refers to an image or voice file.
    pub fn is_attachment(self) -> bool {
        matches!(self, Self::Image | Self::FlashImage | Self::Voice)
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComponentKind {
    type Err = DecodingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_type_name(s).ok_or_else(|| DecodingError::UnknownType {
            type_name: s.to_string(),
        })
    }
}

// ============================================================================
// Message Component
// ============================================================================

/// One element of a message chain.
///
/// Equality is component specific: `At` compares targets only, `Face`
/// matches on id or name, and images compare by the uuid embedded in their
/// id. Everything else compares field by field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum MessageComponent {
    /// Identity of the message the chain belongs to.
    Source(SourceData),
    /// A reply to an earlier message.
    Quote(QuoteData),
    /// Plain text.
    Plain(PlainData),
    /// Mentions one member.
    At(AtData),
    /// Mentions everyone in the group.
    AtAll,
    /// Built-in face.
    Face(FaceData),
    /// Store sticker (receive only).
    MarketFace(MarketFaceData),
    /// Image.
    Image(ImageData),
    /// Image that can be viewed once.
    FlashImage(ImageData),
    /// Voice message. Must be the only component of its chain.
    Voice(VoiceData),
    /// XML card.
    Xml(XmlData),
    /// JSON card.
    Json(JsonData),
    /// Mini-app card.
    App(AppData),
    /// Poke.
    Poke(PokeData),
    /// Dice with a fixed face.
    Dice(DiceData),
    /// Music card.
    MusicShare(MusicShareData),
    /// Forwarded chat history.
    Forward(ForwardData),
    /// Group file (receive only).
    File(FileData),
    /// Raw code string sent as-is.
    MiraiCode(MiraiCodeData),
    /// Placeholder for content that could not be understood.
    Unknown(UnknownData),
}

impl MessageComponent {
    // --------------------------------
    // Constructors
    // --------------------------------

    /// Creates a text component.
    pub fn plain(text: impl Into<String>) -> Self {
        Self::Plain(PlainData { text: text.into() })
    }

    /// Creates a mention of `target`.
    pub fn at(target: i64) -> Self {
        Self::At(AtData {
            target,
            display: None,
        })
    }

    /// Creates a mention of everyone.
    pub fn at_all() -> Self {
        Self::AtAll
    }

    /// Creates a face by numeric id.
    pub fn face(face_id: i64) -> Self {
        Self::Face(FaceData {
            face_id: Some(face_id),
            name: None,
        })
    }

    /// Creates a face by name.
    pub fn face_named(name: impl Into<String>) -> Self {
        Self::Face(FaceData {
            face_id: None,
            name: Some(name.into()),
        })
    }

    /// Creates an image referring to an uploaded image id.
    pub fn image_id(image_id: impl Into<String>) -> Self {
        Self::Image(ImageData {
            image_id: Some(image_id.into()),
            ..Default::default()
        })
    }

    /// Creates an image the server downloads from `url`.
    pub fn image_url(url: impl Into<String>) -> Self {
        Self::Image(ImageData {
            url: Some(url.into()),
            ..Default::default()
        })
    }

    /// Creates an image from base64 encoded bytes.
    pub fn image_base64(base64: impl Into<String>) -> Self {
        Self::Image(ImageData {
            base64: Some(base64.into()),
            ..Default::default()
        })
    }

    /// Creates an image from a local file.
    ///
    /// The path is resolved to an absolute one and must exist.
    pub fn image_path(path: impl AsRef<Path>) -> Result<Self, ConstructionError> {
        Ok(Self::Image(ImageData {
            path: Some(resolve_path(path.as_ref())?),
            ..Default::default()
        }))
    }

    /// Creates an image from a path without checking it.
    ///
    /// Use this when the path is only meaningful to the server.
    pub fn image_unsafe_path(path: impl Into<String>) -> Self {
        Self::Image(ImageData {
            path: Some(path.into()),
            ..Default::default()
        })
    }

    /// Creates a flash image referring to an uploaded image id.
    pub fn flash_image_id(image_id: impl Into<String>) -> Self {
        Self::FlashImage(ImageData {
            image_id: Some(image_id.into()),
            ..Default::default()
        })
    }

    /// Creates a flash image the server downloads from `url`.
    pub fn flash_image_url(url: impl Into<String>) -> Self {
        Self::FlashImage(ImageData {
            url: Some(url.into()),
            ..Default::default()
        })
    }

    /// Creates a voice message the server downloads from `url`.
    pub fn voice_url(url: impl Into<String>) -> Self {
        Self::Voice(VoiceData {
            url: Some(url.into()),
            ..Default::default()
        })
    }

    /// Creates a voice message from base64 encoded bytes.
    pub fn voice_base64(base64: impl Into<String>) -> Self {
        Self::Voice(VoiceData {
            base64: Some(base64.into()),
            ..Default::default()
        })
    }

    /// Creates a voice message from a local file that must exist.
    pub fn voice_path(path: impl AsRef<Path>) -> Result<Self, ConstructionError> {
        Ok(Self::Voice(VoiceData {
            path: Some(resolve_path(path.as_ref())?),
            ..Default::default()
        }))
    }

    /// Creates a poke.
    pub fn poke(name: PokeName) -> Self {
        Self::Poke(PokeData { name })
    }

    /// Creates a dice showing `value`.
    pub fn dice(value: u8) -> Self {
        Self::Dice(DiceData { value })
    }

    /// Creates a mini-app card.
    pub fn app(content: impl Into<String>) -> Self {
        Self::App(AppData {
            content: content.into(),
        })
    }

    /// Creates an XML card.
    pub fn xml(xml: impl Into<String>) -> Self {
        Self::Xml(XmlData { xml: xml.into() })
    }

    /// Creates a JSON card.
    pub fn json(json: impl Into<String>) -> Self {
        Self::Json(JsonData { json: json.into() })
    }

    /// Creates a raw code string component.
    pub fn mirai_code(code: impl Into<String>) -> Self {
        Self::MiraiCode(MiraiCodeData { code: code.into() })
    }

    /// Creates a placeholder carrying `text`.
    pub fn unknown(text: impl Into<String>) -> Self {
        Self::Unknown(UnknownData { text: text.into() })
    }

    // --------------------------------
    // Decoding
    // --------------------------------

    /// Decodes a component from its JSON object.
    pub fn from_value(value: Value) -> Result<Self, DecodingError> {
        let Some(type_name) = value.get("type").and_then(Value::as_str) else {
            return Err(DecodingError::MissingType {
                raw: value.to_string(),
            });
        };
        let kind = type_name.parse::<ComponentKind>()?;
        serde_json::from_value(value).map_err(|source| DecodingError::Invalid { kind, source })
    }

    // --------------------------------
    // Accessors
    // --------------------------------

    /// Returns the kind of this component.
    pub fn kind(&self) -> ComponentKind {
        match self {
            Self::Source(_) => ComponentKind::Source,
            Self::Quote(_) => ComponentKind::Quote,
            Self::Plain(_) => ComponentKind::Plain,
            Self::At(_) => ComponentKind::At,
            Self::AtAll => ComponentKind::AtAll,
            Self::Face(_) => ComponentKind::Face,
            Self::MarketFace(_) => ComponentKind::MarketFace,
            Self::Image(_) => ComponentKind::Image,
            Self::FlashImage(_) => ComponentKind::FlashImage,
            Self::Voice(_) => ComponentKind::Voice,
            Self::Xml(_) => ComponentKind::Xml,
            Self::Json(_) => ComponentKind::Json,
            Self::App(_) => ComponentKind::App,
            Self::Poke(_) => ComponentKind::Poke,
            Self::Dice(_) => ComponentKind::Dice,
            Self::MusicShare(_) => ComponentKind::MusicShare,
            Self::Forward(_) => ComponentKind::Forward,
            Self::File(_) => ComponentKind::File,
            Self::MiraiCode(_) => ComponentKind::MiraiCode,
            Self::Unknown(_) => ComponentKind::Unknown,
        }
    }

    /// Returns true if the component is of `kind`.
    pub fn is(&self, kind: ComponentKind) -> bool {
        self.kind() == kind
    }

    /// Returns the text of a `Plain` component.
    pub fn as_plain(&self) -> Option<&str> {
        match self {
            Self::Plain(data) => Some(&data.text),
            _ => None,
        }
    }

    /// Returns the mentioned account of an `At` component.
    pub fn at_target(&self) -> Option<i64> {
        match self {
            Self::At(data) => Some(data.target),
            _ => None,
        }
    }

    /// Returns the image data of an `Image` or `FlashImage`.
    pub fn as_image(&self) -> Option<&ImageData> {
        match self {
            Self::Image(data) | Self::FlashImage(data) => Some(data),
            _ => None,
        }
    }

    /// Converts an `Image` into a `FlashImage` with the same data.
    pub fn to_flash_image(&self) -> Option<Self> {
        match self {
            Self::Image(data) => Some(Self::FlashImage(data.clone())),
            _ => None,
        }
    }

    /// Converts a `FlashImage` into an `Image` with the same data.
    pub fn to_image(&self) -> Option<Self> {
        match self {
            Self::FlashImage(data) => Some(Self::Image(data.clone())),
            _ => None,
        }
    }

    /// Returns the human readable rendering used for logs and previews.
    pub fn display(&self) -> String {
        match self {
            Self::Plain(data) => data.text.clone(),
            Self::At(data) => match &data.display {
                Some(display) => format!("@{display}"),
                None => format!("@{}", data.target),
            },
            Self::AtAll => "@全体成员".to_string(),
            Self::Face(data) => match &data.name {
                Some(name) => format!("[{name}]"),
                None => "[表情]".to_string(),
            },
            Self::Image(_) => "[图片]".to_string(),
            Self::FlashImage(_) => "[闪照]".to_string(),
            Self::Voice(_) => "[语音]".to_string(),
            Self::App(data) => data.prompt().unwrap_or_else(|| "[应用消息]".to_string()),
            Self::Poke(data) => format!("[{}]", data.name.display_name()),
            Self::Dice(data) => format!("[骰子{}]", data.value),
            Self::MusicShare(data) => data.brief.clone(),
            Self::Forward(_) => "[聊天记录]".to_string(),
            Self::File(data) => format!("[文件]{}", data.name),
            Self::MiraiCode(data) => crate::model::code::escape(&data.code),
            Self::Source(_)
            | Self::Quote(_)
            | Self::MarketFace(_)
            | Self::Xml(_)
            | Self::Json(_)
            | Self::Unknown(_) => String::new(),
        }
    }
}

impl fmt::Display for MessageComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

impl MessageSegment for MessageComponent {
    fn segment_type(&self) -> &str {
        self.kind().as_str()
    }

    fn as_text(&self) -> Option<&str> {
        self.as_plain()
    }

    fn display(&self) -> String {
        MessageComponent::display(self)
    }
}

impl From<&str> for MessageComponent {
    fn from(text: &str) -> Self {
        Self::plain(text)
    }
}

impl From<String> for MessageComponent {
    fn from(text: String) -> Self {
        Self::plain(text)
    }
}

fn resolve_path(path: &Path) -> Result<String, ConstructionError> {
    let resolved = std::fs::canonicalize(path).map_err(|source| ConstructionError::InvalidPath {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(resolved.to_string_lossy().into_owned())
}

// ============================================================================
// Component Data Types
// ============================================================================

/// Message id and send time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceData {
    /// Message id, unique per bot session.
    pub id: i64,
    /// Unix timestamp in seconds.
    pub time: i64,
}

/// Reference to the message being replied to.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_id: Option<i64>,
    /// Content of the quoted message, decoded leniently like event chains.
    #[serde(default, deserialize_with = "deserialize_lenient")]
    pub origin: MessageChain,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlainData {
    pub text: String,
}

/// A mention. Two mentions are equal when they target the same account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AtData {
    pub target: i64,
    /// Text shown in place of the mention when received.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
}

impl PartialEq for AtData {
    fn eq(&self, other: &Self) -> bool {
        self.target == other.target
    }
}

/// A built-in face.
///
/// Two faces are equal when both ids or both names are present and match.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FaceData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub face_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl PartialEq for FaceData {
    fn eq(&self, other: &Self) -> bool {
        match (self.face_id, other.face_id, &self.name, &other.name) {
            (Some(a), Some(b), _, _) if a == b => true,
            (_, _, Some(a), Some(b)) if a == b => true,
            (None, None, None, None) => true,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketFaceData {
    pub id: i64,
    pub name: String,
}

/// Image payload shared by `Image` and `FlashImage`.
///
/// Exactly one of the four sources is used when sending; see
/// [`AttachmentSource`](crate::model::AttachmentSource).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base64: Option<String>,
}

impl ImageData {
    /// Extracts the uuid from the image id.
    ///
    /// Group image ids look like `{XXXXXXXX-XXXX-XXXX-XXXX-XXXXXXXXXXXX}.jpg`,
    /// friend image ids like `/xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx`.
    pub fn uuid(&self) -> Option<&str> {
        let id = self.image_id.as_deref()?;
        if let Some(rest) = id.strip_prefix('{') {
            Some(rest.get(..36).unwrap_or(rest))
        } else if let Some(rest) = id.strip_prefix('/') {
            Some(rest)
        } else {
            Some(id)
        }
    }

    /// Returns the id of this image in group form.
    pub fn group_image_id(&self) -> Option<String> {
        self.uuid()
            .map(|uuid| format!("{{{}}}.jpg", uuid.to_uppercase()))
    }

    /// Returns the id of this image in friend form.
    pub fn friend_image_id(&self) -> Option<String> {
        self.uuid().map(|uuid| format!("/{}", uuid.to_lowercase()))
    }
}

impl PartialEq for ImageData {
    fn eq(&self, other: &Self) -> bool {
        match (self.uuid(), other.uuid()) {
            (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
            (None, None) => {
                self.url == other.url && self.path == other.path && self.base64 == other.base64
            }
            _ => false,
        }
    }
}

/// Voice payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base64: Option<String>,
    /// Duration in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct XmlData {
    pub xml: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonData {
    pub json: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppData {
    pub content: String,
}

impl AppData {
    /// Returns the `prompt` field of the card, if the content is JSON.
    pub fn prompt(&self) -> Option<String> {
        let value: Value = serde_json::from_str(&self.content).ok()?;
        value.get("prompt")?.as_str().map(str::to_string)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PokeData {
    pub name: PokeName,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiceData {
    pub value: u8,
}

/// Music card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MusicShareData {
    pub kind: MusicShareKind,
    pub title: String,
    pub summary: String,
    pub jump_url: String,
    pub picture_url: String,
    pub music_url: String,
    /// Text shown in the conversation list.
    #[serde(default)]
    pub brief: String,
}

/// Forwarded chat history.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForwardData {
    pub node_list: Vec<ForwardNode>,
}

/// One message inside a forward.
///
/// Either `message_id` refers to an existing message, or the sender fields
/// and `message_chain` describe it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForwardNode {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_name: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_lenient_opt"
    )]
    pub message_chain: Option<MessageChain>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<i64>,
}

impl ForwardNode {
    /// Creates a node from sender details and content.
    pub fn new(sender_id: i64, sender_name: impl Into<String>, chain: MessageChain) -> Self {
        Self {
            sender_id: Some(sender_id),
            sender_name: Some(sender_name.into()),
            message_chain: Some(chain),
            ..Default::default()
        }
    }

    /// Creates a node that refers to an existing message.
    pub fn from_message_id(message_id: i64) -> Self {
        Self {
            message_id: Some(message_id),
            ..Default::default()
        }
    }
}

/// Group file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileData {
    pub id: String,
    pub name: String,
    pub size: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MiraiCodeData {
    pub code: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnknownData {
    pub text: String,
}

// ============================================================================
// Poke and Music Kinds
// ============================================================================

/// The kind of a poke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PokeName {
    ChuoYiChuo,
    BiXin,
    DianZan,
    XinSui,
    LiuLiuLiu,
    FangDaZhao,
    BaoBeiQiu,
    Rose,
    ZhaoHuanShu,
    RangNiPi,
    JeiYin,
    ShouLei,
    GouYin,
    ZhuaYiXia,
    SuiPing,
    QiaoMen,
}

impl PokeName {
    /// Every poke kind.
    pub const ALL: [PokeName; 16] = [
        Self::ChuoYiChuo,
        Self::BiXin,
        Self::DianZan,
        Self::XinSui,
        Self::LiuLiuLiu,
        Self::FangDaZhao,
        Self::BaoBeiQiu,
        Self::Rose,
        Self::ZhaoHuanShu,
        Self::RangNiPi,
        Self::JeiYin,
        Self::ShouLei,
        Self::GouYin,
        Self::ZhuaYiXia,
        Self::SuiPing,
        Self::QiaoMen,
    ];

    /// Returns the wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ChuoYiChuo => "ChuoYiChuo",
            Self::BiXin => "BiXin",
            Self::DianZan => "DianZan",
            Self::XinSui => "XinSui",
            Self::LiuLiuLiu => "LiuLiuLiu",
            Self::FangDaZhao => "FangDaZhao",
            Self::BaoBeiQiu => "BaoBeiQiu",
            Self::Rose => "Rose",
            Self::ZhaoHuanShu => "ZhaoHuanShu",
            Self::RangNiPi => "RangNiPi",
            Self::JeiYin => "JeiYin",
            Self::ShouLei => "ShouLei",
            Self::GouYin => "GouYin",
            Self::ZhuaYiXia => "ZhuaYiXia",
            Self::SuiPing => "SuiPing",
            Self::QiaoMen => "QiaoMen",
        }
    }

    /// Returns `(type, id)` as used by the client.
    pub fn type_and_id(self) -> (i32, i32) {
        match self {
            Self::ChuoYiChuo => (1, -1),
            Self::BiXin => (2, -1),
            Self::DianZan => (3, -1),
            Self::XinSui => (4, -1),
            Self::LiuLiuLiu => (5, -1),
            Self::FangDaZhao => (6, -1),
            Self::BaoBeiQiu => (126, 2011),
            Self::Rose => (126, 2007),
            Self::ZhaoHuanShu => (126, 2006),
            Self::RangNiPi => (126, 2009),
            Self::JeiYin => (126, 2005),
            Self::ShouLei => (126, 2004),
            Self::GouYin => (126, 2003),
            Self::ZhuaYiXia => (126, 2001),
            Self::SuiPing => (126, 2002),
            Self::QiaoMen => (126, 2002),
        }
    }

    /// Returns the name shown to users.
    pub fn display_name(self) -> &'static str {
        match self {
            Self::ChuoYiChuo => "戳一戳",
            Self::BiXin => "比心",
            Self::DianZan => "点赞",
            Self::XinSui => "心碎",
            Self::LiuLiuLiu => "666",
            Self::FangDaZhao => "放大招",
            Self::BaoBeiQiu => "宝贝球",
            Self::Rose => "玫瑰花",
            Self::ZhaoHuanShu => "召唤术",
            Self::RangNiPi => "让你皮",
            Self::JeiYin => "结印",
            Self::ShouLei => "手雷",
            Self::GouYin => "勾引",
            Self::ZhuaYiXia => "抓一下",
            Self::SuiPing => "碎屏",
            Self::QiaoMen => "敲门",
        }
    }
}

impl fmt::Display for PokeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PokeName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| format!("unknown poke `{s}`"))
    }
}

/// The platform a music card links to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MusicShareKind {
    NeteaseCloudMusic,
    QQMusic,
    MiguMusic,
    KugouMusic,
    KuwoMusic,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_known_types() {
        let at =
            MessageComponent::from_value(json!({"type": "At", "target": 10001, "display": "Alice"}))
                .unwrap();
        assert_eq!(at, MessageComponent::at(10001));
        assert_eq!(at.display(), "@Alice");

        let all = MessageComponent::from_value(json!({"type": "AtAll"})).unwrap();
        assert_eq!(all.kind(), ComponentKind::AtAll);

        let music = MessageComponent::from_value(json!({
            "type": "MusicShare",
            "kind": "QQMusic",
            "title": "t",
            "summary": "s",
            "jumpUrl": "j",
            "pictureUrl": "p",
            "musicUrl": "m"
        }))
        .unwrap();
        match music {
            MessageComponent::MusicShare(data) => {
                assert_eq!(data.kind, MusicShareKind::QQMusic);
                assert_eq!(data.brief, "");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_decode_errors() {
        let err = MessageComponent::from_value(json!({"text": "hi"})).unwrap_err();
        assert!(matches!(err, DecodingError::MissingType { .. }));

        let err = MessageComponent::from_value(json!({"type": "Hologram"})).unwrap_err();
        assert!(matches!(
            err,
            DecodingError::UnknownType { ref type_name } if type_name == "Hologram"
        ));

        let err = MessageComponent::from_value(json!({"type": "At", "target": "x"})).unwrap_err();
        assert!(matches!(
            err,
            DecodingError::Invalid {
                kind: ComponentKind::At,
                ..
            }
        ));
    }

    #[test]
    fn test_serialize_uses_wire_names() {
        let value = serde_json::to_value(MessageComponent::face(178)).unwrap();
        assert_eq!(value, json!({"type": "Face", "faceId": 178}));

        let value = serde_json::to_value(MessageComponent::at_all()).unwrap();
        assert_eq!(value, json!({"type": "AtAll"}));

        let value = serde_json::to_value(MessageComponent::poke(PokeName::Rose)).unwrap();
        assert_eq!(value, json!({"type": "Poke", "name": "Rose"}));
    }

    #[test]
    fn test_face_equality() {
        let by_id = MessageComponent::face(1);
        let by_name = MessageComponent::face_named("微笑");
        let both = MessageComponent::Face(FaceData {
            face_id: Some(2),
            name: Some("微笑".into()),
        });

        assert_eq!(by_name, both);
        assert_ne!(by_id, both);
        assert_ne!(by_id, by_name);
        assert_eq!(by_id, MessageComponent::face(1));
    }

    #[test]
    fn test_image_equality_by_uuid() {
        let group = MessageComponent::image_id("{01E9451B-70ED-EAE3-B37C-101F1EEBF5B5}.jpg");
        let friend = MessageComponent::image_id("/01e9451b-70ed-eae3-b37c-101f1eebf5b5");
        assert_eq!(group, friend);

        let flash = group.to_flash_image().unwrap();
        assert_ne!(group, flash);
        assert_eq!(flash.to_image().unwrap(), friend);

        let data = group.as_image().unwrap();
        assert_eq!(
            data.friend_image_id().as_deref(),
            Some("/01e9451b-70ed-eae3-b37c-101f1eebf5b5")
        );
        assert_eq!(
            data.group_image_id().as_deref(),
            Some("{01E9451B-70ED-EAE3-B37C-101F1EEBF5B5}.jpg")
        );
    }

    #[test]
    fn test_display_forms() {
        assert_eq!(MessageComponent::at_all().display(), "@全体成员");
        assert_eq!(MessageComponent::face(1).display(), "[表情]");
        assert_eq!(MessageComponent::dice(3).display(), "[骰子3]");
        assert_eq!(MessageComponent::poke(PokeName::BiXin).display(), "[比心]");
        assert_eq!(MessageComponent::app(r#"{"prompt":"[分享]"}"#).display(), "[分享]");
        assert_eq!(MessageComponent::app("not json").display(), "[应用消息]");
        assert_eq!(MessageComponent::image_url("http://x").display(), "[图片]");
    }

    #[test]
    fn test_poke_table() {
        assert_eq!(PokeName::ChuoYiChuo.type_and_id(), (1, -1));
        assert_eq!(PokeName::QiaoMen.type_and_id(), (126, 2002));
        assert_eq!("ShouLei".parse::<PokeName>(), Ok(PokeName::ShouLei));
        assert!("Nope".parse::<PokeName>().is_err());
    }

    #[test]
    fn test_image_path_must_exist() {
        let err = MessageComponent::image_path("/definitely/not/here.png").unwrap_err();
        assert!(err.to_string().starts_with("无效路径"));

        let unchecked = MessageComponent::image_unsafe_path("/definitely/not/here.png");
        assert_eq!(
            unchecked.as_image().and_then(|d| d.path.as_deref()),
            Some("/definitely/not/here.png")
        );
    }

    #[test]
    fn test_kind_lookup() {
        for kind in ComponentKind::ALL {
            assert_eq!(ComponentKind::from_type_name(kind.as_str()), Some(kind));
        }
        assert!(ComponentKind::from_type_name("plain").is_none());
    }
}
