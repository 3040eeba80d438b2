//! mirai-api-http data model.
//!
//! - [`component`]: message components and their kinds
//! - [`chain`]: the message chain, its queries and derived chains
//! - [`code`]: the `[mirai:...]` code string format
//! - [`attachment`]: image/voice sources and downloads
//! - [`entities`], [`event`]: contacts and events

pub mod attachment;
pub mod chain;
pub mod code;
pub mod component;
pub mod entities;
pub mod event;

pub use attachment::{AttachmentSource, DownloadOptions, DownloadTarget, Downloader};
pub use chain::{ChainItem, DecodePolicy, MessageChain, MessageChainBuilder, Needle, Pattern};
pub use component::{
    AppData, AtData, ComponentKind, DiceData, FaceData, FileData, ForwardData, ForwardNode,
    ImageData, JsonData, MarketFaceData, MessageComponent, MiraiCodeData, MusicShareData,
    MusicShareKind, PlainData, PokeData, PokeName, QuoteData, SourceData, UnknownData, VoiceData,
    XmlData,
};
pub use entities::{Client, Friend, Group, GroupMember, Permission, Subject, SubjectKind};
pub use event::{
    FriendMessage, FriendRecallEvent, GroupMessage, GroupRecallEvent, MessageEvent, MiraiEvent,
    NudgeEvent, OtherClientMessage, StrangerMessage, TempMessage, UnknownEvent,
};
