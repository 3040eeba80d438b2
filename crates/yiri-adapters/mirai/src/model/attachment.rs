//! Image and voice attachments.
//!
//! An attachment can be given by server-side id, remote url, local path or
//! inline base64. When it is sent exactly one of them is used, in that order
//! of preference.
//!
//! Received attachments carry a url and can be saved with a [`Downloader`]:
//!
//! ```rust,ignore
//! let downloader = Downloader::new();
//! let path = downloader
//!     .download(&image, DownloadTarget::Directory("images".into()), DownloadOptions::default())
//!     .await?;
//! ```
//!
//! Downloads are written to a temporary `.part` file next to the destination
//! and renamed into place, so the destination never holds a partial file.

use std::io;
use std::path::{Path, PathBuf};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::{Map, Value, json};
use tokio::io::AsyncWriteExt;
use tracing::info;
use uuid::Uuid;

use crate::error::{ConstructionError, FetchError};
use crate::model::component::{ComponentKind, ImageData, MessageComponent, VoiceData};

// ============================================================================
// Sources
// ============================================================================

/// The single source an attachment is sent with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentSource<'a> {
    Id(&'a str),
    Url(&'a str),
    Path(&'a str),
    Base64(&'a str),
}

impl<'a> AttachmentSource<'a> {
    fn pick(
        id: Option<&'a str>,
        url: Option<&'a str>,
        path: Option<&'a str>,
        base64: Option<&'a str>,
    ) -> Option<Self> {
        id.map(Self::Id)
            .or_else(|| url.map(Self::Url))
            .or_else(|| path.map(Self::Path))
            .or_else(|| base64.map(Self::Base64))
    }

    fn field(self, id_field: &'static str) -> (&'static str, &'a str) {
        match self {
            Self::Id(v) => (id_field, v),
            Self::Url(v) => ("url", v),
            Self::Path(v) => ("path", v),
            Self::Base64(v) => ("base64", v),
        }
    }
}

impl ImageData {
    /// Returns the source used when sending.
    pub fn resolve_source(&self) -> Option<AttachmentSource<'_>> {
        AttachmentSource::pick(
            self.image_id.as_deref(),
            self.url.as_deref(),
            self.path.as_deref(),
            self.base64.as_deref(),
        )
    }

    /// Reads a local file into an inline image.
    pub async fn from_local(path: impl AsRef<Path>) -> io::Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        Ok(Self::from_bytes(&bytes))
    }

    /// Creates an inline image from raw bytes.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            base64: Some(STANDARD.encode(bytes)),
            ..Default::default()
        }
    }
}

impl VoiceData {
    /// Returns the source used when sending.
    pub fn resolve_source(&self) -> Option<AttachmentSource<'_>> {
        AttachmentSource::pick(
            self.voice_id.as_deref(),
            self.url.as_deref(),
            self.path.as_deref(),
            self.base64.as_deref(),
        )
    }

    /// Reads a local file into an inline voice message.
    pub async fn from_local(path: impl AsRef<Path>) -> io::Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        Ok(Self::from_bytes(&bytes))
    }

    /// Creates an inline voice message from raw bytes.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            base64: Some(STANDARD.encode(bytes)),
            ..Default::default()
        }
    }
}

/// Serializes a component for sending.
pub(crate) fn outgoing_json(component: &MessageComponent) -> Result<Value, ConstructionError> {
    let kind = component.kind();
    let (source, id_field) = match component {
        MessageComponent::Image(data) | MessageComponent::FlashImage(data) => {
            (data.resolve_source(), "imageId")
        }
        MessageComponent::Voice(data) => (data.resolve_source(), "voiceId"),
        other => return serde_json::to_value(other).map_err(ConstructionError::Serialize),
    };

    let (field, value) = source
        .ok_or(ConstructionError::MissingSource { kind })?
        .field(id_field);
    let mut object = Map::new();
    object.insert("type".into(), json!(kind.as_str()));
    object.insert(field.into(), json!(value));
    Ok(Value::Object(object))
}

// ============================================================================
// Downloads
// ============================================================================

/// Where a download is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadTarget {
    /// A directory; the file name is derived from the attachment.
    Directory(PathBuf),
    /// An explicit file path.
    File(PathBuf),
}

/// Options for [`Downloader::download`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownloadOptions {
    /// Replace the extension of a [`DownloadTarget::File`] with the image
    /// type sniffed from the content.
    pub determine_type: bool,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self {
            determine_type: true,
        }
    }
}

/// Downloads received attachments.
#[derive(Debug, Clone, Default)]
pub struct Downloader {
    client: reqwest::Client,
}

impl Downloader {
    /// Creates a downloader with a default HTTP client.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a downloader that uses `client`.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Fetches the bytes behind `url`.
    pub async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        Ok(response.bytes().await?.to_vec())
    }

    /// Downloads an image or voice component and returns the written path.
    ///
    /// In a directory, images are named after their uuid with the sniffed
    /// extension and voices after their id with `.silk`. Only the last path
    /// component of the id is used; attachments without a usable id get a
    /// random name.
    pub async fn download(
        &self,
        component: &MessageComponent,
        target: DownloadTarget,
        options: DownloadOptions,
    ) -> Result<PathBuf, FetchError> {
        let kind = component.kind();
        let (url, stem) = match component {
            MessageComponent::Image(data) | MessageComponent::FlashImage(data) => {
                (data.url.as_deref(), data.uuid().map(str::to_string))
            }
            MessageComponent::Voice(data) => (data.url.as_deref(), data.voice_id.clone()),
            _ => return Err(FetchError::NotDownloadable { kind }),
        };
        let url = url.ok_or(FetchError::MissingUrl { kind })?;

        let bytes = self.fetch(url).await?;
        let sniffed = match kind {
            ComponentKind::Voice => None,
            _ => sniff_image_type(&bytes),
        };

        let path = match target {
            DownloadTarget::Directory(dir) => {
                let stem = stem
                    .as_deref()
                    .and_then(safe_file_stem)
                    .map_or_else(|| Uuid::new_v4().to_string(), str::to_string);
                let ext = match kind {
                    ComponentKind::Voice => "silk",
                    _ => sniffed.unwrap_or("bin"),
                };
                dir.join(format!("{stem}.{ext}"))
            }
            DownloadTarget::File(path) => match sniffed {
                Some(ext) if options.determine_type => path.with_extension(ext),
                _ => path,
            },
        };

        write_atomically(&path, &bytes).await?;
        info!(%kind, path = %path.display(), bytes = bytes.len(), "Downloaded attachment");
        Ok(path)
    }
}

impl MessageComponent {
    /// Downloads this attachment with a default [`Downloader`].
    pub async fn download(
        &self,
        target: DownloadTarget,
        options: DownloadOptions,
    ) -> Result<PathBuf, FetchError> {
        Downloader::new().download(self, target, options).await
    }
}

/// Returns the last path component of a server-provided id.
///
/// Ids are only ever used as file names inside the target directory, so
/// separators are cut off and `.`, `..` or empty names are rejected.
fn safe_file_stem(id: &str) -> Option<&str> {
    let name = id.rsplit(['/', '\\']).next()?;
    match name {
        "" | "." | ".." => None,
        name => Some(name),
    }
}

/// Detects common image formats from their magic bytes.
pub fn sniff_image_type(bytes: &[u8]) -> Option<&'static str> {
    if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
        Some("png")
    } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some("jpeg")
    } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        Some("gif")
    } else if bytes.starts_with(b"BM") {
        Some("bmp")
    } else if bytes.len() >= 12 && bytes.starts_with(b"RIFF") && &bytes[8..12] == b"WEBP" {
        Some("webp")
    } else {
        None
    }
}

/// Removes the temporary file unless disarmed.
struct PartFile {
    path: PathBuf,
    armed: bool,
}

impl Drop for PartFile {
    fn drop(&mut self) {
        if self.armed {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}

async fn write_atomically(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    };
    tokio::fs::create_dir_all(&dir).await?;

    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut part = PartFile {
        path: dir.join(format!(".{name}.{}.part", Uuid::new_v4().simple())),
        armed: true,
    };

    let mut file = tokio::fs::File::create(&part.path).await?;
    file.write_all(bytes).await?;
    file.flush().await?;
    file.sync_all().await?;
    drop(file);

    tokio::fs::rename(&part.path, path).await?;
    part.armed = false;
    Ok(())
}
