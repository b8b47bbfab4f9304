use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use time::format_description::FormatItem;
use time::macros::format_description;
use time::{OffsetDateTime, UtcOffset};

use crate::error::SessionError;

/// Largest image the detection API accepts.
pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

const MESSAGE_TIME_FORMAT: &[FormatItem<'static>] =
    format_description!("[hour repr:12 padding:zero]:[minute padding:zero] [period case:upper]");

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    /// Position in the log; assigned once on append and never reused.
    pub ordinal: u64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl ChatMessage {
    pub(crate) fn new(role: Role, content: impl Into<String>, ordinal: u64) -> Self {
        Self {
            role,
            content: content.into(),
            ordinal,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    /// Local wall-clock time the message was appended, e.g. `09:41 AM`.
    pub fn display_time(&self) -> Option<String> {
        let mut datetime = self.created_at;
        if let Ok(offset) = UtcOffset::current_local_offset() {
            datetime = datetime.to_offset(offset);
        }
        datetime.format(MESSAGE_TIME_FORMAT).ok()
    }
}

/// Classification returned by the detection API.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub label: String,
    /// Percentage in `[0, 100]`.
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probabilities: Option<BTreeMap<String, f64>>,
}

impl AnalysisResult {
    pub fn is_normal(&self) -> bool {
        self.label.to_lowercase().contains("normal")
    }
}

/// An image the user picked for analysis.
///
/// The payload is shared, so cloning an asset never copies the pixels.
#[derive(Clone, PartialEq)]
pub struct ImageAsset {
    name: String,
    mime_type: String,
    bytes: Arc<[u8]>,
}

impl ImageAsset {
    pub fn new(
        name: impl Into<String>,
        mime_type: impl Into<String>,
        bytes: impl Into<Arc<[u8]>>,
    ) -> Result<Self, SessionError> {
        let name = name.into();
        let mime_type = mime_type.into();
        let bytes = bytes.into();

        if !mime_type.starts_with("image/") {
            return Err(SessionError::validation(format!(
                "{name} is not an image ({mime_type})"
            )));
        }
        if bytes.is_empty() {
            return Err(SessionError::validation(format!("{name} is empty")));
        }
        if bytes.len() > MAX_IMAGE_BYTES {
            return Err(SessionError::validation(format!(
                "{name} is larger than {} MB",
                MAX_IMAGE_BYTES / (1024 * 1024)
            )));
        }

        Ok(Self {
            name,
            mime_type,
            bytes,
        })
    }

    /// Read an image from disk, inferring the MIME type from its extension.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, SessionError> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("image")
            .to_string();
        let mime_type = mime_from_extension(path).ok_or_else(|| {
            SessionError::validation(format!("{name} does not look like an image file"))
        })?;
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| SessionError::validation(format!("Failed to read {name}: {e}")))?;
        Self::new(name, mime_type, bytes)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn size_bytes(&self) -> usize {
        self.bytes.len()
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl std::fmt::Debug for ImageAsset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageAsset")
            .field("name", &self.name)
            .field("mime_type", &self.mime_type)
            .field("size_bytes", &self.bytes.len())
            .finish()
    }
}

fn mime_from_extension(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    let mime = match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "webp" => "image/webp",
        "tif" | "tiff" => "image/tiff",
        _ => return None,
    };
    Some(mime)
}
