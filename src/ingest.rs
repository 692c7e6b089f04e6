//! Image ingestion: file picker, paste and drag-and-drop all land here.
//!
//! Every entry point is reduced to `(mime, bytes)` and handed to a single
//! normalization routine, so the three paths behave identically downstream.
//! Only `image/*` payloads are accepted; anything else is ignored without an
//! error.

use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{ImageFormat, ImageReader, RgbaImage};

use crate::clipboard::{ClipboardPayload, ClipboardSource};
use crate::{Error, Result};

/// The currently loaded source image. Never mutated; replaced as a whole.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedImage {
    /// `data:<mime>;base64,...` of the original bytes.
    pub data_uri: String,
    pub mime: String,
    pub bitmap: Arc<RgbaImage>,
}

impl LoadedImage {
    pub fn width(&self) -> u32 {
        self.bitmap.width()
    }

    pub fn height(&self) -> u32 {
        self.bitmap.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.bitmap.dimensions()
    }
}

/// Where an image comes from.
#[derive(Debug, Clone)]
pub enum IngestSource {
    /// A file chosen in a picker or dropped onto the window.
    File(PathBuf),
    /// Raw bytes from a paste or drop; `mime` is sniffed when absent.
    Bytes { mime: Option<String>, data: Vec<u8> },
    DataUri(String),
    /// The picker selection was emptied.
    Cleared,
}

impl IngestSource {
    /// Turn the current clipboard content into a source. Text that names an
    /// existing file is treated like a dropped file.
    pub fn from_clipboard(clipboard: &mut impl ClipboardSource) -> Result<Option<IngestSource>> {
        Ok(match clipboard.read()? {
            Some(ClipboardPayload::Image { mime, data }) => Some(IngestSource::Bytes {
                mime: Some(mime),
                data,
            }),
            Some(ClipboardPayload::Text(text)) => {
                let path = Path::new(text.trim());
                path.is_file().then(|| IngestSource::File(path.to_path_buf()))
            }
            None => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum IngestOutcome {
    Loaded(LoadedImage),
    /// Not an image; the current image must stay as it is.
    Ignored,
    /// The current image must be cleared.
    Cleared,
}

/// Convert `source` off the async executor.
pub async fn ingest(source: IngestSource) -> Result<IngestOutcome> {
    tokio::task::spawn_blocking(move || ingest_blocking(source))
        .await
        .map_err(|e| Error::Other(format!("ingest task failed: {e}")))?
}

pub fn ingest_blocking(source: IngestSource) -> Result<IngestOutcome> {
    match source {
        IngestSource::Cleared => Ok(IngestOutcome::Cleared),
        IngestSource::File(path) => {
            let data = std::fs::read(&path)?;
            let mime = mime_from_path(&path).or_else(|| sniff_mime(&data));
            normalize(mime.as_deref(), data)
        }
        IngestSource::Bytes { mime, data } => {
            let mime = mime.or_else(|| sniff_mime(&data));
            normalize(mime.as_deref(), data)
        }
        IngestSource::DataUri(uri) => {
            let (mime, data) = decode_data_uri(&uri)?;
            normalize(Some(&mime), data)
        }
    }
}

fn normalize(mime: Option<&str>, data: Vec<u8>) -> Result<IngestOutcome> {
    let mime = match mime {
        Some(m) if m.trim().to_ascii_lowercase().starts_with("image/") => {
            m.trim().to_ascii_lowercase()
        }
        other => {
            log::debug!("ignoring non-image input ({})", other.unwrap_or("unknown type"));
            return Ok(IngestOutcome::Ignored);
        }
    };

    let bitmap = ImageReader::new(Cursor::new(&data))
        .with_guessed_format()?
        .decode()?
        .to_rgba8();
    log::info!(
        "loaded {} image ({}x{}, {} bytes)",
        mime,
        bitmap.width(),
        bitmap.height(),
        data.len()
    );

    Ok(IngestOutcome::Loaded(LoadedImage {
        data_uri: encode_data_uri(&mime, &data),
        mime,
        bitmap: Arc::new(bitmap),
    }))
}

pub fn mime_from_path(path: &Path) -> Option<String> {
    ImageFormat::from_path(path)
        .ok()
        .map(|f| f.to_mime_type().to_string())
}

pub fn sniff_mime(data: &[u8]) -> Option<String> {
    image::guess_format(data)
        .ok()
        .map(|f| f.to_mime_type().to_string())
}

pub fn encode_data_uri(mime: &str, data: &[u8]) -> String {
    format!("data:{};base64,{}", mime, STANDARD.encode(data))
}

/// Split a base64 data URI into its MIME type and decoded bytes.
pub fn decode_data_uri(uri: &str) -> Result<(String, Vec<u8>)> {
    let rest = uri
        .strip_prefix("data:")
        .ok_or_else(|| Error::Decode("not a data URI".into()))?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| Error::Decode("data URI has no payload".into()))?;
    let mime = header
        .strip_suffix(";base64")
        .ok_or_else(|| Error::Decode("only base64 data URIs are supported".into()))?;
    let data = STANDARD
        .decode(payload.trim())
        .map_err(|e| Error::Decode(format!("invalid base64 payload: {e}")))?;
    let mime = if mime.is_empty() { "text/plain" } else { mime };
    Ok((mime.to_ascii_lowercase(), data))
}

/// The base64 part of a data URI (the whole input if there is no prefix).
pub fn strip_data_uri_prefix(uri: &str) -> &str {
    match uri.split_once(',') {
        Some((header, payload)) if header.starts_with("data:") => payload,
        _ => uri,
    }
}
