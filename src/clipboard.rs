//! Clipboard access used by paste-ingestion and copy-export.
//!
//! The system implementation sits behind the `clipboard` feature (arboard);
//! [`MemoryClipboard`] is always available and backs the tests.

use std::io::Cursor;

use image::{ImageFormat, RgbaImage};

use crate::{Error, Result};

/// What a paste produced.
#[derive(Debug, Clone, PartialEq)]
pub enum ClipboardPayload {
    /// Encoded image bytes with their MIME type.
    Image { mime: String, data: Vec<u8> },
    /// Plain text, possibly a path to an image file.
    Text(String),
}

pub trait ClipboardSource {
    /// Read the current clipboard content. `Ok(None)` means there is nothing
    /// usable on it.
    fn read(&mut self) -> Result<Option<ClipboardPayload>>;
}

pub trait ClipboardSink {
    /// Put an encoded PNG on the clipboard.
    fn write_png(&mut self, png: &[u8]) -> Result<()>;
}

/// In-process clipboard.
#[derive(Debug, Default, Clone)]
pub struct MemoryClipboard {
    pub content: Option<ClipboardPayload>,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_image(mime: &str, data: Vec<u8>) -> Self {
        Self {
            content: Some(ClipboardPayload::Image {
                mime: mime.to_string(),
                data,
            }),
        }
    }

    /// PNG bytes last written by a copy, if any.
    pub fn png(&self) -> Option<&[u8]> {
        match &self.content {
            Some(ClipboardPayload::Image { mime, data }) if mime == "image/png" => Some(data),
            _ => None,
        }
    }
}

impl ClipboardSource for MemoryClipboard {
    fn read(&mut self) -> Result<Option<ClipboardPayload>> {
        Ok(self.content.clone())
    }
}

impl ClipboardSink for MemoryClipboard {
    fn write_png(&mut self, png: &[u8]) -> Result<()> {
        self.content = Some(ClipboardPayload::Image {
            mime: "image/png".to_string(),
            data: png.to_vec(),
        });
        Ok(())
    }
}

pub(crate) fn encode_png(img: &RgbaImage) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    img.write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
        .map_err(|e| Error::Encode {
            format: "png",
            reason: e.to_string(),
        })?;
    Ok(buffer)
}

/// The OS clipboard through arboard.
#[cfg(feature = "clipboard")]
pub struct SystemClipboard {
    inner: arboard::Clipboard,
}

#[cfg(feature = "clipboard")]
impl SystemClipboard {
    pub fn new() -> Result<Self> {
        let inner = arboard::Clipboard::new().map_err(|e| Error::Clipboard(e.to_string()))?;
        Ok(Self { inner })
    }
}

#[cfg(feature = "clipboard")]
impl ClipboardSource for SystemClipboard {
    fn read(&mut self) -> Result<Option<ClipboardPayload>> {
        // arboard hands out raw RGBA; re-encode so every paste looks like a
        // PNG file to the ingestion path.
        if let Ok(data) = self.inner.get_image() {
            if let Some(img) =
                RgbaImage::from_raw(data.width as u32, data.height as u32, data.bytes.into_owned())
            {
                return Ok(Some(ClipboardPayload::Image {
                    mime: "image/png".to_string(),
                    data: encode_png(&img)?,
                }));
            }
        }
        match self.inner.get_text() {
            Ok(text) if !text.trim().is_empty() => Ok(Some(ClipboardPayload::Text(text))),
            _ => Ok(None),
        }
    }
}

#[cfg(feature = "clipboard")]
impl ClipboardSink for SystemClipboard {
    fn write_png(&mut self, png: &[u8]) -> Result<()> {
        let img = image::load_from_memory_with_format(png, ImageFormat::Png)?.to_rgba8();
        let data = arboard::ImageData {
            width: img.width() as usize,
            height: img.height() as usize,
            bytes: std::borrow::Cow::Borrowed(img.as_raw()),
        };
        self.inner
            .set_image(data)
            .map_err(|e| Error::Clipboard(e.to_string()))
    }
}
