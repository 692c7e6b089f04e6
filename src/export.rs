//! Export pipeline: rasterize the composited frame and hand the bytes to a
//! file download or the clipboard.
//!
//! Every export waits a short settle delay, rasterizes at a fixed pixel ratio
//! (2x by default) and encodes. JPEG has no alpha, so it is always painted
//! over an explicit backing fill: the solid background color when the
//! background is solid, black otherwise. WebP goes through a blob URL which is
//! revoked as soon as the bytes have been read back.

use std::fmt;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::codecs::webp::WebPEncoder;
use image::{ExtendedColorType, ImageEncoder, Rgba, RgbaImage};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::blob::BlobRegistry;
use crate::clipboard::ClipboardSink;
use crate::color::Color;
use crate::rendering::{raster, RasterOptions, Rasterizer, Scene, DEFAULT_PIXEL_RATIO};
use crate::settings::{BackgroundKind, Settings};
use crate::{Error, Result};

/// Base name of downloaded files; the format's extension is appended.
pub const DOWNLOAD_BASENAME: &str = "shotframe-export";
/// Default JPEG quality (1..=100).
pub const JPEG_QUALITY: u8 = 100;
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Png,
    Jpeg,
    Webp,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 3] = [ExportFormat::Png, ExportFormat::Jpeg, ExportFormat::Webp];

    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Png => "png",
            ExportFormat::Jpeg => "jpeg",
            ExportFormat::Webp => "webp",
        }
    }

    pub fn mime(self) -> &'static str {
        match self {
            ExportFormat::Png => "image/png",
            ExportFormat::Jpeg => "image/jpeg",
            ExportFormat::Webp => "image/webp",
        }
    }

    /// Whether the encoding keeps an alpha channel.
    pub fn has_alpha(self) -> bool {
        !matches!(self, ExportFormat::Jpeg)
    }

    pub fn file_name(self) -> String {
        format!("{}.{}", DOWNLOAD_BASENAME, self.extension())
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "png" => Ok(ExportFormat::Png),
            "jpeg" | "jpg" => Ok(ExportFormat::Jpeg),
            "webp" => Ok(ExportFormat::Webp),
            other => Err(Error::Config(format!("unsupported output format: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExportOptions {
    pub pixel_ratio: f32,
    /// Minimum wait between the request and rasterization.
    pub settle_delay: Duration,
    pub jpeg_quality: u8,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            pixel_ratio: DEFAULT_PIXEL_RATIO,
            settle_delay: DEFAULT_SETTLE_DELAY,
            jpeg_quality: JPEG_QUALITY,
        }
    }
}

/// Fill painted under the frame for formats without alpha.
pub fn backing_fill(settings: &Settings) -> Color {
    match settings.background.kind {
        BackgroundKind::Solid => settings.background.solid,
        _ => Color::BLACK,
    }
}

pub fn raster_options(settings: &Settings, format: ExportFormat, options: &ExportOptions) -> RasterOptions {
    RasterOptions {
        pixel_ratio: options.pixel_ratio,
        background: (!format.has_alpha()).then(|| backing_fill(settings)),
    }
}

/// Encode a raster. `fill` is composited under the image for JPEG (black
/// when absent); PNG and WebP keep transparency.
pub fn encode(img: &RgbaImage, format: ExportFormat, fill: Option<Color>) -> Result<Vec<u8>> {
    encode_with_quality(img, format, fill, JPEG_QUALITY)
}

/// [`encode`] with an explicit JPEG quality, clamped to 1..=100. Ignored by
/// the lossless formats.
pub fn encode_with_quality(
    img: &RgbaImage,
    format: ExportFormat,
    fill: Option<Color>,
    jpeg_quality: u8,
) -> Result<Vec<u8>> {
    let (width, height) = img.dimensions();
    let mut buffer = Vec::new();
    let fail = |e: image::ImageError| Error::Encode {
        format: format.extension(),
        reason: e.to_string(),
    };
    match format {
        ExportFormat::Png => {
            PngEncoder::new_with_quality(
                Cursor::new(&mut buffer),
                CompressionType::Default,
                PngFilter::Adaptive,
            )
            .write_image(img.as_raw(), width, height, ExtendedColorType::Rgba8)
            .map_err(fail)?;
        }
        ExportFormat::Jpeg => {
            let flat = flatten(img, fill.unwrap_or(Color::BLACK));
            let rgb = image::DynamicImage::ImageRgba8(flat).to_rgb8();
            JpegEncoder::new_with_quality(Cursor::new(&mut buffer), jpeg_quality.clamp(1, 100))
                .write_image(rgb.as_raw(), width, height, ExtendedColorType::Rgb8)
                .map_err(fail)?;
        }
        ExportFormat::Webp => {
            WebPEncoder::new_lossless(Cursor::new(&mut buffer))
                .write_image(img.as_raw(), width, height, ExtendedColorType::Rgba8)
                .map_err(fail)?;
        }
    }
    Ok(buffer)
}

fn flatten(img: &RgbaImage, fill: Color) -> RgbaImage {
    let base = Rgba([fill.r, fill.g, fill.b, 255]);
    let mut out = RgbaImage::from_pixel(img.width(), img.height(), base);
    for (dst, src) in out.pixels_mut().zip(img.pixels()) {
        raster::blend(dst, *src, 1.0);
    }
    out
}

/// An encoded export.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportedImage {
    pub format: ExportFormat,
    pub width: u32,
    pub height: u32,
    pub bytes: Vec<u8>,
}

impl ExportedImage {
    pub fn file_name(&self) -> String {
        self.format.file_name()
    }

    /// Hex SHA-256 of the encoded bytes.
    pub fn digest(&self) -> String {
        hex::encode(Sha256::digest(&self.bytes))
    }
}

/// Idle/busy state of an export trigger (download or copy button).
#[derive(Debug, Clone)]
pub struct ExportControl {
    name: &'static str,
    idle_label: &'static str,
    busy_label: &'static str,
    state: Arc<Mutex<ControlState>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlState {
    pub label: &'static str,
    pub busy: bool,
}

impl ExportControl {
    pub fn new(name: &'static str, idle_label: &'static str, busy_label: &'static str) -> Self {
        Self {
            name,
            idle_label,
            busy_label,
            state: Arc::new(Mutex::new(ControlState {
                label: idle_label,
                busy: false,
            })),
        }
    }

    pub fn download() -> Self {
        Self::new("download", "Download", "Exporting...")
    }

    pub fn copy() -> Self {
        Self::new("copy", "Copy to clipboard", "Copying...")
    }

    pub fn state(&self) -> ControlState {
        match self.state.lock() {
            Ok(state) => state.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn label(&self) -> &'static str {
        self.state().label
    }

    pub fn is_busy(&self) -> bool {
        self.state().busy
    }

    /// Disable the control for the duration of an operation. The returned
    /// guard restores the idle state when dropped, whatever the outcome.
    pub fn begin(&self) -> Result<ControlGuard> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| Error::Other(format!("{} control state is poisoned", self.name)))?;
        if state.busy {
            return Err(Error::Busy(self.name));
        }
        *state = ControlState {
            label: self.busy_label,
            busy: true,
        };
        Ok(ControlGuard {
            control: self.clone(),
        })
    }
}

#[derive(Debug)]
pub struct ControlGuard {
    control: ExportControl,
}

impl Drop for ControlGuard {
    fn drop(&mut self) {
        if let Ok(mut state) = self.control.state.lock() {
            *state = ControlState {
                label: self.control.idle_label,
                busy: false,
            };
        }
    }
}

/// Latest user-visible message (export failures and the like).
#[derive(Debug, Clone, Default)]
pub struct Notices {
    current: Arc<Mutex<Option<String>>>,
}

impl Notices {
    pub fn post(&self, message: impl Into<String>) {
        let message = message.into();
        log::warn!("{}", message);
        if let Ok(mut current) = self.current.lock() {
            *current = Some(message);
        }
    }

    pub fn current(&self) -> Option<String> {
        self.current.lock().ok()?.clone()
    }

    pub fn take(&self) -> Option<String> {
        self.current.lock().ok()?.take()
    }
}

/// Wait for the settle delay, then rasterize and encode off the executor.
pub async fn render(
    rasterizer: Arc<dyn Rasterizer>,
    scene: Scene,
    settings: &Settings,
    format: ExportFormat,
    options: &ExportOptions,
    blobs: &BlobRegistry,
) -> Result<ExportedImage> {
    tokio::time::sleep(options.settle_delay).await;

    let raster_opts = raster_options(settings, format, options);
    let (width, height) = raster_opts.pixel_size(&scene);
    let quality = options.jpeg_quality;
    let bytes = match format {
        ExportFormat::Png | ExportFormat::Jpeg => {
            spawn_raster(move || {
                let img = rasterizer.rasterize(&scene, &raster_opts)?;
                encode_with_quality(&img, format, raster_opts.background, quality)
            })
            .await?
        }
        ExportFormat::Webp => {
            let blob = spawn_raster(move || rasterizer.rasterize_blob(&scene, &raster_opts, format)).await?;
            let url = blobs.create_object_url(format.mime(), blob);
            let (_, data) = blobs
                .fetch(url.as_str())
                .ok_or_else(|| Error::Render(format!("{} vanished before it was read", url.as_str())))?;
            (*data).clone()
        }
    };

    log::info!("exported {} ({}x{}, {} bytes)", format, width, height, bytes.len());
    Ok(ExportedImage {
        format,
        width,
        height,
        bytes,
    })
}

async fn spawn_raster<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| Error::Render(format!("rasterizer task failed: {e}")))?
}

/// Write `exported` into `dir` under its download name.
pub fn save_to_dir(exported: &ExportedImage, dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(exported.file_name());
    std::fs::write(&path, &exported.bytes)?;
    log::info!("saved {:?}", path);
    Ok(path)
}

/// Put a PNG export on the clipboard. Other formats are refused.
pub fn write_clipboard(exported: &ExportedImage, clipboard: &mut dyn ClipboardSink) -> Result<()> {
    if exported.format != ExportFormat::Png {
        return Err(Error::Clipboard(format!(
            "only png can be copied, got {}",
            exported.format
        )));
    }
    clipboard.write_png(&exported.bytes)
}
