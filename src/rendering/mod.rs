//! Compositor: layout → paint commands → raster.
//!
//! The rasterizer sits behind [`Rasterizer`] so another backend (a GPU
//! compositor, a browser bridge) can replace [`raster::SoftwareRasterizer`]
//! without touching layout or export.

pub mod layout;
pub mod paint;
pub mod raster;

use image::RgbaImage;

use crate::color::Color;
use crate::export::{self, ExportFormat};
use crate::Result;

pub use layout::{CanvasSize, ChromeLayout, FrameLayout, Rect};
pub use paint::{build_scene, PaintCommand, Scene};
pub use raster::SoftwareRasterizer;

/// Oversampling applied to every export regardless of display density.
pub const DEFAULT_PIXEL_RATIO: f32 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RasterOptions {
    pub pixel_ratio: f32,
    /// Backing fill painted under the frame. `None` leaves uncovered pixels
    /// transparent.
    pub background: Option<Color>,
}

impl Default for RasterOptions {
    fn default() -> Self {
        Self {
            pixel_ratio: DEFAULT_PIXEL_RATIO,
            background: None,
        }
    }
}

impl RasterOptions {
    /// Output size in pixels for a scene.
    pub fn pixel_size(&self, scene: &Scene) -> (u32, u32) {
        (
            (scene.width() as f32 * self.pixel_ratio).round() as u32,
            (scene.height() as f32 * self.pixel_ratio).round() as u32,
        )
    }
}

/// Renders a scene to a bitmap at a given pixel ratio and backing fill.
pub trait Rasterizer: Send + Sync {
    fn rasterize(&self, scene: &Scene, options: &RasterOptions) -> Result<RgbaImage>;

    /// Rasterize straight to an encoded blob of the given format.
    fn rasterize_blob(
        &self,
        scene: &Scene,
        options: &RasterOptions,
        format: ExportFormat,
    ) -> Result<Vec<u8>> {
        let img = self.rasterize(scene, options)?;
        export::encode(&img, format, options.background)
    }
}
