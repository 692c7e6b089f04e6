//! On-screen fit of the logical canvas. Presentation only: export never
//! reads anything from here.

use crate::rendering::CanvasSize;
use crate::settings::AspectRatio;
use crate::Viewport;

/// Space kept free around the preview inside the viewport.
pub const PREVIEW_MARGIN: f32 = 32.0;

/// Scale that shrinks `canvas` to fit `viewport` minus the margin. Never
/// enlarges; an empty viewport yields a tiny positive scale rather than zero.
pub fn fit_scale(canvas: CanvasSize, viewport: Viewport) -> f32 {
    let avail_w = (viewport.width as f32 - PREVIEW_MARGIN).max(1.0);
    let avail_h = (viewport.height as f32 - PREVIEW_MARGIN).max(1.0);
    (avail_w / canvas.width as f32)
        .min(avail_h / canvas.height as f32)
        .min(1.0)
}

/// Cached fit scale for the current viewport and aspect ratio.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Preview {
    viewport: Viewport,
    aspect: AspectRatio,
    fit_scale: f32,
}

impl Preview {
    pub fn new(viewport: Viewport, aspect: AspectRatio) -> Self {
        let canvas = crate::rendering::layout::canvas_size(aspect);
        Self {
            viewport,
            aspect,
            fit_scale: fit_scale(canvas, viewport),
        }
    }

    pub fn fit_scale(&self) -> f32 {
        self.fit_scale
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn resize(&mut self, viewport: Viewport) {
        if viewport != self.viewport {
            *self = Preview::new(viewport, self.aspect);
        }
    }

    pub fn set_aspect(&mut self, aspect: AspectRatio) {
        if aspect != self.aspect {
            *self = Preview::new(self.viewport, aspect);
        }
    }

    /// On-screen size of the canvas.
    pub fn displayed_size(&self) -> (f32, f32) {
        let canvas = crate::rendering::layout::canvas_size(self.aspect);
        (
            canvas.width as f32 * self.fit_scale,
            canvas.height as f32 * self.fit_scale,
        )
    }
}
