/// Frame layout on the fixed logical canvas.
///
/// All coordinates here are logical units. The canvas is always
/// `CANVAS_WIDTH` wide; its height follows the aspect ratio. Pixel output is
/// derived later by multiplying with the raster pixel ratio.
use crate::settings::{AspectRatio, Settings};

pub const CANVAS_WIDTH: u32 = 1200;
pub const HEADER_HEIGHT: f32 = 40.0;
pub const DOT_RADIUS: f32 = 6.0;
pub const DOT_SPACING: f32 = 20.0;
pub const DOT_INSET: f32 = 18.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Scale about `(cx, cy)`, the way a CSS transform scales a box.
    pub fn scaled_about(&self, cx: f32, cy: f32, s: f32) -> Rect {
        Rect {
            x: cx + (self.x - cx) * s,
            y: cy + (self.y - cy) * s,
            width: self.width * s,
            height: self.height * s,
        }
    }

    /// Grow (or shrink, for negative `d`) on every side.
    pub fn outset(&self, d: f32) -> Rect {
        Rect {
            x: self.x - d,
            y: self.y - d,
            width: (self.width + 2.0 * d).max(0.0),
            height: (self.height + 2.0 * d).max(0.0),
        }
    }

    pub fn translated(&self, dx: f32, dy: f32) -> Rect {
        Rect {
            x: self.x + dx,
            y: self.y + dy,
            ..*self
        }
    }

    pub fn times(&self, k: f32) -> Rect {
        Rect {
            x: self.x * k,
            y: self.y * k,
            width: self.width * k,
            height: self.height * k,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Circle {
    pub cx: f32,
    pub cy: f32,
    pub r: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanvasSize {
    pub width: u32,
    pub height: u32,
}

/// The window chrome after `settings.scale` has been applied.
#[derive(Debug, Clone, PartialEq)]
pub struct ChromeLayout {
    pub outer: Rect,
    pub header: Rect,
    /// Where the image is drawn.
    pub body: Rect,
    pub dots: [Circle; 3],
    /// Outer corner radius, already scaled and limited to half the short side.
    pub radius: f32,
    pub scale: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FrameLayout {
    pub canvas: CanvasSize,
    /// Largest box the image may occupy, before chrome scaling.
    pub max_image: (f32, f32),
    /// `None` when no image is loaded.
    pub chrome: Option<ChromeLayout>,
}

pub fn canvas_size(aspect: AspectRatio) -> CanvasSize {
    let (w, h) = aspect.terms();
    CanvasSize {
        width: CANVAS_WIDTH,
        height: (CANVAS_WIDTH as f32 * h as f32 / w as f32).round() as u32,
    }
}

/// `(canvas_w - 2p, canvas_h - 2p - header)`, never negative.
pub fn max_image_box(canvas: CanvasSize, padding: f32) -> (f32, f32) {
    let padding = padding.max(0.0);
    let w = canvas.width as f32 - 2.0 * padding;
    let h = canvas.height as f32 - 2.0 * padding - HEADER_HEIGHT;
    (w.max(0.0), h.max(0.0))
}

/// Fit `natural` into `max` keeping its aspect ratio. Only shrinks.
pub fn fit_image(natural: (u32, u32), max: (f32, f32)) -> (f32, f32) {
    let (iw, ih) = (natural.0 as f32, natural.1 as f32);
    if iw <= 0.0 || ih <= 0.0 {
        return (0.0, 0.0);
    }
    let s = (max.0 / iw).min(max.1 / ih).min(1.0);
    (iw * s, ih * s)
}

pub fn compute(settings: &Settings, image_size: Option<(u32, u32)>) -> FrameLayout {
    let canvas = canvas_size(settings.aspect_ratio);
    let max_image = max_image_box(canvas, settings.padding);
    let chrome = image_size.map(|natural| chrome_layout(settings, canvas, fit_image(natural, max_image)));
    FrameLayout {
        canvas,
        max_image,
        chrome,
    }
}

fn chrome_layout(settings: &Settings, canvas: CanvasSize, image: (f32, f32)) -> ChromeLayout {
    let (img_w, img_h) = image;
    let width = img_w;
    let height = img_h + HEADER_HEIGHT;
    let (cx, cy) = (canvas.width as f32 / 2.0, canvas.height as f32 / 2.0);
    let outer = Rect::new(cx - width / 2.0, cy - height / 2.0, width, height);
    let header = Rect::new(outer.x, outer.y, width, HEADER_HEIGHT);
    let body = Rect::new(outer.x, outer.y + HEADER_HEIGHT, img_w, img_h);

    let dot_y = header.y + HEADER_HEIGHT / 2.0;
    let dots = [0.0, 1.0, 2.0].map(|i| Circle {
        cx: header.x + DOT_INSET + i * DOT_SPACING,
        cy: dot_y,
        r: DOT_RADIUS,
    });

    let s = if settings.scale.is_finite() && settings.scale > 0.0 {
        settings.scale
    } else {
        1.0
    };
    let scale_dot = |d: Circle| Circle {
        cx: cx + (d.cx - cx) * s,
        cy: cy + (d.cy - cy) * s,
        r: d.r * s,
    };
    let outer = outer.scaled_about(cx, cy, s);
    let radius = (settings.border_radius.max(0.0) * s)
        .min(outer.width / 2.0)
        .min(outer.height / 2.0);

    ChromeLayout {
        header: header.scaled_about(cx, cy, s),
        body: body.scaled_about(cx, cy, s),
        dots: dots.map(scale_dot),
        outer,
        radius,
        scale: s,
    }
}
