/// Software rasterizer for composited frames.
use image::imageops::{self, FilterType};
use image::{GrayImage, Luma, Rgba, RgbaImage};

use crate::color::Color;
use crate::rendering::layout::Rect;
use crate::rendering::paint::{BackgroundPaint, CornerRadii, PaintCommand, Scene};
use crate::rendering::{RasterOptions, Rasterizer};
use crate::{Error, Result};

/// CPU rasterizer built on `image` and `imageproc`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SoftwareRasterizer;

impl SoftwareRasterizer {
    pub fn new() -> Self {
        SoftwareRasterizer
    }
}

impl Rasterizer for SoftwareRasterizer {
    fn rasterize(&self, scene: &Scene, options: &RasterOptions) -> Result<RgbaImage> {
        let ratio = options.pixel_ratio;
        if !ratio.is_finite() || ratio <= 0.0 {
            return Err(Error::Render(format!("invalid pixel ratio {ratio}")));
        }
        let (width, height) = options.pixel_size(scene);
        if width == 0 || height == 0 {
            return Err(Error::Render(format!("empty canvas {width}x{height}")));
        }

        let fill = options.background.unwrap_or(Color::TRANSPARENT);
        let mut canvas = RgbaImage::from_pixel(width, height, fill.to_rgba());
        for cmd in &scene.commands {
            paint_command(&mut canvas, cmd, ratio);
        }
        log::debug!(
            "rasterized {} commands at {}x{} (ratio {})",
            scene.commands.len(),
            width,
            height,
            ratio
        );
        Ok(canvas)
    }
}

fn paint_command(canvas: &mut RgbaImage, cmd: &PaintCommand, ratio: f32) {
    match cmd {
        PaintCommand::Background(bg) => paint_background(canvas, bg, ratio),
        PaintCommand::Shadow {
            rect,
            radius,
            color,
            blur,
            offset_y,
            spread,
        } => {
            let rect = rect.outset(*spread).translated(0.0, *offset_y).times(ratio);
            let radius = ((radius + spread) * ratio).max(0.0);
            // CSS blur radius is twice the standard deviation.
            paint_shadow(canvas, rect, radius, *color, blur * ratio / 2.0);
        }
        PaintCommand::RoundedRect { rect, radii, color } => {
            let radii = CornerRadii {
                top_left: radii.top_left * ratio,
                top_right: radii.top_right * ratio,
                bottom_right: radii.bottom_right * ratio,
                bottom_left: radii.bottom_left * ratio,
            };
            fill_rounded_rect(canvas, rect.times(ratio), &radii, *color);
        }
        PaintCommand::Circle { circle, color } => {
            let (cx, cy, r) = (circle.cx * ratio, circle.cy * ratio, circle.r * ratio);
            let bounds = Rect::new(cx - r, cy - r, 2.0 * r, 2.0 * r);
            for_each_pixel(canvas, bounds, |canvas, x, y| {
                let (px, py) = (x as f32 + 0.5, y as f32 + 0.5);
                let d = ((px - cx).powi(2) + (py - cy).powi(2)).sqrt() - r;
                blend(canvas.get_pixel_mut(x, y), color.to_rgba(), coverage(d));
            });
        }
        PaintCommand::Image {
            rect,
            bitmap,
            clip,
            clip_radius,
        } => paint_image(canvas, bitmap, rect.times(ratio), clip.times(ratio), clip_radius * ratio),
    }
}

fn paint_background(canvas: &mut RgbaImage, bg: &BackgroundPaint, ratio: f32) {
    let (w, h) = canvas.dimensions();
    match bg {
        BackgroundPaint::Solid(color) => {
            let src = color.to_rgba();
            for px in canvas.pixels_mut() {
                blend(px, src, 1.0);
            }
        }
        BackgroundPaint::LinearGradient {
            start,
            end,
            direction,
        } => {
            let (fw, fh) = (w as f32, h as f32);
            let (dx, dy) = direction.vector(fw, fh);
            let length = (fw * dx.abs() + fh * dy.abs()).max(f32::EPSILON);
            let (cx, cy) = (fw / 2.0, fh / 2.0);
            for (x, y, px) in canvas.enumerate_pixels_mut() {
                let (px_x, px_y) = (x as f32 + 0.5 - cx, y as f32 + 0.5 - cy);
                let t = (px_x * dx + px_y * dy) / length + 0.5;
                blend(px, start.lerp(*end, t).to_rgba(), 1.0);
            }
        }
        BackgroundPaint::Bitmap {
            bitmap,
            blur,
            scale,
        } => {
            let layer = cover_layer(bitmap, w, h, *scale);
            let layer = if *blur > 0.0 {
                soft_blur(&layer, blur * ratio)
            } else {
                layer
            };
            for (dst, src) in canvas.pixels_mut().zip(layer.pixels()) {
                blend(dst, *src, 1.0);
            }
        }
    }
}

/// Scale `src` to cover `w`x`h` (times `extra`), centered and cropped.
fn cover_layer(src: &RgbaImage, w: u32, h: u32, extra: f32) -> RgbaImage {
    let (sw, sh) = src.dimensions();
    if sw == 0 || sh == 0 {
        return RgbaImage::new(w, h);
    }
    let k = (w as f32 / sw as f32).max(h as f32 / sh as f32) * extra.max(1.0);
    let rw = ((sw as f32 * k).ceil() as u32).max(w);
    let rh = ((sh as f32 * k).ceil() as u32).max(h);
    let resized = imageops::resize(src, rw, rh, FilterType::Triangle);
    imageops::crop_imm(&resized, (rw - w) / 2, (rh - h) / 2, w, h).to_image()
}

/// Gaussian blur that works on a reduced copy when sigma is large.
fn soft_blur<P>(img: &image::ImageBuffer<P, Vec<u8>>, sigma: f32) -> image::ImageBuffer<P, Vec<u8>>
where
    P: image::Pixel<Subpixel = u8> + 'static,
{
    if sigma <= 0.0 {
        return img.clone();
    }
    let (w, h) = img.dimensions();
    let factor = (sigma / 3.0).floor().max(1.0);
    if factor <= 1.0 || w < 8 || h < 8 {
        return imageproc::filter::gaussian_blur_f32(img, sigma);
    }
    let sw = ((w as f32 / factor).round() as u32).max(1);
    let sh = ((h as f32 / factor).round() as u32).max(1);
    let small = imageops::resize(img, sw, sh, FilterType::Triangle);
    let blurred = imageproc::filter::gaussian_blur_f32(&small, sigma / factor);
    imageops::resize(&blurred, w, h, FilterType::Triangle)
}

fn paint_shadow(canvas: &mut RgbaImage, rect: Rect, radius: f32, color: Color, sigma: f32) {
    if rect.width <= 0.0 || rect.height <= 0.0 {
        return;
    }
    let margin = (3.0 * sigma).ceil() + 1.0;
    let region = rect.outset(margin);
    let (w, h) = canvas.dimensions();
    let x0 = region.x.floor().max(0.0) as u32;
    let y0 = region.y.floor().max(0.0) as u32;
    let x1 = (region.right().ceil().max(0.0) as u32).min(w);
    let y1 = (region.bottom().ceil().max(0.0) as u32).min(h);
    if x1 <= x0 || y1 <= y0 {
        return;
    }

    let local = rect.translated(-(x0 as f32), -(y0 as f32));
    let radii = CornerRadii::uniform(radius);
    let mut mask = GrayImage::new(x1 - x0, y1 - y0);
    for (x, y, m) in mask.enumerate_pixels_mut() {
        let d = rounded_rect_distance(x as f32 + 0.5, y as f32 + 0.5, &local, &radii);
        *m = Luma([(coverage(d) * 255.0).round() as u8]);
    }
    let mask = soft_blur(&mask, sigma);

    let src = color.to_rgba();
    for (x, y, m) in mask.enumerate_pixels() {
        blend(canvas.get_pixel_mut(x0 + x, y0 + y), src, m[0] as f32 / 255.0);
    }
}

fn fill_rounded_rect(canvas: &mut RgbaImage, rect: Rect, radii: &CornerRadii, color: Color) {
    let src = color.to_rgba();
    for_each_pixel(canvas, rect, |canvas, x, y| {
        let d = rounded_rect_distance(x as f32 + 0.5, y as f32 + 0.5, &rect, radii);
        blend(canvas.get_pixel_mut(x, y), src, coverage(d));
    });
}

fn paint_image(canvas: &mut RgbaImage, bitmap: &RgbaImage, rect: Rect, clip: Rect, clip_radius: f32) {
    let x0 = rect.x.round();
    let y0 = rect.y.round();
    let tw = (rect.right().round() - x0).max(0.0) as u32;
    let th = (rect.bottom().round() - y0).max(0.0) as u32;
    if tw == 0 || th == 0 || bitmap.width() == 0 || bitmap.height() == 0 {
        return;
    }
    let scaled = if (tw, th) == bitmap.dimensions() {
        bitmap.clone()
    } else {
        imageops::resize(bitmap, tw, th, FilterType::CatmullRom)
    };
    let radii = CornerRadii::uniform(clip_radius);
    let (cw, ch) = canvas.dimensions();
    for (sx, sy, src) in scaled.enumerate_pixels() {
        let x = x0 as i64 + sx as i64;
        let y = y0 as i64 + sy as i64;
        if x < 0 || y < 0 || x >= cw as i64 || y >= ch as i64 {
            continue;
        }
        let (x, y) = (x as u32, y as u32);
        let d = rounded_rect_distance(x as f32 + 0.5, y as f32 + 0.5, &clip, &radii);
        blend(canvas.get_pixel_mut(x, y), *src, coverage(d));
    }
}

/// Visit every canvas pixel whose square intersects `bounds`.
fn for_each_pixel(canvas: &mut RgbaImage, bounds: Rect, mut f: impl FnMut(&mut RgbaImage, u32, u32)) {
    let (w, h) = canvas.dimensions();
    let x0 = bounds.x.floor().max(0.0) as u32;
    let y0 = bounds.y.floor().max(0.0) as u32;
    let x1 = (bounds.right().ceil().max(0.0) as u32).min(w);
    let y1 = (bounds.bottom().ceil().max(0.0) as u32).min(h);
    for y in y0..y1 {
        for x in x0..x1 {
            f(canvas, x, y);
        }
    }
}

/// Signed distance from `(px, py)` to a rounded rectangle (negative inside).
pub(crate) fn rounded_rect_distance(px: f32, py: f32, rect: &Rect, radii: &CornerRadii) -> f32 {
    let (hw, hh) = (rect.width / 2.0, rect.height / 2.0);
    let (cx, cy) = rect.center();
    let (qx, qy) = (px - cx, py - cy);
    let r = match (qx < 0.0, qy < 0.0) {
        (true, true) => radii.top_left,
        (false, true) => radii.top_right,
        (false, false) => radii.bottom_right,
        (true, false) => radii.bottom_left,
    }
    .max(0.0)
    .min(hw)
    .min(hh);
    let dx = qx.abs() - (hw - r);
    let dy = qy.abs() - (hh - r);
    let outside = (dx.max(0.0).powi(2) + dy.max(0.0).powi(2)).sqrt();
    outside + dx.max(dy).min(0.0) - r
}

/// One-pixel antialiasing ramp over a signed distance.
fn coverage(distance: f32) -> f32 {
    (0.5 - distance).clamp(0.0, 1.0)
}

/// Source-over with straight alpha, `src` alpha scaled by `cov`.
pub(crate) fn blend(dst: &mut Rgba<u8>, src: Rgba<u8>, cov: f32) {
    let sa = src[3] as f32 / 255.0 * cov.clamp(0.0, 1.0);
    if sa <= 0.0 {
        return;
    }
    let da = dst[3] as f32 / 255.0;
    let oa = sa + da * (1.0 - sa);
    let mut out = [0u8; 4];
    for c in 0..3 {
        let v = (src[c] as f32 * sa + dst[c] as f32 * da * (1.0 - sa)) / oa;
        out[c] = v.round().clamp(0.0, 255.0) as u8;
    }
    out[3] = (oa * 255.0).round().clamp(0.0, 255.0) as u8;
    *dst = Rgba(out);
}
