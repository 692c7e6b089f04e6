//! Maps a [`BackgroundConfig`] to a description of how to paint it.

use crate::color::Color;
use crate::settings::{BackgroundConfig, BackgroundKind, GradientDirection};

/// Upscale applied to a blurred bitmap so the soft edges never expose the
/// canvas behind it.
pub const BLUR_COMPENSATION_SCALE: f32 = 1.05;

/// How a bitmap is fitted to the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitmapFit {
    /// Fill the canvas, cropping overflow, centered.
    Cover,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PaintDescription {
    Solid(Color),
    LinearGradient {
        start: Color,
        end: Color,
        direction: GradientDirection,
    },
    Bitmap {
        /// Wallpaper path or data URI.
        source: String,
        fit: BitmapFit,
        /// Blur radius in logical units; `0` means none.
        blur: f32,
        /// Extra scale around the canvas center.
        scale: f32,
    },
}

pub fn resolve(config: &BackgroundConfig) -> PaintDescription {
    match config.kind {
        BackgroundKind::Solid => PaintDescription::Solid(config.solid),
        BackgroundKind::Gradient => PaintDescription::LinearGradient {
            start: config.gradient.start,
            end: config.gradient.end,
            direction: config.gradient.direction,
        },
        BackgroundKind::Wallpaper | BackgroundKind::Image => match &config.image {
            Some(source) if !source.trim().is_empty() => {
                let blur = config.blur.max(0.0);
                PaintDescription::Bitmap {
                    source: source.clone(),
                    fit: BitmapFit::Cover,
                    blur,
                    scale: if blur > 0.0 { BLUR_COMPENSATION_SCALE } else { 1.0 },
                }
            }
            _ => PaintDescription::Solid(Color::BLACK),
        },
        BackgroundKind::Unknown => PaintDescription::Solid(Color::BLACK),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bg(kind: BackgroundKind) -> BackgroundConfig {
        BackgroundConfig {
            kind,
            image: Some("wallpapers/aurora.jpg".into()),
            ..Default::default()
        }
    }

    #[test]
    fn solid_and_gradient() {
        let cfg = bg(BackgroundKind::Solid);
        assert_eq!(resolve(&cfg), PaintDescription::Solid(cfg.solid));

        let cfg = bg(BackgroundKind::Gradient);
        match resolve(&cfg) {
            PaintDescription::LinearGradient { start, end, direction } => {
                assert_eq!(start, cfg.gradient.start);
                assert_eq!(end, cfg.gradient.end);
                assert_eq!(direction, GradientDirection::ToBottomRight);
            }
            other => panic!("unexpected paint: {other:?}"),
        }
    }

    #[test]
    fn blurred_bitmap_is_upscaled() {
        let mut cfg = bg(BackgroundKind::Wallpaper);
        cfg.blur = 8.0;
        match resolve(&cfg) {
            PaintDescription::Bitmap { blur, scale, fit, .. } => {
                assert_eq!(blur, 8.0);
                assert_eq!(scale, BLUR_COMPENSATION_SCALE);
                assert_eq!(fit, BitmapFit::Cover);
            }
            other => panic!("unexpected paint: {other:?}"),
        }

        cfg.blur = 0.0;
        match resolve(&cfg) {
            PaintDescription::Bitmap { scale, .. } => assert_eq!(scale, 1.0),
            other => panic!("unexpected paint: {other:?}"),
        }
    }

    #[test]
    fn image_kind_uses_same_bitmap_path() {
        let cfg = bg(BackgroundKind::Image);
        assert!(matches!(resolve(&cfg), PaintDescription::Bitmap { .. }));
    }

    #[test]
    fn unknown_or_sourceless_is_black() {
        assert_eq!(
            resolve(&bg(BackgroundKind::Unknown)),
            PaintDescription::Solid(Color::BLACK)
        );
        let cfg = BackgroundConfig {
            kind: BackgroundKind::Wallpaper,
            image: None,
            ..Default::default()
        };
        assert_eq!(resolve(&cfg), PaintDescription::Solid(Color::BLACK));
    }
}
