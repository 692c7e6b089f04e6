/// Paint commands: the composited frame as an ordered display list.
use std::sync::Arc;

use image::RgbaImage;

use crate::background::{self, PaintDescription};
use crate::color::Color;
use crate::ingest::LoadedImage;
use crate::rendering::layout::{self, Circle, FrameLayout, Rect};
use crate::settings::{GradientDirection, Settings};
use crate::wallpaper::WallpaperStore;

pub const DOT_COLORS: [Color; 3] = [
    Color::rgb(0xff, 0x5f, 0x57),
    Color::rgb(0xfe, 0xbc, 0x2e),
    Color::rgb(0x28, 0xc8, 0x40),
];

/// Window colors `(header, body)` for the light and dark chrome.
pub fn chrome_colors(dark: bool) -> (Color, Color) {
    if dark {
        (Color::rgb(0x2d, 0x2d, 0x2d), Color::rgb(0x1e, 0x1e, 0x1e))
    } else {
        (Color::rgb(0xf3, 0xf4, 0xf6), Color::WHITE)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CornerRadii {
    pub top_left: f32,
    pub top_right: f32,
    pub bottom_right: f32,
    pub bottom_left: f32,
}

impl CornerRadii {
    pub fn uniform(r: f32) -> Self {
        Self {
            top_left: r,
            top_right: r,
            bottom_right: r,
            bottom_left: r,
        }
    }

    pub fn top(r: f32) -> Self {
        Self {
            top_left: r,
            top_right: r,
            ..Default::default()
        }
    }
}

/// A resolved background with its bitmap already loaded.
#[derive(Debug, Clone, PartialEq)]
pub enum BackgroundPaint {
    Solid(Color),
    LinearGradient {
        start: Color,
        end: Color,
        direction: GradientDirection,
    },
    Bitmap {
        bitmap: Arc<RgbaImage>,
        blur: f32,
        scale: f32,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum PaintCommand {
    Background(BackgroundPaint),
    Shadow {
        rect: Rect,
        radius: f32,
        color: Color,
        blur: f32,
        offset_y: f32,
        spread: f32,
    },
    RoundedRect {
        rect: Rect,
        radii: CornerRadii,
        color: Color,
    },
    Circle {
        circle: Circle,
        color: Color,
    },
    Image {
        rect: Rect,
        bitmap: Arc<RgbaImage>,
        /// Rounded clip, normally the chrome outline.
        clip: Rect,
        clip_radius: f32,
    },
}

/// Everything a rasterizer needs to produce one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    pub layout: FrameLayout,
    pub commands: Vec<PaintCommand>,
}

impl Scene {
    /// Logical width.
    pub fn width(&self) -> u32 {
        self.layout.canvas.width
    }

    /// Logical height.
    pub fn height(&self) -> u32 {
        self.layout.canvas.height
    }
}

fn background_paint(desc: PaintDescription, wallpapers: &WallpaperStore) -> BackgroundPaint {
    match desc {
        PaintDescription::Solid(c) => BackgroundPaint::Solid(c),
        PaintDescription::LinearGradient {
            start,
            end,
            direction,
        } => BackgroundPaint::LinearGradient {
            start,
            end,
            direction,
        },
        PaintDescription::Bitmap {
            source,
            blur,
            scale,
            ..
        } => match wallpapers.load(&source) {
            Ok(bitmap) => BackgroundPaint::Bitmap {
                bitmap,
                blur,
                scale,
            },
            Err(e) => {
                log::warn!("background image unavailable, painting black: {}", e);
                BackgroundPaint::Solid(Color::BLACK)
            }
        },
    }
}

/// Build the display list in z-order: background, shadow, window body,
/// header, status dots, image.
pub fn build_scene(
    settings: &Settings,
    image: Option<&LoadedImage>,
    wallpapers: &WallpaperStore,
) -> Scene {
    let layout = layout::compute(settings, image.map(|i| i.dimensions()));
    let mut commands = vec![PaintCommand::Background(background_paint(
        background::resolve(&settings.background),
        wallpapers,
    ))];

    if let (Some(chrome), Some(image)) = (&layout.chrome, image) {
        let s = chrome.scale;
        if let Some(geom) = settings.shadow.size.geometry() {
            let color = settings.shadow.color.with_opacity(settings.shadow.opacity);
            if color.a > 0 {
                commands.push(PaintCommand::Shadow {
                    rect: chrome.outer,
                    radius: chrome.radius,
                    color,
                    blur: geom.blur * s,
                    offset_y: geom.offset_y * s,
                    spread: geom.spread * s,
                });
            }
        }

        let (header_color, body_color) = chrome_colors(settings.dark_mode_window);
        commands.push(PaintCommand::RoundedRect {
            rect: chrome.outer,
            radii: CornerRadii::uniform(chrome.radius),
            color: body_color,
        });
        commands.push(PaintCommand::RoundedRect {
            rect: chrome.header,
            radii: CornerRadii::top(chrome.radius),
            color: header_color,
        });
        for (circle, color) in chrome.dots.iter().zip(DOT_COLORS) {
            commands.push(PaintCommand::Circle {
                circle: *circle,
                color,
            });
        }
        commands.push(PaintCommand::Image {
            rect: chrome.body,
            bitmap: image.bitmap.clone(),
            clip: chrome.outer,
            clip_radius: chrome.radius,
        });
    }

    Scene { layout, commands }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{BackgroundKind, ShadowSize};

    fn loaded(w: u32, h: u32) -> LoadedImage {
        LoadedImage {
            data_uri: String::new(),
            mime: "image/png".into(),
            bitmap: Arc::new(RgbaImage::new(w, h)),
        }
    }

    #[test]
    fn z_order_is_background_first_image_last() {
        let scene = build_scene(&Settings::default(), Some(&loaded(300, 200)), &WallpaperStore::default());
        assert!(matches!(scene.commands.first(), Some(PaintCommand::Background(_))));
        assert!(matches!(scene.commands[1], PaintCommand::Shadow { .. }));
        assert!(matches!(scene.commands.last(), Some(PaintCommand::Image { .. })));
        let dots = scene
            .commands
            .iter()
            .filter(|c| matches!(c, PaintCommand::Circle { .. }))
            .count();
        assert_eq!(dots, 3);
    }

    #[test]
    fn shadow_none_emits_no_shadow() {
        let mut settings = Settings::default();
        settings.shadow.size = ShadowSize::None;
        let scene = build_scene(&settings, Some(&loaded(10, 10)), &WallpaperStore::default());
        assert!(!scene
            .commands
            .iter()
            .any(|c| matches!(c, PaintCommand::Shadow { .. })));
    }

    #[test]
    fn background_only_without_image() {
        let scene = build_scene(&Settings::default(), None, &WallpaperStore::default());
        assert_eq!(scene.commands.len(), 1);
        assert_eq!((scene.width(), scene.height()), (1200, 675));
    }

    #[test]
    fn unloadable_wallpaper_paints_black() {
        let mut settings = Settings::default();
        settings.background.kind = BackgroundKind::Wallpaper;
        settings.background.image = Some("/nonexistent/wall.png".into());
        let scene = build_scene(&settings, None, &WallpaperStore::default());
        assert_eq!(
            scene.commands[0],
            PaintCommand::Background(BackgroundPaint::Solid(Color::BLACK))
        );
    }

    #[test]
    fn dark_chrome_uses_dark_colors() {
        let mut settings = Settings::default();
        settings.dark_mode_window = true;
        let scene = build_scene(&settings, Some(&loaded(10, 10)), &WallpaperStore::default());
        let header = scene.commands.iter().find_map(|c| match c {
            PaintCommand::RoundedRect { radii, color, .. } if radii.bottom_left == 0.0 => Some(*color),
            _ => None,
        });
        assert_eq!(header, Some(chrome_colors(true).0));
    }
}
