//! The settings record describing every visual parameter of a frame.
//!
//! `Settings` is treated as an immutable value: every change produces a new
//! record through [`Settings::update`]. Nested groups (`background`,
//! `background.gradient`, `shadow`) are patched field by field so that an
//! update touching one nested field never drops its siblings.

use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::color::Color;
use crate::export::ExportFormat;
use crate::Error;

pub const PADDING_RANGE: RangeInclusive<f32> = 0.0..=128.0;
pub const BORDER_RADIUS_RANGE: RangeInclusive<f32> = 0.0..=48.0;
pub const SCALE_RANGE: RangeInclusive<f32> = 0.5..=1.5;
pub const BLUR_RANGE: RangeInclusive<f32> = 0.0..=40.0;

/// Canvas aspect ratio. The logical canvas is always 1200 units wide; the
/// ratio only decides its height.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AspectRatio {
    #[default]
    #[serde(rename = "16/9")]
    Widescreen,
    #[serde(rename = "4/3")]
    Standard,
    #[serde(rename = "1/1")]
    Square,
    #[serde(rename = "9/16")]
    Portrait,
}

impl AspectRatio {
    pub const ALL: [AspectRatio; 4] = [
        AspectRatio::Widescreen,
        AspectRatio::Standard,
        AspectRatio::Square,
        AspectRatio::Portrait,
    ];

    /// `(width, height)` terms of the ratio.
    pub fn terms(self) -> (u32, u32) {
        match self {
            AspectRatio::Widescreen => (16, 9),
            AspectRatio::Standard => (4, 3),
            AspectRatio::Square => (1, 1),
            AspectRatio::Portrait => (9, 16),
        }
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (w, h) = self.terms();
        write!(f, "{w}/{h}")
    }
}

impl FromStr for AspectRatio {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().replace(':', "/");
        AspectRatio::ALL
            .into_iter()
            .find(|r| r.to_string() == normalized)
            .ok_or_else(|| Error::Config(format!("unsupported aspect ratio: {s}")))
    }
}

/// Which background variant is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackgroundKind {
    Wallpaper,
    #[default]
    Gradient,
    Solid,
    Image,
    /// Anything a newer or foreign settings file names that we don't know.
    #[serde(other)]
    Unknown,
}

/// Linear gradient direction.
///
/// `Center` is a sentinel kept for compatibility with stored settings; it
/// renders as `to right` and is not offered in [`GradientDirection::SELECTABLE`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum GradientDirection {
    #[serde(rename = "to top")]
    ToTop,
    #[serde(rename = "to top right")]
    ToTopRight,
    #[serde(rename = "to right")]
    ToRight,
    #[default]
    #[serde(rename = "to bottom right")]
    ToBottomRight,
    #[serde(rename = "to bottom")]
    ToBottom,
    #[serde(rename = "to bottom left")]
    ToBottomLeft,
    #[serde(rename = "to left")]
    ToLeft,
    #[serde(rename = "to top left")]
    ToTopLeft,
    #[serde(rename = "center")]
    Center,
}

impl GradientDirection {
    pub const SELECTABLE: [GradientDirection; 8] = [
        GradientDirection::ToTop,
        GradientDirection::ToTopRight,
        GradientDirection::ToRight,
        GradientDirection::ToBottomRight,
        GradientDirection::ToBottom,
        GradientDirection::ToBottomLeft,
        GradientDirection::ToLeft,
        GradientDirection::ToTopLeft,
    ];

    /// The CSS-style direction keyword this variant paints with.
    pub fn as_css(self) -> &'static str {
        match self {
            GradientDirection::ToTop => "to top",
            GradientDirection::ToTopRight => "to top right",
            GradientDirection::ToRight => "to right",
            GradientDirection::ToBottomRight => "to bottom right",
            GradientDirection::ToBottom => "to bottom",
            GradientDirection::ToBottomLeft => "to bottom left",
            GradientDirection::ToLeft => "to left",
            GradientDirection::ToTopLeft => "to top left",
            // Same value as `ToRight`; kept pending product clarification.
            GradientDirection::Center => "to right",
        }
    }

    /// Unit-less direction of the gradient line on a `width` x `height` box
    /// (y grows downwards). Corner directions follow the CSS rule that the
    /// line is perpendicular to the diagonal joining the two other corners.
    pub fn vector(self, width: f32, height: f32) -> (f32, f32) {
        let (w, h) = (width.max(1.0), height.max(1.0));
        let (x, y) = match self {
            GradientDirection::ToTop => (0.0, -1.0),
            GradientDirection::ToBottom => (0.0, 1.0),
            GradientDirection::ToLeft => (-1.0, 0.0),
            GradientDirection::ToRight | GradientDirection::Center => (1.0, 0.0),
            GradientDirection::ToTopRight => (h, -w),
            GradientDirection::ToBottomRight => (h, w),
            GradientDirection::ToBottomLeft => (-h, w),
            GradientDirection::ToTopLeft => (-h, -w),
        };
        let len = (x * x + y * y).sqrt();
        (x / len, y / len)
    }
}

impl FromStr for GradientDirection {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['-', '_'], " ");
        if normalized == "center" {
            return Ok(GradientDirection::Center);
        }
        let with_prefix = if normalized.starts_with("to ") {
            normalized
        } else {
            format!("to {normalized}")
        };
        GradientDirection::SELECTABLE
            .into_iter()
            .find(|d| d.as_css() == with_prefix)
            .ok_or_else(|| Error::Config(format!("unknown gradient direction: {s}")))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GradientConfig {
    pub start: Color,
    pub end: Color,
    pub direction: GradientDirection,
}

impl Default for GradientConfig {
    fn default() -> Self {
        Self {
            start: Color::rgb(0x63, 0x66, 0xf1),
            end: Color::rgb(0xec, 0x48, 0x99),
            direction: GradientDirection::ToBottomRight,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackgroundConfig {
    #[serde(rename = "type")]
    pub kind: BackgroundKind,
    pub solid: Color,
    pub gradient: GradientConfig,
    /// Packaged wallpaper path or user-supplied data URI.
    pub image: Option<String>,
    pub blur: f32,
}

impl Default for BackgroundConfig {
    fn default() -> Self {
        Self {
            kind: BackgroundKind::Gradient,
            solid: Color::rgb(0x1a, 0x1a, 0x1a),
            gradient: GradientConfig::default(),
            image: None,
            blur: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ShadowSize {
    #[serde(rename = "none")]
    None,
    #[serde(rename = "sm")]
    Sm,
    #[serde(rename = "md")]
    Md,
    #[default]
    #[serde(rename = "lg")]
    Lg,
    #[serde(rename = "xl")]
    Xl,
    #[serde(rename = "2xl")]
    Xxl,
}

/// Drop-shadow geometry in logical units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadowGeometry {
    pub offset_y: f32,
    pub blur: f32,
    pub spread: f32,
}

impl ShadowSize {
    pub fn geometry(self) -> Option<ShadowGeometry> {
        let (offset_y, blur, spread) = match self {
            ShadowSize::None => return None,
            ShadowSize::Sm => (1.0, 2.0, 0.0),
            ShadowSize::Md => (4.0, 6.0, -1.0),
            ShadowSize::Lg => (10.0, 15.0, -3.0),
            ShadowSize::Xl => (20.0, 25.0, -5.0),
            ShadowSize::Xxl => (25.0, 50.0, -12.0),
        };
        Some(ShadowGeometry { offset_y, blur, spread })
    }
}

impl FromStr for ShadowSize {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(ShadowSize::None),
            "sm" => Ok(ShadowSize::Sm),
            "md" => Ok(ShadowSize::Md),
            "lg" => Ok(ShadowSize::Lg),
            "xl" => Ok(ShadowSize::Xl),
            "2xl" => Ok(ShadowSize::Xxl),
            other => Err(Error::Config(format!("unknown shadow size: {other}"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShadowConfig {
    pub size: ShadowSize,
    pub color: Color,
    pub opacity: f32,
}

impl Default for ShadowConfig {
    fn default() -> Self {
        Self {
            size: ShadowSize::Lg,
            color: Color::BLACK,
            opacity: 0.5,
        }
    }
}

/// All visual parameters of a frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    pub padding: f32,
    pub border_radius: f32,
    /// Reserved; carried through but not applied by the compositor.
    pub rotate: f32,
    pub scale: f32,
    pub aspect_ratio: AspectRatio,
    pub background: BackgroundConfig,
    pub shadow: ShadowConfig,
    pub dark_mode_window: bool,
    pub output_format: ExportFormat,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            padding: 64.0,
            border_radius: 12.0,
            rotate: 0.0,
            scale: 1.0,
            aspect_ratio: AspectRatio::default(),
            background: BackgroundConfig::default(),
            shadow: ShadowConfig::default(),
            dark_mode_window: false,
            output_format: ExportFormat::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GradientPatch {
    pub start: Option<Color>,
    pub end: Option<Color>,
    pub direction: Option<GradientDirection>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BackgroundPatch {
    pub kind: Option<BackgroundKind>,
    pub solid: Option<Color>,
    pub gradient: Option<GradientPatch>,
    /// `Some(None)` clears the image source.
    pub image: Option<Option<String>>,
    pub blur: Option<f32>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShadowPatch {
    pub size: Option<ShadowSize>,
    pub color: Option<Color>,
    pub opacity: Option<f32>,
}

/// A partial update. Unset fields keep their current value at every level.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SettingsPatch {
    pub padding: Option<f32>,
    pub border_radius: Option<f32>,
    pub rotate: Option<f32>,
    pub scale: Option<f32>,
    pub aspect_ratio: Option<AspectRatio>,
    pub background: Option<BackgroundPatch>,
    pub shadow: Option<ShadowPatch>,
    pub dark_mode_window: Option<bool>,
    pub output_format: Option<ExportFormat>,
}

/// A top-level-only partial update: nested groups are replaced wholesale.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShallowPatch {
    pub padding: Option<f32>,
    pub border_radius: Option<f32>,
    pub rotate: Option<f32>,
    pub scale: Option<f32>,
    pub aspect_ratio: Option<AspectRatio>,
    pub background: Option<BackgroundConfig>,
    pub shadow: Option<ShadowConfig>,
    pub dark_mode_window: Option<bool>,
    pub output_format: Option<ExportFormat>,
}

impl GradientConfig {
    fn merged(&self, patch: GradientPatch) -> Self {
        Self {
            start: patch.start.unwrap_or(self.start),
            end: patch.end.unwrap_or(self.end),
            direction: patch.direction.unwrap_or(self.direction),
        }
    }
}

impl BackgroundConfig {
    fn merged(&self, patch: BackgroundPatch) -> Self {
        Self {
            kind: patch.kind.unwrap_or(self.kind),
            solid: patch.solid.unwrap_or(self.solid),
            gradient: match patch.gradient {
                Some(g) => self.gradient.merged(g),
                None => self.gradient.clone(),
            },
            image: patch.image.unwrap_or_else(|| self.image.clone()),
            blur: patch.blur.unwrap_or(self.blur),
        }
    }
}

impl ShadowConfig {
    fn merged(&self, patch: ShadowPatch) -> Self {
        Self {
            size: patch.size.unwrap_or(self.size),
            color: patch.color.unwrap_or(self.color),
            opacity: patch.opacity.unwrap_or(self.opacity),
        }
    }
}

impl Settings {
    /// Produce a new record with `patch` deep-merged in. No range validation
    /// happens here; see [`Settings::clamped`].
    pub fn update(&self, patch: SettingsPatch) -> Settings {
        Settings {
            padding: patch.padding.unwrap_or(self.padding),
            border_radius: patch.border_radius.unwrap_or(self.border_radius),
            rotate: patch.rotate.unwrap_or(self.rotate),
            scale: patch.scale.unwrap_or(self.scale),
            aspect_ratio: patch.aspect_ratio.unwrap_or(self.aspect_ratio),
            background: match patch.background {
                Some(bg) => self.background.merged(bg),
                None => self.background.clone(),
            },
            shadow: match patch.shadow {
                Some(s) => self.shadow.merged(s),
                None => self.shadow.clone(),
            },
            dark_mode_window: patch.dark_mode_window.unwrap_or(self.dark_mode_window),
            output_format: patch.output_format.unwrap_or(self.output_format),
        }
    }

    /// Top-level merge: any nested group present in `patch` replaces the
    /// current one entirely.
    pub fn update_shallow(&self, patch: ShallowPatch) -> Settings {
        Settings {
            padding: patch.padding.unwrap_or(self.padding),
            border_radius: patch.border_radius.unwrap_or(self.border_radius),
            rotate: patch.rotate.unwrap_or(self.rotate),
            scale: patch.scale.unwrap_or(self.scale),
            aspect_ratio: patch.aspect_ratio.unwrap_or(self.aspect_ratio),
            background: patch.background.unwrap_or_else(|| self.background.clone()),
            shadow: patch.shadow.unwrap_or_else(|| self.shadow.clone()),
            dark_mode_window: patch.dark_mode_window.unwrap_or(self.dark_mode_window),
            output_format: patch.output_format.unwrap_or(self.output_format),
        }
    }

    /// Copy with every numeric field forced into the range its control allows.
    pub fn clamped(&self) -> Settings {
        let clamp = |v: f32, r: &RangeInclusive<f32>| {
            if v.is_nan() {
                *r.start()
            } else {
                v.clamp(*r.start(), *r.end())
            }
        };
        let mut s = self.clone();
        s.padding = clamp(s.padding, &PADDING_RANGE);
        s.border_radius = clamp(s.border_radius, &BORDER_RADIUS_RANGE);
        s.scale = clamp(s.scale, &SCALE_RANGE);
        s.background.blur = clamp(s.background.blur, &BLUR_RANGE);
        s.shadow.opacity = clamp(s.shadow.opacity, &(0.0..=1.0));
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_patch_keeps_siblings() {
        let s = Settings::default();
        let next = s.update(SettingsPatch {
            background: Some(BackgroundPatch {
                blur: Some(12.0),
                ..Default::default()
            }),
            ..Default::default()
        });
        assert_eq!(next.background.blur, 12.0);
        assert_eq!(next.background.gradient, s.background.gradient);
        assert_eq!(next.background.solid, s.background.solid);
        assert_eq!(next.shadow, s.shadow);
    }

    #[test]
    fn gradient_patch_merges_single_stop() {
        let s = Settings::default();
        let next = s.update(SettingsPatch {
            background: Some(BackgroundPatch {
                gradient: Some(GradientPatch {
                    end: Some(Color::WHITE),
                    ..Default::default()
                }),
                ..Default::default()
            }),
            ..Default::default()
        });
        assert_eq!(next.background.gradient.start, s.background.gradient.start);
        assert_eq!(next.background.gradient.end, Color::WHITE);
    }

    #[test]
    fn image_patch_can_clear() {
        let s = Settings::default().update(SettingsPatch {
            background: Some(BackgroundPatch {
                image: Some(Some("wallpapers/dune.jpg".into())),
                ..Default::default()
            }),
            ..Default::default()
        });
        assert_eq!(s.background.image.as_deref(), Some("wallpapers/dune.jpg"));
        let cleared = s.update(SettingsPatch {
            background: Some(BackgroundPatch {
                image: Some(None),
                ..Default::default()
            }),
            ..Default::default()
        });
        assert_eq!(cleared.background.image, None);
    }

    #[test]
    fn shallow_update_replaces_whole_group() {
        let s = Settings::default();
        let shadow = ShadowConfig {
            size: ShadowSize::None,
            ..Default::default()
        };
        let next = s.update_shallow(ShallowPatch {
            shadow: Some(shadow.clone()),
            padding: Some(8.0),
            ..Default::default()
        });
        assert_eq!(next.shadow, shadow);
        assert_eq!(next.padding, 8.0);
        assert_eq!(next.background, s.background);
    }

    #[test]
    fn clamped_respects_control_ranges() {
        let s = Settings {
            padding: 500.0,
            border_radius: -3.0,
            scale: 9.0,
            ..Default::default()
        };
        let c = s.clamped();
        assert_eq!(c.padding, 128.0);
        assert_eq!(c.border_radius, 0.0);
        assert_eq!(c.scale, 1.5);
    }

    #[test]
    fn parses_cli_spellings() {
        assert_eq!("16:9".parse::<AspectRatio>().unwrap(), AspectRatio::Widescreen);
        assert_eq!("9/16".parse::<AspectRatio>().unwrap(), AspectRatio::Portrait);
        assert!("21:9".parse::<AspectRatio>().is_err());
        assert_eq!(
            "bottom-right".parse::<GradientDirection>().unwrap(),
            GradientDirection::ToBottomRight
        );
        assert_eq!("2xl".parse::<ShadowSize>().unwrap(), ShadowSize::Xxl);
    }

    #[test]
    fn center_direction_paints_like_to_right() {
        assert_eq!(GradientDirection::Center.as_css(), GradientDirection::ToRight.as_css());
        assert!(!GradientDirection::SELECTABLE.contains(&GradientDirection::Center));
        assert_eq!(GradientDirection::SELECTABLE.len(), 8);
    }

    #[test]
    fn settings_json_uses_frontend_field_names() {
        let json = serde_json::to_value(Settings::default()).unwrap();
        assert_eq!(json["aspectRatio"], "16/9");
        assert_eq!(json["background"]["type"], "gradient");
        assert_eq!(json["background"]["gradient"]["direction"], "to bottom right");
        assert_eq!(json["shadow"]["size"], "lg");
        assert_eq!(json["outputFormat"], "png");

        let unknown: BackgroundConfig =
            serde_json::from_value(serde_json::json!({ "type": "mesh" })).unwrap();
        assert_eq!(unknown.kind, BackgroundKind::Unknown);
    }
}
