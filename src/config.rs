//! Tool configuration: where wallpapers live, export tuning and the palette
//! service endpoint. This is not the user's frame settings, which are never
//! persisted.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::export::{ExportOptions, JPEG_QUALITY};
use crate::rendering::DEFAULT_PIXEL_RATIO;
use crate::{Error, Result, Viewport};

pub const ENV_PALETTE_KEY: &str = "SHOTFRAME_PALETTE_KEY";
pub const ENV_GEMINI_KEY: &str = "GEMINI_API_KEY";
pub const ENV_WALLPAPER_DIR: &str = "SHOTFRAME_WALLPAPER_DIR";

/// Export tuning.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct ExportConfig {
    pub pixel_ratio: f32,
    pub settle_delay_ms: u64,
    pub jpeg_quality: u8,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            pixel_ratio: DEFAULT_PIXEL_RATIO,
            settle_delay_ms: 100,
            jpeg_quality: JPEG_QUALITY,
        }
    }
}

impl ExportConfig {
    pub fn options(&self) -> ExportOptions {
        ExportOptions {
            pixel_ratio: self.pixel_ratio,
            settle_delay: Duration::from_millis(self.settle_delay_ms),
            jpeg_quality: self.jpeg_quality,
        }
    }
}

/// Palette service endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct PaletteConfig {
    pub endpoint: String,
    pub model: String,
    /// Credential. Never written back out.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub timeout_ms: u64,
}

impl Default for PaletteConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://generativelanguage.googleapis.com/v1beta/models".to_string(),
            model: "gemini-2.0-flash".to_string(),
            api_key: None,
            timeout_ms: 30_000,
        }
    }
}

/// Configuration for a beautifier session.
///
/// # Examples
///
/// ```
/// let cfg = shotframe::BeautifierConfig::default();
/// assert_eq!(cfg.export.pixel_ratio, 2.0);
/// assert!(cfg.palette.api_key.is_none());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct BeautifierConfig {
    /// Directory holding the bundled wallpaper images.
    pub wallpaper_dir: Option<PathBuf>,
    /// Preview viewport.
    pub viewport: Viewport,
    pub export: ExportConfig,
    pub palette: PaletteConfig,
}

impl BeautifierConfig {
    /// Read a JSON config file. Missing fields take their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {}", path.display(), e)))?;
        let cfg: BeautifierConfig = serde_json::from_str(&text)?;
        log::debug!("loaded config from {:?}", path);
        Ok(cfg)
    }

    /// Apply environment overrides on top of `self`.
    pub fn with_env(self) -> Self {
        self.with_env_from(|k| std::env::var(k).ok())
    }

    /// Same as [`with_env`](Self::with_env) with an injectable lookup.
    pub fn with_env_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |k: &str| lookup(k).filter(|v| !v.trim().is_empty());
        if let Some(key) = non_empty(ENV_PALETTE_KEY).or_else(|| non_empty(ENV_GEMINI_KEY)) {
            self.palette.api_key = Some(key);
        }
        if let Some(dir) = non_empty(ENV_WALLPAPER_DIR) {
            self.wallpaper_dir = Some(PathBuf::from(dir));
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg: BeautifierConfig =
            serde_json::from_str(r#"{"export":{"settleDelayMs":250},"viewport":{"width":800,"height":600}}"#)
                .unwrap();
        assert_eq!(cfg.export.settle_delay_ms, 250);
        assert_eq!(cfg.export.pixel_ratio, 2.0);
        assert_eq!(cfg.export.jpeg_quality, 100);
        assert_eq!(cfg.viewport, Viewport { width: 800, height: 600 });
        assert_eq!(cfg.palette, PaletteConfig::default());
    }

    #[test]
    fn export_section_maps_to_options() {
        let cfg: BeautifierConfig =
            serde_json::from_str(r#"{"export":{"pixelRatio":1.0,"jpegQuality":80}}"#).unwrap();
        let opts = cfg.export.options();
        assert_eq!(opts.pixel_ratio, 1.0);
        assert_eq!(opts.jpeg_quality, 80);
        assert_eq!(opts.settle_delay, Duration::from_millis(100));
    }

    #[test]
    fn env_prefers_specific_key() {
        let env: HashMap<&str, &str> = [
            (ENV_PALETTE_KEY, "specific"),
            (ENV_GEMINI_KEY, "generic"),
            (ENV_WALLPAPER_DIR, "/tmp/walls"),
        ]
        .into_iter()
        .collect();
        let cfg = BeautifierConfig::default().with_env_from(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(cfg.palette.api_key.as_deref(), Some("specific"));
        assert_eq!(cfg.wallpaper_dir, Some(PathBuf::from("/tmp/walls")));
    }

    #[test]
    fn blank_env_values_are_ignored() {
        let cfg = BeautifierConfig::default().with_env_from(|k| {
            (k == ENV_GEMINI_KEY).then(|| "  ".to_string())
        });
        assert!(cfg.palette.api_key.is_none());
    }

    #[test]
    fn key_is_not_serialized() {
        let mut cfg = BeautifierConfig::default();
        cfg.palette.api_key = Some("secret".into());
        let json = serde_json::to_string(&cfg).unwrap();
        assert!(!json.contains("secret"));
    }
}
