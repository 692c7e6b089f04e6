//! Shotframe screenshot beautifier
//!
//! Places a screenshot inside rounded window chrome on a padded, decorated
//! background and exports the result as PNG, JPEG or WebP.
//!
//! # Features
//!
//! - **Backgrounds**: solid colors, linear gradients, wallpapers and uploaded
//!   images with optional blur
//! - **Chrome**: light or dark window frame with status dots and Tailwind-style
//!   drop shadows
//! - **Export**: fixed 2x oversampling independent of the on-screen preview;
//!   file download or clipboard copy
//! - **Palette** (feature `palette`): gradient suggestions from a generative
//!   model, with a fixed fallback
//!
//! # Example
//!
//! ```no_run
//! use shotframe::{BeautifierConfig, IngestSource, Session, SettingsPatch};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut session = Session::new(&BeautifierConfig::default().with_env());
//! session.ingest(IngestSource::File("screenshot.png".into())).await?;
//! session.update(SettingsPatch {
//!     padding: Some(96.0),
//!     ..Default::default()
//! });
//!
//! let path = session.export_job()?.download("out".as_ref()).await?;
//! println!("saved {}", path.display());
//! # Ok(())
//! # }
//! ```

use serde::{Deserialize, Serialize};

pub mod error;
pub use error::{Error, Result};

pub mod color;
pub mod settings;

pub mod clipboard;
pub mod ingest;

pub mod background;
pub mod wallpaper;

// Layout, paint list and software rasterizer
pub mod rendering;
pub mod preview;

pub mod blob;
pub mod export;

// Gradient suggestions; the HTTP client is behind the `palette` feature
pub mod palette;

pub mod config;
pub mod session;

pub use color::Color;
pub use config::{BeautifierConfig, PaletteConfig};
pub use export::{ExportFormat, ExportOptions, ExportedImage};
pub use ingest::{IngestOutcome, IngestSource, LoadedImage};
pub use palette::{FallbackPalette, Palette, PaletteService};
pub use session::{ExportJob, Session};
pub use settings::{
    AspectRatio, BackgroundConfig, BackgroundKind, GradientDirection, Settings, SettingsPatch,
    ShadowSize,
};

#[cfg(feature = "palette")]
pub use palette::HttpPaletteService;

/// Preview viewport dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = BeautifierConfig::default();
        assert_eq!(config.viewport.width, 1280);
        assert_eq!(config.viewport.height, 720);
        assert!(config.wallpaper_dir.is_none());
    }

    #[test]
    fn test_viewport_json() {
        let viewport: Viewport = serde_json::from_str(r#"{"width":1920,"height":1080}"#).unwrap();
        assert_eq!(viewport, Viewport { width: 1920, height: 1080 });
    }
}
