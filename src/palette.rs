//! Gradient palette suggestions.
//!
//! The service boundary never fails from the caller's point of view: a
//! missing credential, a transport error or an unusable reply all degrade to
//! [`Palette::fallback`].

use std::future::Future;

use serde::Deserialize;

use crate::color::Color;
use crate::ingest::LoadedImage;
use crate::settings::{BackgroundKind, BackgroundPatch, GradientDirection, GradientPatch, SettingsPatch};

/// Instruction sent along with the image.
pub const PALETTE_PROMPT: &str = "Analyze this screenshot and suggest a background gradient that \
complements its colors. Reply with JSON only, shaped as \
{\"colors\": [\"#rrggbb\", ...], \"description\": \"short phrase\"}, using 2 to 4 hex colors.";

/// Direction applied when a suggested palette becomes the background.
pub const SUGGESTED_DIRECTION: GradientDirection = GradientDirection::ToBottomRight;

#[derive(Debug, Clone, PartialEq)]
pub struct Palette {
    pub colors: Vec<Color>,
    pub description: Option<String>,
}

impl Palette {
    pub fn fallback() -> Self {
        Self {
            colors: vec![
                Color::rgb(0x63, 0x66, 0xf1),
                Color::rgb(0xa8, 0x55, 0xf7),
                Color::rgb(0xec, 0x48, 0x99),
            ],
            description: Some("Indigo to pink".to_string()),
        }
    }

    /// Settings change that turns this palette into the background: a
    /// gradient from the first to the last color. `None` with fewer than two
    /// colors.
    pub fn gradient_patch(&self) -> Option<SettingsPatch> {
        if self.colors.len() < 2 {
            return None;
        }
        Some(SettingsPatch {
            background: Some(BackgroundPatch {
                kind: Some(BackgroundKind::Gradient),
                gradient: Some(GradientPatch {
                    start: self.colors.first().copied(),
                    end: self.colors.last().copied(),
                    direction: Some(SUGGESTED_DIRECTION),
                }),
                ..Default::default()
            }),
            ..Default::default()
        })
    }
}

#[derive(Debug, Deserialize)]
struct RawPalette {
    colors: Vec<String>,
    #[serde(default)]
    description: Option<String>,
}

/// Parse the model's reply text into a palette. Accepts bare JSON or JSON
/// wrapped in a Markdown code fence; invalid color strings are dropped.
pub fn parse_palette_text(text: &str) -> Option<Palette> {
    let trimmed = text.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|s| s.trim_end().strip_suffix("```"))
        .unwrap_or(trimmed);
    let raw: RawPalette = serde_json::from_str(body.trim()).ok()?;
    let colors: Vec<Color> = raw.colors.iter().filter_map(|c| Color::parse(c)).collect();
    if colors.is_empty() {
        return None;
    }
    Some(Palette {
        colors,
        description: raw.description.filter(|d| !d.trim().is_empty()),
    })
}

/// Something that can propose a palette for an image. Always answers.
pub trait PaletteService: Send + Sync {
    fn suggest(&self, image: &LoadedImage) -> impl Future<Output = Palette> + Send;
}

/// Answers with the fallback palette without looking at the image.
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackPalette;

impl PaletteService for FallbackPalette {
    async fn suggest(&self, _image: &LoadedImage) -> Palette {
        Palette::fallback()
    }
}

#[cfg(feature = "palette")]
pub use http::HttpPaletteService;

#[cfg(feature = "palette")]
mod http {
    use std::time::Duration;

    use super::{parse_palette_text, Palette, PaletteService, PALETTE_PROMPT};
    use crate::config::PaletteConfig;
    use crate::ingest::{strip_data_uri_prefix, LoadedImage};
    use crate::{Error, Result};

    /// Palette suggestions from a generative-model `generateContent` endpoint.
    pub struct HttpPaletteService {
        client: reqwest::Client,
        config: PaletteConfig,
    }

    impl HttpPaletteService {
        pub fn new(config: PaletteConfig) -> Result<Self> {
            let client = reqwest::Client::builder()
                .timeout(Duration::from_millis(config.timeout_ms))
                .build()
                .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;
            Ok(Self { client, config })
        }

        fn url(&self, key: &str) -> String {
            format!(
                "{}/{}:generateContent?key={}",
                self.config.endpoint.trim_end_matches('/'),
                self.config.model,
                key
            )
        }

        async fn request(&self, key: &str, image: &LoadedImage) -> Result<Palette> {
            let body = serde_json::json!({
                "contents": [{
                    "parts": [
                        { "text": PALETTE_PROMPT },
                        {
                            "inline_data": {
                                "mime_type": image.mime,
                                "data": strip_data_uri_prefix(&image.data_uri),
                            }
                        }
                    ]
                }],
                "generationConfig": { "responseMimeType": "application/json" }
            });

            let reply: serde_json::Value = self
                .client
                .post(self.url(key))
                .json(&body)
                .send()
                .await?
                .error_for_status()?
                .json()
                .await?;

            let text = reply
                .pointer("/candidates/0/content/parts/0/text")
                .and_then(|v| v.as_str())
                .ok_or_else(|| Error::Network("reply has no candidate text".into()))?;
            parse_palette_text(text)
                .ok_or_else(|| Error::Network(format!("unusable palette reply: {text}")))
        }
    }

    impl PaletteService for HttpPaletteService {
        async fn suggest(&self, image: &LoadedImage) -> Palette {
            let key = match self.config.api_key.as_deref().map(str::trim) {
                Some(k) if !k.is_empty() => k,
                _ => {
                    log::warn!("no palette service key configured; using fallback palette");
                    return Palette::fallback();
                }
            };
            match self.request(key, image).await {
                Ok(palette) => {
                    log::info!(
                        "palette service suggested {} colors ({})",
                        palette.colors.len(),
                        palette.description.as_deref().unwrap_or("no description")
                    );
                    palette
                }
                Err(e) => {
                    log::warn!("palette suggestion failed, using fallback: {}", e);
                    Palette::fallback()
                }
            }
        }
    }
}
