use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::blob::BlobRegistry;
use crate::clipboard::{ClipboardSink, ClipboardSource};
use crate::config::BeautifierConfig;
use crate::export::{self, ExportControl, ExportFormat, ExportOptions, ExportedImage, Notices};
use crate::ingest::{self, IngestOutcome, IngestSource, LoadedImage};
use crate::palette::{Palette, PaletteService};
use crate::preview::Preview;
use crate::rendering::{build_scene, Rasterizer, Scene, SoftwareRasterizer};
use crate::settings::{Settings, SettingsPatch, ShallowPatch};
use crate::wallpaper::WallpaperStore;
use crate::{Error, Result, Viewport};

/// Owner of the editor state: current settings, the loaded image, the
/// preview fit and the two export controls.
///
/// Settings and image are replaced as whole values, never mutated in place,
/// so an [`ExportJob`] can hold on to a snapshot while the session moves on.
pub struct Session {
    settings: Arc<Settings>,
    image: Option<Arc<LoadedImage>>,
    preview: Preview,
    wallpapers: Arc<WallpaperStore>,
    blobs: BlobRegistry,
    download: ExportControl,
    copy: ExportControl,
    notices: Notices,
    export_options: ExportOptions,
    rasterizer: Arc<dyn Rasterizer>,
}

impl Session {
    pub fn new(config: &BeautifierConfig) -> Self {
        let settings = Settings::default();
        Self {
            preview: Preview::new(config.viewport, settings.aspect_ratio),
            settings: Arc::new(settings),
            image: None,
            wallpapers: Arc::new(WallpaperStore::new(config.wallpaper_dir.clone())),
            blobs: BlobRegistry::new(),
            download: ExportControl::download(),
            copy: ExportControl::copy(),
            notices: Notices::default(),
            export_options: config.export.options(),
            rasterizer: Arc::new(SoftwareRasterizer::new()),
        }
    }

    /// Swap the rasterizer backend.
    pub fn with_rasterizer(mut self, rasterizer: Arc<dyn Rasterizer>) -> Self {
        self.rasterizer = rasterizer;
        self
    }

    pub fn with_export_options(mut self, options: ExportOptions) -> Self {
        self.export_options = options;
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn image(&self) -> Option<&LoadedImage> {
        self.image.as_deref()
    }

    pub fn preview(&self) -> &Preview {
        &self.preview
    }

    pub fn wallpapers(&self) -> &WallpaperStore {
        &self.wallpapers
    }

    pub fn blobs(&self) -> &BlobRegistry {
        &self.blobs
    }

    pub fn download_control(&self) -> &ExportControl {
        &self.download
    }

    pub fn copy_control(&self) -> &ExportControl {
        &self.copy
    }

    pub fn notices(&self) -> &Notices {
        &self.notices
    }

    /// Deep-merge `patch` into the current settings.
    pub fn update(&mut self, patch: SettingsPatch) -> &Settings {
        let next = self.settings.update(patch);
        self.replace_settings(next)
    }

    pub fn update_shallow(&mut self, patch: ShallowPatch) -> &Settings {
        let next = self.settings.update_shallow(patch);
        self.replace_settings(next)
    }

    pub fn replace_settings(&mut self, settings: Settings) -> &Settings {
        self.preview.set_aspect(settings.aspect_ratio);
        self.settings = Arc::new(settings);
        &self.settings
    }

    /// Back to defaults. The loaded image is cleared as well.
    pub fn reset(&mut self) {
        self.image = None;
        self.replace_settings(Settings::default());
    }

    /// Load an image from any source. A non-image leaves the current image
    /// alone; an empty selection clears it.
    pub async fn ingest(&mut self, source: IngestSource) -> Result<IngestOutcome> {
        let outcome = ingest::ingest(source).await?;
        match &outcome {
            IngestOutcome::Loaded(img) => self.image = Some(Arc::new(img.clone())),
            IngestOutcome::Cleared => self.image = None,
            IngestOutcome::Ignored => {}
        }
        Ok(outcome)
    }

    /// Paste handler.
    pub async fn ingest_clipboard(&mut self, clipboard: &mut impl ClipboardSource) -> Result<IngestOutcome> {
        match IngestSource::from_clipboard(clipboard)? {
            Some(source) => self.ingest(source).await,
            None => Ok(IngestOutcome::Ignored),
        }
    }

    pub fn resize_viewport(&mut self, viewport: Viewport) {
        self.preview.resize(viewport);
    }

    /// Current display list, identical for preview and export.
    pub fn scene(&self) -> Scene {
        build_scene(&self.settings, self.image.as_deref(), &self.wallpapers)
    }

    /// Make `palette` the background gradient. Returns whether anything
    /// changed; palettes with fewer than two colors are ignored.
    pub fn apply_palette(&mut self, palette: &Palette) -> bool {
        match palette.gradient_patch() {
            Some(patch) => {
                self.update(patch);
                true
            }
            None => false,
        }
    }

    /// Ask `service` for a palette matching the loaded image and apply it.
    pub async fn suggest_background(&mut self, service: &impl PaletteService) -> Result<Palette> {
        let image = self.image.clone().ok_or(Error::NoImage)?;
        let palette = service.suggest(&image).await;
        self.apply_palette(&palette);
        Ok(palette)
    }

    /// Snapshot the current state for an export. Fails without an image.
    pub fn export_job(&self) -> Result<ExportJob> {
        let image = self.image.clone().ok_or(Error::NoImage)?;
        Ok(ExportJob {
            settings: self.settings.clone(),
            image,
            wallpapers: self.wallpapers.clone(),
            rasterizer: self.rasterizer.clone(),
            blobs: self.blobs.clone(),
            download: self.download.clone(),
            copy: self.copy.clone(),
            notices: self.notices.clone(),
            options: self.export_options,
        })
    }
}

/// One export, detached from the session that started it.
#[derive(Clone)]
pub struct ExportJob {
    settings: Arc<Settings>,
    image: Arc<LoadedImage>,
    wallpapers: Arc<WallpaperStore>,
    rasterizer: Arc<dyn Rasterizer>,
    blobs: BlobRegistry,
    download: ExportControl,
    copy: ExportControl,
    notices: Notices,
    options: ExportOptions,
}

impl ExportJob {
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Render the snapshot in `format` without touching any control.
    pub async fn render(&self, format: ExportFormat) -> Result<ExportedImage> {
        let scene = build_scene(&self.settings, Some(&*self.image), &self.wallpapers);
        export::render(
            self.rasterizer.clone(),
            scene,
            &self.settings,
            format,
            &self.options,
            &self.blobs,
        )
        .await
    }

    /// Render in the selected output format and save it into `dir`.
    pub async fn download(&self, dir: &Path) -> Result<PathBuf> {
        let _guard = self.download.begin()?;
        let result = async {
            let exported = self.render(self.settings.output_format).await?;
            log::debug!("export digest {}", exported.digest());
            export::save_to_dir(&exported, dir)
        }
        .await;
        if let Err(e) = &result {
            self.notices.post(format!("Export failed: {}", e));
        }
        result
    }

    /// Render as PNG and put it on the clipboard.
    pub async fn copy(&self, clipboard: &mut (dyn ClipboardSink + Send)) -> Result<()> {
        let _guard = self.copy.begin()?;
        let result = async {
            let exported = self.render(ExportFormat::Png).await?;
            export::write_clipboard(&exported, clipboard)
        }
        .await;
        match &result {
            Ok(()) => log::info!("copied export to clipboard"),
            Err(e) => self.notices.post(format!("Copy failed: {}", e)),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clipboard::MemoryClipboard;
    use crate::color::Color;
    use crate::rendering::RasterOptions;
    use crate::settings::{AspectRatio, BackgroundKind, BackgroundPatch};
    use std::time::Duration;

    fn quick_session() -> Session {
        Session::new(&BeautifierConfig::default()).with_export_options(ExportOptions {
            pixel_ratio: 0.25,
            settle_delay: Duration::from_millis(1),
            ..Default::default()
        })
    }

    fn png_bytes(w: u32, h: u32) -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(w, h, image::Rgba([10, 200, 30, 255]));
        crate::clipboard::encode_png(&img).unwrap()
    }

    struct BrokenRasterizer;

    impl Rasterizer for BrokenRasterizer {
        fn rasterize(&self, _scene: &Scene, _options: &RasterOptions) -> Result<image::RgbaImage> {
            Err(Error::Render("surface lost".into()))
        }
    }

    #[tokio::test]
    async fn non_image_keeps_current_image() {
        let mut s = quick_session();
        s.ingest(IngestSource::Bytes { mime: Some("image/png".into()), data: png_bytes(8, 4) })
            .await
            .unwrap();
        let before = s.image().cloned();
        let outcome = s
            .ingest(IngestSource::Bytes { mime: Some("text/plain".into()), data: b"hello".to_vec() })
            .await
            .unwrap();
        assert_eq!(outcome, IngestOutcome::Ignored);
        assert_eq!(s.image().cloned(), before);

        s.ingest(IngestSource::Cleared).await.unwrap();
        assert!(s.image().is_none());
    }

    #[test]
    fn solid_color_survives_kind_round_trip() {
        let mut s = quick_session();
        let red = Color::rgb(255, 0, 0);
        s.update(SettingsPatch {
            background: Some(BackgroundPatch {
                kind: Some(BackgroundKind::Solid),
                solid: Some(red),
                ..Default::default()
            }),
            ..Default::default()
        });
        for kind in [BackgroundKind::Gradient, BackgroundKind::Solid] {
            s.update(SettingsPatch {
                background: Some(BackgroundPatch { kind: Some(kind), ..Default::default() }),
                ..Default::default()
            });
        }
        assert_eq!(s.settings().background.solid, red);
    }

    #[test]
    fn aspect_change_updates_preview() {
        let mut s = quick_session();
        let before = s.preview().displayed_size();
        s.update(SettingsPatch { aspect_ratio: Some(AspectRatio::Square), ..Default::default() });
        assert_ne!(s.preview().displayed_size(), before);
    }

    #[test]
    fn export_requires_image() {
        let s = quick_session();
        assert!(matches!(s.export_job(), Err(Error::NoImage)));
    }

    #[tokio::test]
    async fn failed_export_restores_control_and_posts_notice() {
        let mut s = quick_session().with_rasterizer(Arc::new(BrokenRasterizer));
        s.ingest(IngestSource::Bytes { mime: None, data: png_bytes(4, 4) }).await.unwrap();
        let job = s.export_job().unwrap();
        let dir = std::env::temp_dir().join("shotframe-session-fail");
        assert!(job.download(&dir).await.is_err());
        assert!(!s.download_control().is_busy());
        assert_eq!(s.download_control().label(), "Download");
        assert!(s.notices().current().unwrap().contains("surface lost"));
    }

    #[tokio::test]
    async fn busy_control_rejects_second_start() {
        let mut s = quick_session();
        s.ingest(IngestSource::Bytes { mime: None, data: png_bytes(4, 4) }).await.unwrap();
        let held = s.copy_control().begin().unwrap();
        assert_eq!(s.copy_control().label(), "Copying...");
        let mut clip = MemoryClipboard::new();
        let job = s.export_job().unwrap();
        assert!(matches!(job.copy(&mut clip).await, Err(Error::Busy("copy"))));
        drop(held);
        job.copy(&mut clip).await.unwrap();
        assert!(clip.png().is_some());
        assert_eq!(s.copy_control().label(), "Copy to clipboard");
    }

    #[tokio::test]
    async fn job_keeps_its_snapshot() {
        let mut s = quick_session();
        s.ingest(IngestSource::Bytes { mime: None, data: png_bytes(4, 4) }).await.unwrap();
        let job = s.export_job().unwrap();
        s.update(SettingsPatch { padding: Some(5.0), ..Default::default() });
        assert_eq!(job.settings().padding, 64.0);
        assert_eq!(s.settings().padding, 5.0);
    }
}
