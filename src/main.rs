use std::io::Read;
use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use shotframe::settings::{BackgroundPatch, GradientPatch, ShadowPatch};
use shotframe::{
    AspectRatio, BackgroundKind, BeautifierConfig, Color, ExportFormat, GradientDirection,
    IngestOutcome, IngestSource, Session, Settings, SettingsPatch, ShadowSize,
};

#[derive(Debug, Parser)]
#[command(name = "shotframe")]
#[command(about = "Frame screenshots with padding, window chrome, shadows and backgrounds", long_about = None)]
struct Cli {
    /// Tool configuration file (JSON).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Frame an image and export it.
    Beautify(BeautifyArgs),

    /// Print the effective settings as JSON.
    Settings {
        /// Settings file merged over the defaults.
        #[arg(long)]
        settings: Option<PathBuf>,
    },

    /// List the bundled wallpapers.
    Wallpapers,
}

#[derive(Debug, Args)]
struct BeautifyArgs {
    /// Image file, or `-` to read from stdin.
    input: String,

    /// Settings file (JSON, camelCase) applied before the flags below.
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Output format: png, jpeg or webp.
    #[arg(long)]
    format: Option<ExportFormat>,

    /// Directory the export is written to.
    #[arg(long, default_value = ".")]
    out: PathBuf,

    /// Copy a PNG to the clipboard instead of writing a file.
    #[arg(long)]
    copy: bool,

    #[arg(long)]
    padding: Option<f32>,

    /// Window corner radius.
    #[arg(long)]
    radius: Option<f32>,

    #[arg(long)]
    scale: Option<f32>,

    /// 16/9, 4/3, 1/1 or 9/16.
    #[arg(long)]
    aspect: Option<AspectRatio>,

    /// Solid background color (hex).
    #[arg(long, conflicts_with_all = ["gradient", "wallpaper"])]
    solid: Option<Color>,

    /// Gradient background: two hex colors separated by a comma.
    #[arg(long, value_delimiter = ',', conflicts_with = "wallpaper")]
    gradient: Option<Vec<Color>>,

    /// Gradient direction, e.g. "to bottom right".
    #[arg(long)]
    direction: Option<GradientDirection>,

    /// Wallpaper file (absolute, or relative to the wallpaper directory).
    #[arg(long)]
    wallpaper: Option<String>,

    /// Background blur radius.
    #[arg(long)]
    blur: Option<f32>,

    /// Shadow size: none, sm, md, lg, xl or 2xl.
    #[arg(long)]
    shadow: Option<ShadowSize>,

    /// Dark window chrome.
    #[arg(long)]
    dark: bool,

    /// Ask the palette service for a matching gradient.
    #[arg(long)]
    suggest_palette: bool,
}

impl BeautifyArgs {
    fn patch(&self) -> SettingsPatch {
        let mut background = BackgroundPatch {
            blur: self.blur,
            ..Default::default()
        };
        if let Some(color) = self.solid {
            background.kind = Some(BackgroundKind::Solid);
            background.solid = Some(color);
        }
        if self.gradient.is_some() || self.direction.is_some() {
            let (start, end) = match self.gradient.as_deref() {
                Some([a, b]) => (Some(*a), Some(*b)),
                _ => (None, None),
            };
            if start.is_some() {
                background.kind = Some(BackgroundKind::Gradient);
            }
            background.gradient = Some(GradientPatch {
                start,
                end,
                direction: self.direction,
            });
        }
        if let Some(wallpaper) = &self.wallpaper {
            background.kind = Some(BackgroundKind::Wallpaper);
            background.image = Some(Some(wallpaper.clone()));
        }

        SettingsPatch {
            padding: self.padding,
            border_radius: self.radius,
            scale: self.scale,
            aspect_ratio: self.aspect,
            background: Some(background),
            shadow: self.shadow.map(|size| ShadowPatch {
                size: Some(size),
                ..Default::default()
            }),
            dark_mode_window: self.dark.then_some(true),
            output_format: self.format,
            ..Default::default()
        }
    }
}

fn load_settings(path: Option<&PathBuf>) -> anyhow::Result<Settings> {
    match path {
        Some(p) => {
            let text = std::fs::read_to_string(p).with_context(|| format!("reading {}", p.display()))?;
            serde_json::from_str(&text).with_context(|| format!("parsing {}", p.display()))
        }
        None => Ok(Settings::default()),
    }
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<BeautifierConfig> {
    let cfg = match path {
        Some(p) => BeautifierConfig::load(p)?,
        None => BeautifierConfig::default(),
    };
    Ok(cfg.with_env())
}

async fn beautify(config: BeautifierConfig, args: BeautifyArgs) -> anyhow::Result<()> {
    if let Some(colors) = &args.gradient {
        if colors.len() != 2 {
            bail!("--gradient takes exactly two colors, got {}", colors.len());
        }
    }

    let mut session = Session::new(&config);
    session.replace_settings(load_settings(args.settings.as_ref())?);
    let merged = session.settings().update(args.patch()).clamped();
    session.replace_settings(merged);

    let source = if args.input == "-" {
        let mut data = Vec::new();
        std::io::stdin().read_to_end(&mut data).context("reading stdin")?;
        IngestSource::Bytes { mime: None, data }
    } else {
        IngestSource::File(PathBuf::from(&args.input))
    };
    match session.ingest(source).await? {
        IngestOutcome::Loaded(img) => log::info!("input {}x{} ({})", img.width(), img.height(), img.mime),
        IngestOutcome::Ignored | IngestOutcome::Cleared => bail!("{} is not an image", args.input),
    }

    if args.suggest_palette {
        let palette = suggest(&mut session, &config).await?;
        println!(
            "palette: {}",
            palette.colors.iter().map(|c| c.to_hex()).collect::<Vec<_>>().join(", ")
        );
    }

    let job = session.export_job()?;
    if args.copy {
        copy_to_clipboard(&job).await?;
        println!("copied to clipboard");
    } else {
        let path = job.download(&args.out).await?;
        println!("{}", path.display());
    }
    Ok(())
}

#[cfg(feature = "palette")]
async fn suggest(session: &mut Session, config: &BeautifierConfig) -> anyhow::Result<shotframe::Palette> {
    let service = shotframe::HttpPaletteService::new(config.palette.clone())?;
    Ok(session.suggest_background(&service).await?)
}

#[cfg(not(feature = "palette"))]
async fn suggest(session: &mut Session, _config: &BeautifierConfig) -> anyhow::Result<shotframe::Palette> {
    log::warn!("built without the palette feature; using fallback palette");
    Ok(session.suggest_background(&shotframe::FallbackPalette).await?)
}

#[cfg(feature = "clipboard")]
async fn copy_to_clipboard(job: &shotframe::ExportJob) -> anyhow::Result<()> {
    let mut clipboard = shotframe::clipboard::SystemClipboard::new()?;
    job.copy(&mut clipboard).await?;
    Ok(())
}

#[cfg(not(feature = "clipboard"))]
async fn copy_to_clipboard(_job: &shotframe::ExportJob) -> anyhow::Result<()> {
    bail!("built without clipboard support")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref())?;

    match cli.cmd {
        Command::Beautify(args) => beautify(config, args).await,
        Command::Settings { settings } => {
            let settings = load_settings(settings.as_ref())?;
            println!("{}", serde_json::to_string_pretty(&settings)?);
            Ok(())
        }
        Command::Wallpapers => {
            let session = Session::new(&config);
            if session.wallpapers().dir().is_none() {
                bail!("no wallpaper directory configured (set SHOTFRAME_WALLPAPER_DIR)");
            }
            for name in session.wallpapers().list()? {
                println!("{}", name);
            }
            Ok(())
        }
    }
}
