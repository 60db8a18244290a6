use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use log::{info, warn};
use mimalloc::MiMalloc;

use kodasnap::assets::{load_font, AssetCatalog, FontBook};
use kodasnap::camera::{CaptureEvent, ReplayCamera, StreamRequest};
use kodasnap::capture::UploadedFile;
use kodasnap::config::Config;
use kodasnap::export::{ExportMethod, ExportOutcome, Exporter, SystemPrinter};
use kodasnap::filters::PhotoFilter;
use kodasnap::session::{BoothSession, Screen};
use kodasnap::template::{Template, MAX_PHOTOS};
use kodasnap::{Compositor, Customization};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[derive(Parser)]
#[command(name = "kodasnap", about = "Photobooth strip compositor")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compose a strip from photo files
    Compose(ComposeArgs),
    /// Run the countdown capture against recorded frames
    Shoot(ShootArgs),
    /// List the layout templates
    Templates,
}

#[derive(Args)]
struct StripArgs {
    /// Customization JSON file (camelCase fields)
    #[arg(long)]
    customization: Option<PathBuf>,

    /// download, print or share
    #[arg(long, default_value = "download")]
    export: ExportMethod,

    /// Mirror photos horizontally
    #[arg(long)]
    mirror: bool,

    /// Capture filter, e.g. "sepia" or "b&w"
    #[arg(long, default_value = "none")]
    filter: String,

    /// Output directory (defaults to KODASNAP_OUTPUT_DIR)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Args)]
struct ComposeArgs {
    /// Photo files, in strip order
    #[arg(long = "photo", required = true, num_args = 1..)]
    photos: Vec<PathBuf>,

    #[command(flatten)]
    strip: StripArgs,
}

#[derive(Args)]
struct ShootArgs {
    /// Frames replayed as the camera feed
    #[arg(long, required = true, num_args = 1..)]
    frames: Vec<PathBuf>,

    /// Number of photos to take
    #[arg(long, default_value_t = 4)]
    count: usize,

    #[command(flatten)]
    strip: StripArgs,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let config = Config::from_env().map_err(|e| anyhow!("Invalid configuration: {}", e))?;

    match cli.command {
        Commands::Compose(args) => compose(&config, args).await,
        Commands::Shoot(args) => shoot(&config, args).await,
        Commands::Templates => {
            list_templates();
            Ok(())
        }
    }
}

async fn compose(config: &Config, args: ComposeArgs) -> Result<()> {
    let files = args
        .photos
        .iter()
        .map(|path| {
            let bytes =
                std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
            Ok(UploadedFile::new(display_name(path), bytes))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut session = start_session(config, &args.strip, files.len())?;
    session.upload(&files)?;
    report_notices(&mut session);

    if session.screen() != Screen::Customize {
        bail!(
            "Only {} of {} photos could be used",
            session.photos().len(),
            session.photo_count()
        );
    }

    finish(config, &args.strip, session).await
}

async fn shoot(config: &Config, args: ShootArgs) -> Result<()> {
    let camera = ReplayCamera::from_files(args.frames.as_slice())?;
    let mut session = start_session(config, &args.strip, args.count)?;

    session
        .open_camera(Box::new(camera), &StreamRequest::default())
        .await?;
    report_notices(&mut session);

    session
        .run_capture(&config.capture_timing(), |event| match event {
            CaptureEvent::Countdown { remaining, .. } => println!("{}...", remaining),
            CaptureEvent::Captured { shot, total } => println!("Captured {}/{}", shot, total),
        })
        .await?;
    report_notices(&mut session);

    if session.screen() != Screen::Customize {
        bail!("Capture did not complete");
    }

    finish(config, &args.strip, session).await
}

fn start_session(config: &Config, args: &StripArgs, count: usize) -> Result<BoothSession> {
    if count > MAX_PHOTOS {
        bail!("At most {} photos fit on a strip", MAX_PHOTOS);
    }

    let filter: PhotoFilter = args
        .filter
        .parse()
        .map_err(|_| anyhow!("Unknown filter: {}", args.filter))?;
    let mut settings = config.capture_settings(filter);
    settings.mirror |= args.mirror;

    let mut session = BoothSession::new(settings);
    session.start()?;
    session.confirm_payment()?;
    session.choose_photo_count(count)?;
    Ok(session)
}

async fn finish(config: &Config, args: &StripArgs, mut session: BoothSession) -> Result<()> {
    if let Some(path) = &args.customization {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        *session.customization_mut() = Customization::from_json(&json)?;
    }

    let compositor = build_compositor(config)?;
    if !session.render(&compositor).await? {
        report_notices(&mut session);
        bail!("Could not compose the strip");
    }
    if let Some(canvas) = session.canvas() {
        info!(
            "Strip uses template {} at {}x{}",
            canvas.template(),
            canvas.width(),
            canvas.height()
        );
    }
    session.proceed_to_download()?;

    let output_dir = args.output.clone().unwrap_or_else(|| config.output_dir.clone());
    let exporter = Exporter::new(output_dir)
        .with_filename_prefix(config.filename_prefix.clone())
        .with_printer(Box::new(SystemPrinter::new(config.print_command.clone())));

    match session.export(&exporter, args.export).await? {
        Some(ExportOutcome::Saved(path)) => println!("Saved {}", path.display()),
        Some(ExportOutcome::SavedForPrinting { path, instruction }) => {
            println!("Saved {}", path.display());
            println!("{}", instruction);
        }
        Some(ExportOutcome::Printed) => println!("Sent to printer"),
        Some(ExportOutcome::Shared) => println!("Shared"),
        Some(ExportOutcome::ShareCancelled) => println!("Share cancelled"),
        None => {
            report_notices(&mut session);
            bail!("Export failed");
        }
    }

    Ok(())
}

fn build_compositor(config: &Config) -> Result<Compositor> {
    let mut fonts = FontBook::load_dir(&config.assets.font_dir);
    if let Some(path) = &config.assets.sticker_font {
        fonts = fonts.with_sticker_face(load_font(path)?);
    }
    if fonts.is_empty() {
        warn!(
            "No fonts found in {}; text and stickers cannot be drawn",
            config.assets.font_dir.display()
        );
    }
    let missing = fonts.missing_sticker_themes();
    if !missing.is_empty() {
        let names: Vec<&str> = missing.iter().map(|theme| theme.as_str()).collect();
        warn!(
            "Sticker font cannot draw themes: {} (set KODASNAP_STICKER_FONT to an outline emoji font)",
            names.join(", ")
        );
    }

    let catalog = AssetCatalog::new(&config.assets.frame_dir, fonts);
    Ok(Compositor::new(catalog).with_time_format(config.time_format))
}

fn list_templates() {
    println!(
        "{:<12} {:>7} {:>12} {:>12} {:>16}",
        "TEMPLATE", "CELLS", "CELL", "CANVAS", "WITH TIMESTAMP"
    );
    for template in Template::catalog() {
        let (w, h) = template.canvas_size(false);
        let (tw, th) = template.canvas_size(true);
        println!(
            "{:<12} {:>7} {:>12} {:>12} {:>16}",
            template.to_string(),
            template.cell_count(),
            format!("{}x{}", template.cell_width, template.cell_height),
            format!("{}x{}", w, h),
            format!("{}x{}", tw, th),
        );
    }
}

fn report_notices(session: &mut BoothSession) {
    for notice in session.take_notices() {
        eprintln!("[{}] {}", notice.kind, notice.message);
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}
