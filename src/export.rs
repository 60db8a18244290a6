//! Export adapter: download, share and print the finished strip.
//!
//! Share and print go through traits so each shell can plug in its own
//! platform flow. Both fall back to a plain download when the platform
//! cannot help; only an explicit user cancel ends an export without a file.

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::Utc;
use log::{debug, info, warn};
use thiserror::Error;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::compositor::CompositeCanvas;
use crate::error::{BoothError, BoothResult};
use crate::photo::encode_png_data_url;

pub const DEFAULT_FILENAME_PREFIX: &str = "kodasnap";
pub const DEFAULT_PRINT_COMMAND: &str = "lp";
pub const PNG_MIME_TYPE: &str = "image/png";

const PRINT_INSTRUCTION: &str = "Printing is not available here. Open the saved file and print it.";

#[derive(Debug, Error)]
pub enum ShareError {
    #[error("Share cancelled by user")]
    Cancelled,

    #[error("Sharing files is not supported on this platform")]
    Unsupported,

    #[error("Share failed: {0}")]
    Failed(String),
}

#[derive(Debug, Error)]
pub enum PrintError {
    #[error("No print flow available")]
    Unsupported,

    #[error("Print failed: {0}")]
    Failed(String),
}

/// The file handed to a share sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareFile {
    pub file_name: String,
    pub mime_type: &'static str,
    pub bytes: Vec<u8>,
}

/// Printable page embedding the strip, plus the raw PNG for printers that
/// take images directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrintDocument {
    pub html: String,
    pub png: Vec<u8>,
}

impl PrintDocument {
    pub fn new(data_url: &str, png: Vec<u8>) -> Self {
        let html = format!(
            "<!DOCTYPE html>\n<html>\n<head>\n<title>KodaSnap Photo Strip</title>\n\
             <style>@page {{ margin: 0; }} body {{ margin: 0; display: flex; justify-content: center; }} \
             img {{ max-width: 100%; height: auto; }}</style>\n</head>\n\
             <body onload=\"window.print()\">\n<img src=\"{}\" alt=\"Photo strip\">\n</body>\n</html>\n",
            data_url
        );
        Self { html, png }
    }
}

#[async_trait]
pub trait ShareTarget: Send + Sync {
    async fn share(&self, file: &ShareFile) -> Result<(), ShareError>;
}

#[async_trait]
pub trait PrintTarget: Send + Sync {
    async fn print(&self, document: &PrintDocument) -> Result<(), PrintError>;
}

/// Share target for platforms without a share sheet.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnsupportedShare;

#[async_trait]
impl ShareTarget for UnsupportedShare {
    async fn share(&self, _file: &ShareFile) -> Result<(), ShareError> {
        Err(ShareError::Unsupported)
    }
}

/// Pipes the PNG into the system print command (`lp` by default).
#[derive(Debug, Clone)]
pub struct SystemPrinter {
    command: String,
}

impl SystemPrinter {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

impl Default for SystemPrinter {
    fn default() -> Self {
        Self::new(DEFAULT_PRINT_COMMAND)
    }
}

#[async_trait]
impl PrintTarget for SystemPrinter {
    async fn print(&self, document: &PrintDocument) -> Result<(), PrintError> {
        let mut child = Command::new(&self.command)
            .arg("-")
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => PrintError::Unsupported,
                _ => PrintError::Failed(format!("Failed to start {}: {}", self.command, e)),
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            if let Err(e) = stdin.write_all(&document.png).await {
                drop(stdin);
                // Reap the command before reporting
                if let Err(kill_err) = child.kill().await {
                    debug!("Failed to stop {}: {}", self.command, kill_err);
                }
                return Err(PrintError::Failed(format!("Failed to send job: {}", e)));
            }
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| PrintError::Failed(e.to_string()))?;

        if !output.status.success() {
            return Err(PrintError::Failed(format!(
                "{} exited with {}: {}",
                self.command,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportMethod {
    #[default]
    Download,
    Print,
    Share,
}

impl FromStr for ExportMethod {
    type Err = BoothError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "download" => Ok(ExportMethod::Download),
            "print" => Ok(ExportMethod::Print),
            "share" => Ok(ExportMethod::Share),
            _ => Err(BoothError::InvalidInput(format!(
                "Unknown export method: {}",
                s
            ))),
        }
    }
}

impl fmt::Display for ExportMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExportMethod::Download => "download",
            ExportMethod::Print => "print",
            ExportMethod::Share => "share",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    Saved(PathBuf),
    Shared,
    ShareCancelled,
    Printed,
    /// No print flow: the strip was saved and the user should print it.
    SavedForPrinting { path: PathBuf, instruction: String },
}

pub struct Exporter {
    output_dir: PathBuf,
    filename_prefix: String,
    share: Box<dyn ShareTarget>,
    printer: Box<dyn PrintTarget>,
}

impl Exporter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            filename_prefix: DEFAULT_FILENAME_PREFIX.to_string(),
            share: Box::new(UnsupportedShare),
            printer: Box::new(SystemPrinter::default()),
        }
    }

    pub fn with_filename_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.filename_prefix = prefix.into();
        self
    }

    pub fn with_share_target(mut self, share: Box<dyn ShareTarget>) -> Self {
        self.share = share;
        self
    }

    pub fn with_printer(mut self, printer: Box<dyn PrintTarget>) -> Self {
        self.printer = printer;
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub async fn export(
        &self,
        canvas: &CompositeCanvas,
        method: ExportMethod,
    ) -> BoothResult<ExportOutcome> {
        match method {
            ExportMethod::Download => self.download(canvas).await.map(ExportOutcome::Saved),
            ExportMethod::Print => self.print(canvas).await,
            ExportMethod::Share => self.share(canvas).await,
        }
    }

    /// Saves the strip as `<prefix>-<unix millis>.png` in the output directory.
    ///
    /// An existing file is never replaced; a `-1`, `-2`, ... suffix is added
    /// instead.
    pub async fn download(&self, canvas: &CompositeCanvas) -> BoothResult<PathBuf> {
        let png = canvas.to_png()?;
        self.save_png(&png, &self.file_name()).await
    }

    pub async fn share(&self, canvas: &CompositeCanvas) -> BoothResult<ExportOutcome> {
        let png = canvas.to_png()?;
        let file = ShareFile {
            file_name: self.file_name(),
            mime_type: PNG_MIME_TYPE,
            bytes: png,
        };

        match self.share.share(&file).await {
            Ok(()) => {
                info!("Shared {}", file.file_name);
                Ok(ExportOutcome::Shared)
            }
            Err(ShareError::Cancelled) => {
                debug!("Share sheet dismissed");
                Ok(ExportOutcome::ShareCancelled)
            }
            Err(e) => {
                warn!("{}, falling back to download", e);
                self.save_png(&file.bytes, &file.file_name)
                    .await
                    .map(ExportOutcome::Saved)
            }
        }
    }

    pub async fn print(&self, canvas: &CompositeCanvas) -> BoothResult<ExportOutcome> {
        let png = canvas.to_png()?;
        let document = PrintDocument::new(&encode_png_data_url(canvas.pixels())?, png);

        match self.printer.print(&document).await {
            Ok(()) => {
                info!("Sent {}x{} strip to printer", canvas.width(), canvas.height());
                Ok(ExportOutcome::Printed)
            }
            Err(e) => {
                warn!("{}, saving for manual printing", e);
                let path = self.save_png(&document.png, &self.file_name()).await?;
                Ok(ExportOutcome::SavedForPrinting {
                    path,
                    instruction: PRINT_INSTRUCTION.to_string(),
                })
            }
        }
    }

    /// Taken once per export so every path of that export agrees on it.
    fn file_name(&self) -> String {
        format!(
            "{}-{}.png",
            self.filename_prefix,
            Utc::now().timestamp_millis()
        )
    }

    async fn save_png(&self, png: &[u8], file_name: &str) -> BoothResult<PathBuf> {
        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .map_err(|e| {
                BoothError::ExportFailure(format!(
                    "Failed to create {}: {}",
                    self.output_dir.display(),
                    e
                ))
            })?;

        let (stem, extension) = file_name.rsplit_once('.').unwrap_or((file_name, "png"));
        let mut candidate = file_name.to_string();
        let mut attempt = 0;
        let (path, mut file) = loop {
            let path = self.output_dir.join(&candidate);
            match OpenOptions::new().write(true).create_new(true).open(&path).await {
                Ok(file) => break (path, file),
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    attempt += 1;
                    candidate = format!("{}-{}.{}", stem, attempt, extension);
                }
                Err(e) => {
                    return Err(BoothError::ExportFailure(format!(
                        "Failed to create {}: {}",
                        path.display(),
                        e
                    )))
                }
            }
        };

        let written = match file.write_all(png).await {
            Ok(()) => file.flush().await,
            Err(e) => Err(e),
        };
        written.map_err(|e| {
            BoothError::ExportFailure(format!("Failed to write {}: {}", path.display(), e))
        })?;

        info!("Saved strip to {}", path.display());
        Ok(path)
    }
}

/// PNG data URL of the finished strip.
pub fn to_data_url(canvas: &CompositeCanvas) -> BoothResult<String> {
    encode_png_data_url(canvas.pixels())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::{AssetCatalog, FontBook};
    use crate::compositor::Compositor;
    use crate::customization::Customization;
    use crate::photo::{PhotoSet, RasterImage};
    use image::{Rgba, RgbaImage};
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    async fn sample_canvas(frame_dir: &Path) -> CompositeCanvas {
        let photos: PhotoSet = vec![RasterImage::new(RgbaImage::from_pixel(
            500,
            200,
            Rgba([30, 60, 90, 255]),
        ))]
        .into_iter()
        .collect();
        Compositor::new(AssetCatalog::new(frame_dir, FontBook::new()))
            .compose(&photos, &Customization::default())
            .await
            .unwrap()
    }

    struct ScriptedShare(fn() -> Result<(), ShareError>);

    #[async_trait]
    impl ShareTarget for ScriptedShare {
        async fn share(&self, _file: &ShareFile) -> Result<(), ShareError> {
            (self.0)()
        }
    }

    #[derive(Default)]
    struct RecordingPrinter {
        jobs: Arc<Mutex<Vec<PrintDocument>>>,
    }

    #[async_trait]
    impl PrintTarget for RecordingPrinter {
        async fn print(&self, document: &PrintDocument) -> Result<(), PrintError> {
            self.jobs.lock().unwrap().push(document.clone());
            Ok(())
        }
    }

    struct NoPrinter;

    #[async_trait]
    impl PrintTarget for NoPrinter {
        async fn print(&self, _document: &PrintDocument) -> Result<(), PrintError> {
            Err(PrintError::Unsupported)
        }
    }

    fn png_files(dir: &Path) -> Vec<PathBuf> {
        std::fs::read_dir(dir)
            .map(|entries| {
                entries
                    .filter_map(|e| e.ok())
                    .map(|e| e.path())
                    .filter(|p| p.extension().is_some_and(|ext| ext == "png"))
                    .collect()
            })
            .unwrap_or_default()
    }

    #[tokio::test]
    async fn test_download_writes_decodable_png() {
        // GIVEN: A composed strip
        let temp_dir = TempDir::new().unwrap();
        let canvas = sample_canvas(temp_dir.path()).await;
        let out = temp_dir.path().join("out");

        // WHEN: Downloading
        let path = Exporter::new(&out).download(&canvas).await.unwrap();

        // THEN: The file is named after the prefix and decodes at full size
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("kodasnap-"));
        assert!(name.ends_with(".png"));
        let decoded = image::open(&path).unwrap();
        assert_eq!(
            (decoded.width(), decoded.height()),
            (canvas.width(), canvas.height())
        );
    }

    #[tokio::test]
    async fn test_custom_prefix() {
        let temp_dir = TempDir::new().unwrap();
        let canvas = sample_canvas(temp_dir.path()).await;
        let path = Exporter::new(temp_dir.path())
            .with_filename_prefix("party")
            .download(&canvas)
            .await
            .unwrap();
        assert!(path
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("party-"));
    }

    #[tokio::test]
    async fn test_share_cancel_writes_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let canvas = sample_canvas(temp_dir.path()).await;
        let out = temp_dir.path().join("out");
        let exporter = Exporter::new(&out)
            .with_share_target(Box::new(ScriptedShare(|| Err(ShareError::Cancelled))));

        let outcome = exporter.export(&canvas, ExportMethod::Share).await.unwrap();

        assert_eq!(outcome, ExportOutcome::ShareCancelled);
        assert!(png_files(&out).is_empty());
    }

    #[tokio::test]
    async fn test_unsupported_share_falls_back_to_download() {
        let temp_dir = TempDir::new().unwrap();
        let canvas = sample_canvas(temp_dir.path()).await;
        let out = temp_dir.path().join("out");

        let outcome = Exporter::new(&out).share(&canvas).await.unwrap();

        assert!(matches!(outcome, ExportOutcome::Saved(ref p) if p.exists()));
        assert_eq!(png_files(&out).len(), 1);
    }

    /// Refuses every share but remembers the file name it was offered.
    #[derive(Default)]
    struct OfferedShare {
        offered: Arc<Mutex<Option<String>>>,
    }

    #[async_trait]
    impl ShareTarget for OfferedShare {
        async fn share(&self, file: &ShareFile) -> Result<(), ShareError> {
            *self.offered.lock().unwrap() = Some(file.file_name.clone());
            Err(ShareError::Failed("share sheet crashed".to_string()))
        }
    }

    #[tokio::test]
    async fn test_share_fallback_saves_under_offered_name() {
        let temp_dir = TempDir::new().unwrap();
        let canvas = sample_canvas(temp_dir.path()).await;
        let share = OfferedShare::default();
        let offered = Arc::clone(&share.offered);
        let exporter = Exporter::new(temp_dir.path().join("out")).with_share_target(Box::new(share));

        let outcome = exporter.share(&canvas).await.unwrap();

        let offered = offered.lock().unwrap().clone().unwrap();
        match outcome {
            ExportOutcome::Saved(path) => {
                assert_eq!(path.file_name().unwrap().to_string_lossy(), offered)
            }
            other => panic!("Expected a saved file, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_same_name_never_overwrites() {
        // GIVEN: Two different strips saved under one name
        let temp_dir = TempDir::new().unwrap();
        let exporter = Exporter::new(temp_dir.path());

        // WHEN: Saving both
        let first = exporter.save_png(b"first", "kodasnap-1.png").await.unwrap();
        let second = exporter.save_png(b"second", "kodasnap-1.png").await.unwrap();

        // THEN: Both files survive side by side
        assert_ne!(first, second);
        assert_eq!(second.file_name().unwrap(), "kodasnap-1-1.png");
        assert_eq!(std::fs::read(&first).unwrap(), b"first");
        assert_eq!(std::fs::read(&second).unwrap(), b"second");
    }

    #[tokio::test]
    async fn test_successful_share() {
        let temp_dir = TempDir::new().unwrap();
        let canvas = sample_canvas(temp_dir.path()).await;
        let exporter = Exporter::new(temp_dir.path().join("out"))
            .with_share_target(Box::new(ScriptedShare(|| Ok(()))));

        assert_eq!(exporter.share(&canvas).await.unwrap(), ExportOutcome::Shared);
    }

    #[tokio::test]
    async fn test_print_embeds_data_url() {
        let temp_dir = TempDir::new().unwrap();
        let canvas = sample_canvas(temp_dir.path()).await;
        let printer = RecordingPrinter::default();
        let jobs = Arc::clone(&printer.jobs);
        let exporter = Exporter::new(temp_dir.path()).with_printer(Box::new(printer));

        let outcome = exporter.print(&canvas).await.unwrap();

        assert_eq!(outcome, ExportOutcome::Printed);
        let jobs = jobs.lock().unwrap();
        assert_eq!(jobs.len(), 1);
        assert!(jobs[0].html.contains("src=\"data:image/png;base64,"));
        assert_eq!(jobs[0].png, canvas.to_png().unwrap());
    }

    #[tokio::test]
    async fn test_print_without_printer_saves_with_instruction() {
        let temp_dir = TempDir::new().unwrap();
        let canvas = sample_canvas(temp_dir.path()).await;
        let out = temp_dir.path().join("out");
        let exporter = Exporter::new(&out).with_printer(Box::new(NoPrinter));

        let outcome = exporter.print(&canvas).await.unwrap();

        match outcome {
            ExportOutcome::SavedForPrinting { path, instruction } => {
                assert!(path.exists());
                assert!(!instruction.is_empty());
            }
            other => panic!("Expected SavedForPrinting, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_print_command_is_unsupported() {
        let printer = SystemPrinter::new("kodasnap-no-such-print-command");
        let document = PrintDocument::new("data:image/png;base64,", Vec::new());
        let result = printer.print(&document).await;
        assert!(matches!(result, Err(PrintError::Unsupported)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_print_command_ignoring_the_job_fails() {
        // `true` exits without reading stdin, so a large job cannot be sent
        let printer = SystemPrinter::new("true");
        let document = PrintDocument::new("data:image/png;base64,", vec![0u8; 8 * 1024 * 1024]);

        let result = printer.print(&document).await;

        assert!(matches!(result, Err(PrintError::Failed(ref msg)) if msg.contains("send job")));
    }

    #[tokio::test]
    async fn test_to_data_url_prefix() {
        let temp_dir = TempDir::new().unwrap();
        let canvas = sample_canvas(temp_dir.path()).await;
        assert!(to_data_url(&canvas)
            .unwrap()
            .starts_with("data:image/png;base64,"));
    }

    #[test]
    fn test_export_method_parsing() {
        assert_eq!("print".parse::<ExportMethod>().unwrap(), ExportMethod::Print);
        assert_eq!(ExportMethod::Share.to_string(), "share");
        assert!("fax".parse::<ExportMethod>().is_err());
    }
}
