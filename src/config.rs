use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::camera::CaptureTiming;
use crate::capture::CaptureSettings;
use crate::cropper::CAPTURE_ASPECT;
use crate::export::{DEFAULT_FILENAME_PREFIX, DEFAULT_PRINT_COMMAND};
use crate::filters::PhotoFilter;
use crate::timestamp::TimeFormat;

#[derive(Debug, Clone)]
pub struct AssetConfig {
    pub font_dir: PathBuf,
    pub frame_dir: PathBuf,
    /// Overrides `<font_dir>/stickers.ttf`
    pub sticker_font: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub output_dir: PathBuf,
    pub assets: AssetConfig,
    pub filename_prefix: String,
    pub mirror: bool,
    pub capture_aspect: f64,
    pub countdown_secs: u32,
    pub pause_secs: u64,
    pub time_format: TimeFormat,
    pub print_command: String,
}

impl Config {
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        let asset_dir = env::var("KODASNAP_ASSET_DIR").unwrap_or_else(|_| "./assets".to_string());

        let capture_aspect: f64 = env::var("KODASNAP_CAPTURE_ASPECT")
            .unwrap_or_else(|_| CAPTURE_ASPECT.to_string())
            .parse()?;
        if !capture_aspect.is_finite() || capture_aspect <= 0.0 {
            return Err(format!("Invalid capture aspect: {}", capture_aspect).into());
        }

        let time_format = env::var("KODASNAP_TIME_FORMAT").unwrap_or_else(|_| "12h".to_string());

        Ok(Config {
            output_dir: env::var("KODASNAP_OUTPUT_DIR")
                .unwrap_or_else(|_| ".".to_string())
                .into(),
            assets: AssetConfig {
                font_dir: env::var("KODASNAP_FONT_DIR")
                    .unwrap_or_else(|_| format!("{}/fonts", asset_dir))
                    .into(),
                frame_dir: env::var("KODASNAP_FRAME_DIR")
                    .unwrap_or_else(|_| format!("{}/frames", asset_dir))
                    .into(),
                sticker_font: env::var("KODASNAP_STICKER_FONT").ok().map(PathBuf::from),
            },
            filename_prefix: env::var("KODASNAP_FILENAME_PREFIX")
                .unwrap_or_else(|_| DEFAULT_FILENAME_PREFIX.to_string()),
            mirror: env::var("KODASNAP_MIRROR")
                .unwrap_or_else(|_| "false".to_string())
                .parse()?,
            capture_aspect,
            countdown_secs: env::var("KODASNAP_COUNTDOWN_SECS")
                .unwrap_or_else(|_| "3".to_string())
                .parse()?,
            pause_secs: env::var("KODASNAP_PAUSE_SECS")
                .unwrap_or_else(|_| "1".to_string())
                .parse()?,
            time_format: time_format
                .parse()
                .map_err(|_| format!("Invalid time format: {}", time_format))?,
            print_command: env::var("KODASNAP_PRINT_COMMAND")
                .unwrap_or_else(|_| DEFAULT_PRINT_COMMAND.to_string()),
        })
    }

    pub fn capture_settings(&self, filter: PhotoFilter) -> CaptureSettings {
        CaptureSettings {
            target_aspect: self.capture_aspect,
            mirror: self.mirror,
            filter,
        }
    }

    pub fn capture_timing(&self) -> CaptureTiming {
        CaptureTiming {
            countdown_from: self.countdown_secs,
            tick: Duration::from_secs(1),
            pause_between: Duration::from_secs(self.pause_secs),
        }
    }
}
