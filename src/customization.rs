//! User customization of the photo strip.
//!
//! Mirrors the JSON the booth UI sends (camelCase keys). Values arrive
//! unchecked; call [`Customization::validate`] before composing.

use std::fmt;
use std::str::FromStr;

use image::Rgba;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{BoothError, BoothResult};

pub const MAX_TEXT_CHARS: usize = 50;
pub const MIN_TEXT_SIZE: u32 = 12;
pub const MAX_TEXT_SIZE: u32 = 48;
pub const STICKER_SLOTS: usize = 5;

pub const DEFAULT_FRAME_COLOR: HexColor = HexColor([0xF4, 0x72, 0xB6]);

pub const DEFAULT_STICKER_POSITIONS: [NormalizedPoint; STICKER_SLOTS] = [
    NormalizedPoint { x: 10.0, y: 10.0 },
    NormalizedPoint { x: 85.0, y: 15.0 },
    NormalizedPoint { x: 5.0, y: 85.0 },
    NormalizedPoint { x: 90.0, y: 80.0 },
    NormalizedPoint { x: 50.0, y: 5.0 },
];

/// `#RRGGBB` color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HexColor(pub [u8; 3]);

impl HexColor {
    pub const WHITE: HexColor = HexColor([0xFF, 0xFF, 0xFF]);

    pub fn to_rgba(self) -> Rgba<u8> {
        let [r, g, b] = self.0;
        Rgba([r, g, b, 255])
    }
}

impl FromStr for HexColor {
    type Err = BoothError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s
            .trim()
            .strip_prefix('#')
            .filter(|h| h.len() == 6 && h.is_ascii())
            .ok_or_else(|| BoothError::InvalidInput(format!("Invalid color '{}'", s)))?;

        let channel = |i: usize| {
            u8::from_str_radix(&hex[i..i + 2], 16)
                .map_err(|_| BoothError::InvalidInput(format!("Invalid color '{}'", s)))
        };

        Ok(HexColor([channel(0)?, channel(2)?, channel(4)?]))
    }
}

impl fmt::Display for HexColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [r, g, b] = self.0;
        write!(f, "#{:02X}{:02X}{:02X}", r, g, b)
    }
}

impl Serialize for HexColor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for HexColor {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Position as a percentage (0–100) of the canvas width and height.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct NormalizedPoint {
    pub x: f32,
    pub y: f32,
}

impl NormalizedPoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn is_valid(&self) -> bool {
        (0.0..=100.0).contains(&self.x) && (0.0..=100.0).contains(&self.y)
    }

    /// Resolves to canvas pixels.
    pub fn to_pixels(self, width: u32, height: u32) -> (i32, i32) {
        (
            (self.x / 100.0 * width as f32).round() as i32,
            (self.y / 100.0 * height as f32).round() as i32,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layout {
    #[default]
    Vertical,
    Grid,
}

impl FromStr for Layout {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "vertical" => Ok(Layout::Vertical),
            "grid" => Ok(Layout::Grid),
            _ => Err(()),
        }
    }
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Layout::Vertical => write!(f, "vertical"),
            Layout::Grid => write!(f, "grid"),
        }
    }
}

/// Decorative frame images bundled with the booth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FrameAsset {
    #[serde(rename = "Classic Film")]
    ClassicFilm,
    Polaroid,
    Hearts,
    Stars,
    #[serde(rename = "Retro Wave")]
    RetroWave,
}

impl FrameAsset {
    pub const ALL: [FrameAsset; 5] = [
        FrameAsset::ClassicFilm,
        FrameAsset::Polaroid,
        FrameAsset::Hearts,
        FrameAsset::Stars,
        FrameAsset::RetroWave,
    ];

    pub fn file_name(&self) -> &'static str {
        match self {
            FrameAsset::ClassicFilm => "classic-film.png",
            FrameAsset::Polaroid => "polaroid.png",
            FrameAsset::Hearts => "hearts.png",
            FrameAsset::Stars => "stars.png",
            FrameAsset::RetroWave => "retro-wave.png",
        }
    }
}

/// Strip background. Setting one replaces the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Background {
    FrameColor(HexColor),
    FrameImage(FrameAsset),
}

impl Default for Background {
    fn default() -> Self {
        Background::FrameColor(DEFAULT_FRAME_COLOR)
    }
}

/// `frameColor` / `frameImage` as top-level customization keys.
///
/// A non-null `frameImage` wins over `frameColor`; with neither present the
/// default color is used. Only the active key is written back.
mod background_keys {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use super::{Background, FrameAsset, HexColor};

    #[derive(Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct Keys {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        frame_color: Option<HexColor>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        frame_image: Option<FrameAsset>,
    }

    pub fn serialize<S: Serializer>(background: &Background, serializer: S) -> Result<S::Ok, S::Error> {
        let keys = match *background {
            Background::FrameColor(color) => Keys {
                frame_color: Some(color),
                frame_image: None,
            },
            Background::FrameImage(frame) => Keys {
                frame_color: None,
                frame_image: Some(frame),
            },
        };
        keys.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Background, D::Error> {
        let keys = Keys::deserialize(deserializer)?;
        Ok(match (keys.frame_image, keys.frame_color) {
            (Some(frame), _) => Background::FrameImage(frame),
            (None, Some(color)) => Background::FrameColor(color),
            (None, None) => Background::default(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum StickerTheme {
    #[default]
    #[serde(rename = "No Sticker")]
    NoSticker,
    #[serde(rename = "Girly Pop")]
    GirlyPop,
    Cute,
    Mofusand,
    #[serde(rename = "Shin Chan")]
    ShinChan,
    Miffy,
    #[serde(rename = "Mark's Solo")]
    MarksSolo,
    #[serde(rename = "Midnight Garden")]
    MidnightGarden,
}

impl StickerTheme {
    pub const ALL: [StickerTheme; 8] = [
        StickerTheme::NoSticker,
        StickerTheme::GirlyPop,
        StickerTheme::Cute,
        StickerTheme::Mofusand,
        StickerTheme::ShinChan,
        StickerTheme::Miffy,
        StickerTheme::MarksSolo,
        StickerTheme::MidnightGarden,
    ];

    /// The glyph drawn in every sticker slot for this theme.
    pub fn glyph(&self) -> Option<char> {
        match self {
            StickerTheme::NoSticker => None,
            StickerTheme::GirlyPop => Some('\u{1F496}'),
            StickerTheme::Cute => Some('\u{1F380}'),
            StickerTheme::Mofusand => Some('\u{1F431}'),
            StickerTheme::ShinChan => Some('\u{2B50}'),
            StickerTheme::Miffy => Some('\u{1F430}'),
            StickerTheme::MarksSolo => Some('\u{1F3B8}'),
            StickerTheme::MidnightGarden => Some('\u{1F319}'),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StickerTheme::NoSticker => "No Sticker",
            StickerTheme::GirlyPop => "Girly Pop",
            StickerTheme::Cute => "Cute",
            StickerTheme::Mofusand => "Mofusand",
            StickerTheme::ShinChan => "Shin Chan",
            StickerTheme::Miffy => "Miffy",
            StickerTheme::MarksSolo => "Mark's Solo",
            StickerTheme::MidnightGarden => "Midnight Garden",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FontFamily {
    #[default]
    SansSerif,
    Serif,
    Monospace,
    Cursive,
    Fantasy,
}

impl FontFamily {
    pub const ALL: [FontFamily; 5] = [
        FontFamily::SansSerif,
        FontFamily::Serif,
        FontFamily::Monospace,
        FontFamily::Cursive,
        FontFamily::Fantasy,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FontFamily::SansSerif => "sans-serif",
            FontFamily::Serif => "serif",
            FontFamily::Monospace => "monospace",
            FontFamily::Cursive => "cursive",
            FontFamily::Fantasy => "fantasy",
        }
    }

    /// Bold face looked up in the font directory
    pub fn file_name(&self) -> &'static str {
        match self {
            FontFamily::SansSerif => "sans-serif-bold.ttf",
            FontFamily::Serif => "serif-bold.ttf",
            FontFamily::Monospace => "monospace-bold.ttf",
            FontFamily::Cursive => "cursive-bold.ttf",
            FontFamily::Fantasy => "fantasy-bold.ttf",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Customization {
    pub layout: Layout,
    #[serde(flatten, with = "background_keys")]
    pub background: Background,
    pub sticker_theme: StickerTheme,
    pub sticker_positions: [NormalizedPoint; STICKER_SLOTS],
    pub custom_text: String,
    pub text_color: HexColor,
    pub text_font: FontFamily,
    pub text_size: u32,
    pub text_position: NormalizedPoint,
    pub add_date: bool,
    pub add_time: bool,
    pub timestamp_color: HexColor,
}

impl Default for Customization {
    fn default() -> Self {
        Self {
            layout: Layout::Vertical,
            background: Background::default(),
            sticker_theme: StickerTheme::NoSticker,
            sticker_positions: DEFAULT_STICKER_POSITIONS,
            custom_text: String::new(),
            text_color: HexColor::WHITE,
            text_font: FontFamily::SansSerif,
            text_size: 18,
            text_position: NormalizedPoint::default(),
            add_date: false,
            add_time: false,
            timestamp_color: HexColor::WHITE,
        }
    }
}

impl Customization {
    pub fn from_json(json: &str) -> BoothResult<Self> {
        let customization: Customization = serde_json::from_str(json)
            .map_err(|e| BoothError::InvalidInput(format!("Invalid customization: {}", e)))?;
        customization.validate()?;
        Ok(customization)
    }

    pub fn set_frame_color(&mut self, color: HexColor) {
        self.background = Background::FrameColor(color);
    }

    pub fn set_frame_image(&mut self, frame: FrameAsset) {
        self.background = Background::FrameImage(frame);
    }

    pub fn set_custom_text(&mut self, text: &str) -> BoothResult<()> {
        if text.chars().count() > MAX_TEXT_CHARS {
            return Err(BoothError::InvalidInput(format!(
                "Custom text is limited to {} characters",
                MAX_TEXT_CHARS
            )));
        }
        self.custom_text = text.to_string();
        Ok(())
    }

    pub fn set_text_size(&mut self, size: u32) -> BoothResult<()> {
        if !(MIN_TEXT_SIZE..=MAX_TEXT_SIZE).contains(&size) {
            return Err(BoothError::InvalidInput(format!(
                "Text size must be between {} and {} px, got {}",
                MIN_TEXT_SIZE, MAX_TEXT_SIZE, size
            )));
        }
        self.text_size = size;
        Ok(())
    }

    pub fn set_sticker_position(&mut self, slot: usize, point: NormalizedPoint) -> BoothResult<()> {
        if !point.is_valid() {
            return Err(BoothError::InvalidInput(format!(
                "Sticker position ({}, {}) is outside 0-100",
                point.x, point.y
            )));
        }
        let position = self.sticker_positions.get_mut(slot).ok_or_else(|| {
            BoothError::InvalidInput(format!("Sticker slot {} does not exist", slot))
        })?;
        *position = point;
        Ok(())
    }

    pub fn set_text_position(&mut self, point: NormalizedPoint) -> BoothResult<()> {
        if !point.is_valid() {
            return Err(BoothError::InvalidInput(format!(
                "Text position ({}, {}) is outside 0-100",
                point.x, point.y
            )));
        }
        self.text_position = point;
        Ok(())
    }

    pub fn has_timestamp(&self) -> bool {
        self.add_date || self.add_time
    }

    pub fn validate(&self) -> BoothResult<()> {
        if self.custom_text.chars().count() > MAX_TEXT_CHARS {
            return Err(BoothError::InvalidInput(format!(
                "Custom text is limited to {} characters",
                MAX_TEXT_CHARS
            )));
        }
        if !(MIN_TEXT_SIZE..=MAX_TEXT_SIZE).contains(&self.text_size) {
            return Err(BoothError::InvalidInput(format!(
                "Text size must be between {} and {} px, got {}",
                MIN_TEXT_SIZE, MAX_TEXT_SIZE, self.text_size
            )));
        }
        if !self.text_position.is_valid() {
            return Err(BoothError::InvalidInput(
                "Text position is outside 0-100".to_string(),
            ));
        }
        if let Some(slot) = self.sticker_positions.iter().position(|p| !p.is_valid()) {
            return Err(BoothError::InvalidInput(format!(
                "Sticker slot {} is outside 0-100",
                slot
            )));
        }
        Ok(())
    }
}
