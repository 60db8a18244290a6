//! Build-time asset catalog: frame images and fonts.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use ab_glyph::FontArc;
use image::RgbaImage;
use log::{debug, info, warn};

use crate::customization::{FontFamily, FrameAsset, StickerTheme};
use crate::error::{BoothError, BoothResult};
use crate::text::has_glyph;

pub const STICKER_FONT_FILE: &str = "stickers.ttf";

/// Fonts commonly present on Linux kiosks, tried when no font directory is
/// configured.
const SYSTEM_FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/TTF/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Bold.ttf",
    "/usr/share/fonts/truetype/freefont/FreeSansBold.ttf",
];

pub fn parse_font(bytes: Vec<u8>) -> BoothResult<FontArc> {
    FontArc::try_from_vec(bytes)
        .map_err(|e| BoothError::DecodeFailure(format!("Font data is not a valid font: {}", e)))
}

pub fn load_font(path: &Path) -> BoothResult<FontArc> {
    let bytes = std::fs::read(path).map_err(|e| {
        BoothError::DecodeFailure(format!("Failed to read font {}: {}", path.display(), e))
    })?;
    parse_font(bytes)
}

/// First well-known system font that exists on this machine
pub fn find_system_font() -> Option<PathBuf> {
    SYSTEM_FONT_CANDIDATES
        .iter()
        .map(PathBuf::from)
        .find(|p| p.exists())
}

/// Text faces per family plus the sticker glyph face.
///
/// Missing families fall back to sans-serif; a missing sticker face falls
/// back to the sans-serif face.
#[derive(Clone, Default)]
pub struct FontBook {
    faces: HashMap<FontFamily, FontArc>,
    stickers: Option<FontArc>,
}

impl FontBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads every font file found in `font_dir`. Missing files are skipped.
    pub fn load_dir(font_dir: &Path) -> Self {
        let mut book = Self::new();

        for family in FontFamily::ALL {
            let path = font_dir.join(family.file_name());
            if !path.exists() {
                debug!("No font for {} at {}", family.as_str(), path.display());
                continue;
            }
            match load_font(&path) {
                Ok(font) => book.faces.insert(family, font),
                Err(e) => {
                    warn!("Skipping font {}: {}", path.display(), e);
                    None
                }
            };
        }

        let sticker_path = font_dir.join(STICKER_FONT_FILE);
        if sticker_path.exists() {
            match load_font(&sticker_path) {
                Ok(font) => book.stickers = Some(font),
                Err(e) => warn!("Skipping sticker font {}: {}", sticker_path.display(), e),
            }
        }
        if book.stickers.is_none() {
            info!(
                "No {} in {}, stickers use the sans-serif face",
                STICKER_FONT_FILE,
                font_dir.display()
            );
        }

        if book.faces.is_empty() {
            if let Some(system) = find_system_font() {
                debug!("Falling back to system font {}", system.display());
                match load_font(&system) {
                    Ok(font) => {
                        book.faces.insert(FontFamily::SansSerif, font);
                    }
                    Err(e) => warn!("Skipping system font {}: {}", system.display(), e),
                }
            }
        }

        book
    }

    pub fn with_face(mut self, family: FontFamily, font: FontArc) -> Self {
        self.faces.insert(family, font);
        self
    }

    pub fn with_sticker_face(mut self, font: FontArc) -> Self {
        self.stickers = Some(font);
        self
    }

    pub fn face(&self, family: FontFamily) -> BoothResult<&FontArc> {
        self.faces
            .get(&family)
            .or_else(|| self.faces.get(&FontFamily::SansSerif))
            .ok_or_else(|| {
                BoothError::DecodeFailure(format!("No font available for {}", family.as_str()))
            })
    }

    pub fn sticker_face(&self) -> BoothResult<&FontArc> {
        match &self.stickers {
            Some(font) => Ok(font),
            None => self.face(FontFamily::SansSerif),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.faces.is_empty() && self.stickers.is_none()
    }

    /// Themes whose glyph the sticker face cannot draw. With no face at all
    /// every theme is missing.
    pub fn missing_sticker_themes(&self) -> Vec<StickerTheme> {
        let face = self.sticker_face().ok();
        StickerTheme::ALL
            .into_iter()
            .filter(|theme| match (theme.glyph(), face) {
                (Some(glyph), Some(font)) => !has_glyph(font, glyph),
                (Some(_), None) => true,
                (None, _) => false,
            })
            .collect()
    }
}

/// Frame images and fonts available to the compositor.
#[derive(Clone)]
pub struct AssetCatalog {
    frame_dir: PathBuf,
    fonts: FontBook,
}

impl AssetCatalog {
    pub fn new(frame_dir: impl Into<PathBuf>, fonts: FontBook) -> Self {
        Self {
            frame_dir: frame_dir.into(),
            fonts,
        }
    }

    pub fn fonts(&self) -> &FontBook {
        &self.fonts
    }

    pub fn frame_path(&self, frame: FrameAsset) -> PathBuf {
        self.frame_dir.join(frame.file_name())
    }

    /// Decodes a frame image from disk.
    pub fn load_frame(&self, frame: FrameAsset) -> BoothResult<RgbaImage> {
        let path = self.frame_path(frame);
        let image = image::open(&path).map_err(|e| {
            BoothError::DecodeFailure(format!("Failed to load frame {}: {}", path.display(), e))
        })?;
        Ok(image.to_rgba8())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;
    use tempfile::TempDir;

    #[test]
    fn test_missing_frame_is_decode_failure() {
        let temp_dir = TempDir::new().unwrap();
        let catalog = AssetCatalog::new(temp_dir.path(), FontBook::new());

        let result = catalog.load_frame(FrameAsset::Polaroid);
        assert!(matches!(result, Err(BoothError::DecodeFailure(_))));
    }

    #[test]
    fn test_frame_loads_from_dir() {
        let temp_dir = TempDir::new().unwrap();
        RgbaImage::from_pixel(8, 4, Rgba([1, 2, 3, 255]))
            .save(temp_dir.path().join("hearts.png"))
            .unwrap();
        let catalog = AssetCatalog::new(temp_dir.path(), FontBook::new());

        let frame = catalog.load_frame(FrameAsset::Hearts).unwrap();
        assert_eq!(frame.dimensions(), (8, 4));
    }

    #[test]
    fn test_empty_font_book_has_no_faces() {
        let book = FontBook::new();
        assert!(book.is_empty());
        assert!(matches!(
            book.face(FontFamily::Serif),
            Err(BoothError::DecodeFailure(_))
        ));
        assert!(book.sticker_face().is_err());
    }

    #[test]
    fn test_missing_family_falls_back_to_sans() {
        let Some(path) = find_system_font() else {
            return; // Skip test if no system font available
        };
        let book = FontBook::new().with_face(FontFamily::SansSerif, load_font(&path).unwrap());
        assert!(book.face(FontFamily::Cursive).is_ok());
        assert!(book.sticker_face().is_ok());
    }

    #[test]
    fn test_every_theme_missing_without_a_face() {
        let missing = FontBook::new().missing_sticker_themes();
        assert_eq!(missing.len(), StickerTheme::ALL.len() - 1);
        assert!(!missing.contains(&StickerTheme::NoSticker));
    }

    #[test]
    fn test_sticker_coverage_of_system_font() {
        let Some(path) = find_system_font() else {
            return;
        };
        // GIVEN: Only a text face, so stickers fall back to it
        let book = FontBook::new().with_face(FontFamily::SansSerif, load_font(&path).unwrap());

        // WHEN: Checking which themes it can draw
        let missing = book.missing_sticker_themes();

        // THEN: Exactly the themes without an outline are reported
        for theme in StickerTheme::ALL {
            let drawable = theme
                .glyph()
                .map(|glyph| has_glyph(book.sticker_face().unwrap(), glyph))
                .unwrap_or(true);
            assert_eq!(missing.contains(&theme), !drawable, "{}", theme.as_str());
        }
    }

    #[test]
    fn test_garbage_font_rejected() {
        assert!(parse_font(b"not a font".to_vec()).is_err());
    }
}
