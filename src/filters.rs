//! Capture filters applied to photo pixels.
//!
//! Each filter is a chain of color operations evaluated in order, using the
//! same formulas as the CSS filter functions the booth preview uses, so the
//! captured photo matches what the user saw on screen.

use std::fmt;
use std::str::FromStr;

use image::RgbaImage;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PhotoFilter {
    #[default]
    #[serde(rename = "No Filter")]
    None,
    #[serde(rename = "B&W")]
    BlackAndWhite,
    Sepia,
    Vintage,
    Soft,
    Noir,
    Vivid,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum ColorOp {
    Grayscale,
    Sepia,
    Contrast(f32),
    Saturate(f32),
    HueRotate(f32),
    Brightness(f32),
}

type Matrix = [[f32; 3]; 3];

impl PhotoFilter {
    pub const ALL: [PhotoFilter; 7] = [
        PhotoFilter::None,
        PhotoFilter::BlackAndWhite,
        PhotoFilter::Sepia,
        PhotoFilter::Vintage,
        PhotoFilter::Soft,
        PhotoFilter::Noir,
        PhotoFilter::Vivid,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PhotoFilter::None => "No Filter",
            PhotoFilter::BlackAndWhite => "B&W",
            PhotoFilter::Sepia => "Sepia",
            PhotoFilter::Vintage => "Vintage",
            PhotoFilter::Soft => "Soft",
            PhotoFilter::Noir => "Noir",
            PhotoFilter::Vivid => "Vivid",
        }
    }

    fn ops(&self) -> &'static [ColorOp] {
        match self {
            PhotoFilter::None => &[],
            PhotoFilter::BlackAndWhite => &[ColorOp::Grayscale],
            PhotoFilter::Sepia => &[ColorOp::Sepia],
            PhotoFilter::Vintage => &[
                ColorOp::Contrast(1.25),
                ColorOp::Saturate(1.5),
                ColorOp::HueRotate(15.0),
            ],
            PhotoFilter::Soft => &[ColorOp::Brightness(1.1), ColorOp::Contrast(0.9)],
            PhotoFilter::Noir => &[ColorOp::Grayscale, ColorOp::Contrast(1.5)],
            PhotoFilter::Vivid => &[ColorOp::Saturate(1.5), ColorOp::Contrast(1.1)],
        }
    }

    /// Applies the filter in place. Alpha is left untouched.
    pub fn apply(&self, image: &mut RgbaImage) {
        let ops = self.ops();
        if ops.is_empty() {
            return;
        }

        for pixel in image.pixels_mut() {
            let mut rgb = [
                pixel[0] as f32 / 255.0,
                pixel[1] as f32 / 255.0,
                pixel[2] as f32 / 255.0,
            ];
            for op in ops {
                rgb = op.apply(rgb);
            }
            for (channel, value) in pixel.0.iter_mut().zip(rgb) {
                *channel = (value.clamp(0.0, 1.0) * 255.0).round() as u8;
            }
        }
    }
}

impl ColorOp {
    fn apply(&self, rgb: [f32; 3]) -> [f32; 3] {
        match *self {
            ColorOp::Grayscale => multiply(&saturate_matrix(0.0), rgb),
            ColorOp::Sepia => multiply(
                &[
                    [0.393, 0.769, 0.189],
                    [0.349, 0.686, 0.168],
                    [0.272, 0.534, 0.131],
                ],
                rgb,
            ),
            ColorOp::Contrast(amount) => rgb.map(|v| (v - 0.5) * amount + 0.5),
            ColorOp::Saturate(amount) => multiply(&saturate_matrix(amount), rgb),
            ColorOp::HueRotate(degrees) => multiply(&hue_rotate_matrix(degrees), rgb),
            ColorOp::Brightness(amount) => rgb.map(|v| v * amount),
        }
    }
}

fn multiply(m: &Matrix, rgb: [f32; 3]) -> [f32; 3] {
    [
        m[0][0] * rgb[0] + m[0][1] * rgb[1] + m[0][2] * rgb[2],
        m[1][0] * rgb[0] + m[1][1] * rgb[1] + m[1][2] * rgb[2],
        m[2][0] * rgb[0] + m[2][1] * rgb[1] + m[2][2] * rgb[2],
    ]
}

fn saturate_matrix(s: f32) -> Matrix {
    [
        [0.213 + 0.787 * s, 0.715 - 0.715 * s, 0.072 - 0.072 * s],
        [0.213 - 0.213 * s, 0.715 + 0.285 * s, 0.072 - 0.072 * s],
        [0.213 - 0.213 * s, 0.715 - 0.715 * s, 0.072 + 0.928 * s],
    ]
}

fn hue_rotate_matrix(degrees: f32) -> Matrix {
    let (sin, cos) = degrees.to_radians().sin_cos();
    [
        [
            0.213 + cos * 0.787 - sin * 0.213,
            0.715 - cos * 0.715 - sin * 0.715,
            0.072 - cos * 0.072 + sin * 0.928,
        ],
        [
            0.213 - cos * 0.213 + sin * 0.143,
            0.715 + cos * 0.285 + sin * 0.140,
            0.072 - cos * 0.072 - sin * 0.283,
        ],
        [
            0.213 - cos * 0.213 - sin * 0.787,
            0.715 - cos * 0.715 + sin * 0.715,
            0.072 + cos * 0.928 + sin * 0.072,
        ],
    ]
}

impl FromStr for PhotoFilter {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        match normalized.as_str() {
            "no filter" | "none" => Ok(PhotoFilter::None),
            "b&w" | "bw" | "black-and-white" => Ok(PhotoFilter::BlackAndWhite),
            "sepia" => Ok(PhotoFilter::Sepia),
            "vintage" => Ok(PhotoFilter::Vintage),
            "soft" => Ok(PhotoFilter::Soft),
            "noir" => Ok(PhotoFilter::Noir),
            "vivid" => Ok(PhotoFilter::Vivid),
            _ => Err(()),
        }
    }
}

impl fmt::Display for PhotoFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn single_pixel(rgba: [u8; 4]) -> RgbaImage {
        RgbaImage::from_pixel(1, 1, Rgba(rgba))
    }

    #[test]
    fn test_no_filter_is_identity() {
        let mut image = single_pixel([12, 200, 99, 255]);
        PhotoFilter::None.apply(&mut image);
        assert_eq!(image.get_pixel(0, 0).0, [12, 200, 99, 255]);
    }

    #[test]
    fn test_black_and_white_equalizes_channels() {
        let mut image = single_pixel([220, 40, 90, 128]);
        PhotoFilter::BlackAndWhite.apply(&mut image);
        let p = image.get_pixel(0, 0).0;
        assert_eq!(p[0], p[1]);
        assert_eq!(p[1], p[2]);
        // Alpha is preserved
        assert_eq!(p[3], 128);
    }

    #[test]
    fn test_sepia_warms_white() {
        let mut image = single_pixel([255, 255, 255, 255]);
        PhotoFilter::Sepia.apply(&mut image);
        let p = image.get_pixel(0, 0).0;
        // Red and green saturate, blue stays below
        assert_eq!(p[0], 255);
        assert!(p[2] < p[1]);
    }

    #[test]
    fn test_noir_pushes_grey_apart() {
        let mut dark = single_pixel([80, 80, 80, 255]);
        let mut light = single_pixel([180, 180, 180, 255]);
        PhotoFilter::Noir.apply(&mut dark);
        PhotoFilter::Noir.apply(&mut light);
        assert!(dark.get_pixel(0, 0)[0] < 80);
        assert!(light.get_pixel(0, 0)[0] > 180);
    }

    #[test]
    fn test_hue_rotate_zero_is_identity() {
        let rgb = [0.2, 0.5, 0.8];
        let out = ColorOp::HueRotate(0.0).apply(rgb);
        for (a, b) in rgb.iter().zip(out) {
            assert!((a - b).abs() < 1e-3);
        }
    }

    #[test]
    fn test_parse_names() {
        for filter in PhotoFilter::ALL {
            assert_eq!(filter.as_str().parse::<PhotoFilter>(), Ok(filter));
        }
        assert_eq!("bw".parse::<PhotoFilter>(), Ok(PhotoFilter::BlackAndWhite));
        assert_eq!("chrome".parse::<PhotoFilter>(), Err(()));
    }
}
