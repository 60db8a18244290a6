//! Upload type sniffing. Only the leading bytes count; the file name is
//! never trusted.

use image::ImageFormat;

/// Image format of `bytes`, if this build can decode it.
pub fn sniff_image(bytes: &[u8]) -> Option<ImageFormat> {
    image::guess_format(bytes)
        .ok()
        .filter(|format| format.reading_enabled())
}
