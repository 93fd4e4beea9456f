//! Image decode / PNG re-encode helpers.

use std::io::Cursor;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use image::{DynamicImage, ImageFormat};

use crate::error::{CoreError, Result};

pub const PNG_MIME: &str = "image/png";

/// Decode arbitrary image bytes (format sniffed from the magic bytes).
pub fn decode(bytes: &[u8]) -> std::result::Result<DynamicImage, image::ImageError> {
    image::load_from_memory(bytes)
}

/// Encode `img` as PNG into a fresh buffer.
pub fn encode_png(img: &DynamicImage) -> Result<Vec<u8>> {
    let mut png = Vec::new();
    img.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
        .map_err(CoreError::Encode)?;
    Ok(png)
}

/// Decode an upload and normalise it to PNG, labelling failures with `what`.
pub fn to_png(bytes: &[u8], what: &'static str) -> Result<Vec<u8>> {
    let img = decode(bytes).map_err(|source| CoreError::InvalidImage { what, source })?;
    encode_png(&img)
}

pub fn to_base64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}
