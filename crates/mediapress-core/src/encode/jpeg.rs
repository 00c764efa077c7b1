//! JPEG encoding using the `image` crate's baseline encoder.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::{ExtendedColorType, ImageEncoder};

use super::{validate_buffer, EncodeError};
use crate::decode::PixelLayout;
use crate::OutputFormat;

/// JPEG stores dimensions in 16-bit fields.
const MAX_JPEG_DIMENSION: u32 = u16::MAX as u32;

/// Encode RGB pixel data to JPEG bytes.
///
/// `quality` is on the 1-100 scale; out-of-range values are clamped.
pub fn encode_jpeg(
    pixels: &[u8],
    width: u32,
    height: u32,
    quality: u8,
) -> Result<Vec<u8>, EncodeError> {
    validate_buffer(OutputFormat::Jpeg, pixels, width, height, PixelLayout::Rgb8)?;
    if width > MAX_JPEG_DIMENSION || height > MAX_JPEG_DIMENSION {
        return Err(EncodeError::InvalidDimensions {
            format: OutputFormat::Jpeg,
            width,
            height,
        });
    }

    let mut buffer = Cursor::new(Vec::new());
    JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100))
        .write_image(pixels, width, height, ExtendedColorType::Rgb8)
        .map_err(|e| EncodeError::EncodingFailed {
            format: OutputFormat::Jpeg,
            message: e.to_string(),
        })?;

    Ok(buffer.into_inner())
}
