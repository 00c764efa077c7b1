//! Lossy WebP encoding through libwebp.

use super::{validate_buffer, EncodeError};
use crate::decode::PixelLayout;
use crate::OutputFormat;

/// WebP stores dimensions in 14-bit fields.
const MAX_WEBP_DIMENSION: u32 = 16_383;

/// Encode RGB or RGBA pixels as lossy WebP.
///
/// `quality` is on libwebp's 0-100 scale.
pub fn encode_webp(
    pixels: &[u8],
    width: u32,
    height: u32,
    layout: PixelLayout,
    quality: f32,
) -> Result<Vec<u8>, EncodeError> {
    validate_buffer(OutputFormat::Webp, pixels, width, height, layout)?;
    if width > MAX_WEBP_DIMENSION || height > MAX_WEBP_DIMENSION {
        return Err(EncodeError::InvalidDimensions {
            format: OutputFormat::Webp,
            width,
            height,
        });
    }

    let encoder = match layout {
        PixelLayout::Rgb8 => ::webp::Encoder::from_rgb(pixels, width, height),
        PixelLayout::Rgba8 => ::webp::Encoder::from_rgba(pixels, width, height),
    };

    let memory = encoder
        .encode_simple(false, quality.clamp(0.0, 100.0))
        .map_err(|e| EncodeError::EncodingFailed {
            format: OutputFormat::Webp,
            message: format!("{e:?}"),
        })?;

    Ok(memory.to_vec())
}
