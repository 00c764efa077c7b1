//! Image encoding for Mediapress.
//!
//! This module provides functionality for:
//! - Encoding JPEG with configurable quality (alpha is flattened onto white)
//! - Encoding lossy WebP through libwebp, keeping alpha
//! - Encoding PNG losslessly, keeping alpha
//!
//! [`encode_image`] picks the encoder for an [`OutputFormat`].

mod jpeg;
mod png;
mod webp;

pub use self::jpeg::encode_jpeg;
pub use self::png::encode_png;
pub use self::webp::encode_webp;

use thiserror::Error;

use crate::decode::{DecodedImage, PixelLayout};
use crate::{OutputFormat, TranscodeOptions};

/// Errors that can occur during encoding.
#[derive(Debug, Error)]
pub enum EncodeError {
    /// Pixel data length doesn't match expected dimensions
    #[error("Invalid pixel data: expected {expected} bytes, got {actual}")]
    InvalidPixelData { expected: usize, actual: usize },

    /// Width or height is zero or exceeds what the format can store
    #[error("Invalid dimensions for {format}: {width}x{height}")]
    InvalidDimensions {
        format: OutputFormat,
        width: u32,
        height: u32,
    },

    /// The underlying encoder failed
    #[error("{format} encoding failed: {message}")]
    EncodingFailed {
        format: OutputFormat,
        message: String,
    },
}

/// Encode a decoded image in the format and quality given by `options`.
pub fn encode_image(image: &DecodedImage, options: &TranscodeOptions) -> Result<Vec<u8>, EncodeError> {
    match options.format {
        OutputFormat::Jpeg => {
            if image.has_alpha() {
                let rgb = flatten_alpha(&image.pixels);
                encode_jpeg(&rgb, image.width, image.height, options.jpeg_quality())
            } else {
                encode_jpeg(&image.pixels, image.width, image.height, options.jpeg_quality())
            }
        }
        OutputFormat::Png => encode_png(&image.pixels, image.width, image.height, image.layout),
        OutputFormat::Webp => encode_webp(
            &image.pixels,
            image.width,
            image.height,
            image.layout,
            options.webp_quality(),
        ),
    }
}

/// Composite straight-alpha RGBA pixels over a white background.
pub fn flatten_alpha(rgba: &[u8]) -> Vec<u8> {
    let mut rgb = Vec::with_capacity(rgba.len() / 4 * 3);
    for px in rgba.chunks_exact(4) {
        let alpha = px[3] as u32;
        for &channel in &px[..3] {
            let blended = (channel as u32 * alpha + 255 * (255 - alpha) + 127) / 255;
            rgb.push(blended as u8);
        }
    }
    rgb
}

/// Check dimensions and buffer length before handing pixels to an encoder.
fn validate_buffer(
    format: OutputFormat,
    pixels: &[u8],
    width: u32,
    height: u32,
    layout: PixelLayout,
) -> Result<(), EncodeError> {
    if width == 0 || height == 0 {
        return Err(EncodeError::InvalidDimensions {
            format,
            width,
            height,
        });
    }

    let expected = width as usize * height as usize * layout.bytes_per_pixel();
    if pixels.len() != expected {
        return Err(EncodeError::InvalidPixelData {
            expected,
            actual: pixels.len(),
        });
    }
    Ok(())
}
