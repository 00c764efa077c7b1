//! Raster decoding with format sniffing and EXIF orientation handling.

use std::io::Cursor;

use exif::{In, Reader, Tag};
use image::error::{ImageError, LimitErrorKind};
use image::{DynamicImage, ImageFormat, ImageReader};

use super::{DecodeError, DecodedImage, Orientation};

/// Container formats accepted as input.
const SUPPORTED_INPUTS: [ImageFormat; 5] = [
    ImageFormat::Jpeg,
    ImageFormat::Png,
    ImageFormat::WebP,
    ImageFormat::Gif,
    ImageFormat::Bmp,
];

/// Detect the container format from the leading magic bytes.
///
/// # Errors
///
/// Returns `DecodeError::Empty` for a zero-length buffer and
/// `DecodeError::InvalidFormat` if the bytes match no supported format.
pub fn detect_format(bytes: &[u8]) -> Result<ImageFormat, DecodeError> {
    if bytes.is_empty() {
        return Err(DecodeError::Empty);
    }
    let format = image::guess_format(bytes).map_err(|_| DecodeError::InvalidFormat)?;
    if SUPPORTED_INPUTS.contains(&format) {
        Ok(format)
    } else {
        Err(DecodeError::InvalidFormat)
    }
}

/// Decode an image from bytes, applying EXIF orientation correction.
///
/// Animated inputs (GIF, WebP) yield their first frame. Images with an alpha
/// channel decode to RGBA, everything else to RGB.
///
/// # Errors
///
/// - `DecodeError::Empty` / `DecodeError::InvalidFormat` if the format is unknown
/// - `DecodeError::CorruptedFile` if the payload is truncated or malformed
/// - `DecodeError::OutOfMemory` if the decoder's allocation limits are hit
pub fn decode_image(bytes: &[u8]) -> Result<DecodedImage, DecodeError> {
    let format = detect_format(bytes)?;
    let orientation = get_orientation(bytes);

    let img = ImageReader::with_format(Cursor::new(bytes), format)
        .decode()
        .map_err(map_image_error)?;

    if img.width() == 0 || img.height() == 0 {
        return Err(DecodeError::ZeroSized {
            width: img.width(),
            height: img.height(),
        });
    }

    Ok(DecodedImage::from_dynamic(apply_orientation(
        img,
        orientation,
    )))
}

/// Extract the EXIF orientation from an encoded image.
///
/// Returns `Orientation::Normal` if there is no EXIF block or the tag is missing.
pub fn get_orientation(bytes: &[u8]) -> Orientation {
    let mut cursor = Cursor::new(bytes);
    Reader::new()
        .read_from_container(&mut cursor)
        .ok()
        .and_then(|exif| {
            exif.get_field(Tag::Orientation, In::PRIMARY)
                .and_then(|field| field.value.get_uint(0))
        })
        .map(Orientation::from)
        .unwrap_or_default()
}

fn apply_orientation(img: DynamicImage, orientation: Orientation) -> DynamicImage {
    match orientation {
        Orientation::Normal => img,
        Orientation::FlipHorizontal => img.fliph(),
        Orientation::Rotate180 => img.rotate180(),
        Orientation::FlipVertical => img.flipv(),
        Orientation::Transpose => img.rotate90().fliph(),
        Orientation::Rotate90CW => img.rotate90(),
        Orientation::Transverse => img.rotate270().fliph(),
        Orientation::Rotate270CW => img.rotate270(),
    }
}

fn map_image_error(err: ImageError) -> DecodeError {
    match err {
        ImageError::Limits(limit) if matches!(limit.kind(), LimitErrorKind::InsufficientMemory) => {
            DecodeError::OutOfMemory
        }
        ImageError::Unsupported(_) => DecodeError::InvalidFormat,
        other => DecodeError::CorruptedFile(other.to_string()),
    }
}
