//! Image decoding pipeline for Mediapress.
//!
//! This module provides functionality for:
//! - Sniffing the container format of an uploaded buffer
//! - Decoding JPEG, PNG, WebP, GIF and BMP inputs
//! - Applying EXIF orientation so photos keep their visual rotation
//! - Shrinking images to fit a bounding box
//!
//! # Architecture
//!
//! All operations are synchronous and allocation-bounded by the `image`
//! crate's default decoder limits. They are meant to run on a dedicated
//! worker thread, never on a caller's thread.
//!
//! # Examples
//!
//! ```ignore
//! use mediapress_core::decode::{decode_image, resize_to_bounds, FilterType};
//!
//! let bytes = std::fs::read("photo.jpg").unwrap();
//! let image = decode_image(&bytes).unwrap();
//! let preview = resize_to_bounds(image, 1920, 1080, FilterType::Lanczos3).unwrap();
//! ```

mod reader;
mod resize;
mod types;

pub use reader::{decode_image, detect_format, get_orientation};
pub use resize::{fit_dimensions, resize, resize_to_bounds};
pub use types::{DecodeError, DecodedImage, FilterType, Orientation, PixelLayout};

#[cfg(test)]
pub(crate) mod fixtures {
    /// Insert an EXIF APP1 segment carrying only an Orientation tag right
    /// after the SOI marker of a JPEG.
    pub(crate) fn with_exif_orientation(jpeg: &[u8], orientation: u16) -> Vec<u8> {
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8], "not a JPEG");

        let mut tiff = Vec::new();
        // Big-endian TIFF header, IFD0 at offset 8
        tiff.extend_from_slice(b"MM\x00\x2A\x00\x00\x00\x08");
        // One entry: tag 0x0112 (Orientation), SHORT, count 1
        tiff.extend_from_slice(&1u16.to_be_bytes());
        tiff.extend_from_slice(&0x0112u16.to_be_bytes());
        tiff.extend_from_slice(&3u16.to_be_bytes());
        tiff.extend_from_slice(&1u32.to_be_bytes());
        tiff.extend_from_slice(&orientation.to_be_bytes());
        tiff.extend_from_slice(&[0, 0]);
        // No next IFD
        tiff.extend_from_slice(&0u32.to_be_bytes());

        let segment_len = (2 + 6 + tiff.len()) as u16;
        let mut out = Vec::with_capacity(jpeg.len() + segment_len as usize + 2);
        out.extend_from_slice(&jpeg[..2]);
        out.extend_from_slice(&[0xFF, 0xE1]);
        out.extend_from_slice(&segment_len.to_be_bytes());
        out.extend_from_slice(b"Exif\x00\x00");
        out.extend_from_slice(&tiff);
        out.extend_from_slice(&jpeg[2..]);
        out
    }
}
