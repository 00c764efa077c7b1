//! Bounding-box resizing.
//!
//! Images are only ever scaled down: an image that already fits inside the
//! bounds is passed through untouched.

use super::{DecodeError, DecodedImage, FilterType};

/// Resize an image to exact dimensions.
///
/// # Errors
///
/// Returns `DecodeError::ZeroSized` if either target dimension is zero and
/// `DecodeError::CorruptedFile` if the pixel buffer does not match the image size.
pub fn resize(
    image: DecodedImage,
    width: u32,
    height: u32,
    filter: FilterType,
) -> Result<DecodedImage, DecodeError> {
    if width == 0 || height == 0 {
        return Err(DecodeError::ZeroSized { width, height });
    }

    if image.width == width && image.height == height {
        return Ok(image);
    }

    let dynamic = image
        .into_dynamic()
        .ok_or_else(|| DecodeError::CorruptedFile("Pixel buffer size mismatch".to_string()))?;
    let resized = dynamic.resize_exact(width, height, filter.to_image_filter());

    Ok(DecodedImage::from_dynamic(resized))
}

/// Shrink an image to fit within `max_width` x `max_height`, preserving aspect ratio.
///
/// Images that already fit are returned unchanged (no upscaling).
pub fn resize_to_bounds(
    image: DecodedImage,
    max_width: u32,
    max_height: u32,
    filter: FilterType,
) -> Result<DecodedImage, DecodeError> {
    let (width, height) = fit_dimensions(image.width, image.height, max_width, max_height);
    resize(image, width, height, filter)
}

/// Compute the output size for an image bounded by `max_width` x `max_height`.
///
/// The scale factor is `min(max_width / width, max_height / height)` and is
/// applied only when the image exceeds either bound. Each scaled edge is
/// rounded to the nearest pixel and clamped to `1..=bound`.
pub fn fit_dimensions(width: u32, height: u32, max_width: u32, max_height: u32) -> (u32, u32) {
    if width == 0 || height == 0 {
        return (0, 0);
    }
    if width <= max_width && height <= max_height {
        return (width, height);
    }

    let scale = f64::min(
        max_width as f64 / width as f64,
        max_height as f64 / height as f64,
    );
    let new_width = (width as f64 * scale).round() as u32;
    let new_height = (height as f64 * scale).round() as u32;

    (
        new_width.clamp(1, max_width.max(1)),
        new_height.clamp(1, max_height.max(1)),
    )
}


// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Property: The result always fits within the bounds.
        #[test]
        fn prop_result_fits_bounds(
            width in 1u32..=10_000,
            height in 1u32..=10_000,
            max_width in 1u32..=4_000,
            max_height in 1u32..=4_000,
        ) {
            let (w, h) = fit_dimensions(width, height, max_width, max_height);
            prop_assert!(w >= 1 && w <= max_width);
            prop_assert!(h >= 1 && h <= max_height);
        }

        /// Property: Images inside the bounds are never resized.
        #[test]
        fn prop_no_upscale(
            width in 1u32..=2_000,
            height in 1u32..=2_000,
            extra_w in 0u32..=2_000,
            extra_h in 0u32..=2_000,
        ) {
            let dims = fit_dimensions(width, height, width + extra_w, height + extra_h);
            prop_assert_eq!(dims, (width, height));
        }

        /// Property: Scaled edges match W*s and H*s with s = min(Wm/W, Hm/H).
        #[test]
        fn prop_scale_factor_applied_to_both_edges(
            width in 2u32..=8_000,
            height in 2u32..=8_000,
            max_width in 1u32..=2_000,
            max_height in 1u32..=2_000,
        ) {
            prop_assume!(width > max_width || height > max_height);

            let (w, h) = fit_dimensions(width, height, max_width, max_height);
            let scale = f64::min(
                max_width as f64 / width as f64,
                max_height as f64 / height as f64,
            );
            let expected_w = ((width as f64 * scale).round() as u32).clamp(1, max_width);
            let expected_h = ((height as f64 * scale).round() as u32).clamp(1, max_height);
            prop_assert_eq!((w, h), (expected_w, expected_h));
        }
    }
}
