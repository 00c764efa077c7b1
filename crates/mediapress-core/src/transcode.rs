//! The decode → resize → re-encode step.

use thiserror::Error;

use crate::decode::{decode_image, resize_to_bounds, DecodeError};
use crate::encode::{encode_image, EncodeError};
use crate::{OutputFormat, TranscodeOptions};

/// Failure of a single transcode.
#[derive(Debug, Error)]
pub enum TranscodeError {
    #[error("Decode failed: {0}")]
    Decode(#[from] DecodeError),

    #[error("Encode failed: {0}")]
    Encode(#[from] EncodeError),
}

/// Encoded output of a successful transcode.
#[derive(Debug, Clone)]
pub struct TranscodeOutput {
    pub bytes: Vec<u8>,
    pub format: OutputFormat,
    pub width: u32,
    pub height: u32,
    /// Dimensions after orientation correction, before resizing.
    pub source_width: u32,
    pub source_height: u32,
}

impl TranscodeOutput {
    pub fn mime_type(&self) -> &'static str {
        self.format.mime_type()
    }

    pub fn was_resized(&self) -> bool {
        (self.width, self.height) != (self.source_width, self.source_height)
    }
}

/// Decode `input`, shrink it into the configured bounds and re-encode it.
///
/// The input buffer is only read; nothing outside it is touched, so this is
/// safe to run on an isolated worker thread.
pub fn transcode(input: &[u8], options: &TranscodeOptions) -> Result<TranscodeOutput, TranscodeError> {
    let decoded = decode_image(input)?;
    let (source_width, source_height) = (decoded.width, decoded.height);

    let resized = resize_to_bounds(decoded, options.max_width, options.max_height, options.filter)?;
    let bytes = encode_image(&resized, options)?;

    Ok(TranscodeOutput {
        bytes,
        format: options.format,
        width: resized.width,
        height: resized.height,
        source_width,
        source_height,
    })
}
