//! The seam between the worker thread and the codec.

use std::sync::Arc;

use mediapress_core::{TranscodeError, TranscodeOptions, TranscodeOutput};

/// A blocking decode → resize → re-encode implementation.
///
/// Runs on the worker thread only and sees nothing but the input buffer.
pub trait Transcoder: Send + Sync {
    fn transcode(
        &self,
        input: &[u8],
        options: &TranscodeOptions,
    ) -> Result<TranscodeOutput, TranscodeError>;
}

pub type DynTranscoder = Arc<dyn Transcoder>;

/// Production transcoder backed by `mediapress_core::transcode`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageTranscoder;

impl Transcoder for ImageTranscoder {
    fn transcode(
        &self,
        input: &[u8],
        options: &TranscodeOptions,
    ) -> Result<TranscodeOutput, TranscodeError> {
        mediapress_core::transcode(input, options)
    }
}
