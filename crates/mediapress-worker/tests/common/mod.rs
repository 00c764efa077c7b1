//! Fixtures and fake transcoders shared by the integration tests.

#![allow(dead_code)]

use std::future::Future;
use std::io::Cursor;
use std::thread;
use std::time::Duration;

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use mediapress_core::decode::DecodeError;
use mediapress_worker::{
    MediaFile, OutputFormat, TranscodeError, TranscodeOptions, TranscodeOutput, Transcoder,
};

/// Upper bound for any single test scenario.
pub const TEST_TIMEOUT: Duration = Duration::from_secs(120);

pub async fn within_timeout<F: Future>(future: F) -> F::Output {
    tokio::time::timeout(TEST_TIMEOUT, future)
        .await
        .expect("scenario did not finish in time")
}

/// An opaque photo-like image: smooth gradients plus fine texture.
pub fn photo(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        Rgb([
            (x * 255 / width) as u8,
            (y * 255 / height) as u8,
            (((x / 7) ^ (y / 5)) & 0xFF) as u8,
        ])
    }))
}

pub fn encode(img: &DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut buffer = Cursor::new(Vec::new());
    img.write_to(&mut buffer, format).unwrap();
    buffer.into_inner()
}

pub fn jpeg_file(name: &str, width: u32, height: u32) -> MediaFile {
    MediaFile::new(name, "image/jpeg", encode(&photo(width, height), ImageFormat::Jpeg))
}

pub fn png_file(name: &str, width: u32, height: u32) -> MediaFile {
    MediaFile::new(name, "image/png", encode(&photo(width, height), ImageFormat::Png))
}

pub fn broken_file(name: &str) -> MediaFile {
    MediaFile::new(name, "image/jpeg", b"this is not an image".to_vec())
}

pub fn dimensions(file: &MediaFile) -> (u32, u32) {
    let img = image::load_from_memory(file.bytes()).unwrap();
    (img.width(), img.height())
}

/// Fake codec driven by the first input byte:
/// - empty input fails to decode
/// - `0xFF` panics
/// - any other value `n` sleeps `n * step` and then succeeds
pub struct ScriptedTranscoder {
    pub step: Duration,
}

impl ScriptedTranscoder {
    pub fn new(step: Duration) -> Self {
        Self { step }
    }
}

impl Transcoder for ScriptedTranscoder {
    fn transcode(
        &self,
        input: &[u8],
        options: &TranscodeOptions,
    ) -> Result<TranscodeOutput, TranscodeError> {
        let first = *input.first().ok_or(DecodeError::Empty)?;
        if first == 0xFF {
            panic!("scripted panic");
        }
        thread::sleep(self.step * first as u32);
        Ok(TranscodeOutput {
            bytes: input.to_vec(),
            format: options.format,
            width: 1,
            height: 1,
            source_width: 1,
            source_height: 1,
        })
    }
}

pub fn scripted_file(name: &str, first_byte: u8) -> MediaFile {
    MediaFile::new(name, "image/png", vec![first_byte, 1, 2, 3])
}

pub fn assert_webp(file: &MediaFile) {
    assert_eq!(file.mime_type, OutputFormat::Webp.mime_type());
    assert_eq!(&file.bytes()[0..4], b"RIFF");
    assert_eq!(&file.bytes()[8..12], b"WEBP");
}
