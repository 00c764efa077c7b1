//! Binary payloads exchanged with callers.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use mediapress_core::OutputFormat;

/// An uploaded file: bytes plus the metadata the browser-side `File` carries.
///
/// Once handed to [`Compressor::compress`](crate::Compressor::compress) the
/// value is moved into the task, so the caller can no longer touch the buffer.
#[derive(Clone, PartialEq, Eq)]
pub struct MediaFile {
    pub name: String,
    pub mime_type: String,
    /// Milliseconds since the Unix epoch.
    pub last_modified_ms: u64,
    bytes: Vec<u8>,
}

impl MediaFile {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            last_modified_ms: now_ms(),
            bytes,
        }
    }

    pub fn with_last_modified(mut self, last_modified_ms: u64) -> Self {
        self.last_modified_ms = last_modified_ms;
        self
    }

    /// Size of the payload in bytes.
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Build the compressed counterpart of `self`: same stem, new extension
    /// and MIME type.
    pub(crate) fn derive_output(&self, format: OutputFormat, bytes: Vec<u8>) -> MediaFile {
        MediaFile {
            name: derived_name(&self.name, format),
            mime_type: format.mime_type().to_string(),
            last_modified_ms: now_ms(),
            bytes,
        }
    }
}

impl fmt::Debug for MediaFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaFile")
            .field("name", &self.name)
            .field("mime_type", &self.mime_type)
            .field("last_modified_ms", &self.last_modified_ms)
            .field("size", &self.bytes.len())
            .finish()
    }
}

fn derived_name(original: &str, format: OutputFormat) -> String {
    let stem = match original.rfind('.') {
        Some(0) | None => original,
        Some(dot) => &original[..dot],
    };
    let stem = if stem.is_empty() { "image" } else { stem };
    format!("{stem}.{}", format.extension())
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
