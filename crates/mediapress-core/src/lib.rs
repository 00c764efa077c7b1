//! Mediapress Core - Image transcoding library
//!
//! This crate provides the pure, synchronous half of Mediapress: the
//! decode → resize → re-encode step that turns an uploaded image into a
//! smaller web-friendly file. It has no threads and no shared state, so it
//! can be hosted by any execution context (see `mediapress-worker`).

pub mod decode;
pub mod encode;
pub mod transcode;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use decode::FilterType;
pub use transcode::{transcode, TranscodeError, TranscodeOutput};

/// Default maximum output width in pixels.
pub const DEFAULT_MAX_WIDTH: u32 = 1920;
/// Default maximum output height in pixels.
pub const DEFAULT_MAX_HEIGHT: u32 = 1080;
/// Default encoder quality (0.0 to 1.0).
pub const DEFAULT_QUALITY: f32 = 0.8;

/// Output formats the encoder can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Baseline JPEG (lossy, no alpha).
    #[serde(alias = "jpg")]
    Jpeg,
    /// PNG (lossless, quality is ignored).
    Png,
    /// Lossy WebP.
    #[default]
    Webp,
}

impl OutputFormat {
    /// MIME type of files in this format.
    pub fn mime_type(self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "image/jpeg",
            OutputFormat::Png => "image/png",
            OutputFormat::Webp => "image/webp",
        }
    }

    /// Canonical file extension, without the leading dot.
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "jpg",
            OutputFormat::Png => "png",
            OutputFormat::Webp => "webp",
        }
    }

    /// Whether the quality setting affects the encoded output.
    pub fn is_lossy(self) -> bool {
        !matches!(self, OutputFormat::Png)
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for OutputFormat {
    type Err = ConfigError;

    /// Accepts extensions ("jpg", "webp") and MIME types ("image/png").
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        let name = normalized.strip_prefix("image/").unwrap_or(&normalized);
        match name {
            "jpeg" | "jpg" => Ok(OutputFormat::Jpeg),
            "png" => Ok(OutputFormat::Png),
            "webp" => Ok(OutputFormat::Webp),
            _ => Err(ConfigError::UnknownFormat(s.to_string())),
        }
    }
}

/// Errors raised while resolving a [`CompressionConfig`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// A bounding dimension was set to zero.
    #[error("Invalid bound: {name} must be greater than zero")]
    ZeroBound { name: &'static str },

    /// Quality is not a finite number in 0.0..=1.0.
    #[error("Invalid quality {0}: must be between 0.0 and 1.0")]
    Quality(f32),

    /// The requested output format is not one of the supported ones.
    #[error("Unknown output format: {0}")]
    UnknownFormat(String),
}

/// Caller-facing compression settings.
///
/// Every field is optional; absent fields fall back to the crate defaults
/// (1920x1080, quality 0.8, WebP).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompressionConfig {
    pub max_width: Option<u32>,
    pub max_height: Option<u32>,
    /// Encoder quality (0.0 to 1.0)
    pub quality: Option<f32>,
    pub output_format: Option<OutputFormat>,
}

impl CompressionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_size(mut self, max_width: u32, max_height: u32) -> Self {
        self.max_width = Some(max_width);
        self.max_height = Some(max_height);
        self
    }

    pub fn with_quality(mut self, quality: f32) -> Self {
        self.quality = Some(quality);
        self
    }

    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.output_format = Some(format);
        self
    }

    /// Fill in defaults and validate, producing options for [`transcode`].
    pub fn resolve(&self) -> Result<TranscodeOptions, ConfigError> {
        let max_width = self.max_width.unwrap_or(DEFAULT_MAX_WIDTH);
        if max_width == 0 {
            return Err(ConfigError::ZeroBound { name: "maxWidth" });
        }
        let max_height = self.max_height.unwrap_or(DEFAULT_MAX_HEIGHT);
        if max_height == 0 {
            return Err(ConfigError::ZeroBound { name: "maxHeight" });
        }
        let quality = self.quality.unwrap_or(DEFAULT_QUALITY);
        if !quality.is_finite() || !(0.0..=1.0).contains(&quality) {
            return Err(ConfigError::Quality(quality));
        }

        Ok(TranscodeOptions {
            max_width,
            max_height,
            quality,
            format: self.output_format.unwrap_or_default(),
            filter: FilterType::default(),
        })
    }
}

/// Fully resolved settings for a single transcode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TranscodeOptions {
    pub max_width: u32,
    pub max_height: u32,
    /// Encoder quality (0.0 to 1.0)
    pub quality: f32,
    pub format: OutputFormat,
    pub filter: FilterType,
}

impl TranscodeOptions {
    pub fn with_filter(mut self, filter: FilterType) -> Self {
        self.filter = filter;
        self
    }

    /// Quality on the 1-100 scale used by the JPEG encoder.
    pub fn jpeg_quality(&self) -> u8 {
        (self.quality * 100.0).round().clamp(1.0, 100.0) as u8
    }

    /// Quality on the 0-100 scale used by libwebp.
    pub fn webp_quality(&self) -> f32 {
        (self.quality * 100.0).clamp(0.0, 100.0)
    }
}

impl Default for TranscodeOptions {
    fn default() -> Self {
        Self {
            max_width: DEFAULT_MAX_WIDTH,
            max_height: DEFAULT_MAX_HEIGHT,
            quality: DEFAULT_QUALITY,
            format: OutputFormat::default(),
            filter: FilterType::default(),
        }
    }
}
