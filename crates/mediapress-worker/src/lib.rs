//! Mediapress Worker - background image compression dispatcher
//!
//! This crate hosts the `mediapress-core` transcode step on a dedicated
//! worker thread and exposes an async API that never blocks the caller.
//!
//! # Module Structure
//!
//! - `compressor` - Public API: [`Compressor`], single and batch compression
//! - `shared` - [`SharedCompressor`], the lazily started application-wide instance
//! - `dispatch` - Dispatch queue, correlation table and single-flight slot
//! - `worker` - The worker thread and its request/response channels
//! - `transcoder` - The [`Transcoder`] seam between worker and codec
//! - `settings` - [`CompressorSettings`] and [`DispatchMode`]
//!
//! # Usage
//!
//! ```ignore
//! use mediapress_worker::{CompressionConfig, Compressor, CompressorSettings, MediaFile};
//!
//! let compressor = Compressor::open(CompressorSettings::default())?;
//! let file = MediaFile::new("photo.jpg", "image/jpeg", bytes);
//! let result = compressor.compress(file, &CompressionConfig::new()).await;
//! if let Some(stats) = result.stats() {
//!     println!("saved {:.1}%", stats.compression_ratio_percent);
//! }
//! compressor.close();
//! ```

mod compressor;
mod dispatch;
mod error;
mod media;
mod result;
mod settings;
mod shared;
mod transcoder;
mod worker;

pub use compressor::{BatchProgress, Compressor, PendingCompression};
pub use dispatch::DispatcherStats;
pub use error::{CompressorError, CompressorResult};
pub use media::MediaFile;
pub use result::{compression_ratio, CompressionOutcome, CompressionResult, CompressionStats, TaskId};
pub use settings::{CompressorSettings, DispatchMode};
pub use shared::SharedCompressor;
pub use transcoder::{DynTranscoder, ImageTranscoder, Transcoder};

pub use mediapress_core::{
    CompressionConfig, FilterType, OutputFormat, TranscodeError, TranscodeOptions, TranscodeOutput,
};
