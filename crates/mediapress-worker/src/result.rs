//! Per-task results delivered to callers.

use std::fmt;

use crate::media::MediaFile;

/// Opaque correlation id of a compression task.
///
/// Ids come from a per-compressor counter and are never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

impl TaskId {
    pub(crate) fn new(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task-{}", self.0)
    }
}

/// Size and timing figures for a successful compression.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompressionStats {
    pub original_size: u64,
    pub compressed_size: u64,
    /// Percentage saved; negative when the output grew.
    pub compression_ratio_percent: f64,
    /// Time spent in the worker, from receiving the request to encoding.
    pub processing_time_ms: f64,
    pub width: u32,
    pub height: u32,
}

impl CompressionStats {
    pub fn new(original_size: u64, compressed_size: u64, processing_time_ms: f64) -> Self {
        Self {
            original_size,
            compressed_size,
            compression_ratio_percent: compression_ratio(original_size, compressed_size),
            processing_time_ms,
            width: 0,
            height: 0,
        }
    }

    pub fn with_dimensions(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn saved_bytes(&self) -> i64 {
        self.original_size as i64 - self.compressed_size as i64
    }
}

/// `(original - compressed) / original * 100`, or 0 for an empty original.
pub fn compression_ratio(original_size: u64, compressed_size: u64) -> f64 {
    if original_size == 0 {
        return 0.0;
    }
    (original_size as f64 - compressed_size as f64) / original_size as f64 * 100.0
}

#[derive(Debug, Clone)]
pub enum CompressionOutcome {
    Compressed {
        file: MediaFile,
        stats: CompressionStats,
    },
    /// No partial output is ever kept.
    Failed { error: String },
}

/// The reply for one task. Every `compress` call resolves to exactly one of these.
#[derive(Debug, Clone)]
pub struct CompressionResult {
    pub id: TaskId,
    pub outcome: CompressionOutcome,
}

impl CompressionResult {
    pub fn compressed(id: TaskId, file: MediaFile, stats: CompressionStats) -> Self {
        Self {
            id,
            outcome: CompressionOutcome::Compressed { file, stats },
        }
    }

    pub fn failed(id: TaskId, error: impl Into<String>) -> Self {
        let mut error = error.into();
        if error.is_empty() {
            error.push_str("Unknown compression error");
        }
        Self {
            id,
            outcome: CompressionOutcome::Failed { error },
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, CompressionOutcome::Compressed { .. })
    }

    pub fn file(&self) -> Option<&MediaFile> {
        match &self.outcome {
            CompressionOutcome::Compressed { file, .. } => Some(file),
            CompressionOutcome::Failed { .. } => None,
        }
    }

    pub fn stats(&self) -> Option<&CompressionStats> {
        match &self.outcome {
            CompressionOutcome::Compressed { stats, .. } => Some(stats),
            CompressionOutcome::Failed { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            CompressionOutcome::Compressed { .. } => None,
            CompressionOutcome::Failed { error } => Some(error),
        }
    }

    pub fn into_file(self) -> Option<MediaFile> {
        match self.outcome {
            CompressionOutcome::Compressed { file, .. } => Some(file),
            CompressionOutcome::Failed { .. } => None,
        }
    }
}
