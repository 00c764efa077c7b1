//! Lifecycle errors.
//!
//! Per-item failures never use these: they are reported as
//! [`CompressionResult`](crate::CompressionResult) values.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CompressorError {
    /// Settings failed validation
    #[error("Invalid settings: {0}")]
    Settings(String),

    /// Settings JSON could not be parsed
    #[error("Invalid settings JSON: {0}")]
    SettingsJson(#[from] serde_json::Error),

    /// The worker or response thread could not be started
    #[error("Failed to spawn {thread} thread: {source}")]
    Spawn {
        thread: String,
        #[source]
        source: std::io::Error,
    },
}

impl CompressorError {
    pub fn settings<T: Into<String>>(msg: T) -> Self {
        Self::Settings(msg.into())
    }
}

pub type CompressorResult<T> = Result<T, CompressorError>;
