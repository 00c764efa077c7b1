//! Compressor settings.

use std::time::Duration;

use mediapress_core::FilterType;
use serde::{Deserialize, Serialize};

use crate::error::{CompressorError, CompressorResult};

const DEFAULT_QUEUE_CAPACITY: usize = 16;
const DEFAULT_THREAD_NAME: &str = "mediapress-worker";

/// How the dispatch queue gates sends to the worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DispatchMode {
    /// Hold the slot from send until the matching result arrives, so at most
    /// one task is ever handed to the worker.
    #[default]
    SingleFlight,
    /// Release the slot right after each send. Every queued task is pushed
    /// to the worker immediately and only the worker's sequential loop and
    /// the bounded request channel limit outstanding work.
    Eager,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompressorSettings {
    /// Capacity of the bounded request channel to the worker.
    pub queue_capacity: usize,
    pub dispatch_mode: DispatchMode,
    /// Per-task deadline, measured from when the caller starts awaiting the
    /// result. `None` waits forever.
    pub task_timeout_ms: Option<u64>,
    pub resize_filter: FilterType,
    pub worker_thread_name: String,
}

impl Default for CompressorSettings {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            dispatch_mode: DispatchMode::default(),
            task_timeout_ms: None,
            resize_filter: FilterType::default(),
            worker_thread_name: DEFAULT_THREAD_NAME.to_string(),
        }
    }
}

impl CompressorSettings {
    /// Parse and validate settings from JSON. Missing keys take defaults.
    pub fn from_json_str(json: &str) -> CompressorResult<Self> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> CompressorResult<()> {
        if self.queue_capacity == 0 {
            return Err(CompressorError::settings("queueCapacity must be at least 1"));
        }
        if self.task_timeout_ms == Some(0) {
            return Err(CompressorError::settings("taskTimeoutMs must be greater than zero"));
        }
        if self.worker_thread_name.trim().is_empty() {
            return Err(CompressorError::settings("workerThreadName must not be empty"));
        }
        Ok(())
    }

    pub fn task_timeout(&self) -> Option<Duration> {
        self.task_timeout_ms.map(Duration::from_millis)
    }

    pub fn with_dispatch_mode(mut self, mode: DispatchMode) -> Self {
        self.dispatch_mode = mode;
        self
    }

    pub fn with_task_timeout(mut self, timeout: Duration) -> Self {
        self.task_timeout_ms = Some(timeout.as_millis() as u64);
        self
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }
}
