//! Public API: the compressor handle, single and batch compression.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use mediapress_core::CompressionConfig;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::dispatch::{CompressionTask, Dispatcher, DispatcherStats};
use crate::error::CompressorResult;
use crate::media::MediaFile;
use crate::result::{CompressionResult, TaskId};
use crate::settings::CompressorSettings;
use crate::transcoder::{DynTranscoder, ImageTranscoder};
use crate::worker::WorkerContext;

pub(crate) const RELEASED_MESSAGE: &str = "Compressor released before the task completed";

/// Progress of a [`Compressor::compress_many`] batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchProgress {
    pub completed: usize,
    pub total: usize,
}

impl BatchProgress {
    /// Completion in percent (0.0 to 100.0).
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            return 100.0;
        }
        self.completed as f64 * 100.0 / self.total as f64
    }

    pub fn is_complete(&self) -> bool {
        self.completed >= self.total
    }
}

/// Handle to a running compressor: one worker thread plus its dispatch queue.
///
/// Cloning is cheap and every clone talks to the same worker. The worker is
/// stopped by [`close`](Self::close) or when the last clone is dropped.
#[derive(Clone)]
pub struct Compressor {
    inner: Arc<Inner>,
}

struct Inner {
    settings: CompressorSettings,
    dispatcher: Arc<Dispatcher>,
    context: Mutex<Option<WorkerContext>>,
}

impl Compressor {
    /// Start a compressor backed by the image codec.
    pub fn open(settings: CompressorSettings) -> CompressorResult<Self> {
        Self::open_with_transcoder(settings, Arc::new(ImageTranscoder))
    }

    /// Start a compressor with a custom transcoder.
    pub fn open_with_transcoder(
        settings: CompressorSettings,
        transcoder: DynTranscoder,
    ) -> CompressorResult<Self> {
        settings.validate()?;

        let dispatcher = Arc::new(Dispatcher::new(settings.dispatch_mode));
        let (context, requests) = WorkerContext::spawn(
            &settings.worker_thread_name,
            settings.queue_capacity,
            transcoder,
            Arc::clone(&dispatcher),
        )?;
        dispatcher.connect(requests);

        info!(
            mode = ?settings.dispatch_mode,
            timeout_ms = ?settings.task_timeout_ms,
            "Compressor opened"
        );

        Ok(Self {
            inner: Arc::new(Inner {
                settings,
                dispatcher,
                context: Mutex::new(Some(context)),
            }),
        })
    }

    pub fn settings(&self) -> &CompressorSettings {
        &self.inner.settings
    }

    /// Enqueue a file without waiting for it.
    ///
    /// The task is registered and queued before this returns, so submission
    /// order is dispatch order.
    pub fn submit(&self, file: MediaFile, config: &CompressionConfig) -> PendingCompression {
        let dispatcher = &self.inner.dispatcher;
        let id = dispatcher.next_id();
        let (reply, receiver) = oneshot::channel();

        match config.resolve() {
            Ok(options) => {
                let options = options.with_filter(self.inner.settings.resize_filter);
                dispatcher.enqueue(
                    CompressionTask {
                        id,
                        input: file,
                        options,
                    },
                    reply,
                );
            }
            Err(err) => {
                warn!(task = %id, name = %file.name, error = %err, "Rejected compression config");
                let _ = reply.send(CompressionResult::failed(id, err.to_string()));
            }
        }

        PendingCompression {
            id,
            receiver,
            timeout: self.inner.settings.task_timeout(),
            dispatcher: Arc::clone(dispatcher),
        }
    }

    /// Compress one file. Resolves exactly once, always with a result value.
    pub async fn compress(&self, file: MediaFile, config: &CompressionConfig) -> CompressionResult {
        self.submit(file, config).wait().await
    }

    /// Compress several files with the same config.
    ///
    /// All files are queued up front, then awaited one at a time in input
    /// order. `on_progress` is called after each item resolves. A failed item
    /// does not stop the batch; the returned vector is aligned with `files`.
    pub async fn compress_many<F>(
        &self,
        files: Vec<MediaFile>,
        config: &CompressionConfig,
        mut on_progress: F,
    ) -> Vec<CompressionResult>
    where
        F: FnMut(BatchProgress),
    {
        let total = files.len();
        debug!(total, "Starting batch");

        let pending: Vec<PendingCompression> = files
            .into_iter()
            .map(|file| self.submit(file, config))
            .collect();

        let mut results = Vec::with_capacity(total);
        for (index, task) in pending.into_iter().enumerate() {
            results.push(task.wait().await);
            on_progress(BatchProgress {
                completed: index + 1,
                total,
            });
        }

        let failed = results.iter().filter(|r| !r.is_success()).count();
        if failed > 0 {
            warn!(failed, total, "Batch finished with failures");
        } else {
            debug!(total, "Batch finished");
        }
        results
    }

    pub fn stats(&self) -> DispatcherStats {
        self.inner.dispatcher.stats()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.dispatcher.is_closed()
    }

    /// Stop the worker and clear all queued and pending state.
    ///
    /// Callers still awaiting a task resolve with a failure result. Returns
    /// without waiting for the task currently inside the transcoder; the
    /// worker thread exits once that task ends and its result is discarded.
    /// Calling this more than once is harmless.
    pub fn close(&self) {
        let context = self
            .inner
            .context
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(context) = context {
            shutdown(&self.inner.dispatcher, context);
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        let context = self
            .context
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(context) = context {
            shutdown(&self.dispatcher, context);
        }
    }
}

fn shutdown(dispatcher: &Dispatcher, context: WorkerContext) {
    context.begin_shutdown();
    let dropped = dispatcher.close();
    context.detach();
    if dropped > 0 {
        warn!(dropped, "Compressor closed with pending tasks");
    } else {
        info!("Compressor closed");
    }
}

/// A submitted task whose result has not been awaited yet.
#[must_use = "the result is only observed by calling `wait`"]
pub struct PendingCompression {
    id: TaskId,
    receiver: oneshot::Receiver<CompressionResult>,
    timeout: Option<Duration>,
    dispatcher: Arc<Dispatcher>,
}

impl PendingCompression {
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Wait for the worker's result.
    ///
    /// With a task timeout configured this needs a Tokio runtime with the
    /// time driver enabled; the clock starts when `wait` is first polled.
    pub async fn wait(self) -> CompressionResult {
        let Self {
            id,
            mut receiver,
            timeout,
            dispatcher,
        } = self;

        let Some(timeout) = timeout else {
            return receiver
                .await
                .unwrap_or_else(|_| CompressionResult::failed(id, RELEASED_MESSAGE));
        };

        match tokio::time::timeout(timeout, &mut receiver).await {
            Ok(received) => {
                received.unwrap_or_else(|_| CompressionResult::failed(id, RELEASED_MESSAGE))
            }
            Err(_) => {
                if dispatcher.abandon(id) {
                    warn!(task = %id, timeout_ms = timeout.as_millis() as u64, "Task timed out");
                    return CompressionResult::failed(
                        id,
                        format!("Timed out after {} ms", timeout.as_millis()),
                    );
                }
                // The result or a close raced the deadline
                receiver
                    .try_recv()
                    .unwrap_or_else(|_| CompressionResult::failed(id, RELEASED_MESSAGE))
            }
        }
    }
}
