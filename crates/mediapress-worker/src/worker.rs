//! The worker execution context.
//!
//! One dedicated thread owns the transcoder and reads tasks from a bounded
//! request channel, one at a time, in arrival order. Results go out on a
//! response channel that a second, lightweight thread drains back into the
//! [`Dispatcher`]. Nothing but messages crosses between caller and worker.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender, SyncSender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use tracing::{debug, error, info, warn};

use crate::dispatch::{CompressionTask, Dispatcher};
use crate::error::{CompressorError, CompressorResult};
use crate::result::{CompressionResult, CompressionStats};
use crate::transcoder::{DynTranscoder, Transcoder};

/// Handles to the worker and response threads.
pub(crate) struct WorkerContext {
    worker: JoinHandle<()>,
    replies: JoinHandle<()>,
    stopping: Arc<AtomicBool>,
}

impl WorkerContext {
    /// Start both threads and return the sending half of the request channel.
    pub(crate) fn spawn(
        thread_name: &str,
        capacity: usize,
        transcoder: DynTranscoder,
        dispatcher: Arc<Dispatcher>,
    ) -> CompressorResult<(Self, SyncSender<CompressionTask>)> {
        let (request_tx, request_rx) = mpsc::sync_channel::<CompressionTask>(capacity);
        let (response_tx, response_rx) = mpsc::channel::<CompressionResult>();
        let stopping = Arc::new(AtomicBool::new(false));

        let worker = {
            let stopping = Arc::clone(&stopping);
            thread::Builder::new()
                .name(thread_name.to_string())
                .spawn(move || run_worker(request_rx, response_tx, transcoder, stopping))
                .map_err(|source| CompressorError::Spawn {
                    thread: thread_name.to_string(),
                    source,
                })?
        };

        let replies_name = format!("{thread_name}-replies");
        let replies = thread::Builder::new()
            .name(replies_name.clone())
            .spawn(move || run_replies(response_rx, dispatcher))
            .map_err(|source| CompressorError::Spawn {
                thread: replies_name,
                source,
            })?;

        info!(thread = thread_name, capacity, "Worker context started");

        Ok((
            Self {
                worker,
                replies,
                stopping,
            },
            request_tx,
        ))
    }

    /// Ask the worker to skip anything still buffered in the request channel.
    ///
    /// Must be called before the request sender is dropped.
    pub(crate) fn begin_shutdown(&self) {
        self.stopping.store(true, Ordering::SeqCst);
    }

    /// Let go of both threads without waiting on a running transcode.
    ///
    /// The request sender must already be gone. Threads that have finished
    /// are joined; a worker still busy exits on its own once its current
    /// task returns, and the response thread follows it.
    pub(crate) fn detach(self) {
        for handle in [self.worker, self.replies] {
            let name = handle.thread().name().unwrap_or("unnamed").to_string();
            if !handle.is_finished() {
                debug!(thread = %name, "Thread still busy, leaving it to exit on its own");
                continue;
            }
            if handle.join().is_err() {
                warn!(thread = %name, "Worker context thread panicked during shutdown");
            }
        }
    }
}

fn run_worker(
    requests: Receiver<CompressionTask>,
    responses: Sender<CompressionResult>,
    transcoder: DynTranscoder,
    stopping: Arc<AtomicBool>,
) {
    let mut processed = 0usize;
    while let Ok(task) = requests.recv() {
        if stopping.load(Ordering::SeqCst) {
            debug!(task = %task.id, "Dropping task received during shutdown");
            continue;
        }

        let result = process_task(transcoder.as_ref(), task);
        processed += 1;
        if responses.send(result).is_err() {
            warn!("Response channel closed, worker exiting");
            break;
        }
    }
    debug!(processed, "Worker loop finished");
}

fn run_replies(responses: Receiver<CompressionResult>, dispatcher: Arc<Dispatcher>) {
    while let Ok(result) = responses.recv() {
        dispatcher.on_result(result);
    }
    dispatcher.on_worker_exit();
}

/// Run one task through the transcoder, turning every failure (including a
/// panic) into a failed result.
pub(crate) fn process_task(transcoder: &dyn Transcoder, task: CompressionTask) -> CompressionResult {
    let started = Instant::now();
    let CompressionTask { id, input, options } = task;
    debug!(task = %id, name = %input.name, size = input.size(), "Transcoding");

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        transcoder.transcode(input.bytes(), &options)
    }));
    let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;

    match outcome {
        Ok(Ok(output)) => {
            let stats = CompressionStats::new(input.size(), output.bytes.len() as u64, elapsed_ms)
                .with_dimensions(output.width, output.height);
            debug!(
                task = %id,
                original = stats.original_size,
                compressed = stats.compressed_size,
                ratio = stats.compression_ratio_percent,
                elapsed_ms,
                "Transcode finished"
            );
            let file = input.derive_output(output.format, output.bytes);
            CompressionResult::compressed(id, file, stats)
        }
        Ok(Err(err)) => {
            warn!(task = %id, name = %input.name, error = %err, "Transcode failed");
            CompressionResult::failed(id, err.to_string())
        }
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            error!(task = %id, name = %input.name, panic = %message, "Transcoder panicked");
            CompressionResult::failed(id, format!("Transcoder panicked: {message}"))
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
