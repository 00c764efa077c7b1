//! Dispatch queue and task correlation table.
//!
//! Callers enqueue tasks from any thread; results come back on the response
//! thread. Both paths mutate the same queue, correlation table and slot, so
//! all of it lives behind one mutex.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{SyncSender, TrySendError};
use std::sync::{Mutex, MutexGuard, PoisonError};

use mediapress_core::TranscodeOptions;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::media::MediaFile;
use crate::result::{CompressionResult, TaskId};
use crate::settings::DispatchMode;

pub(crate) const CLOSED_MESSAGE: &str = "Compressor is closed";
pub(crate) const WORKER_LOST_MESSAGE: &str = "Worker terminated unexpectedly";

/// One compression request. Owned by the queue until it is sent, then by the worker.
#[derive(Debug)]
pub(crate) struct CompressionTask {
    pub id: TaskId,
    pub input: MediaFile,
    pub options: TranscodeOptions,
}

pub(crate) type Reply = oneshot::Sender<CompressionResult>;

/// State of the single dispatch slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Idle,
    /// A send is in progress under the lock.
    Sending,
    /// Held until the result for this task arrives (single-flight only).
    InFlight(TaskId),
    /// The caller gave up on this task but the worker is still running it.
    /// Held until its late result arrives.
    Abandoned(TaskId),
}

/// Snapshot of the dispatcher's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatcherStats {
    /// Tasks waiting in the queue, not yet sent to the worker.
    pub queued: usize,
    /// Tasks sent to the worker whose result has not come back.
    pub in_flight: usize,
    /// Highest `in_flight` value observed.
    pub peak_in_flight: usize,
    /// Callers still waiting on a result.
    pub pending: usize,
    pub completed: u64,
    pub failed: u64,
}

struct DispatchState {
    queue: VecDeque<CompressionTask>,
    pending: HashMap<TaskId, Reply>,
    slot: Slot,
    requests: Option<SyncSender<CompressionTask>>,
    stats: DispatcherStats,
}

pub(crate) struct Dispatcher {
    mode: DispatchMode,
    next_id: AtomicU64,
    state: Mutex<DispatchState>,
}

impl Dispatcher {
    pub(crate) fn new(mode: DispatchMode) -> Self {
        Self {
            mode,
            next_id: AtomicU64::new(1),
            state: Mutex::new(DispatchState {
                queue: VecDeque::new(),
                pending: HashMap::new(),
                slot: Slot::Idle,
                requests: None,
                stats: DispatcherStats::default(),
            }),
        }
    }

    /// Attach the worker's request channel. Until then the dispatcher counts as closed.
    pub(crate) fn connect(&self, requests: SyncSender<CompressionTask>) {
        let mut state = self.lock();
        state.requests = Some(requests);
        self.attempt_dispatch(&mut state);
    }

    pub(crate) fn next_id(&self) -> TaskId {
        TaskId::new(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Register the caller's continuation, append the task and try to send.
    ///
    /// On a closed dispatcher the continuation is resolved with a failure at once.
    pub(crate) fn enqueue(&self, task: CompressionTask, reply: Reply) {
        let mut state = self.lock();
        if state.requests.is_none() {
            state.stats.failed += 1;
            let _ = reply.send(CompressionResult::failed(task.id, CLOSED_MESSAGE));
            return;
        }

        debug!(task = %task.id, queued = state.queue.len(), "Enqueued");
        state.pending.insert(task.id, reply);
        state.queue.push_back(task);
        self.attempt_dispatch(&mut state);
    }

    /// Send queued tasks to the worker while the slot allows it.
    fn attempt_dispatch(&self, state: &mut DispatchState) {
        loop {
            if state.slot != Slot::Idle {
                return;
            }
            let Some(task) = state.queue.pop_front() else {
                return;
            };
            let Some(requests) = state.requests.as_ref() else {
                state.queue.push_front(task);
                return;
            };

            let id = task.id;
            state.slot = Slot::Sending;
            match requests.try_send(task) {
                Ok(()) => {
                    state.stats.in_flight += 1;
                    state.stats.peak_in_flight =
                        state.stats.peak_in_flight.max(state.stats.in_flight);
                    debug!(
                        task = %id,
                        in_flight = state.stats.in_flight,
                        "Dispatched to worker"
                    );
                    match self.mode {
                        DispatchMode::SingleFlight => {
                            state.slot = Slot::InFlight(id);
                            return;
                        }
                        DispatchMode::Eager => state.slot = Slot::Idle,
                    }
                }
                Err(TrySendError::Full(task)) => {
                    // Retried when the next result frees channel capacity
                    state.queue.push_front(task);
                    state.slot = Slot::Idle;
                    return;
                }
                Err(TrySendError::Disconnected(task)) => {
                    state.queue.push_front(task);
                    state.slot = Slot::Idle;
                    self.fail_all(state, WORKER_LOST_MESSAGE);
                    return;
                }
            }
        }
    }

    /// Correlate a worker result with its caller and move on to the next task.
    pub(crate) fn on_result(&self, result: CompressionResult) {
        let mut state = self.lock();
        let id = result.id;
        state.stats.in_flight = state.stats.in_flight.saturating_sub(1);
        if matches!(state.slot, Slot::InFlight(held) | Slot::Abandoned(held) if held == id) {
            state.slot = Slot::Idle;
        }

        match state.pending.remove(&id) {
            Some(reply) => {
                if result.is_success() {
                    state.stats.completed += 1;
                } else {
                    state.stats.failed += 1;
                }
                if reply.send(result).is_err() {
                    debug!(task = %id, "Caller stopped waiting before the result arrived");
                }
            }
            None => warn!(task = %id, "Dropping result for unknown task"),
        }

        self.attempt_dispatch(&mut state);
    }

    /// Forget a task whose caller gave up waiting (timeout).
    ///
    /// Returns `true` if the task was still outstanding. A queued task is
    /// removed from the queue. A task the worker is already running keeps the
    /// slot until its late result arrives, which is then dropped as unknown.
    pub(crate) fn abandon(&self, id: TaskId) -> bool {
        let mut state = self.lock();
        if state.pending.remove(&id).is_none() {
            return false;
        }
        state.stats.failed += 1;
        state.queue.retain(|task| task.id != id);
        if state.slot == Slot::InFlight(id) {
            debug!(task = %id, "Abandoned task still running, slot held");
            state.slot = Slot::Abandoned(id);
        }
        true
    }

    /// Called by the response thread once the worker side is gone.
    pub(crate) fn on_worker_exit(&self) {
        let mut state = self.lock();
        if state.requests.is_none() {
            debug!("Response thread finished after close");
            return;
        }
        state.requests = None;
        self.fail_all(&mut state, WORKER_LOST_MESSAGE);
    }

    /// Disconnect from the worker and drop every queued task and continuation.
    ///
    /// Dropped continuations make their awaiting callers resolve with a
    /// failure rather than hang.
    pub(crate) fn close(&self) -> usize {
        let mut state = self.lock();
        state.requests = None;
        state.queue.clear();
        state.slot = Slot::Idle;
        state.stats.in_flight = 0;
        let dropped = state.pending.len();
        state.pending.clear();
        dropped
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.lock().requests.is_none()
    }

    pub(crate) fn stats(&self) -> DispatcherStats {
        let state = self.lock();
        DispatcherStats {
            queued: state.queue.len(),
            pending: state.pending.len(),
            ..state.stats
        }
    }

    fn fail_all(&self, state: &mut DispatchState, message: &str) {
        let count = state.pending.len();
        if count > 0 {
            warn!(count, reason = message, "Failing all pending tasks");
        }
        state.queue.clear();
        state.slot = Slot::Idle;
        state.stats.in_flight = 0;
        for (id, reply) in state.pending.drain() {
            state.stats.failed += 1;
            let _ = reply.send(CompressionResult::failed(id, message));
        }
    }

    fn lock(&self) -> MutexGuard<'_, DispatchState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::CompressionStats;
    use std::sync::mpsc;

    fn task(dispatcher: &Dispatcher) -> CompressionTask {
        CompressionTask {
            id: dispatcher.next_id(),
            input: MediaFile::new("a.png", "image/png", vec![1, 2, 3]),
            options: TranscodeOptions::default(),
        }
    }

    fn ok_result(id: TaskId) -> CompressionResult {
        CompressionResult::compressed(
            id,
            MediaFile::new("a.webp", "image/webp", vec![1]),
            CompressionStats::new(3, 1, 0.0),
        )
    }

    #[test]
    fn test_ids_are_unique_and_increasing() {
        let dispatcher = Dispatcher::new(DispatchMode::SingleFlight);
        let a = dispatcher.next_id();
        let b = dispatcher.next_id();
        assert!(b > a);
    }

    #[test]
    fn test_single_flight_holds_slot_until_result() {
        let dispatcher = Dispatcher::new(DispatchMode::SingleFlight);
        let (tx, rx) = mpsc::sync_channel(8);
        dispatcher.connect(tx);

        let (reply_a, mut rx_a) = oneshot::channel();
        let (reply_b, _rx_b) = oneshot::channel();
        let first = task(&dispatcher);
        let first_id = first.id;
        dispatcher.enqueue(first, reply_a);
        dispatcher.enqueue(task(&dispatcher), reply_b);

        // Only the first task reached the worker
        let sent = rx.try_recv().unwrap();
        assert_eq!(sent.id, first_id);
        assert!(rx.try_recv().is_err());
        let stats = dispatcher.stats();
        assert_eq!((stats.queued, stats.in_flight, stats.pending), (1, 1, 2));

        dispatcher.on_result(ok_result(first_id));
        assert!(rx_a.try_recv().unwrap().is_success());

        // The result freed the slot and the second task went out
        assert!(rx.try_recv().is_ok());
        assert_eq!(dispatcher.stats().peak_in_flight, 1);
    }

    #[test]
    fn test_eager_sends_everything_immediately() {
        let dispatcher = Dispatcher::new(DispatchMode::Eager);
        let (tx, rx) = mpsc::sync_channel(8);
        dispatcher.connect(tx);

        let mut receivers = Vec::new();
        for _ in 0..3 {
            let (reply, rx_reply) = oneshot::channel();
            dispatcher.enqueue(task(&dispatcher), reply);
            receivers.push(rx_reply);
        }

        assert_eq!(rx.try_iter().count(), 3);
        let stats = dispatcher.stats();
        assert_eq!((stats.queued, stats.in_flight, stats.peak_in_flight), (0, 3, 3));
    }

    #[test]
    fn test_eager_respects_channel_capacity() {
        let dispatcher = Dispatcher::new(DispatchMode::Eager);
        let (tx, rx) = mpsc::sync_channel(1);
        dispatcher.connect(tx);

        let mut ids = Vec::new();
        let mut receivers = Vec::new();
        for _ in 0..3 {
            let (reply, rx_reply) = oneshot::channel();
            let t = task(&dispatcher);
            ids.push(t.id);
            dispatcher.enqueue(t, reply);
            receivers.push(rx_reply);
        }
        assert_eq!(dispatcher.stats().queued, 2);

        // Worker takes the first task and answers; the next one is pushed
        let first = rx.recv().unwrap();
        dispatcher.on_result(ok_result(first.id));
        assert_eq!(rx.recv().unwrap().id, ids[1]);
        assert_eq!(dispatcher.stats().queued, 1);
    }

    #[test]
    fn test_enqueue_before_connect_fails() {
        let dispatcher = Dispatcher::new(DispatchMode::SingleFlight);
        let (reply, mut rx_reply) = oneshot::channel();
        dispatcher.enqueue(task(&dispatcher), reply);
        assert_eq!(rx_reply.try_recv().unwrap().error(), Some(CLOSED_MESSAGE));
        assert!(dispatcher.is_closed());
    }

    #[test]
    fn test_unknown_result_is_dropped() {
        let dispatcher = Dispatcher::new(DispatchMode::SingleFlight);
        let (tx, _rx) = mpsc::sync_channel(1);
        dispatcher.connect(tx);
        dispatcher.on_result(ok_result(TaskId::new(999)));
        assert_eq!(dispatcher.stats().completed, 0);
    }

    #[test]
    fn test_abandon_keeps_slot_until_late_result() {
        let dispatcher = Dispatcher::new(DispatchMode::SingleFlight);
        let (tx, rx) = mpsc::sync_channel(4);
        dispatcher.connect(tx);

        let (reply_a, _rx_a) = oneshot::channel();
        let (reply_b, _rx_b) = oneshot::channel();
        let (reply_c, _rx_c) = oneshot::channel();
        let a = task(&dispatcher);
        let b = task(&dispatcher);
        let c = task(&dispatcher);
        let (a_id, b_id, c_id) = (a.id, b.id, c.id);
        dispatcher.enqueue(a, reply_a);
        dispatcher.enqueue(b, reply_b);
        dispatcher.enqueue(c, reply_c);

        // b never left the queue; abandoning it removes it
        assert!(dispatcher.abandon(b_id));
        assert_eq!(dispatcher.stats().queued, 1);

        // a is still running in the worker; c must wait for it
        assert!(dispatcher.abandon(a_id));
        let sent: Vec<_> = rx.try_iter().map(|t| t.id).collect();
        assert_eq!(sent, vec![a_id]);
        assert_eq!(dispatcher.stats().queued, 1);

        // The late result for a frees the slot and c goes out
        dispatcher.on_result(ok_result(a_id));
        assert_eq!(rx.try_recv().unwrap().id, c_id);
        assert!(!dispatcher.abandon(a_id));

        let stats = dispatcher.stats();
        assert_eq!(stats.pending, 1);
        assert_eq!(stats.peak_in_flight, 1);
        assert_eq!(stats.completed, 0);
    }

    #[test]
    fn test_eager_abandon_does_not_block_dispatch() {
        let dispatcher = Dispatcher::new(DispatchMode::Eager);
        let (tx, rx) = mpsc::sync_channel(4);
        dispatcher.connect(tx);

        let (reply_a, _rx_a) = oneshot::channel();
        let a = task(&dispatcher);
        let a_id = a.id;
        dispatcher.enqueue(a, reply_a);
        assert!(dispatcher.abandon(a_id));

        let (reply_b, _rx_b) = oneshot::channel();
        dispatcher.enqueue(task(&dispatcher), reply_b);
        assert_eq!(rx.try_iter().count(), 2);
    }

    #[test]
    fn test_close_drops_pending_continuations() {
        let dispatcher = Dispatcher::new(DispatchMode::SingleFlight);
        let (tx, _rx) = mpsc::sync_channel(4);
        dispatcher.connect(tx);

        let (reply, mut rx_reply) = oneshot::channel();
        dispatcher.enqueue(task(&dispatcher), reply);
        assert_eq!(dispatcher.stats().in_flight, 1);
        assert_eq!(dispatcher.close(), 1);
        assert!(dispatcher.is_closed());
        assert_eq!(dispatcher.stats().in_flight, 0);
        assert!(matches!(
            rx_reply.try_recv(),
            Err(oneshot::error::TryRecvError::Closed)
        ));
    }

    #[test]
    fn test_worker_exit_fails_pending() {
        let dispatcher = Dispatcher::new(DispatchMode::Eager);
        let (tx, _rx) = mpsc::sync_channel(4);
        dispatcher.connect(tx);

        let (reply, mut rx_reply) = oneshot::channel();
        dispatcher.enqueue(task(&dispatcher), reply);
        dispatcher.on_worker_exit();

        let result = rx_reply.try_recv().unwrap();
        assert_eq!(result.error(), Some(WORKER_LOST_MESSAGE));
        let stats = dispatcher.stats();
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.in_flight, 0);
    }

    #[test]
    fn test_disconnected_channel_fails_pending() {
        let dispatcher = Dispatcher::new(DispatchMode::SingleFlight);
        let (tx, rx) = mpsc::sync_channel(4);
        dispatcher.connect(tx);
        drop(rx);

        let (reply, mut rx_reply) = oneshot::channel();
        dispatcher.enqueue(task(&dispatcher), reply);
        assert_eq!(rx_reply.try_recv().unwrap().error(), Some(WORKER_LOST_MESSAGE));
        assert_eq!(dispatcher.stats().queued, 0);
    }
}
