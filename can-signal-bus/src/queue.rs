//! Inter-stage queues
//!
//! [`BusQueue`] is the only shared mutable state between two pipeline stages:
//! a FIFO guarded by one mutex and one condition variable. Producers never
//! block; consumers suspend in [`BusQueue::pop_blocking`] until an item
//! arrives or the queue is closed. There is no capacity ceiling - instead,
//! every push that lands at or past the watermark emits a backpressure
//! warning to the log. The warning is diagnostic only; nothing is ever
//! dropped.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Condvar, Mutex};

/// Watermark for per-instance inbound frame queues
pub const FRAME_QUEUE_WATERMARK: usize = 10;
/// Watermark for the shared decoded-signal queue
pub const SIGNAL_QUEUE_WATERMARK: usize = 80;
/// Watermark for per-instance processed-write frame queues
pub const WRITE_FRAME_QUEUE_WATERMARK: usize = 80;

struct QueueState<T> {
    items: VecDeque<T>,
    closed: bool,
}

/// A thread-safe FIFO with a blocking consumer side and a backpressure
/// watermark.
///
/// Multiple producers and multiple consumers may share one queue; the mutex
/// serializes both push and pop.
pub struct BusQueue<T> {
    state: Mutex<QueueState<T>>,
    not_empty: Condvar,
    watermark: usize,
    label: String,
    backpressure_events: AtomicU64,
}

impl<T> BusQueue<T> {
    /// Create a queue with a diagnostic label and a backpressure watermark.
    pub fn new(label: impl Into<String>, watermark: usize) -> Self {
        Self {
            state: Mutex::new(QueueState {
                items: VecDeque::new(),
                closed: false,
            }),
            not_empty: Condvar::new(),
            watermark,
            label: label.into(),
            backpressure_events: AtomicU64::new(0),
        }
    }

    /// Append an item and wake one blocked consumer. Never blocks.
    ///
    /// Items pushed after [`BusQueue::close`] are silently discarded; the
    /// pipeline is shutting down and nothing will consume them.
    pub fn push(&self, item: T) {
        let depth = {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            if state.closed {
                return;
            }
            state.items.push_back(item);
            state.items.len()
        };
        if depth >= self.watermark {
            self.backpressure_events.fetch_add(1, Ordering::Relaxed);
            log::warn!("{}: {} unconsumed items", self.label, depth);
        }
        self.not_empty.notify_one();
    }

    /// Remove the oldest item, suspending until one is available.
    ///
    /// Returns `None` once the queue has been closed and drained. Never
    /// busy-waits.
    pub fn pop_blocking(&self) -> Option<T> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        loop {
            if let Some(item) = state.items.pop_front() {
                return Some(item);
            }
            if state.closed {
                return None;
            }
            state = self
                .not_empty
                .wait(state)
                .unwrap_or_else(|e| e.into_inner());
        }
    }

    /// Remove the oldest item without blocking.
    pub fn try_pop(&self) -> Option<T> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.items.pop_front()
    }

    /// Current queue depth
    pub fn len(&self) -> usize {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.items.len()
    }

    /// True if the queue currently holds no items
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Close the queue: blocked consumers wake and drain what remains, then
    /// receive `None`. Subsequent pushes are discarded.
    pub fn close(&self) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.closed = true;
        drop(state);
        self.not_empty.notify_all();
    }

    /// Number of pushes that landed at or past the watermark
    pub fn backpressure_events(&self) -> u64 {
        self.backpressure_events.load(Ordering::Relaxed)
    }
}
