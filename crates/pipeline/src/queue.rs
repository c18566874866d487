//! Per-subscription delivery queue
//!
//! An ordered buffer of pending outbound payloads plus the single-drain-
//! owner guard. The router appends at the tail while the subscription's
//! sender drains from the head; a failed payload is re-inserted at the head
//! so it is re-attempted before anything enqueued after it.

use std::collections::VecDeque;

use bytes::Bytes;
use parking_lot::Mutex;

/// Ordered buffer of serialized payloads with a drain-ownership flag
///
/// Invariant: at most one drain owner at any time. `begin_processing`
/// returns whether the caller acquired ownership; the owner must call
/// `end_processing` before abandoning the drain.
#[derive(Debug, Default)]
pub struct DeliveryQueue {
    inner: Mutex<QueueInner>,
}

#[derive(Debug, Default)]
struct QueueInner {
    items: VecDeque<Bytes>,
    processing: bool,
}

impl DeliveryQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a payload at the tail (normal enqueue)
    pub fn add(&self, payload: Bytes) {
        self.inner.lock().items.push_back(payload);
    }

    /// Re-insert a payload at the head (retry without losing order)
    pub fn push(&self, payload: Bytes) {
        self.inner.lock().items.push_front(payload);
    }

    /// Remove and return the head, or `None` if empty
    pub fn pop(&self) -> Option<Bytes> {
        self.inner.lock().items.pop_front()
    }

    /// Try to acquire drain ownership
    ///
    /// Returns `true` if the caller is now the single drain owner, `false`
    /// if another drain is already running.
    pub fn begin_processing(&self) -> bool {
        let mut inner = self.inner.lock();
        if inner.processing {
            false
        } else {
            inner.processing = true;
            true
        }
    }

    /// Release drain ownership
    pub fn end_processing(&self) {
        self.inner.lock().processing = false;
    }

    /// Whether a drain currently owns this queue
    pub fn is_processing(&self) -> bool {
        self.inner.lock().processing
    }

    /// Number of queued payloads
    pub fn len(&self) -> usize {
        self.inner.lock().items.len()
    }

    /// Whether the queue holds no payloads
    pub fn is_empty(&self) -> bool {
        self.inner.lock().items.is_empty()
    }
}
