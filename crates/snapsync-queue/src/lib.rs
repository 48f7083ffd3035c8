//! Bounded, drop-oldest, multi-producer/single-consumer queue (spec §4.2,
//! C2). Used both for the server's per-session outbound queue of
//! `Arc<WireChunk>` and the client's inbound queue of `PlaybackChunk`.
//!
//! Modeled on `original_source/common/queue.h`'s `push`/`pop`/`try_pop`/
//! `close` contract, reimplemented without raw pointers and with an
//! explicit drop-oldest policy (the original grows unbounded; this core
//! requires a cap, spec §4.2).

use parking_lot::{Condvar, Mutex};
use snapsync_foundation::error::QueueError;
use std::collections::VecDeque;
use std::time::Duration;

struct Inner<T> {
    queue: VecDeque<T>,
    capacity: usize,
    closed: bool,
    dropped: u64,
}

/// A bounded queue that drops the oldest item instead of blocking the
/// producer on overflow. Never blocks on `push`.
pub struct ChunkQueue<T> {
    inner: Mutex<Inner<T>>,
    not_empty: Condvar,
}

impl<T> ChunkQueue<T> {
    /// `capacity` is clamped to at least 4, per spec §4.2
    /// ("K ≈ 2× buffer_target_ms / CHUNK_MS, never less than 4").
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                queue: VecDeque::with_capacity(capacity.max(4)),
                capacity: capacity.max(4),
                closed: false,
                dropped: 0,
            }),
            not_empty: Condvar::new(),
        }
    }

    /// Never blocks. If full, drops the oldest item (front) before pushing.
    /// Returns `true` if an item was dropped to make room.
    pub fn push(&self, item: T) -> bool {
        let mut inner = self.inner.lock();
        if inner.closed {
            return false;
        }
        let mut dropped = false;
        if inner.queue.len() >= inner.capacity {
            inner.queue.pop_front();
            inner.dropped += 1;
            dropped = true;
        }
        inner.queue.push_back(item);
        drop(inner);
        self.not_empty.notify_one();
        dropped
    }

    /// Blocks until an item is available or the queue is closed.
    pub fn pop(&self) -> Result<T, QueueError> {
        let mut inner = self.inner.lock();
        loop {
            if let Some(item) = inner.queue.pop_front() {
                return Ok(item);
            }
            if inner.closed {
                return Err(QueueError::Closed);
            }
            self.not_empty.wait(&mut inner);
        }
    }

    /// Bounded wait. Returns `Timeout` if nothing arrived in time, `Closed`
    /// if the queue was closed while waiting (or already closed and empty).
    pub fn try_pop(&self, timeout: Duration) -> Result<T, QueueError> {
        let mut inner = self.inner.lock();
        if let Some(item) = inner.queue.pop_front() {
            return Ok(item);
        }
        if inner.closed {
            return Err(QueueError::Closed);
        }

        let result = self.not_empty.wait_for(&mut inner, timeout);
        if let Some(item) = inner.queue.pop_front() {
            return Ok(item);
        }
        if inner.closed {
            return Err(QueueError::Closed);
        }
        if result.timed_out() {
            return Err(QueueError::Timeout);
        }
        Err(QueueError::Timeout)
    }

    /// Wakes all waiters with `Closed`. Idempotent.
    pub fn close(&self) {
        let mut inner = self.inner.lock();
        inner.closed = true;
        drop(inner);
        self.not_empty.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }

    pub fn len(&self) -> usize {
        self.inner.lock().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of items dropped due to overflow since creation.
    pub fn dropped_count(&self) -> u64 {
        self.inner.lock().dropped
    }
}
