//! Bounded timestamp storage.
//!
//! A fixed-capacity circular buffer of millisecond timestamps. Once full, each
//! append overwrites the oldest slot, so memory stays bounded no matter how
//! bursty the input gets.
//!
//! ```text
//!   capacity = 4, after appending 10, 20, 30, 40, 50:
//!
//!   data = [50, 20, 30, 40]
//!   head = 1            (next overwrite slot, also the oldest entry)
//!
//!   snapshot() => [20, 30, 40, 50]
//! ```
//!
//! A buffer can be closed once. Appends that take the lock after `close`
//! returns are rejected, so a closed buffer never changes again.

use crate::core::TrackerError;
use std::sync::{PoisonError, RwLock};

/// Circular buffer of event timestamps, safe for concurrent writers and readers.
#[derive(Debug)]
pub struct TimestampRingBuffer {
    capacity: usize,
    inner: RwLock<RingState>,
}

#[derive(Debug)]
struct RingState {
    data: Vec<i64>,
    size: usize,
    head: usize,
    appended: u64,
    closed: bool,
}

impl TimestampRingBuffer {
    /// Create a buffer holding at most `capacity` timestamps.
    pub fn new(capacity: usize) -> Result<Self, TrackerError> {
        if capacity == 0 {
            return Err(TrackerError::InvalidConfiguration(
                "buffer capacity must be positive".to_string(),
            ));
        }

        Ok(Self {
            capacity,
            inner: RwLock::new(RingState {
                data: vec![0; capacity],
                size: 0,
                head: 0,
                appended: 0,
                closed: false,
            }),
        })
    }

    /// Record one timestamp, evicting the oldest entry when full.
    ///
    /// Returns `false` if the buffer is closed.
    pub fn append(&self, timestamp_millis: i64) -> bool {
        let mut state = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if state.closed {
            return false;
        }
        state.push(self.capacity, timestamp_millis);
        true
    }

    /// Record a timestamp, raising it to the newest stored entry if it would
    /// otherwise break non-decreasing order.
    ///
    /// Returns the value stored, or `None` if the buffer is closed.
    pub fn append_monotonic(&self, timestamp_millis: i64) -> Option<i64> {
        let mut state = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if state.closed {
            return None;
        }

        let stored = match state.newest(self.capacity) {
            Some(newest) if newest > timestamp_millis => newest,
            _ => timestamp_millis,
        };
        state.push(self.capacity, stored);
        Some(stored)
    }

    /// Reject all further appends. Returns `true` for the call that closed
    /// the buffer, `false` if it was already closed.
    pub fn close(&self) -> bool {
        let mut state = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        !std::mem::replace(&mut state.closed, true)
    }

    pub fn is_closed(&self) -> bool {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .closed
    }

    /// Number of timestamps ever accepted, including evicted ones.
    pub fn total_appended(&self) -> u64 {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .appended
    }

    /// Copy out the stored timestamps, oldest first.
    pub fn snapshot(&self) -> Vec<i64> {
        let state = self.inner.read().unwrap_or_else(PoisonError::into_inner);

        (0..state.size)
            .map(|i| state.data[(state.head + i) % self.capacity])
            .collect()
    }

    /// The most recently appended timestamp, if any.
    pub fn latest(&self) -> Option<i64> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .newest(self.capacity)
    }

    pub fn len(&self) -> usize {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .size
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl RingState {
    fn push(&mut self, capacity: usize, timestamp_millis: i64) {
        if self.size < capacity {
            let slot = self.size;
            self.data[slot] = timestamp_millis;
            self.size += 1;
        } else {
            let slot = self.head;
            self.data[slot] = timestamp_millis;
            self.head = (slot + 1) % capacity;
        }
        self.appended += 1;
    }

    fn newest(&self, capacity: usize) -> Option<i64> {
        if self.size == 0 {
            return None;
        }
        Some(self.data[(self.head + self.size - 1) % capacity])
    }
}
