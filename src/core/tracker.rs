//! Rolling action-rate computations.
//!
//! The tracker owns a [`TimestampRingBuffer`] and derives every statistic from
//! a snapshot of it, so no lock is held while counting.
//!
//! Timestamps are stored in non-decreasing order. `record_event` enforces this
//! by clamping a reading that steps backward to the newest stored timestamp,
//! which is what allows `current_rate` to stop scanning at the first entry
//! older than its window.
//!
//! Peak tracking is driven by `current_rate` calls, not by individual events:
//! its accuracy is bounded by how often the caller polls.
//!
//! Time arithmetic saturates, so extreme `now` values clip the window instead
//! of overflowing.

use crate::core::histogram::Histogram;
use crate::core::ring::TimestampRingBuffer;
use crate::core::TrackerError;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Default buffer capacity: one hour at one action per second.
pub const DEFAULT_CAPACITY: usize = 3600;

/// Default trailing window for the current rate.
pub const DEFAULT_WINDOW_MILLIS: i64 = 60_000;

/// Default histogram bucket width.
pub const DEFAULT_BUCKET_WIDTH_MILLIS: i64 = 1_000;

/// Default number of histogram buckets.
pub const DEFAULT_BUCKET_COUNT: usize = 60;

/// Largest accepted histogram bucket count.
pub const MAX_BUCKET_COUNT: usize = 86_400;

/// Below this much elapsed time the average rate is undefined.
pub const MIN_AVERAGE_ELAPSED_MILLIS: i64 = 1_000;

const MILLIS_PER_MINUTE: f64 = 60_000.0;

/// Sizing and window parameters for a [`RateTracker`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackerSettings {
    /// Maximum number of timestamps retained
    pub capacity: usize,
    /// Trailing window used by `current_rate`
    pub window_millis: i64,
    /// Default histogram bucket width
    pub bucket_width_millis: i64,
    /// Default histogram bucket count
    pub bucket_count: usize,
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            window_millis: DEFAULT_WINDOW_MILLIS,
            bucket_width_millis: DEFAULT_BUCKET_WIDTH_MILLIS,
            bucket_count: DEFAULT_BUCKET_COUNT,
        }
    }
}

impl TrackerSettings {
    /// Check that every parameter is positive.
    pub fn validate(&self) -> Result<(), TrackerError> {
        if self.capacity == 0 {
            return Err(TrackerError::InvalidConfiguration(
                "buffer capacity must be positive".to_string(),
            ));
        }
        if self.window_millis <= 0 {
            return Err(TrackerError::InvalidConfiguration(format!(
                "rate window must be positive, got {}ms",
                self.window_millis
            )));
        }
        validate_buckets(self.bucket_width_millis, self.bucket_count)
    }
}

fn validate_buckets(bucket_width_millis: i64, bucket_count: usize) -> Result<(), TrackerError> {
    if bucket_width_millis <= 0 {
        return Err(TrackerError::InvalidConfiguration(format!(
            "bucket width must be positive, got {bucket_width_millis}ms"
        )));
    }
    if bucket_count == 0 {
        return Err(TrackerError::InvalidConfiguration(
            "bucket count must be positive".to_string(),
        ));
    }
    if bucket_count > MAX_BUCKET_COUNT {
        return Err(TrackerError::InvalidConfiguration(format!(
            "bucket count must be at most {MAX_BUCKET_COUNT}, got {bucket_count}"
        )));
    }
    // The span must fit in i64 for the window bound to mean anything.
    let span = i64::try_from(bucket_count)
        .ok()
        .and_then(|count| bucket_width_millis.checked_mul(count));
    if span.is_none() {
        return Err(TrackerError::InvalidConfiguration(format!(
            "histogram span overflows: {bucket_count} buckets of {bucket_width_millis}ms"
        )));
    }
    Ok(())
}

/// Lifecycle state of a tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackerState {
    /// Accepting events and serving queries
    Active,
    /// Serving queries only; new events are ignored
    Stopped,
}

/// Tracks action timestamps and derives current, peak, and average rates.
///
/// All methods take `&self`; the tracker can be shared between producer
/// threads calling [`record_event`](Self::record_event) and any number of
/// polling threads.
#[derive(Debug)]
pub struct RateTracker {
    settings: TrackerSettings,
    buffer: TimestampRingBuffer,
    start_millis: i64,
    peak_rate: AtomicU64,
}

impl RateTracker {
    /// Create a tracker whose session starts at `start_millis`.
    pub fn new(settings: TrackerSettings, start_millis: i64) -> Result<Self, TrackerError> {
        settings.validate()?;

        Ok(Self {
            settings,
            buffer: TimestampRingBuffer::new(settings.capacity)?,
            start_millis,
            peak_rate: AtomicU64::new(0),
        })
    }

    /// Record one action at `now_millis`.
    ///
    /// A timestamp older than the newest buffered one is stored as that newest
    /// value. Late events are therefore never lost and never reorder the
    /// buffer, so queries need neither a sort nor a full scan. The cost is
    /// precision: a late event counts at the newer instant, which can move it
    /// into a more recent histogram bucket or keep it in the rate window
    /// slightly longer than its true time would.
    ///
    /// The stopped check happens under the buffer's write lock. Once
    /// [`stop`](Self::stop) has returned, no call is accepted.
    pub fn record_event(&self, now_millis: i64) {
        match self.buffer.append_monotonic(now_millis) {
            None => tracing::trace!(now_millis, "tracker stopped, event ignored"),
            Some(stored) if stored != now_millis => tracing::debug!(
                now_millis,
                stored,
                "clock moved backward, clamped event timestamp"
            ),
            Some(_) => {}
        }
    }

    /// Count actions in `[now - window, now]` and advance the peak.
    pub fn current_rate(&self, now_millis: i64) -> u64 {
        let cutoff = now_millis.saturating_sub(self.settings.window_millis);
        let snapshot = self.buffer.snapshot();

        let count = snapshot
            .iter()
            .rev()
            .take_while(|&&ts| ts >= cutoff)
            .filter(|&&ts| ts <= now_millis)
            .count() as u64;

        let previous = self.peak_rate.fetch_max(count, Ordering::AcqRel);
        if count > previous {
            tracing::debug!(peak = count, previous, "new peak rate");
        }

        count
    }

    /// Highest value ever returned by `current_rate`, or 0.
    pub fn peak_rate(&self) -> u64 {
        self.peak_rate.load(Ordering::Acquire)
    }

    /// Buffered actions per elapsed minute, or `None` while less than
    /// [`MIN_AVERAGE_ELAPSED_MILLIS`] has passed since the start.
    pub fn try_average_rate(&self, now_millis: i64) -> Option<f64> {
        let elapsed = now_millis.saturating_sub(self.start_millis);
        if elapsed < MIN_AVERAGE_ELAPSED_MILLIS {
            return None;
        }

        let minutes = elapsed as f64 / MILLIS_PER_MINUTE;
        Some(self.buffer.len() as f64 / minutes)
    }

    /// Like [`try_average_rate`](Self::try_average_rate), with 0.0 standing in
    /// for the undefined case.
    pub fn average_rate(&self, now_millis: i64) -> f64 {
        self.try_average_rate(now_millis).unwrap_or(0.0)
    }

    /// Bucket the trailing `bucket_width_millis * bucket_count` window.
    ///
    /// Bucket 0 is the most recent slice. An empty buffer yields all-zero
    /// buckets.
    pub fn histogram(
        &self,
        now_millis: i64,
        bucket_width_millis: i64,
        bucket_count: usize,
    ) -> Result<Histogram, TrackerError> {
        validate_buckets(bucket_width_millis, bucket_count)?;

        let snapshot = self.buffer.snapshot();
        Ok(Histogram::from_timestamps(
            &snapshot,
            now_millis,
            bucket_width_millis,
            bucket_count,
        ))
    }

    /// Histogram using the configured bucket width and count.
    pub fn default_histogram(&self, now_millis: i64) -> Histogram {
        let snapshot = self.buffer.snapshot();
        Histogram::from_timestamps(
            &snapshot,
            now_millis,
            self.settings.bucket_width_millis,
            self.settings.bucket_count,
        )
    }

    /// Transition to [`TrackerState::Stopped`]. There is no way back.
    ///
    /// Events racing with this call are either buffered before it returns
    /// or rejected.
    pub fn stop(&self) {
        if self.buffer.close() {
            tracing::info!(
                buffered = self.buffer.len(),
                total = self.total_recorded(),
                peak = self.peak_rate(),
                "rate tracker stopped"
            );
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.buffer.is_closed()
    }

    pub fn state(&self) -> TrackerState {
        if self.is_stopped() {
            TrackerState::Stopped
        } else {
            TrackerState::Active
        }
    }

    /// Copy of the buffered timestamps, oldest first.
    pub fn snapshot(&self) -> Vec<i64> {
        self.buffer.snapshot()
    }

    /// Number of timestamps currently buffered.
    pub fn buffered_events(&self) -> usize {
        self.buffer.len()
    }

    /// Number of events accepted since the start, including evicted ones.
    pub fn total_recorded(&self) -> u64 {
        self.buffer.total_appended()
    }

    pub fn start_millis(&self) -> i64 {
        self.start_millis
    }

    pub fn settings(&self) -> &TrackerSettings {
        &self.settings
    }
}

/// Thread-safe shared tracker.
pub type SharedRateTracker = Arc<RateTracker>;

/// Create a new shared tracker.
pub fn create_shared_tracker(
    settings: TrackerSettings,
    start_millis: i64,
) -> Result<SharedRateTracker, TrackerError> {
    RateTracker::new(settings, start_millis).map(Arc::new)
}
