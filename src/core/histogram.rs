//! Per-bucket event density over a trailing window.
//!
//! Bucket 0 always holds the most recent slice of time; higher indices reach
//! further into the past.

use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

/// Event counts for consecutive fixed-width time slices ending at "now".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Histogram {
    /// Width of each bucket in milliseconds
    pub bucket_width_millis: i64,
    /// Event counts, most recent bucket first
    pub counts: Vec<u64>,
}

/// Summary statistics over the bucket counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct HistogramStats {
    /// Mean events per bucket
    pub mean: f64,
    /// Population standard deviation of events per bucket
    pub std_dev: f64,
    /// Largest bucket count
    pub max: u64,
    /// Number of buckets with at least one event
    pub active_buckets: usize,
}

impl Histogram {
    /// Create an all-zero histogram.
    pub fn empty(bucket_width_millis: i64, bucket_count: usize) -> Self {
        Self {
            bucket_width_millis,
            counts: vec![0; bucket_count],
        }
    }

    /// Bucket `timestamps` relative to `now_millis`.
    ///
    /// Only entries in the half-open window
    /// `(now - width * count, now]` are counted. `timestamps` must be in
    /// non-decreasing order; the scan stops at the first entry older than
    /// the window.
    pub(crate) fn from_timestamps(
        timestamps: &[i64],
        now_millis: i64,
        bucket_width_millis: i64,
        bucket_count: usize,
    ) -> Self {
        let mut histogram = Self::empty(bucket_width_millis, bucket_count);

        for &ts in timestamps.iter().rev() {
            let age = now_millis.saturating_sub(ts);
            if age < 0 {
                // Recorded after the query instant.
                continue;
            }
            let index = usize::try_from(age / bucket_width_millis).unwrap_or(usize::MAX);
            if index >= bucket_count {
                break;
            }
            histogram.counts[index] += 1;
        }

        histogram
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    /// True when no bucket holds an event.
    pub fn is_empty(&self) -> bool {
        self.counts.iter().all(|&c| c == 0)
    }

    /// Total number of events across all buckets.
    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    /// Largest bucket count, 0 for an empty histogram.
    pub fn max_count(&self) -> u64 {
        self.counts.iter().copied().fold(0, u64::max)
    }

    /// Scale each bucket to a bar height in `0..=max_height`, relative to the
    /// fullest bucket.
    ///
    /// Returns all zeros when no bucket has events.
    pub fn bar_heights(&self, max_height: u32) -> Vec<u32> {
        let max = self.max_count();
        if max == 0 {
            return vec![0; self.counts.len()];
        }

        self.counts
            .iter()
            .map(|&count| ((count as f64 / max as f64) * max_height as f64) as u32)
            .collect()
    }

    /// Compute summary statistics over the bucket counts.
    pub fn stats(&self) -> HistogramStats {
        if self.counts.is_empty() {
            return HistogramStats::default();
        }

        let values: Vec<f64> = self.counts.iter().map(|&c| c as f64).collect();

        HistogramStats {
            mean: values.iter().mean(),
            std_dev: values.iter().population_std_dev(),
            max: self.max_count(),
            active_buckets: self.counts.iter().filter(|&&c| c > 0).count(),
        }
    }
}
