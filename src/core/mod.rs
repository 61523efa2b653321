//! Core functionality for the APM tracker.
//!
//! This module contains:
//! - A bounded, overwrite-oldest timestamp buffer
//! - Rate computations (current, peak, average) over buffer snapshots
//! - Per-second histogram bucketing
//! - Report building for display and export

pub mod clock;
pub mod error;
pub mod histogram;
pub mod report;
pub mod ring;
pub mod tracker;

// Re-export commonly used types
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::TrackerError;
pub use histogram::{Histogram, HistogramStats};
pub use report::{RateReport, ReportBuilder, UNDEFINED_RATE};
pub use ring::TimestampRingBuffer;
pub use tracker::{
    create_shared_tracker, RateTracker, SharedRateTracker, TrackerSettings, TrackerState,
};
