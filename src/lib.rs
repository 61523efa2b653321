//! APM Tracker - rolling action-rate statistics for keyboard and mouse input.
//!
//! The tracker measures how often discrete user actions (key presses, mouse
//! clicks) happen and exposes a trailing-minute rate, a historical peak, a
//! lifetime average, and a per-second histogram of the last minute.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         APM Tracker                          │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐  record_event  ┌─────────────────────────┐  │
//! │  │  Collector  │───────────────▶│       RateTracker       │  │
//! │  │ (line/synth)│                │  ┌───────────────────┐  │  │
//! │  └─────────────┘                │  │ TimestampRingBuf  │  │  │
//! │                                 │  └───────────────────┘  │  │
//! │  ┌─────────────┐   poll (500ms) │  current / peak / avg   │  │
//! │  │   Display   │◀───────────────│  histogram              │  │
//! │  └─────────────┘                └─────────────────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use apm_tracker::core::{RateTracker, TrackerSettings};
//!
//! let tracker = RateTracker::new(TrackerSettings::default(), 0).unwrap();
//! for second in 0..60 {
//!     tracker.record_event(second * 1_000);
//! }
//!
//! assert_eq!(tracker.current_rate(60_000), 60);
//! assert_eq!(tracker.peak_rate(), 60);
//! assert_eq!(tracker.average_rate(60_000), 60.0);
//! ```

pub mod collector;
pub mod config;
pub mod core;
pub mod session;

// Re-export key types at crate root for convenience
pub use crate::collector::{
    ActionEvent, ActionKind, ActionSource, CollectorConfig, CollectorError, SourceCounters,
};
pub use crate::config::{Config, ConfigError, SourceConfig};
pub use crate::core::{
    Histogram, RateReport, RateTracker, ReportBuilder, SharedRateTracker, TimestampRingBuffer,
    TrackerError, TrackerSettings, TrackerState,
};
pub use crate::session::{SessionLog, SessionStats, SharedSessionLog};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
