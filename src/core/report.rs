//! Point-in-time rate reports for display and export.
//!
//! A report polls the tracker the same way a display refresh would, so
//! building one also advances the peak rate.

use crate::core::histogram::{Histogram, HistogramStats};
use crate::core::tracker::{RateTracker, TrackerState};
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Shown in place of a rate that is not yet defined.
pub const UNDEFINED_RATE: &str = "—";

/// All derived statistics at one instant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateReport {
    /// Identifier of the builder (one per session)
    pub session_id: String,
    /// Instant the statistics were computed for
    pub generated_at: DateTime<Utc>,
    /// Actions in the trailing window
    pub current_rate: u64,
    /// Highest current rate observed so far
    pub peak_rate: u64,
    /// Lifetime actions per minute, `None` when too little time has passed
    pub average_rate: Option<f64>,
    /// Per-bucket counts over the trailing window
    pub histogram: Histogram,
    /// Summary of the histogram buckets
    pub histogram_stats: HistogramStats,
    /// Timestamps currently held in the buffer
    pub buffered_events: usize,
    /// Actions accepted since the session started
    pub total_events: u64,
    /// Tracker lifecycle state
    pub state: TrackerState,
}

impl RateReport {
    /// Multi-line label text for the full view.
    pub fn summary_line(&self) -> String {
        format!(
            "Current APM: {}\nPeak APM: {}\nAverage APM: {}",
            self.current_rate,
            self.peak_rate,
            self.average_label()
        )
    }

    /// Single label for the compact view.
    pub fn compact_line(&self) -> String {
        format!("APM: {}", self.current_rate)
    }

    fn average_label(&self) -> String {
        match self.average_rate {
            Some(avg) => format!("{avg:.2}"),
            None => UNDEFINED_RATE.to_string(),
        }
    }
}

/// Builds [`RateReport`]s tagged with a per-session identifier.
pub struct ReportBuilder {
    session_id: Uuid,
}

impl ReportBuilder {
    pub fn new() -> Self {
        Self {
            session_id: Uuid::new_v4(),
        }
    }

    pub fn session_id(&self) -> String {
        self.session_id.to_string()
    }

    /// Poll `tracker` at `now_millis` and collect the results.
    pub fn build(&self, tracker: &RateTracker, now_millis: i64) -> RateReport {
        // Current first so the peak below includes it.
        let current_rate = tracker.current_rate(now_millis);
        let histogram = tracker.default_histogram(now_millis);
        let histogram_stats = histogram.stats();

        RateReport {
            session_id: self.session_id(),
            generated_at: Utc
                .timestamp_millis_opt(now_millis)
                .single()
                .unwrap_or_else(Utc::now),
            current_rate,
            peak_rate: tracker.peak_rate(),
            average_rate: tracker.try_average_rate(now_millis),
            histogram,
            histogram_stats,
            buffered_events: tracker.buffered_events(),
            total_events: tracker.total_recorded(),
            state: tracker.state(),
        }
    }
}

impl Default for ReportBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::tracker::TrackerSettings;

    #[test]
    fn test_report_fields() {
        let tracker = RateTracker::new(TrackerSettings::default(), 0).unwrap();
        for i in 0..10 {
            tracker.record_event(110_000 + i * 1_000);
        }

        let builder = ReportBuilder::new();
        let report = builder.build(&tracker, 120_000);

        assert_eq!(report.current_rate, 10);
        assert_eq!(report.peak_rate, 10);
        assert_eq!(report.average_rate, Some(5.0));
        assert_eq!(report.histogram.total(), 10);
        assert_eq!(report.total_events, 10);
        assert_eq!(report.state, TrackerState::Active);
        assert_eq!(report.session_id, builder.session_id());
        assert_eq!(report.generated_at.timestamp_millis(), 120_000);
    }

    #[test]
    fn test_labels_with_undefined_average() {
        let tracker = RateTracker::new(TrackerSettings::default(), 0).unwrap();
        let report = ReportBuilder::new().build(&tracker, 0);

        assert_eq!(report.compact_line(), "APM: 0");
        assert!(report.summary_line().contains("Average APM: —"));
    }

    #[test]
    fn test_labels_format_average() {
        let tracker = RateTracker::new(TrackerSettings::default(), 0).unwrap();
        for i in 0..3 {
            tracker.record_event(i * 1_000);
        }
        let report = ReportBuilder::new().build(&tracker, 60_000);

        assert!(report.summary_line().contains("Current APM: 3"));
        assert!(report.summary_line().contains("Peak APM: 3"));
        assert!(report.summary_line().contains("Average APM: 3.00"));
    }

    #[test]
    fn test_report_serializes() {
        let tracker = RateTracker::new(TrackerSettings::default(), 0).unwrap();
        let report = ReportBuilder::new().build(&tracker, 0);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["state"], "active");
        assert!(json["average_rate"].is_null());
        assert_eq!(json["histogram"]["counts"].as_array().unwrap().len(), 60);
    }
}
