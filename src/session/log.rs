//! In-memory session counters.
//!
//! Nothing here is written to disk; the counters live and die with the
//! session.

use crate::collector::types::ActionKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Per-session activity counters.
#[derive(Debug)]
pub struct SessionLog {
    /// Number of key actions recorded
    key_actions: AtomicU64,
    /// Number of click actions recorded
    click_actions: AtomicU64,
    /// Actions rejected by the source filter
    filtered_actions: AtomicU64,
    /// Actions lost to a full channel
    dropped_actions: AtomicU64,
    /// Number of times the statistics were polled
    polls: AtomicU64,
    /// Number of reports exported
    reports_exported: AtomicU64,
    /// Session start time
    session_start: DateTime<Utc>,
}

impl SessionLog {
    pub fn new() -> Self {
        Self {
            key_actions: AtomicU64::new(0),
            click_actions: AtomicU64::new(0),
            filtered_actions: AtomicU64::new(0),
            dropped_actions: AtomicU64::new(0),
            polls: AtomicU64::new(0),
            reports_exported: AtomicU64::new(0),
            session_start: Utc::now(),
        }
    }

    /// Record one action of the given kind.
    pub fn record_action(&self, kind: ActionKind) {
        match kind {
            ActionKind::Key => self.key_actions.fetch_add(1, Ordering::Relaxed),
            ActionKind::Click => self.click_actions.fetch_add(1, Ordering::Relaxed),
        };
    }

    /// Add actions a source filtered out.
    pub fn record_filtered(&self, count: u64) {
        self.filtered_actions.fetch_add(count, Ordering::Relaxed);
    }

    /// Add actions a source could not deliver.
    pub fn record_dropped(&self, count: u64) {
        self.dropped_actions.fetch_add(count, Ordering::Relaxed);
    }

    /// Record a statistics refresh.
    pub fn record_poll(&self) {
        self.polls.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an exported report.
    pub fn record_report_exported(&self) {
        self.reports_exported.fetch_add(1, Ordering::Relaxed);
    }

    /// Get the current statistics.
    pub fn stats(&self) -> SessionStats {
        SessionStats {
            key_actions: self.key_actions.load(Ordering::Relaxed),
            click_actions: self.click_actions.load(Ordering::Relaxed),
            filtered_actions: self.filtered_actions.load(Ordering::Relaxed),
            dropped_actions: self.dropped_actions.load(Ordering::Relaxed),
            polls: self.polls.load(Ordering::Relaxed),
            reports_exported: self.reports_exported.load(Ordering::Relaxed),
            session_start: self.session_start,
            session_duration_secs: (Utc::now() - self.session_start).num_seconds().max(0) as u64,
        }
    }

    /// Get a summary string for display.
    pub fn summary(&self) -> String {
        let stats = self.stats();
        format!(
            "Session Statistics:\n\
             - Key actions: {}\n\
             - Click actions: {}\n\
             - Filtered actions: {}\n\
             - Dropped actions: {}\n\
             - Refreshes: {}\n\
             - Reports exported: {}\n\
             - Session duration: {} seconds",
            stats.key_actions,
            stats.click_actions,
            stats.filtered_actions,
            stats.dropped_actions,
            stats.polls,
            stats.reports_exported,
            stats.session_duration_secs
        )
    }
}

impl Default for SessionLog {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of session statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStats {
    pub key_actions: u64,
    pub click_actions: u64,
    pub filtered_actions: u64,
    pub dropped_actions: u64,
    pub polls: u64,
    pub reports_exported: u64,
    pub session_start: DateTime<Utc>,
    pub session_duration_secs: u64,
}

impl SessionStats {
    pub fn total_actions(&self) -> u64 {
        self.key_actions + self.click_actions
    }
}

/// Thread-safe shared session log.
pub type SharedSessionLog = Arc<SessionLog>;

/// Create a new shared session log.
pub fn create_shared_log() -> SharedSessionLog {
    Arc::new(SessionLog::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_counting() {
        let log = SessionLog::new();

        log.record_action(ActionKind::Key);
        log.record_action(ActionKind::Key);
        log.record_action(ActionKind::Click);
        log.record_poll();

        let stats = log.stats();
        assert_eq!(stats.key_actions, 2);
        assert_eq!(stats.click_actions, 1);
        assert_eq!(stats.total_actions(), 3);
        assert_eq!(stats.polls, 1);
        assert_eq!(stats.filtered_actions, 0);
    }

    #[test]
    fn test_source_losses_not_in_total() {
        let log = SessionLog::new();
        log.record_action(ActionKind::Click);
        log.record_filtered(3);
        log.record_filtered(2);
        log.record_dropped(1);

        let stats = log.stats();
        assert_eq!(stats.filtered_actions, 5);
        assert_eq!(stats.dropped_actions, 1);
        assert_eq!(stats.total_actions(), 1);
    }

    #[test]
    fn test_summary_format() {
        let log = create_shared_log();
        log.record_report_exported();
        let summary = log.summary();

        assert!(summary.contains("Key actions: 0"));
        assert!(summary.contains("Click actions: 0"));
        assert!(summary.contains("Filtered actions: 0"));
        assert!(summary.contains("Dropped actions: 0"));
        assert!(summary.contains("Reports exported: 1"));
    }
}
