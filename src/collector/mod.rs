//! Action sources for the APM tracker.
//!
//! Capturing input from the operating system happens outside this crate.
//! Sources here turn an external feed (a line stream, or a synthetic
//! generator) into [`ActionEvent`]s delivered over a channel.

pub mod reader;
pub mod synthetic;
pub mod types;

use crossbeam_channel::Receiver;
use std::sync::atomic::{AtomicU64, Ordering};

// Re-export commonly used types
pub use reader::ReaderCollector;
pub use synthetic::{SyntheticCollector, SyntheticConfig};
pub use types::{ActionEvent, ActionKind};

/// Channel depth between a source thread and its consumer.
pub const CHANNEL_CAPACITY: usize = 10_000;

/// Which action kinds a source should emit.
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    pub capture_keyboard: bool,
    pub capture_mouse: bool,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            capture_keyboard: true,
            capture_mouse: true,
        }
    }
}

impl CollectorConfig {
    /// Whether an action of `kind` passes the filter.
    pub fn accepts(&self, kind: ActionKind) -> bool {
        match kind {
            ActionKind::Key => self.capture_keyboard,
            ActionKind::Click => self.capture_mouse,
        }
    }

    /// Whether any action kind passes the filter.
    pub fn accepts_any(&self) -> bool {
        self.capture_keyboard || self.capture_mouse
    }
}

/// Actions a source saw but did not deliver.
///
/// Shared between the source handle and its thread.
#[derive(Debug, Default)]
pub struct SourceCounters {
    /// Rejected by the [`CollectorConfig`] filter
    filtered: AtomicU64,
    /// Lost because the channel was full
    dropped: AtomicU64,
}

impl SourceCounters {
    pub fn record_filtered(&self) {
        self.filtered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn filtered(&self) -> u64 {
        self.filtered.load(Ordering::Relaxed)
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Errors that can occur while running a source.
#[derive(Debug)]
pub enum CollectorError {
    AlreadyRunning,
    InputConsumed,
    ThreadSpawnFailed(String),
}

impl std::fmt::Display for CollectorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CollectorError::AlreadyRunning => write!(f, "Collector is already running"),
            CollectorError::InputConsumed => write!(f, "Collector input was already consumed"),
            CollectorError::ThreadSpawnFailed(e) => {
                write!(f, "Failed to spawn collector thread: {e}")
            }
        }
    }
}

impl std::error::Error for CollectorError {}

/// A producer of action events running on its own thread.
pub trait ActionSource {
    /// Begin emitting events.
    fn start(&mut self) -> Result<(), CollectorError>;

    /// Stop emitting events.
    fn stop(&mut self);

    /// Whether the source is still producing.
    fn is_running(&self) -> bool;

    /// Channel the events arrive on.
    fn receiver(&self) -> &Receiver<ActionEvent>;

    /// Filtered and dropped action counts so far.
    fn counters(&self) -> &SourceCounters;
}
