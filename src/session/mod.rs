//! Session bookkeeping for the APM tracker.
//!
//! Counts what a session has seen, broken down by input kind, so a user can
//! check what was measured.

pub mod log;

// Re-export commonly used types
pub use log::{create_shared_log, SessionLog, SessionStats, SharedSessionLog};
