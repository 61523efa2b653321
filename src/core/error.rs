//! Errors raised by the rate-tracking core.

/// Errors that can occur when configuring the tracker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackerError {
    /// A capacity, window, or bucket parameter was not positive.
    InvalidConfiguration(String),
}

impl std::fmt::Display for TrackerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrackerError::InvalidConfiguration(e) => write!(f, "Invalid configuration: {e}"),
        }
    }
}

impl std::error::Error for TrackerError {}
