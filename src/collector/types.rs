//! Action event types.
//!
//! An action is a key press or a mouse-button press. Only the instant it
//! happened is kept; every action counts the same toward the rate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What kind of input produced an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// A key went down
    Key,
    /// A mouse button went down
    Click,
}

impl ActionKind {
    /// Classify one line of textual input.
    ///
    /// Blank lines are not actions. A line whose first word is `click`,
    /// `mouse`, `c` or `m` is a click; anything else is a key press.
    pub fn from_line(line: &str) -> Option<Self> {
        let word = line.split_whitespace().next()?.to_lowercase();
        match word.as_str() {
            "click" | "mouse" | "c" | "m" => Some(ActionKind::Click),
            _ => Some(ActionKind::Key),
        }
    }
}

/// A single user action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionEvent {
    /// When the action occurred
    pub timestamp: DateTime<Utc>,
    /// Which input produced it
    pub kind: ActionKind,
}

impl ActionEvent {
    /// An action happening now.
    pub fn new(kind: ActionKind) -> Self {
        Self {
            timestamp: Utc::now(),
            kind,
        }
    }

    pub fn key() -> Self {
        Self::new(ActionKind::Key)
    }

    pub fn click() -> Self {
        Self::new(ActionKind::Click)
    }

    /// Milliseconds since the Unix epoch.
    pub fn timestamp_millis(&self) -> i64 {
        self.timestamp.timestamp_millis()
    }
}
