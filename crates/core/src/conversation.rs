//! Conversation turn types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum number of turns kept per contact
pub const MAX_HISTORY_TURNS: usize = 50;

/// Role in a conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnRole {
    /// Contact message
    User,
    /// Assistant reply
    Assistant,
    /// System message (instructions)
    System,
}

impl TurnRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            TurnRole::User => "user",
            TurnRole::Assistant => "assistant",
            TurnRole::System => "system",
        }
    }
}

impl std::fmt::Display for TurnRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single turn in a contact's history
///
/// Persisted as `{"role": "...", "content": "...", "timestamp": <epoch ms>}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    /// Role of the speaker
    pub role: TurnRole,
    /// Content of the turn
    pub content: String,
    /// When the turn was appended
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
}

impl Turn {
    /// Create a new turn stamped with the current time
    ///
    /// The stamp is truncated to milliseconds, the persisted precision.
    pub fn new(role: TurnRole, content: impl Into<String>) -> Self {
        let now = Utc::now();
        let timestamp = DateTime::from_timestamp_millis(now.timestamp_millis()).unwrap_or(now);
        Self {
            role,
            content: content.into(),
            timestamp,
        }
    }

    /// Create a user turn
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(TurnRole::User, content)
    }

    /// Create an assistant turn
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(TurnRole::Assistant, content)
    }

    /// Timestamp as epoch milliseconds
    pub fn timestamp_ms(&self) -> i64 {
        self.timestamp.timestamp_millis()
    }
}
