//! History repository trait and the bounded per-contact history

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use chat_agent_core::{Turn, TurnRole, MAX_HISTORY_TURNS};

use crate::{ContactGuard, PersistenceError};

/// Ordered turns of one contact, oldest first, never longer than the cap
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContactHistory {
    turns: VecDeque<Turn>,
}

impl ContactHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a turn, evicting the oldest ones beyond the cap
    pub fn push(&mut self, turn: Turn) {
        self.turns.push_back(turn);
        self.enforce_cap();
    }

    /// Drop the oldest turns until the cap holds
    pub fn enforce_cap(&mut self) -> usize {
        let excess = self.turns.len().saturating_sub(MAX_HISTORY_TURNS);
        self.turns.drain(..excess);
        excess
    }

    pub fn turns(&self) -> impl Iterator<Item = &Turn> {
        self.turns.iter()
    }

    pub fn to_vec(&self) -> Vec<Turn> {
        self.turns.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

/// Conversation store interface
///
/// Histories are created lazily on first reference and never deleted.
/// Every append is persisted before it returns (write-through); persistence
/// failures are logged and the in-memory state keeps operating.
#[async_trait]
pub trait HistoryRepository: Send + Sync + 'static {
    /// Read durable state into memory, returning the number of contacts
    async fn load(&self) -> Result<usize, PersistenceError>;

    /// Snapshot of a contact's history, oldest first
    async fn history(&self, contact: &str) -> Vec<Turn>;

    /// Append a turn stamped with the current time
    async fn append_turn(&self, contact: &str, role: TurnRole, content: &str) -> Turn;

    /// Persist the whole store
    async fn flush(&self) -> Result<(), PersistenceError>;

    /// Exclusive access to one contact for read-modify-append sequences
    async fn lock_contact(&self, contact: &str) -> ContactGuard;

    /// Number of contacts with a history
    async fn contact_count(&self) -> usize;

    /// Whether appends survive a restart
    fn is_durable(&self) -> bool;
}
