//! In-memory history store (persistence disabled, tests)

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;

use chat_agent_core::{Turn, TurnRole};

use crate::{ContactGuard, ContactHistory, ContactLocks, HistoryRepository, PersistenceError};

#[derive(Debug, Default)]
pub struct InMemoryHistoryStore {
    histories: Mutex<HashMap<String, ContactHistory>>,
    locks: ContactLocks,
}

impl InMemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HistoryRepository for InMemoryHistoryStore {
    async fn load(&self) -> Result<usize, PersistenceError> {
        Ok(self.histories.lock().await.len())
    }

    async fn history(&self, contact: &str) -> Vec<Turn> {
        self.histories
            .lock()
            .await
            .entry(contact.to_string())
            .or_default()
            .to_vec()
    }

    async fn append_turn(&self, contact: &str, role: TurnRole, content: &str) -> Turn {
        let turn = Turn::new(role, content);
        self.histories
            .lock()
            .await
            .entry(contact.to_string())
            .or_default()
            .push(turn.clone());
        turn
    }

    async fn flush(&self) -> Result<(), PersistenceError> {
        Ok(())
    }

    async fn lock_contact(&self, contact: &str) -> ContactGuard {
        self.locks.lock(contact).await
    }

    async fn contact_count(&self) -> usize {
        self.histories.lock().await.len()
    }

    fn is_durable(&self) -> bool {
        false
    }
}
