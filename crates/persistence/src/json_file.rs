//! JSON file history store
//!
//! The whole store is kept in memory and rewritten to a single pretty-printed
//! JSON object (`contact -> [turn, ...]`) after every append. Writes go to a
//! sibling temp file that is renamed over the target.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

use chat_agent_core::{Turn, TurnRole};

use crate::{ContactGuard, ContactHistory, ContactLocks, HistoryRepository, PersistenceError};

pub struct JsonFileHistoryStore {
    path: PathBuf,
    histories: Mutex<HashMap<String, ContactHistory>>,
    /// Serializes snapshot + write so files land in mutation order
    write_lock: Mutex<()>,
    locks: ContactLocks,
}

impl JsonFileHistoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            histories: Mutex::new(HashMap::new()),
            write_lock: Mutex::new(()),
            locks: ContactLocks::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    async fn persist(&self) -> Result<(), PersistenceError> {
        let _write = self.write_lock.lock().await;

        let json = {
            let histories = self.histories.lock().await;
            let ordered: BTreeMap<&str, &ContactHistory> =
                histories.iter().map(|(k, v)| (k.as_str(), v)).collect();
            serde_json::to_string_pretty(&ordered)?
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| PersistenceError::io(parent, e))?;
        }

        let temp = self.temp_path();
        tokio::fs::write(&temp, json.as_bytes())
            .await
            .map_err(|e| PersistenceError::io(&temp, e))?;
        tokio::fs::rename(&temp, &self.path)
            .await
            .map_err(|e| PersistenceError::io(&self.path, e))?;

        Ok(())
    }
}

#[async_trait]
impl HistoryRepository for JsonFileHistoryStore {
    async fn load(&self) -> Result<usize, PersistenceError> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %self.path.display(), "No history file yet");
                return Ok(0);
            }
            Err(e) => return Err(PersistenceError::io(&self.path, e)),
        };

        if raw.trim().is_empty() {
            return Ok(0);
        }

        let mut loaded: HashMap<String, ContactHistory> =
            serde_json::from_str(&raw).map_err(|e| PersistenceError::Corrupt {
                path: self.path.display().to_string(),
                message: e.to_string(),
            })?;

        for (contact, history) in loaded.iter_mut() {
            let evicted = history.enforce_cap();
            if evicted > 0 {
                tracing::debug!(contact = %contact, evicted, "Trimmed oversized history on load");
            }
        }

        let count = loaded.len();
        *self.histories.lock().await = loaded;
        Ok(count)
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
        {
            let mut histories = self.histories.lock().await;
            let history = histories.entry(contact.to_string()).or_default();
            history.push(turn.clone());
            tracing::trace!(contact = %contact, role = %role, len = history.len(), "Turn appended");
        }

        if let Err(e) = self.persist().await {
            tracing::error!(
                path = %self.path.display(),
                contact = %contact,
                error = %e,
                "Failed to persist conversation history"
            );
        }

        turn
    }

    async fn flush(&self) -> Result<(), PersistenceError> {
        self.persist().await
    }

    async fn lock_contact(&self, contact: &str) -> ContactGuard {
        self.locks.lock(contact).await
    }

    async fn contact_count(&self) -> usize {
        self.histories.lock().await.len()
    }

    fn is_durable(&self) -> bool {
        true
    }
}
