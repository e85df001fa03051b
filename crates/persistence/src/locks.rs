//! Per-contact exclusion

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Lazily created async mutex per contact
#[derive(Debug, Default)]
pub struct ContactLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl ContactLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `contact`
    pub async fn lock(&self, contact: &str) -> ContactGuard {
        let mutex = self
            .locks
            .entry(contact.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        // DashMap shard guard is released before awaiting
        let guard = mutex.lock_owned().await;
        ContactGuard {
            contact: contact.to_string(),
            _guard: guard,
        }
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

/// Held while a contact's history is being read and extended
#[derive(Debug)]
pub struct ContactGuard {
    contact: String,
    _guard: OwnedMutexGuard<()>,
}

impl ContactGuard {
    pub fn contact(&self) -> &str {
        &self.contact
    }
}
