//! Conversation history persistence
//!
//! Provides the per-contact conversation store:
//! - `HistoryRepository` trait shared by every backend
//! - `JsonFileHistoryStore`: in-memory map written through to a JSON file
//! - `InMemoryHistoryStore`: same behavior without durability
//! - `ContactLocks`: per-contact exclusion for read-modify-append sequences

pub mod error;
pub mod history;
pub mod json_file;
pub mod locks;
pub mod memory;

pub use error::PersistenceError;
pub use history::{ContactHistory, HistoryRepository};
pub use json_file::JsonFileHistoryStore;
pub use locks::{ContactGuard, ContactLocks};
pub use memory::InMemoryHistoryStore;

use std::sync::Arc;

use chat_agent_config::Settings;

/// Build the configured store and load any durable state
///
/// Load failures are logged and leave an empty store; they never abort
/// startup.
pub async fn init(settings: &Settings) -> Arc<dyn HistoryRepository> {
    if !settings.persistence.enabled {
        tracing::info!("History persistence disabled, using in-memory store");
        return Arc::new(InMemoryHistoryStore::new());
    }

    let store = JsonFileHistoryStore::new(settings.paths.history_file.clone());
    match store.load().await {
        Ok(contacts) => tracing::info!(
            path = %store.path().display(),
            contacts,
            "Conversation history loaded"
        ),
        Err(e) => tracing::error!(
            path = %store.path().display(),
            error = %e,
            "Failed to load conversation history, starting empty"
        ),
    }
    Arc::new(store)
}
