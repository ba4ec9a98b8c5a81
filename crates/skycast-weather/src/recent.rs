//! Recently searched locations, persisted between sessions.

use std::sync::Arc;

use skycast_core::storage::RECENT_SEARCHES_KEY;
use skycast_core::{KeyValueStore, StorageError};

/// Maximum number of remembered searches.
pub const MAX_RECENT_SEARCHES: usize = 5;

/// Most-recent-first list of distinct search queries.
pub struct RecentSearches {
    storage: Arc<dyn KeyValueStore>,
    entries: Vec<String>,
}

impl RecentSearches {
    /// Load the list from storage. Unreadable or malformed data yields an empty list.
    pub fn load(storage: Arc<dyn KeyValueStore>) -> Self {
        let entries = match storage.get_item(RECENT_SEARCHES_KEY) {
            Ok(Some(raw)) => match serde_json::from_str::<Vec<String>>(&raw) {
                Ok(mut entries) => {
                    entries.truncate(MAX_RECENT_SEARCHES);
                    entries
                }
                Err(e) => {
                    tracing::warn!("Ignoring malformed recent searches: {}", e);
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                tracing::warn!("Failed to read recent searches: {}", e);
                Vec::new()
            }
        };

        Self { storage, entries }
    }

    /// Record a query at the front of the list and persist it.
    ///
    /// Case-insensitive duplicates are dropped; blank queries are ignored.
    pub fn add(&mut self, query: &str) -> Result<(), StorageError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(());
        }

        let lowered = query.to_lowercase();
        self.entries.retain(|existing| existing.to_lowercase() != lowered);
        self.entries.insert(0, query.to_string());
        self.entries.truncate(MAX_RECENT_SEARCHES);

        let json = serde_json::to_string(&self.entries)
            .map_err(|e| StorageError::Write(e.to_string()))?;
        self.storage.set_item(RECENT_SEARCHES_KEY, &json)
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for RecentSearches {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecentSearches")
            .field("entries", &self.entries)
            .finish()
    }
}
