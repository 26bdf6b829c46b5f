use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use hoplink_core::repository::Result;
use hoplink_core::{NewUrlRecord, Repository, ShortCode, ShortUrlRecord, StorageError};
use jiff::Timestamp;
use std::sync::Arc;

/// In-memory storage entry for a URL mapping.
#[derive(Debug, Clone)]
struct StoredEntry {
    original_url: String,
    created_at: Timestamp,
    updated_at: Timestamp,
    expires_at: Option<Timestamp>,
}

impl StoredEntry {
    fn to_record(&self, code: &str) -> ShortUrlRecord {
        ShortUrlRecord {
            short_code: ShortCode::new_unchecked(code),
            original_url: self.original_url.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
            expires_at: self.expires_at,
        }
    }
}

/// In-memory implementation of the [`Repository`] trait using DashMap.
///
/// DashMap's sharded locks let concurrent operations on different codes
/// proceed without blocking each other, and its entry API makes the
/// conflict check and insert a single atomic step, which is what the
/// resolution service relies on when two creates race on one code.
///
/// Clones share the same underlying map.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    storage: Arc<DashMap<String, StoredEntry>>,
}

impl InMemoryStore {
    /// Creates a new in-memory store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Repository for InMemoryStore {
    async fn find(&self, code: &ShortCode) -> Result<Option<ShortUrlRecord>> {
        // Expired entries are returned as-is; the caller decides whether
        // expired and absent look the same.
        Ok(self
            .storage
            .get(code.as_str())
            .map(|entry| entry.to_record(code.as_str())))
    }

    async fn insert(&self, record: NewUrlRecord) -> Result<ShortUrlRecord> {
        let now = Timestamp::now();
        let key = record.short_code.as_str().to_owned();

        // Any occupant conflicts, expired or not. Reusing a code requires
        // deleting the old record first.
        match self.storage.entry(key) {
            Entry::Occupied(_) => Err(StorageError::Conflict(record.short_code.to_string())),
            Entry::Vacant(vacant) => {
                let entry = StoredEntry {
                    original_url: record.original_url,
                    created_at: now,
                    updated_at: now,
                    expires_at: record.expires_at,
                };
                let stored = entry.to_record(record.short_code.as_str());
                vacant.insert(entry);
                Ok(stored)
            }
        }
    }

    async fn update_url(&self, code: &ShortCode, new_url: &str) -> Result<Option<ShortUrlRecord>> {
        let Some(mut entry) = self.storage.get_mut(code.as_str()) else {
            return Ok(None);
        };

        entry.original_url = new_url.to_owned();
        entry.updated_at = Timestamp::now();
        Ok(Some(entry.to_record(code.as_str())))
    }

    async fn delete(&self, code: &ShortCode) -> Result<bool> {
        Ok(self.storage.remove(code.as_str()).is_some())
    }

    async fn list_codes(&self) -> Result<Vec<String>> {
        Ok(self
            .storage
            .iter()
            .map(|entry| entry.key().clone())
            .collect())
    }
}
