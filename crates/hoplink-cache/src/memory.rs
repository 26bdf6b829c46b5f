use async_trait::async_trait;
use dashmap::DashMap;
use hoplink_core::cache::Result;
use hoplink_core::ByteStore;
use jiff::{SignedDuration, Timestamp};
use std::sync::Arc;
use std::time::Duration;
use tracing::trace;

/// In-memory [`ByteStore`] backed by a DashMap.
///
/// Used by single-node deployments and tests in place of Redis. Expiry is
/// enforced lazily on read. Clones share the same underlying map.
#[derive(Debug, Clone, Default)]
pub struct MemoryByteStore {
    entries: Arc<DashMap<String, StoredBytes>>,
}

#[derive(Debug, Clone)]
struct StoredBytes {
    value: Vec<u8>,
    expires_at: Option<Timestamp>,
}

impl StoredBytes {
    fn is_expired(&self) -> bool {
        self.expires_at
            .is_some_and(|expires_at| Timestamp::now() >= expires_at)
    }
}

impl MemoryByteStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ByteStore for MemoryByteStore {
    async fn get_bytes(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let Some(entry) = self.entries.get(key) else {
            return Ok(None);
        };

        if entry.is_expired() {
            drop(entry);
            self.entries.remove(key);
            return Ok(None);
        }

        Ok(Some(entry.value.clone()))
    }

    async fn set_bytes(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> Result<()> {
        trace!(key, len = value.len(), "storing bytes in memory");

        let expires_at = ttl.map(|ttl| {
            Timestamp::now() + SignedDuration::from_secs(ttl.as_secs().min(i64::MAX as u64) as i64)
        });
        self.entries.insert(
            key.to_string(),
            StoredBytes {
                value: value.to_vec(),
                expires_at,
            },
        );
        Ok(())
    }

    async fn del_bytes(&self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}
