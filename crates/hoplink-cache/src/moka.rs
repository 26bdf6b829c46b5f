use async_trait::async_trait;
use hoplink_core::cache::Result;
use hoplink_core::{RecordCache, ShortCode, ShortUrlRecord};
use moka::future::Cache;
use moka::Expiry;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

const DEFAULT_CAPACITY: u64 = 10_000;

/// A cached record together with the TTL it was stored under.
#[derive(Debug, Clone)]
struct CachedEntry {
    record: ShortUrlRecord,
    ttl: Duration,
}

/// Per-entry expiration policy: each entry lives for the TTL it carried at
/// insert time.
struct EntryTtl;

impl Expiry<String, CachedEntry> for EntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        entry: &CachedEntry,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(entry.ttl)
    }
}

/// An in-process cache implementation using Moka.
///
/// Ideal for single-node deployments or tests; multi-node deployments use
/// [`RedisRecordCache`](crate::RedisRecordCache) so that invalidations are
/// shared.
#[derive(Debug, Clone)]
pub struct MokaRecordCache {
    cache: Cache<String, CachedEntry>,
}

impl MokaRecordCache {
    /// Creates a cache with the default maximum capacity of 10,000 entries.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Creates a cache bounded to `max_capacity` entries.
    pub fn with_capacity(max_capacity: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_capacity)
            .expire_after(EntryTtl)
            .build();
        Self { cache }
    }
}

impl Default for MokaRecordCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RecordCache for MokaRecordCache {
    async fn get(&self, code: &ShortCode) -> Result<Option<ShortUrlRecord>> {
        trace!(code = %code, "fetching record from Moka cache");

        match self.cache.get(code.as_str()).await {
            Some(entry) => {
                debug!(code = %code, "cache hit in Moka");
                Ok(Some(entry.record))
            }
            None => {
                trace!(code = %code, "cache miss in Moka");
                Ok(None)
            }
        }
    }

    async fn set(&self, code: &ShortCode, record: &ShortUrlRecord, ttl: Duration) -> Result<()> {
        trace!(code = %code, ttl_secs = ttl.as_secs(), "storing record in Moka cache");

        let entry = CachedEntry {
            record: record.clone(),
            ttl,
        };
        self.cache.insert(code.as_str().to_string(), entry).await;
        Ok(())
    }

    async fn del(&self, code: &ShortCode) -> Result<()> {
        trace!(code = %code, "removing record from Moka cache");

        self.cache.invalidate(code.as_str()).await;
        Ok(())
    }
}
