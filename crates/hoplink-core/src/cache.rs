use crate::error::CacheError;
use crate::record::ShortUrlRecord;
use crate::shortcode::ShortCode;
use async_trait::async_trait;
use std::time::Duration;

/// Result type for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;

/// A time-expiring cache for short-URL records.
///
/// The cache mirrors durable records for low-latency reads and is
/// authoritative only for freshness, never for existence: it is always
/// safe to drop an entry and recompute from the durable store.
#[async_trait]
pub trait RecordCache: Send + Sync + 'static {
    /// Get a record from the cache.
    ///
    /// Returns `Ok(None)` if the key is not in the cache.
    async fn get(&self, code: &ShortCode) -> Result<Option<ShortUrlRecord>>;

    /// Store a record in the cache, overwriting unconditionally.
    ///
    /// The entry is dropped once `ttl` has elapsed.
    async fn set(&self, code: &ShortCode, record: &ShortUrlRecord, ttl: Duration) -> Result<()>;

    /// Remove a record from the cache.
    ///
    /// It is not an error if the key does not exist.
    async fn del(&self, code: &ShortCode) -> Result<()>;
}

/// Raw byte storage in the cache layer's backing store.
///
/// The resolution pipeline uses a single well-known key to persist the
/// membership filter snapshot across restarts.
#[async_trait]
pub trait ByteStore: Send + Sync + 'static {
    /// Get the bytes stored under `key`, if any.
    async fn get_bytes(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Store bytes under `key`, with an optional expiry.
    async fn set_bytes(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> Result<()>;

    /// Remove the bytes stored under `key`.
    async fn del_bytes(&self, key: &str) -> Result<()>;
}
