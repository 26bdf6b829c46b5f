use async_trait::async_trait;
use hoplink_core::cache::Result;
use hoplink_core::{ByteStore, CacheError, RecordCache, ShortCode, ShortUrlRecord};
use redis::AsyncCommands;
use std::time::Duration;
use tracing::{debug, trace, warn};

fn map_redis_error(err: redis::RedisError) -> CacheError {
    if err.is_timeout() {
        CacheError::Timeout(err.to_string())
    } else if err.is_connection_refusal() || err.is_io_error() {
        CacheError::Unavailable(err.to_string())
    } else {
        CacheError::Operation(err.to_string())
    }
}

/// A Redis-based implementation of [`RecordCache`].
///
/// Records are stored as JSON strings under a configurable key prefix,
/// with the per-entry TTL applied via `SET EX`.
#[derive(Debug, Clone)]
pub struct RedisRecordCache {
    conn: redis::aio::MultiplexedConnection,
    key_prefix: String,
}

impl RedisRecordCache {
    /// Creates a new Redis record cache with the default `hl:url:` prefix.
    pub fn new(conn: redis::aio::MultiplexedConnection) -> Self {
        Self {
            conn,
            key_prefix: "hl:url:".to_string(),
        }
    }

    /// Creates a new Redis record cache with a custom key prefix.
    pub fn with_prefix(
        conn: redis::aio::MultiplexedConnection,
        key_prefix: impl Into<String>,
    ) -> Self {
        Self {
            conn,
            key_prefix: key_prefix.into(),
        }
    }

    fn cache_key(&self, code: &ShortCode) -> String {
        format!("{}{}", self.key_prefix, code.as_str())
    }
}

#[async_trait]
impl RecordCache for RedisRecordCache {
    async fn get(&self, code: &ShortCode) -> Result<Option<ShortUrlRecord>> {
        let key = self.cache_key(code);
        trace!(code = %code, "fetching record from Redis cache");

        let mut conn = self.conn.clone();
        match conn.get::<_, Option<String>>(&key).await {
            Ok(Some(cached)) => {
                debug!(code = %code, "cache hit in Redis");
                match serde_json::from_str::<ShortUrlRecord>(&cached) {
                    Ok(record) => Ok(Some(record)),
                    Err(e) => {
                        // Undecodable value: treat as a miss, the store is
                        // authoritative anyway.
                        warn!(code = %code, error = %e, "failed to deserialize cached record");
                        Ok(None)
                    }
                }
            }
            Ok(None) => {
                trace!(code = %code, "cache miss in Redis");
                Ok(None)
            }
            Err(e) => {
                warn!(code = %code, error = %e, "Redis error on get");
                Err(map_redis_error(e))
            }
        }
    }

    async fn set(&self, code: &ShortCode, record: &ShortUrlRecord, ttl: Duration) -> Result<()> {
        let key = self.cache_key(code);
        trace!(code = %code, ttl_secs = ttl.as_secs(), "storing record in Redis cache");

        let secs = ttl.as_secs();
        if secs == 0 {
            // Sub-second remaining lifetime: nothing worth caching.
            trace!(code = %code, "skipping cache write for zero TTL");
            return Ok(());
        }

        let json = serde_json::to_string(record)
            .map_err(|e| CacheError::Serialization(e.to_string()))?;

        let mut conn = self.conn.clone();
        match conn.set_ex::<_, _, ()>(&key, json, secs).await {
            Ok(()) => {
                debug!(code = %code, "cached record in Redis");
                Ok(())
            }
            Err(e) => {
                warn!(code = %code, error = %e, "failed to cache record in Redis");
                Err(map_redis_error(e))
            }
        }
    }

    async fn del(&self, code: &ShortCode) -> Result<()> {
        let key = self.cache_key(code);
        trace!(code = %code, "removing record from Redis cache");

        let mut conn = self.conn.clone();
        match conn.del::<_, ()>(&key).await {
            Ok(()) => {
                debug!(code = %code, "removed record from Redis cache");
                Ok(())
            }
            Err(e) => {
                warn!(code = %code, error = %e, "failed to remove record from Redis cache");
                Err(map_redis_error(e))
            }
        }
    }
}

/// A Redis-based implementation of [`ByteStore`].
///
/// Used for the membership-filter snapshot, which is stored as a raw byte
/// string under its well-known key.
#[derive(Debug, Clone)]
pub struct RedisByteStore {
    conn: redis::aio::MultiplexedConnection,
}

impl RedisByteStore {
    pub fn new(conn: redis::aio::MultiplexedConnection) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl ByteStore for RedisByteStore {
    async fn get_bytes(&self, key: &str) -> Result<Option<Vec<u8>>> {
        trace!(key, "fetching bytes from Redis");

        let mut conn = self.conn.clone();
        conn.get::<_, Option<Vec<u8>>>(key)
            .await
            .map_err(map_redis_error)
    }

    async fn set_bytes(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> Result<()> {
        trace!(key, len = value.len(), "storing bytes in Redis");

        let mut conn = self.conn.clone();
        match ttl {
            Some(ttl) => conn
                .set_ex::<_, _, ()>(key, value, ttl.as_secs().max(1))
                .await
                .map_err(map_redis_error),
            None => conn
                .set::<_, _, ()>(key, value)
                .await
                .map_err(map_redis_error),
        }
    }

    async fn del_bytes(&self, key: &str) -> Result<()> {
        trace!(key, "removing bytes from Redis");

        let mut conn = self.conn.clone();
        conn.del::<_, ()>(key).await.map_err(map_redis_error)
    }
}

// Unit coverage for the Redis backends lives with the in-process
// implementations; exercising these against a live Redis requires an
// external instance and belongs in an environment-gated integration suite.
