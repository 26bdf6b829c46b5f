use crate::config::ServiceConfig;
use crate::error::ResolutionError;
use hoplink_core::{ByteStore, NewUrlRecord, RecordCache, Repository, ShortCode, ShortUrlRecord};
use hoplink_filter::{MembershipFilter, SNAPSHOT_KEY};
use hoplink_generator::CodeGenerator;
use jiff::{SignedDuration, Timestamp};
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, trace, warn};
use url::Url;

/// Result type for resolution operations.
pub type Result<T> = std::result::Result<T, ResolutionError>;

/// Orchestrates short-code resolution across three layers.
///
/// Reads go membership filter → cache → durable store, with the filter
/// short-circuiting codes that were never created and the cache refilled
/// on store hits. Writes go durable store → cache → filter. The store is
/// authoritative for existence; the cache only for freshness; the filter
/// only grows.
///
/// All collaborators are owned explicitly and passed at construction;
/// there is no ambient global state.
pub struct ResolutionService<R, C, S, G> {
    store: Arc<R>,
    cache: Arc<C>,
    snapshots: Arc<S>,
    generator: Arc<G>,
    filter: Arc<RwLock<MembershipFilter>>,
    config: ServiceConfig,
}

impl<R, C, S, G> Clone for ResolutionService<R, C, S, G> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            cache: Arc::clone(&self.cache),
            snapshots: Arc::clone(&self.snapshots),
            generator: Arc::clone(&self.generator),
            filter: Arc::clone(&self.filter),
            config: self.config.clone(),
        }
    }
}

impl<R, C, S, G> ResolutionService<R, C, S, G>
where
    R: Repository,
    C: RecordCache,
    S: ByteStore,
    G: CodeGenerator,
{
    /// Creates a service with an empty membership filter.
    ///
    /// Most callers want [`bootstrap`](Self::bootstrap) instead, which
    /// restores the filter from its persisted snapshot or rebuilds it from
    /// the store. An empty filter denies every lookup until codes are
    /// created or [`rebuild_filter`](Self::rebuild_filter) runs.
    pub fn new(store: R, cache: C, snapshots: S, generator: G, config: ServiceConfig) -> Self {
        let filter = MembershipFilter::new(&config.filter);
        Self {
            store: Arc::new(store),
            cache: Arc::new(cache),
            snapshots: Arc::new(snapshots),
            generator: Arc::new(generator),
            filter: Arc::new(RwLock::new(filter)),
            config,
        }
    }

    /// Creates a service and initializes the membership filter.
    ///
    /// Loads the persisted snapshot when present and readable; otherwise
    /// rebuilds the filter by scanning all codes in the durable store and
    /// persists the rebuilt snapshot.
    pub async fn bootstrap(
        store: R,
        cache: C,
        snapshots: S,
        generator: G,
        config: ServiceConfig,
    ) -> Result<Self> {
        let service = Self::new(store, cache, snapshots, generator, config);

        match service.snapshots.get_bytes(SNAPSHOT_KEY).await {
            Ok(Some(bytes)) => match MembershipFilter::from_bytes(&bytes) {
                Ok(filter) => {
                    debug!("membership filter loaded from snapshot");
                    *service.filter.write() = filter;
                    return Ok(service);
                }
                Err(e) => warn!(error = %e, "filter snapshot is unreadable, rebuilding"),
            },
            Ok(None) => debug!("no filter snapshot present, rebuilding from store"),
            Err(e) => warn!(error = %e, "failed to load filter snapshot, rebuilding"),
        }

        service.rebuild_filter().await?;
        Ok(service)
    }

    /// Resolves a short code to its record.
    pub async fn lookup(&self, code: &str) -> Result<ShortUrlRecord> {
        let Ok(code) = ShortCode::new(code) else {
            // A code that fails validation can never have been created.
            trace!(code, "lookup of syntactically invalid code");
            return Err(ResolutionError::NotFound(code.to_string()));
        };

        let denied = !self.filter.read().may_contain(code.as_str());
        if denied {
            trace!(code = %code, "membership filter denies code");
            return Err(ResolutionError::NotFound(code.to_string()));
        }

        self.resolve(&code).await
    }

    /// Creates a new short-URL record.
    ///
    /// When `custom_code` is absent a random code is generated, retrying a
    /// bounded number of times on collision. When `ttl_seconds` is absent
    /// the record never expires.
    pub async fn create(
        &self,
        original_url: &str,
        custom_code: Option<&str>,
        ttl_seconds: Option<i64>,
    ) -> Result<ShortUrlRecord> {
        validate_url(original_url)?;

        let code = match custom_code {
            Some(raw) => {
                let code = ShortCode::new(raw)
                    .map_err(|e| ResolutionError::BadInput(e.to_string()))?;
                // Any occupant blocks the code, expired or not. This check
                // can race with a concurrent create; the insert below is
                // what actually decides the winner.
                if self.store.find(&code).await?.is_some() {
                    return Err(ResolutionError::AlreadyExists(code.to_string()));
                }
                code
            }
            None => self.generate_vacant_code().await?,
        };

        let ttl = validate_ttl(ttl_seconds)?;
        let expires_at =
            ttl.map(|secs| Timestamp::now() + SignedDuration::from_secs(secs as i64));

        let record = self
            .store
            .insert(NewUrlRecord {
                short_code: code.clone(),
                original_url: original_url.to_string(),
                expires_at,
            })
            .await?;

        let cache_ttl = ttl
            .map(Duration::from_secs)
            .unwrap_or(self.config.default_cache_ttl);
        if let Err(e) = self.cache.set(&code, &record, cache_ttl).await {
            warn!(code = %code, error = %e, "failed to cache created record");
        }

        self.register_code(&code).await;

        debug!(code = %code, url = %record.original_url, "created short url");
        Ok(record)
    }

    /// Replaces the target URL of an existing record.
    ///
    /// Operates on authoritative store state, bypassing the cache; the
    /// cache entry is overwritten unconditionally afterwards. The short
    /// code and expiry are immutable.
    pub async fn update(&self, code: &str, new_url: &str) -> Result<ShortUrlRecord> {
        validate_url(new_url)?;
        let Ok(code) = ShortCode::new(code) else {
            return Err(ResolutionError::NotFound(code.to_string()));
        };

        let Some(current) = self.store.find(&code).await? else {
            return Err(ResolutionError::NotFound(code.to_string()));
        };
        if current.is_expired() {
            return Err(ResolutionError::Expired(code.to_string()));
        }

        let Some(updated) = self.store.update_url(&code, new_url).await? else {
            // Deleted between the existence check and the write.
            return Err(ResolutionError::NotFound(code.to_string()));
        };

        let ttl = updated
            .remaining_ttl()
            .unwrap_or(self.config.default_cache_ttl);
        if let Err(e) = self.cache.set(&code, &updated, ttl).await {
            warn!(code = %code, error = %e, "failed to refresh cache after update");
        }

        debug!(code = %code, url = %updated.original_url, "updated short url");
        Ok(updated)
    }

    /// Removes a record from the store and the cache.
    ///
    /// Deleting an unknown code is `NOT_FOUND`; deleting an expired one is
    /// `EXPIRED` — there is nothing left to delete. The membership filter
    /// is deliberately not updated: it only grows, and deleted codes stay
    /// "possibly present" until the next [`rebuild_filter`](Self::rebuild_filter).
    pub async fn delete(&self, code: &str) -> Result<bool> {
        let Ok(code) = ShortCode::new(code) else {
            return Err(ResolutionError::NotFound(code.to_string()));
        };

        let Some(current) = self.store.find(&code).await? else {
            return Err(ResolutionError::NotFound(code.to_string()));
        };
        if current.is_expired() {
            return Err(ResolutionError::Expired(code.to_string()));
        }

        // Past the existence check, failures downgrade to a boolean: the
        // caller learns the delete did not complete and the log keeps the
        // cause.
        if let Err(e) = self.store.delete(&code).await {
            error!(code = %code, error = %e, "store delete failed");
            return Ok(false);
        }
        if let Err(e) = self.cache.del(&code).await {
            error!(code = %code, error = %e, "cache delete failed");
            return Ok(false);
        }

        debug!(code = %code, "deleted short url");
        Ok(true)
    }

    /// Rebuilds the membership filter from the durable store and persists
    /// the fresh snapshot.
    ///
    /// This is the only way to shrink false-positive exposure accumulated
    /// through deletions. Intended for out-of-band maintenance, not the
    /// request path.
    pub async fn rebuild_filter(&self) -> Result<usize> {
        let codes = self.store.list_codes().await?;

        let mut fresh = MembershipFilter::new(&self.config.filter);
        for code in &codes {
            fresh.insert(code);
        }
        *self.filter.write() = fresh;
        self.persist_filter().await;

        debug!(codes = codes.len(), "membership filter rebuilt from store");
        Ok(codes.len())
    }

    /// Returns a reference to the durable store.
    pub fn store(&self) -> &R {
        &self.store
    }

    /// Returns a reference to the record cache.
    pub fn cache(&self) -> &C {
        &self.cache
    }

    /// Returns a reference to the snapshot byte store.
    pub fn snapshots(&self) -> &S {
        &self.snapshots
    }

    /// Read-through resolution: cache first, durable store on miss, cache
    /// refilled with the record's remaining lifetime.
    ///
    /// The two layers disagree on what expiry means to the caller: an
    /// expired cache entry is evicted and reads as `NOT_FOUND` (the cache
    /// is not authoritative), while an expired store record is `EXPIRED`.
    async fn resolve(&self, code: &ShortCode) -> Result<ShortUrlRecord> {
        match self.cache.get(code).await {
            Ok(Some(record)) => {
                if record.is_expired() {
                    debug!(code = %code, "evicting expired record from cache");
                    if let Err(e) = self.cache.del(code).await {
                        warn!(code = %code, error = %e, "failed to evict expired cache entry");
                    }
                    return Err(ResolutionError::NotFound(code.to_string()));
                }
                debug!(code = %code, "resolved from cache");
                return Ok(record);
            }
            Ok(None) => trace!(code = %code, "cache miss"),
            Err(e) => {
                // The cache buys latency, not correctness; fall through.
                warn!(code = %code, error = %e, "cache read failed, falling back to store");
            }
        }

        let Some(record) = self.store.find(code).await? else {
            trace!(code = %code, "short code not found in store");
            return Err(ResolutionError::NotFound(code.to_string()));
        };
        if record.is_expired() {
            debug!(code = %code, "record has expired");
            return Err(ResolutionError::Expired(code.to_string()));
        }

        let ttl = record
            .remaining_ttl()
            .unwrap_or(self.config.default_cache_ttl);
        if let Err(e) = self.cache.set(code, &record, ttl).await {
            warn!(code = %code, error = %e, "failed to refill cache");
        }

        debug!(code = %code, url = %record.original_url, "resolved from store");
        Ok(record)
    }

    async fn generate_vacant_code(&self) -> Result<ShortCode> {
        let attempts = self.config.max_generation_attempts;

        for attempt in 1..=attempts {
            let code = self.generator.generate();
            if self.store.find(&code).await?.is_none() {
                return Ok(code);
            }
            debug!(code = %code, attempt, "generated code collides, retrying");
        }

        Err(ResolutionError::GenerationExhausted(attempts))
    }

    /// Registers a freshly created code in the filter and persists the
    /// snapshot write-through, skipping the write when the code already
    /// tested positive.
    async fn register_code(&self, code: &ShortCode) {
        let changed = self.filter.write().insert(code.as_str());
        if changed {
            self.persist_filter().await;
        }
    }

    /// Best-effort snapshot persistence. Not transactional with the store
    /// insert: a crash in between leaves the filter momentarily behind,
    /// self-healing on the next full rebuild.
    async fn persist_filter(&self) {
        let bytes = self.filter.read().to_bytes();

        match bytes {
            Ok(bytes) => {
                if let Err(e) = self.snapshots.set_bytes(SNAPSHOT_KEY, &bytes, None).await {
                    warn!(error = %e, "failed to persist filter snapshot");
                }
            }
            Err(e) => warn!(error = %e, "failed to serialize filter snapshot"),
        }
    }
}

fn validate_url(url: &str) -> Result<()> {
    Url::parse(url)
        .map_err(|e| ResolutionError::BadInput(format!("invalid url '{url}': {e}")))?;
    Ok(())
}

fn validate_ttl(ttl_seconds: Option<i64>) -> Result<Option<u64>> {
    match ttl_seconds {
        None => Ok(None),
        Some(ttl) if ttl > 0 => Ok(Some(ttl as u64)),
        Some(ttl) => Err(ResolutionError::BadInput(format!(
            "ttl must be a positive integer, got {ttl}"
        ))),
    }
}
