use crate::error::StorageError;
use crate::record::ShortUrlRecord;
use crate::shortcode::ShortCode;
use async_trait::async_trait;
use jiff::Timestamp;

/// Result type for repository operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// The fields of a record to be inserted.
///
/// `created_at` and `updated_at` are deliberately absent: the store sets
/// them at insert time.
#[derive(Debug, Clone)]
pub struct NewUrlRecord {
    pub short_code: ShortCode,
    pub original_url: String,
    pub expires_at: Option<Timestamp>,
}

/// The durable, authoritative store of short-URL records.
///
/// The store enforces short-code uniqueness at insert time. Expired
/// records are returned by `find` as-is; deciding between "expired" and
/// "not found" is the resolution service's job, not the store's.
#[async_trait]
pub trait Repository: Send + Sync + 'static {
    /// Retrieves the record for a short code, expired or not.
    /// Returns `None` if the code does not exist.
    async fn find(&self, code: &ShortCode) -> Result<Option<ShortUrlRecord>>;

    /// Inserts a new record, stamping `created_at`/`updated_at`.
    ///
    /// Fails with [`StorageError::Conflict`] if any record, live or
    /// expired, already occupies the code. This is the uniqueness-enforcing
    /// write: a concurrent duplicate insert must lose here even if an
    /// earlier existence check raced.
    async fn insert(&self, record: NewUrlRecord) -> Result<ShortUrlRecord>;

    /// Replaces the record's URL and refreshes `updated_at`.
    ///
    /// Returns `None` if the code does not exist (e.g. deleted between the
    /// caller's existence check and this write).
    async fn update_url(&self, code: &ShortCode, new_url: &str) -> Result<Option<ShortUrlRecord>>;

    /// Removes the record for a short code.
    /// Returns `true` if the record existed and was removed.
    async fn delete(&self, code: &ShortCode) -> Result<bool>;

    /// All short codes currently in the store, for membership-filter
    /// rebuilds.
    async fn list_codes(&self) -> Result<Vec<String>>;
}
