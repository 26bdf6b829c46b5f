use crate::shortcode::ShortCode;
use jiff::{Span, Timestamp};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A stored short-URL record.
///
/// `created_at` and `updated_at` are set by the durable store on write.
/// A record whose `expires_at` lies in the past is logically dead even if
/// still physically present in the store or the cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShortUrlRecord {
    /// The short code this record is keyed by. Immutable once created.
    pub short_code: ShortCode,
    /// The original URL that was shortened.
    pub original_url: String,
    /// When the record was created.
    pub created_at: Timestamp,
    /// When the record was last written. Refreshed by the store on update.
    pub updated_at: Timestamp,
    /// When the record expires, if ever. Immutable once created.
    pub expires_at: Option<Timestamp>,
}

impl ShortUrlRecord {
    /// Whether the record's lifetime has elapsed.
    pub fn is_expired(&self) -> bool {
        self.expires_at
            .is_some_and(|expires_at| Timestamp::now() >= expires_at)
    }

    /// Seconds until `expires_at`, floored at zero.
    ///
    /// Returns `None` when the record carries no explicit expiry; callers
    /// substitute their default cache TTL.
    pub fn remaining_ttl(&self) -> Option<Duration> {
        self.expires_at.map(|expires_at| {
            let span: Span = expires_at - Timestamp::now();
            let secs = span.get_seconds();
            if secs > 0 {
                Duration::from_secs(secs as u64)
            } else {
                Duration::ZERO
            }
        })
    }
}
