//! Probabilistic membership filter for fast negative lookups.
//!
//! The filter records every short code ever issued and answers "could this
//! code exist?" in O(1). A `false` answer is a guarantee of absence, so the
//! resolution service can fail such lookups without touching the cache or
//! the durable store. A `true` answer means "check further" — false
//! positives are expected and bounded by the configured rate.
//!
//! The filter only grows. Deletions are never recorded; the only way to
//! shrink false-positive exposure after many deletes is a full rebuild from
//! the durable store.

pub mod membership;

pub use membership::{hash_rounds, FilterConfig, MembershipFilter, SNAPSHOT_KEY};
