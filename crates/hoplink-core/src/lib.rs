//! Core types and traits for the hoplink short-code resolution pipeline.
//!
//! This crate defines the shared vocabulary of the three resolution layers:
//! the validated [`ShortCode`], the [`ShortUrlRecord`] entity, and the
//! traits implemented by the cache layer ([`RecordCache`], [`ByteStore`])
//! and the durable store ([`Repository`]).

pub mod cache;
pub mod error;
pub mod record;
pub mod repository;
pub mod shortcode;

pub use cache::{ByteStore, RecordCache};
pub use error::{CacheError, CoreError, StorageError};
pub use record::ShortUrlRecord;
pub use repository::{NewUrlRecord, Repository};
pub use shortcode::ShortCode;
