//! Cache layer implementations for the resolution pipeline.
//!
//! Two families live here: [`RecordCache`](hoplink_core::RecordCache)
//! backends for short-URL records (Moka in-process, Redis) and
//! [`ByteStore`](hoplink_core::ByteStore) backends for raw bytes, used to
//! persist the membership-filter snapshot.

pub mod memory;
pub mod moka;
pub mod redis;

pub use self::moka::MokaRecordCache;
pub use self::redis::{RedisByteStore, RedisRecordCache};
pub use memory::MemoryByteStore;
