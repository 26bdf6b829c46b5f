//! The resolution service: create, look up, update, and delete short-URL
//! records across the membership filter, the cache layer, and the durable
//! store, keeping the three layers consistent.
//!
//! This crate is the outermost deliverable of the pipeline. A thin API
//! layer invokes [`ResolutionService`]'s plain operations and translates
//! them to and from its wire format.

pub mod config;
pub mod error;
pub mod service;

pub use config::ServiceConfig;
pub use error::ResolutionError;
pub use service::ResolutionService;
