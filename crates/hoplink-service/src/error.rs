use hoplink_core::{CacheError, StorageError};
use thiserror::Error;

/// Errors surfaced by the resolution service.
///
/// Every variant maps to a stable machine-readable kind (see
/// [`ResolutionError::kind`]) so API layers can translate errors without
/// string matching.
#[derive(Debug, Clone, Error)]
pub enum ResolutionError {
    /// Malformed URL, short code, or TTL. Caller error, never retried.
    #[error("invalid input: {0}")]
    BadInput(String),
    /// The code is unknown or never existed.
    #[error("short code not found: {0}")]
    NotFound(String),
    /// The code is known but its lifetime has elapsed.
    #[error("short code has expired: {0}")]
    Expired(String),
    /// A caller-supplied code collides with an existing record.
    #[error("short code already exists: {0}")]
    AlreadyExists(String),
    /// Random code generation collided on every attempt.
    #[error("code generation exhausted after {0} attempts")]
    GenerationExhausted(u32),
    /// Unexpected store or cache failure.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ResolutionError {
    /// Stable machine-readable error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::BadInput(_) => "BAD_INPUT",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Expired(_) => "EXPIRED",
            Self::AlreadyExists(_) => "ALREADY_EXISTS",
            Self::GenerationExhausted(_) => "GENERATION_EXHAUSTED",
            Self::Internal(_) => "INTERNAL",
        }
    }
}

impl From<StorageError> for ResolutionError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Conflict(code) => Self::AlreadyExists(code),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<CacheError> for ResolutionError {
    fn from(err: CacheError) -> Self {
        Self::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_are_stable() {
        assert_eq!(ResolutionError::BadInput("x".into()).kind(), "BAD_INPUT");
        assert_eq!(ResolutionError::NotFound("x".into()).kind(), "NOT_FOUND");
        assert_eq!(ResolutionError::Expired("x".into()).kind(), "EXPIRED");
        assert_eq!(
            ResolutionError::AlreadyExists("x".into()).kind(),
            "ALREADY_EXISTS"
        );
        assert_eq!(
            ResolutionError::GenerationExhausted(3).kind(),
            "GENERATION_EXHAUSTED"
        );
        assert_eq!(ResolutionError::Internal("x".into()).kind(), "INTERNAL");
    }

    #[test]
    fn storage_conflict_maps_to_already_exists() {
        let err: ResolutionError = StorageError::Conflict("abc123".into()).into();
        assert!(matches!(err, ResolutionError::AlreadyExists(_)));
    }

    #[test]
    fn other_storage_errors_map_to_internal() {
        let err: ResolutionError = StorageError::Unavailable("down".into()).into();
        assert!(matches!(err, ResolutionError::Internal(_)));
    }
}
