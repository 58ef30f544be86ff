//! RagKit error taxonomy.
//!
//! Two families of failures flow through the engine:
//! - **Configuration / integrity errors** (`DimensionMismatch`, `DuplicateId`,
//!   `CorruptStore`, `ApiKeyMissing`, `Config`) — fatal, never retried.
//! - **Transient errors** (`Http`, `Provider`, `Timeout`) — recovered locally
//!   per query variant; they only escalate (`RecallFailed`) when every
//!   variant of a stage fails.

use thiserror::Error;

/// All errors produced by RagKit crates.
#[derive(Error, Debug)]
pub enum RagKitError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("API key missing for provider: {0}")]
    ApiKeyMissing(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Vector dimension mismatch: store expects {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Duplicate passage id: {0}")]
    DuplicateId(String),

    #[error("Corrupt store: {0}")]
    CorruptStore(String),

    #[error("Every recall variant failed: {0}")]
    RecallFailed(String),

    #[error("Deadline exceeded: {0}")]
    Timeout(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl RagKitError {
    /// Whether this error signals misconfiguration or data corruption
    /// rather than a transient external failure.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Config(_)
                | Self::ApiKeyMissing(_)
                | Self::DimensionMismatch { .. }
                | Self::DuplicateId(_)
                | Self::CorruptStore(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, RagKitError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(RagKitError::DimensionMismatch { expected: 3, actual: 4 }.is_fatal());
        assert!(RagKitError::DuplicateId("x".into()).is_fatal());
        assert!(RagKitError::CorruptStore("count mismatch".into()).is_fatal());
        assert!(!RagKitError::Http("503".into()).is_fatal());
        assert!(!RagKitError::Timeout("deadline".into()).is_fatal());
        assert!(!RagKitError::RecallFailed("all failed".into()).is_fatal());
    }

    #[test]
    fn test_display() {
        let e = RagKitError::DimensionMismatch { expected: 1536, actual: 768 };
        assert_eq!(
            e.to_string(),
            "Vector dimension mismatch: store expects 1536, got 768"
        );
    }
}
