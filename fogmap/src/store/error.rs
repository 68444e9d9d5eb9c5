//! Error types for the region store.

use thiserror::Error;

use crate::region::RegionError;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur during region store operations.
///
/// An update that matches no row is not an error; `update` returns
/// `Ok(false)`. Rows that cannot be parsed are skipped, never surfaced.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing storage could not be opened at startup.
    ///
    /// Every call on an unavailable store fails fast with this error.
    #[error("Region store is unavailable")]
    Unavailable,

    /// Failed to open or initialize the database file.
    #[error("Failed to open region store at {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: rusqlite::Error,
    },

    /// A write was rejected by the storage engine.
    #[error("Write failed: {0}")]
    WriteFailed(#[source] rusqlite::Error),

    /// A read query could not be executed.
    #[error("Query failed: {0}")]
    QueryFailed(#[source] rusqlite::Error),

    /// The record violates a storage constraint.
    #[error("Constraint violated: {0}")]
    Constraint(String),
}

impl From<RegionError> for StoreError {
    fn from(e: RegionError) -> Self {
        StoreError::Constraint(e.to_string())
    }
}

impl StoreError {
    /// Whether the store is permanently unusable for this session.
    pub fn is_fatal(&self) -> bool {
        matches!(self, StoreError::Unavailable | StoreError::Open { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_display() {
        assert_eq!(
            StoreError::Unavailable.to_string(),
            "Region store is unavailable"
        );
        let err = StoreError::Constraint("region id already assigned".to_string());
        assert!(err.to_string().contains("region id already assigned"));
    }

    #[test]
    fn test_from_region_error() {
        let err: StoreError = RegionError::ZeroRadius.into();
        assert!(matches!(err, StoreError::Constraint(ref msg) if msg.contains("Radius")));
    }

    #[test]
    fn test_fatal_classification() {
        assert!(StoreError::Unavailable.is_fatal());
        assert!(!StoreError::Constraint("x".into()).is_fatal());
        assert!(!StoreError::WriteFailed(rusqlite::Error::InvalidQuery).is_fatal());
    }
}
