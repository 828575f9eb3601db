//! Error types for entity storage.

/// Errors returned by the entity store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// An entity with this id is already stored
    #[error("Entity {0} already exists")]
    DuplicateId(u64),

    /// No entity with this id is stored
    #[error("Entity {0} not found")]
    NotFound(u64),

    /// The storage engine failed; the collection switches to its fallback
    #[error("Storage engine unavailable: {0}")]
    EngineUnavailable(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A storage task panicked or was cancelled
    #[error("Storage task failed: {0}")]
    TaskFailed(String),

    /// Entity violates a data model invariant
    #[error("Invalid entity: {0}")]
    InvalidEntity(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::EngineUnavailable(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_display() {
        assert_eq!(StoreError::DuplicateId(42).to_string(), "Entity 42 already exists");
        assert_eq!(StoreError::NotFound(7).to_string(), "Entity 7 not found");
        assert!(StoreError::EngineUnavailable("locked".to_string())
            .to_string()
            .contains("locked"));
    }

    #[test]
    fn test_sqlite_errors_map_to_engine_unavailable() {
        let err: StoreError = rusqlite::Error::InvalidQuery.into();
        assert!(matches!(err, StoreError::EngineUnavailable(_)));
    }
}
