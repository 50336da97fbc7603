//! Collection and storage error types

use thiserror::Error;

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Result type for registry operations
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Storage accessor errors
///
/// `Clone` so one failed batch can be reported to every waiting caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    /// The backend failed
    #[error("Storage error: {0}")]
    Backend(String),

    /// The backend cancelled the operation
    #[error("Storage operation cancelled")]
    Cancelled,
}

impl StorageError {
    /// Create a backend error
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }
}

/// Registration errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// Collection name already registered
    #[error("Collection already registered: {0}")]
    Duplicate(String),

    /// Schema failed structural validation
    #[error("Invalid schema for {collection}: {reason}")]
    InvalidSchema { collection: String, reason: String },

    /// Name or type name missing
    #[error("Invalid collection metadata: {0}")]
    InvalidMetadata(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_error_messages() {
        assert_eq!(StorageError::Cancelled.to_string(), "Storage operation cancelled");
        assert!(StorageError::backend("disk").to_string().contains("disk"));
    }
}
