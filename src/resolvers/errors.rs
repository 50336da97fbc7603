//! # Resolver Errors
//!
//! Error types for the generated single and multi resolvers.

use thiserror::Error;

use crate::auth::AccessError;
use crate::collection::StorageError;
use crate::filter::FilterError;

/// Result type for resolver operations
pub type ResolverResult<T> = Result<T, ResolverError>;

/// Resolver errors. All are request-terminal; nothing is retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolverError {
    // ==================
    // Client Errors
    // ==================
    /// Non-empty selector matched nothing and null was not allowed
    #[error("No {collection} document found for {selector}")]
    NotFound { collection: String, selector: String },

    /// Document-level access check failed for a single lookup
    #[error("Permission denied on {collection} document")]
    PermissionDenied { collection: String },

    /// Malformed input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Terms could not be translated
    #[error("{0}")]
    Filter(#[from] FilterError),

    // ==================
    // System Errors
    // ==================
    /// A read rule failed while redacting; the field was denied
    #[error("{0}")]
    Access(#[from] AccessError),

    /// Storage accessor failure, including cancellation
    #[error("{0}")]
    Storage(#[from] StorageError),

    /// Context carries no such collection
    #[error("Collection not registered: {0}")]
    CollectionNotRegistered(String),

    /// Context carries no loader for the collection
    #[error("No loader for collection: {0}")]
    LoaderUnavailable(String),
}

impl ResolverError {
    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            ResolverError::NotFound { .. } => "NOT_FOUND",
            ResolverError::PermissionDenied { .. } => "PERMISSION_DENIED",
            ResolverError::InvalidInput(_) => "INVALID_INPUT",
            ResolverError::Filter(FilterError::Access(_)) => "AUTHORIZATION_RULE_FAILURE",
            ResolverError::Filter(_) => "INVALID_FILTER",
            ResolverError::Access(_) => "AUTHORIZATION_RULE_FAILURE",
            ResolverError::Storage(StorageError::Cancelled) => "STORAGE_CANCELLED",
            ResolverError::Storage(_) => "STORAGE_ERROR",
            ResolverError::CollectionNotRegistered(_) => "COLLECTION_NOT_REGISTERED",
            ResolverError::LoaderUnavailable(_) => "LOADER_UNAVAILABLE",
        }
    }

    /// Returns the HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            ResolverError::NotFound { .. } => 404,
            ResolverError::PermissionDenied { .. } => 403,
            ResolverError::InvalidInput(_) => 400,
            ResolverError::Filter(err) => err.status_code(),
            ResolverError::Access(err) => err.status_code(),
            ResolverError::Storage(_) => 500,
            ResolverError::CollectionNotRegistered(_) => 500,
            ResolverError::LoaderUnavailable(_) => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        let not_found = ResolverError::NotFound {
            collection: "Movies".into(),
            selector: "documentId 'x'".into(),
        };
        assert_eq!(not_found.code(), "NOT_FOUND");
        assert_eq!(not_found.status_code(), 404);

        let denied = ResolverError::PermissionDenied {
            collection: "Movies".into(),
        };
        assert_eq!(denied.code(), "PERMISSION_DENIED");
        assert_eq!(denied.status_code(), 403);
    }

    #[test]
    fn test_rule_failure_through_filter() {
        let err = ResolverError::from(FilterError::from(AccessError::rule_failure("f", "boom")));
        assert_eq!(err.code(), "AUTHORIZATION_RULE_FAILURE");
        assert_eq!(err.status_code(), 500);
    }

    #[test]
    fn test_cancellation_keeps_identity() {
        let err = ResolverError::from(StorageError::Cancelled);
        assert_eq!(err.code(), "STORAGE_CANCELLED");
        assert_eq!(err, ResolverError::Storage(StorageError::Cancelled));
    }

    #[test]
    fn test_denied_message_has_no_content() {
        let denied = ResolverError::PermissionDenied {
            collection: "Movies".into(),
        };
        assert_eq!(denied.to_string(), "Permission denied on Movies document");
    }
}
