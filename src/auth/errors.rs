//! # Access Errors
//!
//! Error types for the Access Filter.

use thiserror::Error;

/// Result type for access filtering
pub type AccessResult<T> = Result<T, AccessError>;

/// Access filter errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccessError {
    /// A field's read rule raised while evaluating. The field was denied.
    #[error("Read rule for field '{field}' failed: {message}")]
    RuleFailure { field: String, message: String },
}

impl AccessError {
    /// Create a rule failure error
    pub fn rule_failure(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RuleFailure {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Returns the HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            // Authorization machinery broke, not the caller
            AccessError::RuleFailure { .. } => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_failure_is_system_error() {
        let err = AccessError::rule_failure("salary", "lookup failed");
        assert_eq!(err.status_code(), 500);
        assert!(err.to_string().contains("salary"));
    }
}
