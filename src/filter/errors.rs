//! # Filter Errors
//!
//! Error types for the Selector/Terms Translator.

use thiserror::Error;

use crate::auth::AccessError;

/// Result type for filter translation
pub type FilterResult<T> = Result<T, FilterError>;

/// Filter translation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    // ==================
    // Client Errors
    // ==================
    /// Operator outside the supported vocabulary
    #[error("Unknown filter operator '{operator}' on field '{field}'")]
    UnknownOperator { field: String, operator: String },

    /// Operator known but operand malformed
    #[error("Invalid condition on field '{field}': {reason}")]
    InvalidCondition { field: String, reason: String },

    /// Malformed sort specification
    #[error("Invalid sort: {0}")]
    InvalidSort(String),

    /// Malformed limit or offset
    #[error("Invalid pagination: {0}")]
    InvalidPagination(String),

    /// Limit exceeds maximum
    #[error("Limit {0} exceeds maximum {1}")]
    LimitExceeded(usize, usize),

    // ==================
    // System Errors
    // ==================
    /// A read rule failed while deciding whether a field may be filtered on
    #[error(transparent)]
    Access(#[from] AccessError),
}

impl FilterError {
    /// Create an invalid condition error
    pub fn invalid_condition(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidCondition {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Returns the HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            FilterError::Access(err) => err.status_code(),
            _ => 400,
        }
    }
}
