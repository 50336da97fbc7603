//! # Query Errors
//!
//! Error types for the Execution Context Builder and query composition.

use thiserror::Error;

use crate::settings::SettingsError;

/// Result type for query operations
pub type QueryResult<T> = Result<T, QueryError>;

/// Query errors
#[derive(Debug, Error)]
pub enum QueryError {
    /// The engine reported errors; carries the first message
    #[error("{0}")]
    Engine(String),

    /// Named fragment is not registered
    #[error("Unknown fragment: {0}")]
    UnknownFragment(String),

    /// Fragment text has no recognizable name
    #[error("Invalid fragment text: {0}")]
    InvalidFragment(String),

    /// Response lacks the expected data path
    #[error("Missing data at '{0}'")]
    MissingData(String),

    /// No such collection in the registry
    #[error("Collection not registered: {0}")]
    CollectionNotRegistered(String),

    /// Runner settings are unusable
    #[error("Invalid settings: {0}")]
    Settings(#[from] SettingsError),

    /// Input or output could not be converted
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl QueryError {
    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            QueryError::Engine(_) => "QUERY_ENGINE_ERROR",
            QueryError::UnknownFragment(_) => "UNKNOWN_FRAGMENT",
            QueryError::InvalidFragment(_) => "INVALID_FRAGMENT",
            QueryError::MissingData(_) => "MISSING_DATA",
            QueryError::CollectionNotRegistered(_) => "COLLECTION_NOT_REGISTERED",
            QueryError::Serialization(_) => "SERIALIZATION_ERROR",
            QueryError::Settings(_) => "INVALID_SETTINGS",
        }
    }

    /// Returns the HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            QueryError::UnknownFragment(_) | QueryError::InvalidFragment(_) => 400,
            QueryError::Serialization(_) => 400,
            QueryError::CollectionNotRegistered(_) => 404,
            QueryError::Engine(_) | QueryError::MissingData(_) | QueryError::Settings(_) => 500,
        }
    }
}
