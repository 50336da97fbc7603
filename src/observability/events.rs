//! Observable events for aeroquery
//!
//! Events are explicit and typed. Each maps to a stable code used as the
//! `event` field of a log line.

use std::fmt;

/// Observable events in the resolution path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Registration
    /// Collections registered and query handles built
    CollectionsRegistered,

    // Execution context
    /// Fresh per-request context built
    ContextBuilt,

    // Query operations
    /// Query received by the runner
    QueryReceived,
    /// Query executed without engine errors
    QueryExecuted,
    /// Engine reported errors; first message surfaced
    QueryRejected,

    // Loader
    /// Loader dispatched one batched storage fetch
    LoaderBatch,

    // Resolution
    /// Single lookup matched nothing
    DocumentNotFound,
    /// Document-level access check denied a document
    AccessDenied,
    /// A read rule raised while being evaluated
    RuleFailure,
    /// A filter clause on an unreadable field was dropped
    FilterDropped,
}

impl Event {
    /// Returns the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::CollectionsRegistered => "COLLECTIONS_REGISTERED",
            Event::ContextBuilt => "CONTEXT_BUILT",
            Event::QueryReceived => "QUERY_RECEIVED",
            Event::QueryExecuted => "QUERY_EXECUTED",
            Event::QueryRejected => "QUERY_REJECTED",
            Event::LoaderBatch => "LOADER_BATCH",
            Event::DocumentNotFound => "DOCUMENT_NOT_FOUND",
            Event::AccessDenied => "ACCESS_DENIED",
            Event::RuleFailure => "RULE_FAILURE",
            Event::FilterDropped => "FILTER_DROPPED",
        }
    }

    /// Rejections are logged at WARN
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Event::QueryRejected | Event::AccessDenied | Event::RuleFailure
        )
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
