//! # Access Filter
//!
//! Document visibility and field redaction.
//!
//! Document-level access defaults open: a collection without a rule shows
//! every document. Field-level access is closed by declaration: a field is
//! returned only if the schema declares it and its read rule passes.
//!
//! Everything here is synchronous and side-effect free apart from logging.

use std::fmt;
use std::sync::Arc;

use tracing::warn;

use crate::observability::Event;
use crate::schema::{Document, Schema, ID_FIELD};

use super::errors::{AccessError, AccessResult};
use super::principal::{is_admin, Principal};

/// Signature of a collection's document access check
pub type DocumentAccessFn = dyn Fn(Option<&Principal>, &Document) -> bool + Send + Sync;

/// Per-collection document access rule
#[derive(Clone)]
pub struct DocumentAccessRule(Arc<DocumentAccessFn>);

impl DocumentAccessRule {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(Option<&Principal>, &Document) -> bool + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Whether the principal may view the document at all
    pub fn allows(&self, principal: Option<&Principal>, document: &Document) -> bool {
        (self.0)(principal, document)
    }
}

impl fmt::Debug for DocumentAccessRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DocumentAccessRule(..)")
    }
}

/// Decide whether a principal may view a document
///
/// The collection rule, when present, is authoritative. Without one the
/// document is visible.
pub fn check_document_access(
    document: &Document,
    principal: Option<&Principal>,
    rule: Option<&DocumentAccessRule>,
) -> bool {
    match rule {
        Some(rule) => rule.allows(principal, document),
        None => true,
    }
}

/// Whether a single field may be read by the principal
///
/// Undeclared fields are unreadable, except the identity field which is
/// implicitly public unless the schema declares it. Administrators read every
/// declared field. `Err` carries the message of a failing rule.
pub fn field_is_readable(
    schema: &Schema,
    field: &str,
    principal: Option<&Principal>,
) -> Result<bool, String> {
    match schema.field(field) {
        None => Ok(field == ID_FIELD),
        Some(_) if is_admin(principal) => Ok(true),
        Some(def) => def.can_read.evaluate(principal),
    }
}

/// Redact every field the principal may not read
///
/// Key order of the input is preserved. A failing rule denies its field;
/// filtering still runs to completion and the first failure is returned.
pub fn restrict_viewable_fields(
    schema: &Schema,
    principal: Option<&Principal>,
    document: Document,
) -> AccessResult<Document> {
    let mut restricted = Document::new();
    let mut failure: Option<AccessError> = None;

    for (key, value) in document {
        match field_is_readable(schema, &key, principal) {
            Ok(true) => {
                restricted.insert(key, value);
            }
            Ok(false) => {}
            Err(message) => {
                warn!(
                    event = Event::RuleFailure.as_str(),
                    field = %key,
                    reason = %message,
                    "read rule failed, field denied"
                );
                if failure.is_none() {
                    failure = Some(AccessError::rule_failure(key, message));
                }
            }
        }
    }

    match failure {
        Some(err) => Err(err),
        None => Ok(restricted),
    }
}

/// Redact a list of documents, preserving order
///
/// No document-level filtering happens here.
pub fn restrict_viewable_fields_many(
    schema: &Schema,
    principal: Option<&Principal>,
    documents: Vec<Document>,
) -> AccessResult<Vec<Document>> {
    documents
        .into_iter()
        .map(|doc| restrict_viewable_fields(schema, principal, doc))
        .collect()
}
