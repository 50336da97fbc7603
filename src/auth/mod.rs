//! # Authorization
//!
//! Principals, role groups, and the Access Filter.
//!
//! ## Invariants
//! - Every field returned to a caller passed its read rule for the principal
//! - Fields absent from the schema are never returned (identity field excepted)
//! - A read rule that fails to evaluate denies, and the failure is reported

pub mod access;
pub mod errors;
pub mod principal;

pub use access::{
    check_document_access, field_is_readable, restrict_viewable_fields,
    restrict_viewable_fields_many, DocumentAccessRule,
};
pub use errors::{AccessError, AccessResult};
pub use principal::{is_admin, role_groups, Principal, ADMINS, GUESTS, MEMBERS};
