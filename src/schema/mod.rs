//! Collection schemas
//!
//! Schemas are immutable after registration and read concurrently by every
//! request. A field that is not declared is never returned to a caller.

mod types;

pub use types::{
    Document, FieldDef, FieldType, ReadFn, ReadPredicate, ReadRule, Schema, ID_FIELD,
};
