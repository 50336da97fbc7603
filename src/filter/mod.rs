//! # Filters
//!
//! Storage predicates and the translation of caller terms into them.

pub mod errors;
pub mod predicate;
pub mod translator;

pub use errors::{FilterError, FilterResult};
pub use predicate::{compare_json_values, Clause, FieldCondition, FilterOperator, Predicate};
pub use translator::{
    build_filter, resolve_find_options, FindOptions, PageOverrides, SortSpec, RESERVED_TERMS,
};
