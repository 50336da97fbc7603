//! # Query Execution
//!
//! Runs queries through an engine with a fresh per-request context, and
//! composes single-document queries from fragments.

pub mod engine;
pub mod errors;
pub mod fragments;
pub mod runner;

pub use engine::{
    root_field, EngineError, EngineFuture, EngineRequest, EngineResponse, QueryEngine,
    ResolverRouter,
};
pub use errors::{QueryError, QueryResult};
pub use fragments::{extract_fragment_name, single_query_template, FragmentRegistry, FragmentSource};
pub use runner::{
    build_query, CollectionQuery, FragmentSelection, QueryOneOptions, QueryRunner, SingleTarget,
};
