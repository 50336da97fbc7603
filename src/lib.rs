//! aeroquery - Authorization-aware document resolvers
//!
//! Default single and multi fetch operations generated from a collection
//! schema, executed through a request-scoped context with batched loading.
//!
//! ```text
//! QueryRunner ─► ExecutionContext (principal, locale, loaders)
//!      │
//!      ▼
//! QueryEngine ─► SingleResolver / MultiResolver
//!                    │  build_filter ─► StorageAccessor
//!                    ▼
//!               check_document_access ─► restrict_viewable_fields
//! ```

pub mod auth;
pub mod collection;
pub mod context;
pub mod filter;
pub mod loader;
pub mod observability;
pub mod query;
pub mod resolvers;
pub mod schema;
pub mod settings;

pub use auth::{check_document_access, restrict_viewable_fields, DocumentAccessRule, Principal};
pub use collection::{CollectionMetadata, CollectionOptions, CollectionRegistry, StorageAccessor};
pub use context::{ContextOverrides, ExecutionContext};
pub use filter::build_filter;
pub use loader::BatchLoader;
pub use query::{build_query, CollectionQuery, QueryRunner};
pub use resolvers::{get_default_resolvers, ResolverOptions};
pub use schema::{Document, FieldDef, ReadRule, Schema};
pub use settings::{QueryConfig, Settings};
