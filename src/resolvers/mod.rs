//! # Resolver Factory
//!
//! Builds the default `single` and `multi` fetch operations of a collection.
//!
//! ## Pipeline
//!
//! ```text
//! single: selector → loader / slug find → document access → field redaction
//! multi:  terms + where → predicate → find → document access (drop) → field redaction
//! ```
//!
//! Collection schema and storage are looked up in the [`ExecutionContext`]
//! on every call, never through a global.

pub mod errors;
pub mod input;
mod multi;
mod single;

use std::sync::Arc;

use crate::auth::DocumentAccessRule;
use crate::collection::{Collection, CollectionMetadata, CollectionOptions};
use crate::context::ExecutionContext;
use crate::settings::QueryConfig;

pub use errors::{ResolverError, ResolverResult};
pub use input::{MultiInput, MultiOutput, Selector, SingleInput, SingleOutput};
pub use multi::MultiResolver;
pub use single::SingleResolver;

/// What the factory needs to know about a collection
#[derive(Debug, Clone)]
pub struct ResolverOptions {
    pub type_name: String,
    pub collection_name: String,

    /// Overrides of the registered collection's options
    pub options: CollectionOptions,

    pub config: QueryConfig,
}

impl ResolverOptions {
    pub fn new(type_name: impl Into<String>, collection_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            collection_name: collection_name.into(),
            options: CollectionOptions::default(),
            config: QueryConfig::default(),
        }
    }

    pub fn with_options(mut self, options: CollectionOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_config(mut self, config: QueryConfig) -> Self {
        self.config = config;
        self
    }

    fn collection<'c>(&self, ctx: &'c ExecutionContext) -> ResolverResult<&'c Arc<Collection>> {
        ctx.collection(&self.collection_name)
            .ok_or_else(|| ResolverError::CollectionNotRegistered(self.collection_name.clone()))
    }

    /// Factory option first, then the registered collection's rule
    fn access_rule<'a>(&'a self, collection: &'a Collection) -> Option<&'a DocumentAccessRule> {
        self.options
            .check_access
            .as_ref()
            .or(collection.metadata.options.check_access.as_ref())
    }

    fn cache_hint(&self, enabled: bool, collection: &Collection) -> Option<u32> {
        if !enabled {
            return None;
        }
        Some(
            self.options
                .cache_max_age
                .or(collection.metadata.options.cache_max_age)
                .unwrap_or(self.config.cache_max_age),
        )
    }
}

impl From<&CollectionMetadata> for ResolverOptions {
    fn from(meta: &CollectionMetadata) -> Self {
        Self::new(meta.type_name.clone(), meta.collection_name.clone())
    }
}

/// A resolver with its documentation string
#[derive(Debug, Clone)]
pub struct ResolverDef<R> {
    pub description: String,
    pub resolver: R,
}

/// The generated pair
#[derive(Debug, Clone)]
pub struct DefaultResolvers {
    pub single: ResolverDef<SingleResolver>,
    pub multi: ResolverDef<MultiResolver>,
}

/// Generate the default resolvers of a collection
pub fn get_default_resolvers(options: ResolverOptions) -> DefaultResolvers {
    let options = Arc::new(options);
    DefaultResolvers {
        single: ResolverDef {
            description: format!(
                "A single {} document fetched by ID or slug",
                options.type_name
            ),
            resolver: SingleResolver::new(options.clone()),
        },
        multi: ResolverDef {
            description: format!(
                "A list of {} documents matching a set of query terms",
                options.type_name
            ),
            resolver: MultiResolver::new(options),
        },
    }
}
