//! Collection metadata
//!
//! Owned by the registration layer, immutable once registered.

use crate::auth::DocumentAccessRule;
use crate::schema::Schema;

/// Per-collection options consumed by the generated resolvers
#[derive(Debug, Clone, Default)]
pub struct CollectionOptions {
    /// Document-level access rule. Absent means every document is visible.
    pub check_access: Option<DocumentAccessRule>,

    /// Cache hint override in seconds for cache-enabled fetches
    pub cache_max_age: Option<u32>,
}

impl CollectionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the document access rule
    pub fn with_check_access(mut self, rule: DocumentAccessRule) -> Self {
        self.check_access = Some(rule);
        self
    }

    /// Set the cache hint
    pub fn with_cache_max_age(mut self, seconds: u32) -> Self {
        self.cache_max_age = Some(seconds);
        self
    }
}

/// Collection description
#[derive(Debug, Clone)]
pub struct CollectionMetadata {
    /// Collection name, e.g. `Movies`
    pub collection_name: String,

    /// Type name, e.g. `Movie`
    pub type_name: String,

    /// Field schema
    pub schema: Schema,

    /// Resolver options
    pub options: CollectionOptions,
}

impl CollectionMetadata {
    pub fn new(
        collection_name: impl Into<String>,
        type_name: impl Into<String>,
        schema: Schema,
    ) -> Self {
        Self {
            collection_name: collection_name.into(),
            type_name: type_name.into(),
            schema,
            options: CollectionOptions::default(),
        }
    }

    pub fn with_options(mut self, options: CollectionOptions) -> Self {
        self.options = options;
        self
    }

    /// Root field name used by queries for this type (`Movie` → `movie`)
    pub fn single_field_name(&self) -> String {
        camel_case(&self.type_name)
    }

    /// Root field name of list queries (`Movie` → `movies`)
    pub fn multi_field_name(&self) -> String {
        format!("{}s", camel_case(&self.type_name))
    }

    /// Name of the generated default fragment
    pub fn default_fragment_name(&self) -> String {
        format!("{}DefaultFragment", self.collection_name)
    }
}

/// Lower-case the first character
pub fn camel_case(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}
