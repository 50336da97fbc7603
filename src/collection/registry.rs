//! Collection registry
//!
//! Built once at startup and shared read-only by every request. Core logic
//! receives it explicitly; there is no global lookup.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use super::errors::{RegistryError, RegistryResult};
use super::metadata::CollectionMetadata;
use super::storage::StorageAccessor;

/// A registered collection: metadata plus its storage accessor
pub struct Collection {
    pub metadata: CollectionMetadata,
    pub storage: Arc<dyn StorageAccessor>,
}

impl Collection {
    pub fn name(&self) -> &str {
        &self.metadata.collection_name
    }
}

impl fmt::Debug for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collection")
            .field("metadata", &self.metadata)
            .finish_non_exhaustive()
    }
}

/// Registry of all collections
#[derive(Debug, Default)]
pub struct CollectionRegistry {
    collections: BTreeMap<String, Arc<Collection>>,
}

impl CollectionRegistry {
    /// Create new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a collection
    pub fn register(
        &mut self,
        metadata: CollectionMetadata,
        storage: Arc<dyn StorageAccessor>,
    ) -> RegistryResult<()> {
        if metadata.collection_name.is_empty() {
            return Err(RegistryError::InvalidMetadata("empty collection name".into()));
        }
        if metadata.type_name.is_empty() {
            return Err(RegistryError::InvalidMetadata(format!(
                "empty type name for {}",
                metadata.collection_name
            )));
        }
        if self.collections.contains_key(&metadata.collection_name) {
            return Err(RegistryError::Duplicate(metadata.collection_name));
        }
        metadata
            .schema
            .validate_structure()
            .map_err(|reason| RegistryError::InvalidSchema {
                collection: metadata.collection_name.clone(),
                reason,
            })?;

        let name = metadata.collection_name.clone();
        self.collections
            .insert(name, Arc::new(Collection { metadata, storage }));
        Ok(())
    }

    /// Builder form of [`register`](Self::register)
    pub fn with_collection(
        mut self,
        metadata: CollectionMetadata,
        storage: Arc<dyn StorageAccessor>,
    ) -> RegistryResult<Self> {
        self.register(metadata, storage)?;
        Ok(self)
    }

    /// Get a collection by name
    pub fn get(&self, name: &str) -> Option<&Arc<Collection>> {
        self.collections.get(name)
    }

    /// All collections in name order
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Collection>> {
        self.collections.values()
    }

    /// List all registered collection names
    pub fn names(&self) -> Vec<String> {
        self.collections.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.collections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collections.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::InMemoryCollection;
    use crate::schema::{FieldDef, Schema};

    fn movies_meta() -> CollectionMetadata {
        CollectionMetadata::new(
            "Movies",
            "Movie",
            Schema::new().with_field("title", FieldDef::string().public()),
        )
    }

    #[test]
    fn test_register_and_get() {
        let registry = CollectionRegistry::new()
            .with_collection(movies_meta(), Arc::new(InMemoryCollection::new()))
            .unwrap();

        assert!(registry.get("Movies").is_some());
        assert!(registry.get("nonexistent").is_none());
        assert_eq!(registry.names(), vec!["Movies"]);
    }

    #[test]
    fn test_duplicate_rejected() {
        let mut registry = CollectionRegistry::new();
        registry
            .register(movies_meta(), Arc::new(InMemoryCollection::new()))
            .unwrap();
        let result = registry.register(movies_meta(), Arc::new(InMemoryCollection::new()));

        assert_eq!(result, Err(RegistryError::Duplicate("Movies".into())));
    }

    #[test]
    fn test_invalid_schema_rejected() {
        let meta = CollectionMetadata::new(
            "Bad",
            "Bad",
            Schema::new().with_field("$x", FieldDef::string()),
        );
        let result =
            CollectionRegistry::new().with_collection(meta, Arc::new(InMemoryCollection::new()));
        assert!(matches!(result, Err(RegistryError::InvalidSchema { .. })));
    }

    #[test]
    fn test_empty_type_name_rejected() {
        let meta = CollectionMetadata::new("Movies", "", Schema::new());
        let result =
            CollectionRegistry::new().with_collection(meta, Arc::new(InMemoryCollection::new()));
        assert!(matches!(result, Err(RegistryError::InvalidMetadata(_))));
    }
}
