//! # Collections
//!
//! Collection metadata, the startup registry, and storage accessors.

pub mod errors;
pub mod metadata;
pub mod registry;
pub mod storage;

pub use errors::{RegistryError, RegistryResult, StorageError, StorageResult};
pub use metadata::{camel_case, CollectionMetadata, CollectionOptions};
pub use registry::{Collection, CollectionRegistry};
pub use storage::{document_id, InMemoryCollection, StorageAccessor, StorageFuture, StorageStats};
