//! Storage accessors
//!
//! The only suspension points of the resolution path live behind
//! [`StorageAccessor`]. Cancellation and timeouts belong to the backend; its
//! errors are propagated unchanged.

use std::cmp::Ordering;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::RwLock;

use serde_json::Value;
use uuid::Uuid;

use crate::filter::{compare_json_values, FindOptions, Predicate};
use crate::schema::{Document, ID_FIELD};

use super::errors::{StorageError, StorageResult};

/// Boxed storage future
pub type StorageFuture<'a, T> = Pin<Box<dyn Future<Output = StorageResult<T>> + Send + 'a>>;

/// Identity of a document, if it carries a string `_id`
pub fn document_id(doc: &Document) -> Option<&str> {
    doc.get(ID_FIELD).and_then(Value::as_str)
}

/// Per-collection storage
pub trait StorageAccessor: Send + Sync {
    /// Fetch every document whose id is in `ids`. Missing ids are omitted.
    fn find_by_ids<'a>(&'a self, ids: &'a [String]) -> StorageFuture<'a, Vec<Document>>;

    /// Fetch documents matching a predicate
    fn find<'a>(
        &'a self,
        predicate: &'a Predicate,
        options: &'a FindOptions,
    ) -> StorageFuture<'a, Vec<Document>>;

    /// Count documents matching a predicate; `None` when unsupported
    fn count<'a>(&'a self, _predicate: &'a Predicate) -> StorageFuture<'a, Option<u64>> {
        Box::pin(async { Ok::<Option<u64>, StorageError>(None) })
    }

    /// Fetch one document by id
    fn find_by_id<'a>(&'a self, id: &'a str) -> StorageFuture<'a, Option<Document>> {
        Box::pin(async move {
            let ids = vec![id.to_string()];
            let docs = self.find_by_ids(&ids).await?;
            Ok(docs.into_iter().find(|d| document_id(d) == Some(id)))
        })
    }
}

/// Fetch counters for an in-memory collection
#[derive(Debug, Default)]
pub struct StorageStats {
    by_id_fetches: AtomicU64,
    finds: AtomicU64,
    counts: AtomicU64,
}

impl StorageStats {
    /// Number of `find_by_ids` calls
    pub fn by_id_fetches(&self) -> u64 {
        self.by_id_fetches.load(AtomicOrdering::Relaxed)
    }

    /// Number of `find` calls
    pub fn finds(&self) -> u64 {
        self.finds.load(AtomicOrdering::Relaxed)
    }

    /// Number of `count` calls
    pub fn counts(&self) -> u64 {
        self.counts.load(AtomicOrdering::Relaxed)
    }
}

/// In-memory storage accessor for tests and embedding
///
/// Documents keep insertion order, which is also the unsorted result order.
#[derive(Debug, Default)]
pub struct InMemoryCollection {
    documents: RwLock<Vec<Document>>,
    stats: StorageStats,
}

impl InMemoryCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a collection from JSON objects; non-objects are skipped
    pub fn with_documents(docs: impl IntoIterator<Item = Value>) -> StorageResult<Self> {
        let collection = Self::new();
        for doc in docs {
            if let Value::Object(doc) = doc {
                collection.insert(doc)?;
            }
        }
        Ok(collection)
    }

    /// Insert a document, assigning an `_id` when missing
    pub fn insert(&self, mut document: Document) -> StorageResult<String> {
        let mut docs = self
            .documents
            .write()
            .map_err(|e| StorageError::backend(e.to_string()))?;

        let id = document_id(&document)
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        document.insert(ID_FIELD.to_string(), Value::String(id.clone()));

        docs.retain(|d| document_id(d) != Some(id.as_str()));
        docs.push(document);
        Ok(id)
    }

    pub fn len(&self) -> usize {
        self.documents.read().map(|d| d.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> &StorageStats {
        &self.stats
    }

    fn matching(&self, predicate: &Predicate) -> StorageResult<Vec<Document>> {
        let docs = self
            .documents
            .read()
            .map_err(|e| StorageError::backend(e.to_string()))?;
        Ok(docs.iter().filter(|d| predicate.matches(d)).cloned().collect())
    }
}

impl StorageAccessor for InMemoryCollection {
    fn find_by_ids<'a>(&'a self, ids: &'a [String]) -> StorageFuture<'a, Vec<Document>> {
        Box::pin(async move {
            self.stats.by_id_fetches.fetch_add(1, AtomicOrdering::Relaxed);
            let docs = self
                .documents
                .read()
                .map_err(|e| StorageError::backend(e.to_string()))?;

            Ok(docs
                .iter()
                .filter(|d| document_id(d).map(|id| ids.iter().any(|i| i == id)).unwrap_or(false))
                .cloned()
                .collect())
        })
    }

    fn find<'a>(
        &'a self,
        predicate: &'a Predicate,
        options: &'a FindOptions,
    ) -> StorageFuture<'a, Vec<Document>> {
        Box::pin(async move {
            self.stats.finds.fetch_add(1, AtomicOrdering::Relaxed);
            let mut results = self.matching(predicate)?;

            if !options.sort.is_empty() {
                results.sort_by(|a, b| {
                    for spec in &options.sort {
                        let ordering = match (a.get(&spec.field), b.get(&spec.field)) {
                            (Some(x), Some(y)) => {
                                compare_json_values(x, y).unwrap_or(Ordering::Equal)
                            }
                            (None, Some(_)) => Ordering::Less,
                            (Some(_), None) => Ordering::Greater,
                            (None, None) => Ordering::Equal,
                        };
                        let ordering = if spec.ascending { ordering } else { ordering.reverse() };
                        if ordering != Ordering::Equal {
                            return ordering;
                        }
                    }
                    Ordering::Equal
                });
            }

            let paginated = results.into_iter().skip(options.offset);
            Ok(match options.limit {
                Some(limit) => paginated.take(limit).collect(),
                None => paginated.collect(),
            })
        })
    }

    fn count<'a>(&'a self, predicate: &'a Predicate) -> StorageFuture<'a, Option<u64>> {
        Box::pin(async move {
            self.stats.counts.fetch_add(1, AtomicOrdering::Relaxed);
            Ok(Some(self.matching(predicate)?.len() as u64))
        })
    }
}
