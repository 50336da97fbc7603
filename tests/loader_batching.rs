//! Loader Batching Tests
//!
//! Per-request loader guarantees:
//! - Repeated and concurrent by-id lookups in one request share one fetch
//! - Nothing is cached across requests
//! - Storage failures reach the caller unchanged

use std::sync::Arc;

use aeroquery::collection::{
    CollectionMetadata, CollectionRegistry, InMemoryCollection, StorageAccessor, StorageError,
    StorageFuture,
};
use aeroquery::context::{ContextOverrides, ExecutionContext};
use aeroquery::filter::{FindOptions, Predicate};
use aeroquery::query::{QueryOneOptions, QueryRunner};
use aeroquery::resolvers::{get_default_resolvers, ResolverError, ResolverOptions, SingleInput};
use aeroquery::schema::{Document, FieldDef, Schema};
use aeroquery::settings::Settings;
use futures_util::future::join_all;
use serde_json::{json, Value};

// =============================================================================
// Helper Functions
// =============================================================================

fn movies_registry() -> (Arc<CollectionRegistry>, Arc<InMemoryCollection>) {
    let storage = Arc::new(
        InMemoryCollection::with_documents(vec![
            json!({"_id": "m1", "title": "Heat"}),
            json!({"_id": "m2", "title": "Alien"}),
            json!({"_id": "m3", "title": "Arrival"}),
        ])
        .unwrap(),
    );
    let meta = CollectionMetadata::new(
        "Movies",
        "Movie",
        Schema::new().with_field("title", FieldDef::string().public()),
    );
    let registry = CollectionRegistry::new()
        .with_collection(meta, storage.clone())
        .unwrap();
    (Arc::new(registry), storage)
}

fn options() -> ResolverOptions {
    ResolverOptions::new("Movie", "Movies")
}

// =============================================================================
// Coalescing Tests
// =============================================================================

/// Two sequential lookups of one id in one context fetch once.
#[tokio::test]
async fn test_sequential_single_lookups_fetch_once() {
    let (registry, storage) = movies_registry();
    let ctx = ExecutionContext::anonymous(registry);
    let single = get_default_resolvers(options()).single.resolver;

    single.resolve(&Value::Null, SingleInput::by_id("m1"), &ctx).await.unwrap();
    single.resolve(&Value::Null, SingleInput::by_id("m1"), &ctx).await.unwrap();

    assert_eq!(storage.stats().by_id_fetches(), 1);
}

/// Concurrent lookups of different ids in one context share a batch.
#[tokio::test]
async fn test_concurrent_single_lookups_share_batch() {
    let (registry, storage) = movies_registry();
    let ctx = ExecutionContext::anonymous(registry);
    let single = get_default_resolvers(options()).single.resolver;

    let lookups = ["m1", "m2", "m3", "m1"]
        .iter()
        .map(|id| single.resolve(&Value::Null, SingleInput::by_id(*id), &ctx));
    let results = join_all(lookups).await;

    assert!(results.iter().all(|r| r.is_ok()));
    assert_eq!(storage.stats().by_id_fetches(), 1);
}

// =============================================================================
// Isolation Tests
// =============================================================================

/// Each context starts with an empty cache.
#[tokio::test]
async fn test_contexts_do_not_share_cache() {
    let (registry, storage) = movies_registry();
    let single = get_default_resolvers(options()).single.resolver;

    let first = ExecutionContext::anonymous(registry.clone());
    single.resolve(&Value::Null, SingleInput::by_id("m1"), &first).await.unwrap();

    let second = ExecutionContext::anonymous(registry);
    single.resolve(&Value::Null, SingleInput::by_id("m1"), &second).await.unwrap();

    assert_eq!(storage.stats().by_id_fetches(), 2);
}

/// A write between two runner calls is visible to the second call.
#[tokio::test]
async fn test_runner_calls_see_fresh_data() {
    let (registry, storage) = movies_registry();
    let runner = QueryRunner::with_default_engine(registry, Settings::new()).unwrap();
    let runner = Arc::new(runner);
    let movies = runner.collection_query("Movies").unwrap();

    let before = movies.query_one("m1", QueryOneOptions::new()).await.unwrap().unwrap();
    assert_eq!(before["title"], "Heat");

    storage
        .insert(json!({"_id": "m1", "title": "Heat (1995)"}).as_object().cloned().unwrap())
        .unwrap();

    let after = movies
        .query_one("m1", QueryOneOptions::new().with_context(ContextOverrides::new().anonymous()))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(after["title"], "Heat (1995)");
}

// =============================================================================
// Failure Propagation Tests
// =============================================================================

/// Backend that reports every operation as cancelled
struct CancelledStorage;

impl StorageAccessor for CancelledStorage {
    fn find_by_ids<'a>(&'a self, _ids: &'a [String]) -> StorageFuture<'a, Vec<Document>> {
        Box::pin(async { Err::<Vec<Document>, _>(StorageError::Cancelled) })
    }

    fn find<'a>(
        &'a self,
        _predicate: &'a Predicate,
        _options: &'a FindOptions,
    ) -> StorageFuture<'a, Vec<Document>> {
        Box::pin(async { Err::<Vec<Document>, _>(StorageError::Cancelled) })
    }
}

/// Cancellation from storage is propagated, not swallowed into a null.
#[tokio::test]
async fn test_cancellation_propagates() {
    let meta = CollectionMetadata::new("Movies", "Movie", Schema::new());
    let registry = Arc::new(
        CollectionRegistry::new()
            .with_collection(meta, Arc::new(CancelledStorage))
            .unwrap(),
    );
    let ctx = ExecutionContext::anonymous(registry);
    let single = get_default_resolvers(options()).single.resolver;

    let err = single
        .resolve(&Value::Null, SingleInput::by_id("m1").allow_null(), &ctx)
        .await
        .unwrap_err();

    assert_eq!(err, ResolverError::Storage(StorageError::Cancelled));
}
