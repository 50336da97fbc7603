//! Batched Loader
//!
//! Per-request coalescing of by-id lookups.
//!
//! - A loader belongs to exactly one execution context and is discarded with it
//! - Loads issued in the same scheduling window share one `find_by_ids` call
//! - An id already being fetched is never fetched again; later loads wait on it
//! - Results, including misses, are memoized for the loader's lifetime
//! - Cache entries are never refreshed; a new request builds a new loader
//!
//! Each `load` registers a waiter for its id and queues the id unless it is
//! already pending. It then yields once. Whichever caller runs first
//! afterwards drains the queue and performs the fetch; the others find the
//! queue empty and wait for their answer. If the fetching caller is dropped
//! mid-flight, its waiters are released with `StorageError::Cancelled`.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use futures_util::future::join_all;
use tokio::sync::oneshot;
use tracing::debug;

use crate::collection::{document_id, StorageAccessor, StorageError, StorageResult};
use crate::observability::Event;
use crate::schema::Document;

type Reply = oneshot::Sender<StorageResult<Option<Document>>>;

#[derive(Default)]
struct LoaderState {
    cache: HashMap<String, Option<Document>>,
    /// Ids waiting for the next batch
    queue: Vec<String>,
    /// Every id that is queued or in flight, with its waiting callers
    pending: HashMap<String, Vec<Reply>>,
}

/// Request-scoped batching loader for one collection
pub struct BatchLoader {
    collection: String,
    storage: Arc<dyn StorageAccessor>,
    state: Mutex<LoaderState>,
}

/// Releases the waiters of a batch whose fetch never completed
struct InFlight<'a> {
    loader: &'a BatchLoader,
    ids: &'a [String],
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut state = match self.loader.state.lock() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        };
        for id in self.ids {
            // Dropping the senders wakes the receivers with an error
            state.pending.remove(id);
        }
    }
}

impl BatchLoader {
    pub fn new(collection: impl Into<String>, storage: Arc<dyn StorageAccessor>) -> Self {
        Self {
            collection: collection.into(),
            storage,
            state: Mutex::new(LoaderState::default()),
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    fn lock(&self) -> StorageResult<MutexGuard<'_, LoaderState>> {
        self.state
            .lock()
            .map_err(|e| StorageError::backend(format!("loader state poisoned: {}", e)))
    }

    /// Load one document by id
    pub async fn load(&self, id: &str) -> StorageResult<Option<Document>> {
        let rx = {
            let mut state = self.lock()?;
            if let Some(hit) = state.cache.get(id) {
                return Ok(hit.clone());
            }
            let (tx, rx) = oneshot::channel();
            match state.pending.get_mut(id) {
                Some(waiters) => waiters.push(tx),
                None => {
                    state.pending.insert(id.to_string(), vec![tx]);
                    state.queue.push(id.to_string());
                }
            }
            rx
        };

        // Let sibling loads of this request join the batch
        tokio::task::yield_now().await;
        self.dispatch().await?;

        rx.await.map_err(|_| StorageError::Cancelled)?
    }

    /// Load several documents with one fetch for all uncached ids
    ///
    /// Results are in the order of `ids`.
    pub async fn load_many(&self, ids: &[String]) -> StorageResult<Vec<Option<Document>>> {
        join_all(ids.iter().map(|id| self.load(id)))
            .await
            .into_iter()
            .collect()
    }

    /// Seed the cache without fetching. Existing entries win.
    pub fn prime(&self, id: impl Into<String>, document: Document) -> StorageResult<()> {
        let mut state = self.lock()?;
        state.cache.entry(id.into()).or_insert(Some(document));
        Ok(())
    }

    /// Number of memoized ids
    pub fn cached_len(&self) -> usize {
        self.lock().map(|s| s.cache.len()).unwrap_or(0)
    }

    /// Number of ids queued or being fetched
    pub fn pending_len(&self) -> usize {
        self.lock().map(|s| s.pending.len()).unwrap_or(0)
    }

    async fn dispatch(&self) -> StorageResult<()> {
        let ids = {
            let mut state = self.lock()?;
            std::mem::take(&mut state.queue)
        };
        if ids.is_empty() {
            return Ok(());
        }
        let _guard = InFlight { loader: self, ids: &ids };

        debug!(
            event = Event::LoaderBatch.as_str(),
            collection = %self.collection,
            ids = ids.len(),
            "loader batch"
        );

        let fetched = self.storage.find_by_ids(&ids).await;

        let mut state = self.lock()?;
        match fetched {
            Ok(docs) => {
                let mut found: HashMap<String, Document> = docs
                    .into_iter()
                    .filter_map(|d| document_id(&d).map(str::to_string).map(|id| (id, d)))
                    .collect();

                for id in &ids {
                    let doc = state
                        .cache
                        .entry(id.clone())
                        .or_insert_with(|| found.remove(id))
                        .clone();
                    for reply in state.pending.remove(id).unwrap_or_default() {
                        // Receiver gone means that caller was cancelled
                        let _ = reply.send(Ok(doc.clone()));
                    }
                }
            }
            Err(err) => {
                for id in &ids {
                    for reply in state.pending.remove(id).unwrap_or_default() {
                        let _ = reply.send(Err(err.clone()));
                    }
                }
            }
        }
        Ok(())
    }
}

impl fmt::Debug for BatchLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchLoader")
            .field("collection", &self.collection)
            .field("cached", &self.cached_len())
            .field("pending", &self.pending_len())
            .finish()
    }
}
