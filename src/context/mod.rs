//! Execution Context
//!
//! State carried through one external call: the principal, the locale, the
//! registry, and one fresh batched loader per collection.
//!
//! A context is created at request start and dropped at request end. It is
//! never shared between requests, so the loaders' caches cannot leak data
//! from one call into the next.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use uuid::Uuid;

use crate::auth::Principal;
use crate::collection::{Collection, CollectionRegistry};
use crate::loader::BatchLoader;

/// Typed map for collaborator-specific additions
#[derive(Default)]
pub struct Extensions {
    map: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl Extensions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value, returning the previous one of the same type
    pub fn insert<T: Send + Sync + 'static>(&mut self, value: T) -> Option<T> {
        self.map
            .insert(TypeId::of::<T>(), Box::new(value))
            .and_then(|prev| prev.downcast::<T>().ok())
            .map(|prev| *prev)
    }

    pub fn get<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.map
            .get(&TypeId::of::<T>())
            .and_then(|v| v.downcast_ref::<T>())
    }

    pub fn contains<T: Send + Sync + 'static>(&self) -> bool {
        self.map.contains_key(&TypeId::of::<T>())
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Move every entry of `other` into `self`; `other` wins on conflicts
    pub fn extend(&mut self, other: Extensions) {
        self.map.extend(other.map);
    }
}

impl fmt::Debug for Extensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Extensions")
            .field("len", &self.map.len())
            .finish()
    }
}

/// Caller-supplied partial context
///
/// Every field left unset is filled from the defaults. `principal` is doubly
/// optional: unset keeps the default principal, `Some(None)` runs the call
/// anonymously.
#[derive(Debug, Default)]
pub struct ContextOverrides {
    pub principal: Option<Option<Principal>>,
    pub locale: Option<String>,
    pub extensions: Extensions,
}

impl ContextOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run as the given user
    pub fn with_user(mut self, principal: Principal) -> Self {
        self.principal = Some(Some(principal));
        self
    }

    /// Run without a principal
    pub fn anonymous(mut self) -> Self {
        self.principal = Some(None);
        self
    }

    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = Some(locale.into());
        self
    }

    pub fn with_extension<T: Send + Sync + 'static>(mut self, value: T) -> Self {
        self.extensions.insert(value);
        self
    }
}

/// Per-request execution context
pub struct ExecutionContext {
    /// Request ID for tracing
    pub request_id: Uuid,

    /// Principal on whose behalf the request runs; `None` is anonymous
    pub principal: Option<Principal>,

    /// Locale of the request
    pub locale: String,

    /// Shared, read-only collection registry
    pub collections: Arc<CollectionRegistry>,

    /// One loader per collection, built for this request only
    loaders: HashMap<String, Arc<BatchLoader>>,

    /// Collaborator-specific additions
    pub extensions: Extensions,

    started_at: Instant,
}

impl ExecutionContext {
    /// Build a context from defaults and caller overrides
    ///
    /// The caller wins field by field. The default principal is the
    /// privileged system principal.
    pub fn build(
        collections: Arc<CollectionRegistry>,
        default_locale: impl Into<String>,
        overrides: ContextOverrides,
    ) -> Self {
        let loaders = collections
            .iter()
            .map(|c| {
                let loader = BatchLoader::new(c.name(), c.storage.clone());
                (c.name().to_string(), Arc::new(loader))
            })
            .collect();

        Self {
            request_id: Uuid::new_v4(),
            principal: overrides.principal.unwrap_or_else(|| Some(Principal::system())),
            locale: overrides.locale.unwrap_or_else(|| default_locale.into()),
            collections,
            loaders,
            extensions: overrides.extensions,
            started_at: Instant::now(),
        }
    }

    /// Context for a given principal with default locale
    pub fn for_principal(
        collections: Arc<CollectionRegistry>,
        principal: Option<Principal>,
    ) -> Self {
        let overrides = ContextOverrides {
            principal: Some(principal),
            ..ContextOverrides::default()
        };
        Self::build(collections, crate::settings::DEFAULT_LOCALE, overrides)
    }

    /// Anonymous context
    pub fn anonymous(collections: Arc<CollectionRegistry>) -> Self {
        Self::for_principal(collections, None)
    }

    pub fn principal(&self) -> Option<&Principal> {
        self.principal.as_ref()
    }

    /// Registered collection by name
    pub fn collection(&self, name: &str) -> Option<&Arc<Collection>> {
        self.collections.get(name)
    }

    /// This request's loader for a collection
    pub fn loader(&self, name: &str) -> Option<&Arc<BatchLoader>> {
        self.loaders.get(name)
    }

    pub fn loader_count(&self) -> usize {
        self.loaders.len()
    }

    pub fn extension<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.extensions.get::<T>()
    }

    /// Get elapsed time in milliseconds
    pub fn elapsed_ms(&self) -> u128 {
        self.started_at.elapsed().as_millis()
    }
}

impl fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("request_id", &self.request_id)
            .field("principal", &self.principal)
            .field("locale", &self.locale)
            .field("loaders", &self.loaders.keys().collect::<Vec<_>>())
            .field("extensions", &self.extensions)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::{CollectionMetadata, InMemoryCollection};
    use crate::schema::Schema;

    fn registry() -> Arc<CollectionRegistry> {
        let registry = CollectionRegistry::new()
            .with_collection(
                CollectionMetadata::new("Movies", "Movie", Schema::new()),
                Arc::new(InMemoryCollection::new()),
            )
            .unwrap()
            .with_collection(
                CollectionMetadata::new("Books", "Book", Schema::new()),
                Arc::new(InMemoryCollection::new()),
            )
            .unwrap();
        Arc::new(registry)
    }

    #[derive(Debug, PartialEq)]
    struct TenantId(u32);

    #[test]
    fn test_defaults_to_system_principal() {
        let ctx = ExecutionContext::build(registry(), "en", ContextOverrides::new());

        assert!(ctx.principal().map(|p| p.is_admin).unwrap_or(false));
        assert_eq!(ctx.locale, "en");
        assert_eq!(ctx.loader_count(), 2);
        assert!(ctx.loader("Movies").is_some());
    }

    #[test]
    fn test_caller_overrides_win() {
        let overrides = ContextOverrides::new()
            .with_user(Principal::new("u1"))
            .with_locale("fr")
            .with_extension(TenantId(7));
        let ctx = ExecutionContext::build(registry(), "en", overrides);

        assert_eq!(ctx.principal().map(|p| p.id.as_str()), Some("u1"));
        assert_eq!(ctx.locale, "fr");
        assert_eq!(ctx.extension::<TenantId>(), Some(&TenantId(7)));
    }

    #[test]
    fn test_explicit_anonymous() {
        let ctx = ExecutionContext::build(registry(), "en", ContextOverrides::new().anonymous());
        assert!(ctx.principal().is_none());
    }

    #[test]
    fn test_each_context_has_fresh_loaders() {
        let registry = registry();
        let a = ExecutionContext::anonymous(registry.clone());
        let b = ExecutionContext::anonymous(registry);

        let la = a.loader("Movies").unwrap();
        let lb = b.loader("Movies").unwrap();
        assert!(!Arc::ptr_eq(la, lb));
        assert_ne!(a.request_id, b.request_id);
    }

    #[test]
    fn test_extensions_replace_by_type() {
        let mut ext = Extensions::new();
        assert!(ext.insert(TenantId(1)).is_none());
        assert_eq!(ext.insert(TenantId(2)), Some(TenantId(1)));
        assert_eq!(ext.len(), 1);
        assert!(ext.contains::<TenantId>());
    }
}
