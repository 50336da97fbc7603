//! Multi-document resolver

use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::auth::{
    check_document_access, restrict_viewable_fields_many, DocumentAccessRule, Principal,
};
use crate::collection::{document_id, Collection};
use crate::context::ExecutionContext;
use crate::filter::{build_filter, resolve_find_options, FindOptions, PageOverrides, Predicate};
use crate::observability::Event;
use crate::schema::Document;

use super::errors::ResolverResult;
use super::input::{MultiInput, MultiOutput};
use super::ResolverOptions;

/// Lists documents matching caller terms
#[derive(Debug, Clone)]
pub struct MultiResolver {
    options: Arc<ResolverOptions>,
}

impl MultiResolver {
    pub(super) fn new(options: Arc<ResolverOptions>) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ResolverOptions {
        &self.options
    }

    /// Resolve a listing
    ///
    /// Conditions on fields the principal cannot read never reach storage.
    /// Documents the access rule denies are dropped silently; survivors keep
    /// storage order.
    pub async fn resolve(
        &self,
        _root: &Value,
        input: MultiInput,
        ctx: &ExecutionContext,
    ) -> ResolverResult<MultiOutput> {
        let collection = self.options.collection(ctx)?;
        let schema = &collection.metadata.schema;
        let principal = ctx.principal();

        let mut predicate = build_filter(schema, principal, &input.terms)?;
        if let Some(filter) = &input.filter {
            predicate.merge(build_filter(schema, principal, filter)?);
        }

        let overrides = PageOverrides {
            order_by: input.order_by.clone(),
            limit: input.limit,
            offset: input.offset,
        };
        let find_options = resolve_find_options(&input.terms, &overrides, &self.options.config)?;

        let raw = collection.storage.find(&predicate, &find_options).await?;
        let fetched = raw.len();

        let rule = self.options.access_rule(collection);
        let visible = visible_documents(raw, principal, rule, collection.name());

        if let Some(loader) = ctx.loader(collection.name()) {
            for doc in &visible {
                if let Some(id) = document_id(doc) {
                    loader.prime(id, doc.clone())?;
                }
            }
        }

        let enable_total = input
            .enable_total
            .unwrap_or(self.options.config.enable_total_by_default);
        let total_count = if enable_total {
            Some(total_count(collection, &predicate, principal, rule).await?)
        } else {
            None
        };

        let results = restrict_viewable_fields_many(schema, principal, visible)?;

        debug!(
            event = Event::QueryExecuted.as_str(),
            collection = %collection.name(),
            fetched,
            returned = results.len(),
            "multi resolved"
        );

        Ok(MultiOutput {
            results,
            total_count,
            cache_max_age: self.options.cache_hint(input.enable_cache, collection),
        })
    }
}

fn visible_documents(
    documents: Vec<Document>,
    principal: Option<&Principal>,
    rule: Option<&DocumentAccessRule>,
    collection: &str,
) -> Vec<Document> {
    documents
        .into_iter()
        .filter(|doc| {
            let allowed = check_document_access(doc, principal, rule);
            if !allowed {
                debug!(
                    event = Event::AccessDenied.as_str(),
                    collection = %collection,
                    "document dropped from listing"
                );
            }
            allowed
        })
        .collect()
}

/// Count every matching document the principal may view, ignoring pagination
///
/// Without an access rule the backend count is used when it has one.
async fn total_count(
    collection: &Collection,
    predicate: &Predicate,
    principal: Option<&Principal>,
    rule: Option<&DocumentAccessRule>,
) -> ResolverResult<u64> {
    if rule.is_none() {
        if let Some(count) = collection.storage.count(predicate).await? {
            return Ok(count);
        }
    }

    let all = collection
        .storage
        .find(predicate, &FindOptions::default())
        .await?;
    Ok(all
        .iter()
        .filter(|doc| check_document_access(doc, principal, rule))
        .count() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::{
        CollectionMetadata, CollectionOptions, CollectionRegistry, InMemoryCollection,
    };
    use crate::filter::FilterError;
    use crate::resolvers::{get_default_resolvers, ResolverError, ResolverOptions};
    use crate::schema::{FieldDef, Schema};
    use serde_json::{json, Map};

    fn obj(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    fn setup(options: CollectionOptions) -> (Arc<CollectionRegistry>, Arc<InMemoryCollection>) {
        let storage = Arc::new(
            InMemoryCollection::with_documents(vec![
                json!({"_id": "1", "title": "Alien", "year": 1979, "secret": "x"}),
                json!({"_id": "2", "title": "Heat", "year": 1995, "secret": "y"}),
                json!({"_id": "3", "title": "Arrival", "year": 2016, "secret": "z"}),
            ])
            .unwrap(),
        );
        let schema = Schema::new()
            .with_field("title", FieldDef::string().public())
            .with_field("year", FieldDef::int().readable_by(["members"]));
        let meta = CollectionMetadata::new("Movies", "Movie", schema).with_options(options);
        let registry = CollectionRegistry::new()
            .with_collection(meta, storage.clone())
            .unwrap();
        (Arc::new(registry), storage)
    }

    fn resolver() -> MultiResolver {
        get_default_resolvers(ResolverOptions::new("Movie", "Movies")).multi.resolver
    }

    fn ids(out: &MultiOutput) -> Vec<&str> {
        out.results.iter().filter_map(document_id).collect()
    }

    #[tokio::test]
    async fn test_lists_and_redacts() {
        let (registry, _) = setup(CollectionOptions::default());
        let ctx = ExecutionContext::for_principal(registry, Some(Principal::new("u1")));

        let out = resolver().resolve(&Value::Null, MultiInput::new(), &ctx).await.unwrap();

        assert_eq!(ids(&out), vec!["1", "2", "3"]);
        assert!(out.results.iter().all(|d| !d.contains_key("secret")));
        assert_eq!(out.total_count, Some(3));
    }

    #[tokio::test]
    async fn test_where_and_order_by() {
        let (registry, _) = setup(CollectionOptions::default());
        let ctx = ExecutionContext::for_principal(registry, Some(Principal::new("u1")));
        let input = MultiInput::new()
            .with_where(obj(json!({"year": {"gte": 1990}})))
            .with_order_by(obj(json!({"year": "desc"})))
            .with_limit(1);

        let out = resolver().resolve(&Value::Null, input, &ctx).await.unwrap();

        assert_eq!(ids(&out), vec!["3"]);
        // Total ignores pagination
        assert_eq!(out.total_count, Some(2));
    }

    #[tokio::test]
    async fn test_anonymous_cannot_filter_on_hidden_field() {
        let (registry, _) = setup(CollectionOptions::default());
        let ctx = ExecutionContext::anonymous(registry);
        let input = MultiInput::new().with_where(obj(json!({"year": {"gte": 1990}})));

        let out = resolver().resolve(&Value::Null, input, &ctx).await.unwrap();

        // Condition dropped, so every document comes back without `year`
        assert_eq!(out.results.len(), 3);
        assert!(out.results.iter().all(|d| !d.contains_key("year")));
    }

    #[tokio::test]
    async fn test_access_rule_drops_and_counts_visible() {
        let rule = DocumentAccessRule::new(|_, doc| document_id(doc) != Some("1"));
        let (registry, _) = setup(CollectionOptions::new().with_check_access(rule));
        let ctx = ExecutionContext::anonymous(registry);

        let out = resolver().resolve(&Value::Null, MultiInput::new(), &ctx).await.unwrap();

        assert_eq!(ids(&out), vec!["2", "3"]);
        assert_eq!(out.total_count, Some(2));
    }

    #[tokio::test]
    async fn test_total_disabled() {
        let (registry, storage) = setup(CollectionOptions::default());
        let ctx = ExecutionContext::anonymous(registry);

        let out = resolver()
            .resolve(&Value::Null, MultiInput::new().with_total(false), &ctx)
            .await
            .unwrap();

        assert!(out.total_count.is_none());
        assert_eq!(storage.stats().counts(), 0);
    }

    #[tokio::test]
    async fn test_results_prime_loader() {
        let (registry, storage) = setup(CollectionOptions::default());
        let ctx = ExecutionContext::anonymous(registry);

        resolver().resolve(&Value::Null, MultiInput::new(), &ctx).await.unwrap();
        let loader = ctx.loader("Movies").unwrap();
        assert!(loader.load("2").await.unwrap().is_some());
        assert_eq!(storage.stats().by_id_fetches(), 0);
    }

    #[tokio::test]
    async fn test_unknown_operator_rejected() {
        let (registry, storage) = setup(CollectionOptions::default());
        let ctx = ExecutionContext::anonymous(registry);
        let input = MultiInput::new().with_where(obj(json!({"title": {"regex": "A.*"}})));

        let err = resolver().resolve(&Value::Null, input, &ctx).await.unwrap_err();

        assert!(matches!(
            err,
            ResolverError::Filter(FilterError::UnknownOperator { .. })
        ));
        assert_eq!(storage.stats().finds(), 0);
    }

    #[tokio::test]
    async fn test_limit_above_max_rejected() {
        let (registry, _) = setup(CollectionOptions::default());
        let ctx = ExecutionContext::anonymous(registry);

        let err = resolver()
            .resolve(&Value::Null, MultiInput::new().with_limit(5000), &ctx)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_FILTER");
    }
}
