//! Single-document resolver

use std::sync::Arc;

use serde_json::Value;

use crate::auth::{check_document_access, restrict_viewable_fields};
use crate::collection::{document_id, Collection};
use crate::context::ExecutionContext;
use crate::filter::{Clause, FieldCondition, FindOptions, Predicate};
use crate::observability::{log_event_with_fields, Event};
use crate::schema::Document;

use super::errors::{ResolverError, ResolverResult};
use super::input::{SingleInput, SingleOutput};
use super::ResolverOptions;

/// Field used by slug selectors
const SLUG_FIELD: &str = "slug";

/// Fetches one document by id or slug
#[derive(Debug, Clone)]
pub struct SingleResolver {
    options: Arc<ResolverOptions>,
}

impl SingleResolver {
    pub(super) fn new(options: Arc<ResolverOptions>) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ResolverOptions {
        &self.options
    }

    /// Resolve a single lookup
    ///
    /// A miss resolves to `{ result: null }` only when `allow_null` is set;
    /// an empty selector is a miss. A document the principal may not view is
    /// a `PermissionDenied` error carrying nothing of the document.
    pub async fn resolve(
        &self,
        _root: &Value,
        input: SingleInput,
        ctx: &ExecutionContext,
    ) -> ResolverResult<SingleOutput> {
        let collection = self.options.collection(ctx)?;
        let cache_max_age = self.options.cache_hint(input.enable_cache, collection);

        let document = match self.fetch(&input, collection, ctx).await? {
            Some(doc) => doc,
            None if input.allow_null => {
                return Ok(SingleOutput {
                    result: None,
                    cache_max_age,
                })
            }
            None => {
                let selector = input.selector.describe();
                log_event_with_fields(
                    Event::DocumentNotFound,
                    &[("collection", collection.name()), ("selector", selector.as_str())],
                );
                return Err(ResolverError::NotFound {
                    collection: collection.name().to_string(),
                    selector,
                });
            }
        };

        let rule = self.options.access_rule(collection);
        if !check_document_access(&document, ctx.principal(), rule) {
            let request_id = ctx.request_id.to_string();
            log_event_with_fields(
                Event::AccessDenied,
                &[("collection", collection.name()), ("request_id", request_id.as_str())],
            );
            return Err(ResolverError::PermissionDenied {
                collection: collection.name().to_string(),
            });
        }

        let result =
            restrict_viewable_fields(&collection.metadata.schema, ctx.principal(), document)?;
        Ok(SingleOutput {
            result: Some(result),
            cache_max_age,
        })
    }

    async fn fetch(
        &self,
        input: &SingleInput,
        collection: &Collection,
        ctx: &ExecutionContext,
    ) -> ResolverResult<Option<Document>> {
        let loader = ctx
            .loader(collection.name())
            .ok_or_else(|| ResolverError::LoaderUnavailable(collection.name().to_string()))?;

        if let Some(id) = &input.selector.document_id {
            return Ok(loader.load(id).await?);
        }

        if let Some(slug) = &input.selector.slug {
            let predicate = Predicate::new().and(Clause::Field(FieldCondition::eq(
                SLUG_FIELD,
                Value::String(slug.clone()),
            )));
            let found = collection
                .storage
                .find(&predicate, &FindOptions::first())
                .await?
                .into_iter()
                .next();

            if let Some(doc) = &found {
                if let Some(id) = document_id(doc) {
                    loader.prime(id, doc.clone())?;
                }
            }
            return Ok(found);
        }

        Ok(None)
    }
}
