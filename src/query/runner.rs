//! Execution Context Builder
//!
//! Every call gets a fresh [`ExecutionContext`]: default principal and locale,
//! caller overrides merged on top, one new loader per collection. The context
//! is dropped when the call returns.
//!
//! Without overrides a query runs as the privileged system principal. Callers
//! serving external users must narrow it with [`ContextOverrides`].

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{error, info};

use crate::collection::{CollectionMetadata, CollectionRegistry};
use crate::context::{ContextOverrides, ExecutionContext};
use crate::observability::{log_event_with_fields, Event};
use crate::resolvers::SingleInput;
use crate::schema::Document;
use crate::settings::Settings;

use super::engine::{EngineRequest, QueryEngine, ResolverRouter};
use super::errors::{QueryError, QueryResult};
use super::fragments::{FragmentRegistry, FragmentSource};

/// Fragment choice for [`build_query`]
#[derive(Debug, Clone, Default)]
pub struct FragmentSelection {
    pub fragment_name: Option<String>,
    pub fragment_text: Option<String>,
}

impl FragmentSelection {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            fragment_name: Some(name.into()),
            fragment_text: None,
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self {
            fragment_name: None,
            fragment_text: Some(text.into()),
        }
    }
}

/// Compose a single-document query for a collection
///
/// Precedence: explicit name, then explicit text, then the default fragment
/// over every declared field. Readability is enforced when the response is
/// resolved, not here.
pub fn build_query(
    metadata: &CollectionMetadata,
    selection: &FragmentSelection,
    fragments: &dyn FragmentSource,
) -> QueryResult<String> {
    let (name, text) = if let Some(name) = &selection.fragment_name {
        let text = fragments
            .fragment_text(name)
            .ok_or_else(|| QueryError::UnknownFragment(name.clone()))?;
        (name.clone(), text)
    } else if let Some(text) = &selection.fragment_text {
        let name = fragments
            .extract_fragment_name(text)
            .ok_or_else(|| QueryError::InvalidFragment(text.clone()))?;
        (name, text.clone())
    } else {
        (
            metadata.default_fragment_name(),
            fragments.default_fragment_text(metadata, false),
        )
    };

    let mut query = fragments.single_query_template(&metadata.type_name, &name);
    query.push_str(&text);
    Ok(query)
}

/// Runs queries with a request-scoped context
pub struct QueryRunner {
    engine: Arc<dyn QueryEngine>,
    collections: Arc<CollectionRegistry>,
    settings: Settings,
    fragments: Arc<dyn FragmentSource>,
}

impl QueryRunner {
    pub fn new(
        engine: Arc<dyn QueryEngine>,
        collections: Arc<CollectionRegistry>,
        settings: Settings,
    ) -> Self {
        Self {
            engine,
            collections,
            settings,
            fragments: Arc::new(FragmentRegistry::new()),
        }
    }

    /// Runner backed by a [`ResolverRouter`] over every registered collection
    ///
    /// Fails when the `"query"` settings section is malformed.
    pub fn with_default_engine(
        collections: Arc<CollectionRegistry>,
        settings: Settings,
    ) -> QueryResult<Self> {
        let router = ResolverRouter::from_registry(&collections, &settings.query_config()?);
        Ok(Self::new(Arc::new(router), collections, settings))
    }

    pub fn with_fragments(mut self, fragments: Arc<dyn FragmentSource>) -> Self {
        self.fragments = fragments;
        self
    }

    pub fn collections(&self) -> &Arc<CollectionRegistry> {
        &self.collections
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Fresh context: defaults from settings, overrides on top
    pub fn context(&self, overrides: ContextOverrides) -> ExecutionContext {
        let ctx =
            ExecutionContext::build(self.collections.clone(), self.settings.locale(), overrides);
        info!(
            event = Event::ContextBuilt.as_str(),
            request_id = %ctx.request_id,
            anonymous = ctx.principal().is_none(),
            locale = %ctx.locale,
            loaders = ctx.loader_count(),
            "context built"
        );
        ctx
    }

    /// Execute a query
    ///
    /// If the engine reports errors, all of them are logged and the first
    /// message becomes [`QueryError::Engine`]. Returns the response data.
    pub async fn run_graphql(
        &self,
        query: &str,
        variables: &Map<String, Value>,
        overrides: ContextOverrides,
    ) -> QueryResult<Value> {
        let context = self.context(overrides);
        info!(
            event = Event::QueryReceived.as_str(),
            request_id = %context.request_id,
            "query received"
        );

        let root = Value::Object(Map::new());
        let response = self
            .engine
            .execute(EngineRequest {
                query,
                root: &root,
                context: &context,
                variables,
            })
            .await;

        if let Some(first) = response.errors.first() {
            for err in &response.errors {
                error!(
                    event = Event::QueryRejected.as_str(),
                    request_id = %context.request_id,
                    code = err.code.as_deref().unwrap_or(""),
                    path = %err.path.join("."),
                    reason = %err.message,
                    "query engine error"
                );
            }
            return Err(QueryError::Engine(first.message.clone()));
        }

        info!(
            event = Event::QueryExecuted.as_str(),
            request_id = %context.request_id,
            elapsed_ms = context.elapsed_ms() as u64,
            "query executed"
        );
        Ok(response.data.unwrap_or(Value::Null))
    }

    /// Alias of [`run_graphql`](Self::run_graphql)
    pub async fn run_query(
        &self,
        query: &str,
        variables: &Map<String, Value>,
        overrides: ContextOverrides,
    ) -> QueryResult<Value> {
        self.run_graphql(query, variables, overrides).await
    }

    /// [`build_query`] with this runner's fragments
    pub fn build_query(
        &self,
        metadata: &CollectionMetadata,
        selection: &FragmentSelection,
    ) -> QueryResult<String> {
        build_query(metadata, selection, self.fragments.as_ref())
    }

    /// One query handle per registered collection, built once at startup
    pub fn collection_queries(self: &Arc<Self>) -> BTreeMap<String, CollectionQuery> {
        let handles: BTreeMap<_, _> = self
            .collections
            .iter()
            .map(|c| {
                let handle = CollectionQuery {
                    runner: self.clone(),
                    metadata: c.metadata.clone(),
                };
                (c.name().to_string(), handle)
            })
            .collect();

        let names = handles.keys().cloned().collect::<Vec<_>>().join(",");
        log_event_with_fields(
            Event::CollectionsRegistered,
            &[("collections", names.as_str()), ("count", handles.len().to_string().as_str())],
        );
        handles
    }

    /// Query handle of one collection
    pub fn collection_query(self: &Arc<Self>, name: &str) -> QueryResult<CollectionQuery> {
        let collection = self
            .collections
            .get(name)
            .ok_or_else(|| QueryError::CollectionNotRegistered(name.to_string()))?;
        Ok(CollectionQuery {
            runner: self.clone(),
            metadata: collection.metadata.clone(),
        })
    }
}

impl std::fmt::Debug for QueryRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryRunner")
            .field("collections", &self.collections.names())
            .finish_non_exhaustive()
    }
}

/// Target of [`CollectionQuery::query_one`]
#[derive(Debug, Clone)]
pub enum SingleTarget {
    Id(String),
    Input(SingleInput),
}

impl SingleTarget {
    fn into_input(self) -> SingleInput {
        match self {
            SingleTarget::Id(id) => SingleInput::by_id(id),
            SingleTarget::Input(input) => input,
        }
    }
}

impl From<&str> for SingleTarget {
    fn from(id: &str) -> Self {
        SingleTarget::Id(id.to_string())
    }
}

impl From<String> for SingleTarget {
    fn from(id: String) -> Self {
        SingleTarget::Id(id)
    }
}

impl From<SingleInput> for SingleTarget {
    fn from(input: SingleInput) -> Self {
        SingleTarget::Input(input)
    }
}

/// Options of [`CollectionQuery::query_one`]
#[derive(Debug, Default)]
pub struct QueryOneOptions {
    pub fragment: FragmentSelection,
    pub context: ContextOverrides,
}

impl QueryOneOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fragment(mut self, fragment: FragmentSelection) -> Self {
        self.fragment = fragment;
        self
    }

    pub fn with_context(mut self, context: ContextOverrides) -> Self {
        self.context = context;
        self
    }
}

/// Per-collection convenience queries
#[derive(Debug, Clone)]
pub struct CollectionQuery {
    runner: Arc<QueryRunner>,
    metadata: CollectionMetadata,
}

impl CollectionQuery {
    pub fn metadata(&self) -> &CollectionMetadata {
        &self.metadata
    }

    /// Fetch one document by id or full single input
    ///
    /// Returns `None` when the lookup allowed null and nothing matched.
    pub async fn query_one(
        &self,
        target: impl Into<SingleTarget>,
        options: QueryOneOptions,
    ) -> QueryResult<Option<Document>> {
        let query = self.runner.build_query(&self.metadata, &options.fragment)?;

        let mut variables = Map::new();
        variables.insert(
            "input".to_string(),
            serde_json::to_value(target.into().into_input())?,
        );

        let data = self
            .runner
            .run_query(&query, &variables, options.context)
            .await?;

        let field = self.metadata.single_field_name();
        let result = data
            .get(&field)
            .and_then(|v| v.get("result"))
            .ok_or_else(|| QueryError::MissingData(format!("{}.result", field)))?;

        match result {
            Value::Null => Ok(None),
            other => Ok(Some(serde_json::from_value(other.clone())?)),
        }
    }
}
