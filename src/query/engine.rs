//! Query engine seam
//!
//! The engine executes query text against a context and reports
//! `{ data, errors }`. [`ResolverRouter`] is a small engine that serves the
//! default resolvers; deployments with a full schema engine plug in their own
//! [`QueryEngine`].

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::collection::CollectionRegistry;
use crate::context::ExecutionContext;
use crate::resolvers::{
    get_default_resolvers, MultiInput, MultiResolver, ResolverError, ResolverOptions, SingleInput,
    SingleResolver,
};
use crate::settings::QueryConfig;

/// Boxed engine future
pub type EngineFuture<'a> = Pin<Box<dyn Future<Output = EngineResponse> + Send + 'a>>;

/// One execution request
#[derive(Debug, Clone, Copy)]
pub struct EngineRequest<'a> {
    pub query: &'a str,
    pub root: &'a Value,
    pub context: &'a ExecutionContext,
    pub variables: &'a Map<String, Value>,
}

/// Error descriptor reported by an engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineError {
    pub message: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub path: Vec<String>,

    /// Machine-readable code, when the failure has one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl EngineError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            path: Vec::new(),
            code: None,
        }
    }
}

/// Engine result
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,

    /// Ordered; the first entry is the one surfaced to callers
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<EngineError>,
}

impl EngineResponse {
    pub fn data(data: Value) -> Self {
        Self {
            data: Some(data),
            errors: Vec::new(),
        }
    }

    pub fn error(error: EngineError) -> Self {
        Self {
            data: None,
            errors: vec![error],
        }
    }

    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Underlying query engine
pub trait QueryEngine: Send + Sync {
    fn execute<'a>(&'a self, request: EngineRequest<'a>) -> EngineFuture<'a>;
}

static ROOT_FIELD: OnceLock<Option<Regex>> = OnceLock::new();

/// First root field selected by a query, e.g. `movie` in
/// `query q($input: SingleMovieInput!) { movie(input: $input) { .. } }`
pub fn root_field(query: &str) -> Option<String> {
    ROOT_FIELD
        .get_or_init(|| Regex::new(r"^[^{]*\{\s*([A-Za-z_][A-Za-z0-9_]*)").ok())
        .as_ref()?
        .captures(query)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

#[derive(Debug, Clone)]
enum Route {
    Single(SingleResolver),
    Multi(MultiResolver),
}

/// Engine dispatching root fields to default resolvers
///
/// `movie` routes to the single resolver of type `Movie`, `movies` to its
/// multi resolver. The field's argument is read from `variables.input` and
/// the whole resolver output is returned; selection sets are not applied.
#[derive(Debug, Clone, Default)]
pub struct ResolverRouter {
    routes: BTreeMap<String, Route>,
}

impl ResolverRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route every registered collection with the given config
    pub fn from_registry(registry: &CollectionRegistry, config: &QueryConfig) -> Self {
        registry.iter().fold(Self::new(), |router, collection| {
            let options = ResolverOptions::from(&collection.metadata).with_config(config.clone());
            router.with_resolvers(options)
        })
    }

    /// Add the default resolvers of one collection
    pub fn with_resolvers(mut self, options: ResolverOptions) -> Self {
        let single_field = crate::collection::camel_case(&options.type_name);
        let multi_field = format!("{}s", single_field);
        let resolvers = get_default_resolvers(options);

        self.routes
            .insert(single_field, Route::Single(resolvers.single.resolver));
        self.routes
            .insert(multi_field, Route::Multi(resolvers.multi.resolver));
        self
    }

    /// Root fields served
    pub fn fields(&self) -> Vec<String> {
        self.routes.keys().cloned().collect()
    }

    async fn dispatch(
        &self,
        field: &str,
        route: &Route,
        request: EngineRequest<'_>,
    ) -> EngineResponse {
        let input = request
            .variables
            .get("input")
            .cloned()
            .unwrap_or_else(|| Value::Object(Map::new()));

        let output = match route {
            Route::Single(resolver) => match serde_json::from_value::<SingleInput>(input) {
                Ok(input) => resolver
                    .resolve(request.root, input, request.context)
                    .await
                    .map(|out| serde_json::to_value(out).map_err(|e| e.to_string())),
                Err(e) => return invalid_input(field, e),
            },
            Route::Multi(resolver) => match serde_json::from_value::<MultiInput>(input) {
                Ok(input) => resolver
                    .resolve(request.root, input, request.context)
                    .await
                    .map(|out| serde_json::to_value(out).map_err(|e| e.to_string())),
                Err(e) => return invalid_input(field, e),
            },
        };

        match output {
            Ok(Ok(value)) => {
                let mut data = Map::new();
                data.insert(field.to_string(), value);
                EngineResponse::data(Value::Object(data))
            }
            Ok(Err(message)) => EngineResponse::error(EngineError {
                message,
                path: vec![field.to_string()],
                code: Some("SERIALIZATION_ERROR".to_string()),
            }),
            Err(err) => resolver_failure(field, err),
        }
    }
}

impl QueryEngine for ResolverRouter {
    fn execute<'a>(&'a self, request: EngineRequest<'a>) -> EngineFuture<'a> {
        Box::pin(async move {
            let field = match root_field(request.query) {
                Some(field) => field,
                None => {
                    return EngineResponse::error(EngineError::new(
                        "Syntax error: no root field selected",
                    ))
                }
            };
            match self.routes.get(&field) {
                Some(route) => self.dispatch(&field, route, request).await,
                None => EngineResponse::error(EngineError {
                    message: format!("Cannot query field \"{}\" on type \"Query\"", field),
                    path: vec![field.clone()],
                    code: None,
                }),
            }
        })
    }
}

fn invalid_input(field: &str, err: serde_json::Error) -> EngineResponse {
    resolver_failure(field, ResolverError::InvalidInput(err.to_string()))
}

fn resolver_failure(field: &str, err: ResolverError) -> EngineResponse {
    let mut data = Map::new();
    data.insert(field.to_string(), Value::Null);
    EngineResponse {
        data: Some(Value::Object(data)),
        errors: vec![EngineError {
            message: err.to_string(),
            path: vec![field.to_string()],
            code: Some(err.code().to_string()),
        }],
    }
}
