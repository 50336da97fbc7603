//! Resolver inputs and outputs
//!
//! Wire shapes are camelCase so engine variables deserialize directly.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::schema::Document;

/// Target of a single-document lookup
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Selector {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
}

impl Selector {
    pub fn document_id(id: impl Into<String>) -> Self {
        Self {
            document_id: Some(id.into()),
            slug: None,
        }
    }

    pub fn slug(slug: impl Into<String>) -> Self {
        Self {
            document_id: None,
            slug: Some(slug.into()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.document_id.is_none() && self.slug.is_none()
    }

    /// Human-readable form for errors and logs
    pub fn describe(&self) -> String {
        match (&self.document_id, &self.slug) {
            (Some(id), _) => format!("documentId '{}'", id),
            (None, Some(slug)) => format!("slug '{}'", slug),
            (None, None) => "an empty selector".to_string(),
        }
    }
}

/// Input of the single resolver
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SingleInput {
    #[serde(default)]
    pub selector: Selector,

    /// Resolve to `null` instead of failing when nothing matches
    #[serde(default)]
    pub allow_null: bool,

    /// Attach a cache hint to the output
    #[serde(default)]
    pub enable_cache: bool,
}

impl SingleInput {
    /// Lookup by document id
    pub fn by_id(id: impl Into<String>) -> Self {
        Self {
            selector: Selector::document_id(id),
            ..Self::default()
        }
    }

    /// Lookup by slug
    pub fn by_slug(slug: impl Into<String>) -> Self {
        Self {
            selector: Selector::slug(slug),
            ..Self::default()
        }
    }

    pub fn allow_null(mut self) -> Self {
        self.allow_null = true;
        self
    }

    pub fn enable_cache(mut self) -> Self {
        self.enable_cache = true;
        self
    }
}

/// Output of the single resolver
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SingleOutput {
    pub result: Option<Document>,

    /// Seconds the result may be cached, when caching was requested
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_max_age: Option<u32>,
}

/// Input of the multi resolver
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultiInput {
    /// Filter criteria plus `limit` / `offset` / `skip` / `sort`
    #[serde(default)]
    pub terms: Map<String, Value>,

    /// Additional filter criteria, combined with `terms` by AND
    #[serde(default, rename = "where", skip_serializing_if = "Option::is_none")]
    pub filter: Option<Map<String, Value>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_by: Option<Map<String, Value>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<usize>,

    /// Compute `totalCount`; unset means the configured default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_total: Option<bool>,

    #[serde(default)]
    pub enable_cache: bool,
}

impl MultiInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_terms(mut self, terms: Map<String, Value>) -> Self {
        self.terms = terms;
        self
    }

    pub fn with_where(mut self, filter: Map<String, Value>) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn with_order_by(mut self, order_by: Map<String, Value>) -> Self {
        self.order_by = Some(order_by);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn with_total(mut self, enable: bool) -> Self {
        self.enable_total = Some(enable);
        self
    }
}

/// Output of the multi resolver
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultiOutput {
    pub results: Vec<Document>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_count: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_max_age: Option<u32>,
}
