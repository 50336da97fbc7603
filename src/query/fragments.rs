//! Fragments and query templates
//!
//! [`FragmentSource`] is the fragment collaborator. [`FragmentRegistry`] is
//! an in-memory implementation keyed by fragment name.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;

use crate::collection::{camel_case, CollectionMetadata};
use crate::schema::ID_FIELD;

use super::errors::{QueryError, QueryResult};

static FRAGMENT_NAME: OnceLock<Option<Regex>> = OnceLock::new();

fn fragment_name_pattern() -> Option<&'static Regex> {
    FRAGMENT_NAME
        .get_or_init(|| Regex::new(r"fragment\s+([A-Za-z_][A-Za-z0-9_]*)\s+on\s+").ok())
        .as_ref()
}

/// Name declared by a fragment's text, e.g. `fragment MovieItem on Movie {..}`
pub fn extract_fragment_name(text: &str) -> Option<String> {
    fragment_name_pattern()?
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Query text for a single-document request, without the fragment body
pub fn single_query_template(type_name: &str, fragment_name: &str) -> String {
    format!(
        concat!(
            "query single{ty}Query($input: Single{ty}Input!) {{\n",
            "  {field}(input: $input) {{\n",
            "    result {{\n",
            "      ...{fragment}\n",
            "    }}\n",
            "  }}\n",
            "}}\n",
        ),
        ty = type_name,
        field = camel_case(type_name),
        fragment = fragment_name,
    )
}

/// Fragment collaborator
pub trait FragmentSource: Send + Sync {
    /// Fragment selecting the collection's declared fields
    ///
    /// With `only_viewable`, fields nobody but administrators can read are
    /// left out.
    fn default_fragment_text(&self, metadata: &CollectionMetadata, only_viewable: bool) -> String;

    /// Text of a named fragment
    fn fragment_text(&self, name: &str) -> Option<String>;

    fn extract_fragment_name(&self, text: &str) -> Option<String> {
        extract_fragment_name(text)
    }

    fn single_query_template(&self, type_name: &str, fragment_name: &str) -> String {
        single_query_template(type_name, fragment_name)
    }
}

/// In-memory fragment store
#[derive(Debug, Clone, Default)]
pub struct FragmentRegistry {
    fragments: BTreeMap<String, String>,
}

impl FragmentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a fragment under the name its text declares
    pub fn register(&mut self, text: impl Into<String>) -> QueryResult<String> {
        let text = text.into();
        let name = extract_fragment_name(&text)
            .ok_or_else(|| QueryError::InvalidFragment(first_line(&text)))?;
        self.fragments.insert(name.clone(), text);
        Ok(name)
    }

    pub fn with_fragment(mut self, text: impl Into<String>) -> QueryResult<Self> {
        self.register(text)?;
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }
}

impl FragmentSource for FragmentRegistry {
    fn default_fragment_text(&self, metadata: &CollectionMetadata, only_viewable: bool) -> String {
        let mut fields: Vec<&str> = Vec::new();
        if !metadata.schema.contains(ID_FIELD) {
            fields.push(ID_FIELD);
        }
        fields.extend(
            metadata
                .schema
                .iter()
                .filter(|(_, def)| !only_viewable || !def.can_read.is_never())
                .map(|(name, _)| name),
        );

        let mut text = format!(
            "fragment {} on {} {{\n",
            metadata.default_fragment_name(),
            metadata.type_name
        );
        for field in fields {
            text.push_str("  ");
            text.push_str(field);
            text.push('\n');
        }
        text.push_str("}\n");
        text
    }

    fn fragment_text(&self, name: &str) -> Option<String> {
        self.fragments.get(name).cloned()
    }
}

fn first_line(text: &str) -> String {
    text.lines().next().unwrap_or_default().trim().to_string()
}
