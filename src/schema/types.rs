//! Schema type definitions
//!
//! A schema maps field names to [`FieldDef`]s. Each field carries a value
//! type and a [`ReadRule`] deciding who may see it.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::auth::principal::{role_groups, Principal};

/// Identity field carried by every stored document
pub const ID_FIELD: &str = "_id";

/// Raw record as returned by storage, keys in insertion order
pub type Document = Map<String, Value>;

/// Supported field value types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Int,
    Float,
    Bool,
    Date,
    Object,
    Array,
}

/// Signature of a computed read rule. `Err` means the rule itself failed.
pub type ReadFn = dyn Fn(Option<&Principal>) -> Result<bool, String> + Send + Sync;

/// Shareable computed read rule
#[derive(Clone)]
pub struct ReadPredicate(Arc<ReadFn>);

impl ReadPredicate {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(Option<&Principal>) -> Result<bool, String> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    fn call(&self, principal: Option<&Principal>) -> Result<bool, String> {
        (self.0)(principal)
    }
}

impl fmt::Debug for ReadPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ReadPredicate(..)")
    }
}

/// Field-level read capability
///
/// Serialized forms: `{"roles": ["admins"]}`, `"always"`, `"never"`.
/// Computed predicates are code-only.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadRule {
    /// Readable by any principal in one of these groups
    Roles(BTreeSet<String>),
    /// Readable by everyone
    Always,
    /// Readable by nobody except administrators
    #[default]
    Never,
    /// Decided by code
    #[serde(skip)]
    Predicate(ReadPredicate),
}

impl ReadRule {
    /// Rule granting read access to the given groups
    pub fn roles<I, S>(roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ReadRule::Roles(roles.into_iter().map(Into::into).collect())
    }

    /// Rule computed from the principal
    pub fn predicate<F>(f: F) -> Self
    where
        F: Fn(Option<&Principal>) -> Result<bool, String> + Send + Sync + 'static,
    {
        ReadRule::Predicate(ReadPredicate::new(f))
    }

    /// Evaluate the rule for a principal
    ///
    /// Administrator bypass is not applied here; see
    /// [`crate::auth::field_is_readable`].
    pub fn evaluate(&self, principal: Option<&Principal>) -> Result<bool, String> {
        match self {
            ReadRule::Always => Ok(true),
            ReadRule::Never => Ok(false),
            ReadRule::Roles(allowed) => {
                let groups = role_groups(principal);
                Ok(allowed.iter().any(|r| groups.contains(r)))
            }
            ReadRule::Predicate(p) => p.call(principal),
        }
    }

    /// Whether nobody but administrators can ever read the field
    pub fn is_never(&self) -> bool {
        matches!(self, ReadRule::Never)
    }
}

/// Field definition
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDef {
    /// Field data type
    #[serde(rename = "type")]
    pub field_type: FieldType,

    /// Who may read the field. Undeclared means nobody.
    #[serde(default)]
    pub can_read: ReadRule,
}

impl FieldDef {
    /// Create a field nobody but administrators can read
    pub fn new(field_type: FieldType) -> Self {
        Self {
            field_type,
            can_read: ReadRule::Never,
        }
    }

    /// Create a string field
    pub fn string() -> Self {
        Self::new(FieldType::String)
    }

    /// Create an int field
    pub fn int() -> Self {
        Self::new(FieldType::Int)
    }

    /// Make the field readable by the given groups
    pub fn readable_by<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.can_read = ReadRule::roles(roles);
        self
    }

    /// Make the field readable by everyone
    pub fn public(mut self) -> Self {
        self.can_read = ReadRule::Always;
        self
    }

    /// Set an explicit read rule
    pub fn with_rule(mut self, rule: ReadRule) -> Self {
        self.can_read = rule;
        self
    }
}

/// Collection schema
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Schema {
    fields: BTreeMap<String, FieldDef>,
}

impl Schema {
    /// Create an empty schema
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field definition
    pub fn with_field(mut self, name: impl Into<String>, def: FieldDef) -> Self {
        self.fields.insert(name.into(), def);
        self
    }

    /// Look up a field
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.get(name)
    }

    /// Whether the schema declares a field
    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Declared field names in sorted order
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Declared fields in sorted order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldDef)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Validates the schema structure itself (not a document)
    ///
    /// Field names must be non-empty and must not collide with the filter
    /// vocabulary (`$`-prefixed operators, `_and`, `_or`).
    pub fn validate_structure(&self) -> Result<(), String> {
        for name in self.fields.keys() {
            if name.is_empty() {
                return Err("Schema contains an empty field name".into());
            }
            if name.starts_with('$') {
                return Err(format!("Field '{}' must not start with '$'", name));
            }
            if name == "_and" || name == "_or" {
                return Err(format!("Field '{}' is a reserved filter keyword", name));
            }
        }
        Ok(())
    }
}
