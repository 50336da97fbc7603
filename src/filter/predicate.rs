//! # Storage Predicate AST
//!
//! The predicate handed to a storage accessor. Field conditions are combined
//! with AND; `_and` / `_or` groups nest.
//!
//! [`Predicate::to_native`] renders the storage engine's operator vocabulary
//! (`{"year": {"$gte": 2000}}`), and [`Predicate::matches`] evaluates it
//! against a document for in-memory backends.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::schema::Document;

/// Filter operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterOperator {
    /// Equals
    #[serde(rename = "$eq")]
    Eq,

    /// Not equals
    #[serde(rename = "$ne")]
    Neq,

    /// Greater than
    #[serde(rename = "$gt")]
    Gt,

    /// Greater than or equal
    #[serde(rename = "$gte")]
    Gte,

    /// Less than
    #[serde(rename = "$lt")]
    Lt,

    /// Less than or equal
    #[serde(rename = "$lte")]
    Lte,

    /// Value in list
    #[serde(rename = "$in")]
    In,

    /// Value not in list
    #[serde(rename = "$nin")]
    Nin,
}

impl FilterOperator {
    /// Native operator string
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOperator::Eq => "$eq",
            FilterOperator::Neq => "$ne",
            FilterOperator::Gt => "$gt",
            FilterOperator::Gte => "$gte",
            FilterOperator::Lt => "$lt",
            FilterOperator::Lte => "$lte",
            FilterOperator::In => "$in",
            FilterOperator::Nin => "$nin",
        }
    }

    /// Parse a caller-facing operator name
    ///
    /// Accepts `gte` and `_gte` spellings.
    pub fn parse(name: &str) -> Option<Self> {
        let name = name.strip_prefix('_').unwrap_or(name);
        match name {
            "eq" => Some(FilterOperator::Eq),
            "neq" | "ne" => Some(FilterOperator::Neq),
            "gt" => Some(FilterOperator::Gt),
            "gte" => Some(FilterOperator::Gte),
            "lt" => Some(FilterOperator::Lt),
            "lte" => Some(FilterOperator::Lte),
            "in" => Some(FilterOperator::In),
            "nin" => Some(FilterOperator::Nin),
            _ => None,
        }
    }

    /// Whether the operand must be an array
    pub fn takes_list(&self) -> bool {
        matches!(self, FilterOperator::In | FilterOperator::Nin)
    }
}

/// A condition on one field
#[derive(Debug, Clone, PartialEq)]
pub struct FieldCondition {
    pub field: String,
    pub operator: FilterOperator,
    pub value: Value,
}

impl FieldCondition {
    pub fn new(field: impl Into<String>, operator: FilterOperator, value: Value) -> Self {
        Self {
            field: field.into(),
            operator,
            value,
        }
    }

    /// Create an equality condition
    pub fn eq(field: impl Into<String>, value: Value) -> Self {
        Self::new(field, FilterOperator::Eq, value)
    }

    /// Check if a document matches this condition
    pub fn matches(&self, doc: &Document) -> bool {
        let field_value = match doc.get(&self.field) {
            Some(v) => v,
            // A missing field only satisfies negative operators
            None => return matches!(self.operator, FilterOperator::Neq | FilterOperator::Nin),
        };

        match self.operator {
            FilterOperator::Eq => field_value == &self.value,
            FilterOperator::Neq => field_value != &self.value,
            FilterOperator::Gt => {
                compare_json_values(field_value, &self.value) == Some(Ordering::Greater)
            }
            FilterOperator::Gte => matches!(
                compare_json_values(field_value, &self.value),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            FilterOperator::Lt => {
                compare_json_values(field_value, &self.value) == Some(Ordering::Less)
            }
            FilterOperator::Lte => matches!(
                compare_json_values(field_value, &self.value),
                Some(Ordering::Less | Ordering::Equal)
            ),
            FilterOperator::In => self
                .value
                .as_array()
                .map(|arr| arr.contains(field_value))
                .unwrap_or(false),
            FilterOperator::Nin => self
                .value
                .as_array()
                .map(|arr| !arr.contains(field_value))
                .unwrap_or(true),
        }
    }
}

/// Compare two JSON values for ordering
///
/// Only numbers with numbers and strings with strings are ordered.
pub fn compare_json_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(a), Value::Number(b)) => {
            let a_f = a.as_f64()?;
            let b_f = b.as_f64()?;
            a_f.partial_cmp(&b_f)
        }
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

/// One element of a predicate
#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    Field(FieldCondition),
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
}

impl Clause {
    fn matches(&self, doc: &Document) -> bool {
        match self {
            Clause::Field(c) => c.matches(doc),
            Clause::And(ps) => ps.iter().all(|p| p.matches(doc)),
            Clause::Or(ps) => ps.is_empty() || ps.iter().any(|p| p.matches(doc)),
        }
    }

    fn references(&self, field: &str) -> bool {
        match self {
            Clause::Field(c) => c.field == field,
            Clause::And(ps) | Clause::Or(ps) => ps.iter().any(|p| p.references(field)),
        }
    }
}

/// A set of clauses combined with AND logic
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Predicate {
    clauses: Vec<Clause>,
}

impl Predicate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a clause
    pub fn and(mut self, clause: Clause) -> Self {
        self.clauses.push(clause);
        self
    }

    pub fn push(&mut self, clause: Clause) {
        self.clauses.push(clause);
    }

    /// Append every clause of another predicate
    pub fn merge(&mut self, other: Predicate) {
        self.clauses.extend(other.clauses);
    }

    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    /// An empty predicate matches every document
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Check if a document matches all clauses
    pub fn matches(&self, doc: &Document) -> bool {
        self.clauses.iter().all(|c| c.matches(doc))
    }

    /// Whether any clause, at any depth, conditions on the field
    pub fn references(&self, field: &str) -> bool {
        self.clauses.iter().any(|c| c.references(field))
    }

    /// Render in the storage engine's native vocabulary
    pub fn to_native(&self) -> Value {
        let mut out = Map::new();
        for clause in &self.clauses {
            match clause {
                Clause::Field(c) => {
                    let entry = out
                        .entry(c.field.clone())
                        .or_insert_with(|| Value::Object(Map::new()));
                    if let Some(ops) = entry.as_object_mut() {
                        ops.insert(c.operator.as_str().to_string(), c.value.clone());
                    }
                }
                Clause::And(ps) => append_group(&mut out, "$and", ps),
                Clause::Or(ps) => append_group(&mut out, "$or", ps),
            }
        }
        Value::Object(out)
    }
}

fn append_group(out: &mut Map<String, Value>, key: &str, predicates: &[Predicate]) {
    let entry = out
        .entry(key.to_string())
        .or_insert_with(|| Value::Array(Vec::new()));
    if let Some(arr) = entry.as_array_mut() {
        arr.extend(predicates.iter().map(Predicate::to_native));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_operator_parse() {
        assert_eq!(FilterOperator::parse("gte"), Some(FilterOperator::Gte));
        assert_eq!(FilterOperator::parse("_gte"), Some(FilterOperator::Gte));
        assert_eq!(FilterOperator::parse("neq"), Some(FilterOperator::Neq));
        assert_eq!(FilterOperator::parse("regex"), None);
    }

    #[test]
    fn test_eq_condition() {
        let c = FieldCondition::eq("name", json!("Alice"));

        assert!(c.matches(&doc(json!({"name": "Alice"}))));
        assert!(!c.matches(&doc(json!({"name": "Bob"}))));
        assert!(!c.matches(&doc(json!({}))));
    }

    #[test]
    fn test_range_conditions() {
        let gte = FieldCondition::new("year", FilterOperator::Gte, json!(2000));
        let lt = FieldCondition::new("year", FilterOperator::Lt, json!(2010));

        assert!(gte.matches(&doc(json!({"year": 2000}))));
        assert!(!gte.matches(&doc(json!({"year": 1999}))));
        assert!(lt.matches(&doc(json!({"year": 2009.5}))));
        assert!(!lt.matches(&doc(json!({"year": "2009"}))));
    }

    #[test]
    fn test_list_conditions() {
        let within = FieldCondition::new("status", FilterOperator::In, json!(["a", "b"]));
        let outside = FieldCondition::new("status", FilterOperator::Nin, json!(["a", "b"]));

        assert!(within.matches(&doc(json!({"status": "a"}))));
        assert!(!within.matches(&doc(json!({"status": "c"}))));
        assert!(outside.matches(&doc(json!({"status": "c"}))));
        assert!(outside.matches(&doc(json!({}))));
    }

    #[test]
    fn test_to_native_groups_by_field() {
        let p = Predicate::new()
            .and(Clause::Field(FieldCondition::new("year", FilterOperator::Gte, json!(2000))))
            .and(Clause::Field(FieldCondition::new("year", FilterOperator::Lt, json!(2010))))
            .and(Clause::Field(FieldCondition::eq("genre", json!("drama"))));

        assert_eq!(
            p.to_native(),
            json!({"year": {"$gte": 2000, "$lt": 2010}, "genre": {"$eq": "drama"}})
        );
    }

    #[test]
    fn test_or_group() {
        let a = Predicate::new().and(Clause::Field(FieldCondition::eq("genre", json!("drama"))));
        let b = Predicate::new().and(Clause::Field(FieldCondition::eq("genre", json!("horror"))));
        let p = Predicate::new().and(Clause::Or(vec![a, b]));

        assert!(p.matches(&doc(json!({"genre": "horror"}))));
        assert!(!p.matches(&doc(json!({"genre": "comedy"}))));
        assert!(p.references("genre"));
        assert!(!p.references("year"));
        assert_eq!(
            p.to_native(),
            json!({"$or": [{"genre": {"$eq": "drama"}}, {"genre": {"$eq": "horror"}}]})
        );
    }

    #[test]
    fn test_empty_predicate_matches_everything() {
        let p = Predicate::new();
        assert!(p.is_empty());
        assert!(p.matches(&doc(json!({"anything": 1}))));
        assert_eq!(p.to_native(), json!({}));
    }
}
