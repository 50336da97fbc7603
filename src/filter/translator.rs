//! # Selector/Terms Translator
//!
//! Turns a caller's `terms` / `where` object into a storage [`Predicate`]
//! and resolves sort and pagination.
//!
//! Filtering on a field is as good as reading it: a caller could binary
//! search a hidden value through repeated queries. A condition on a field the
//! principal cannot read is therefore dropped from the predicate entirely.
//! Operators are validated before the readability decision so a malformed
//! condition is rejected the same way whether or not the field is visible.

use serde_json::{Map, Value};
use tracing::debug;

use crate::auth::{field_is_readable, AccessError, Principal};
use crate::observability::Event;
use crate::schema::Schema;
use crate::settings::QueryConfig;

use super::errors::{FilterError, FilterResult};
use super::predicate::{Clause, FieldCondition, FilterOperator, Predicate};

/// Keys of a `terms` object that control pagination rather than filtering
pub const RESERVED_TERMS: &[&str] = &["limit", "offset", "skip", "sort", "orderBy"];

/// Nested AND group keyword
pub const AND_KEYWORD: &str = "_and";

/// Nested OR group keyword
pub const OR_KEYWORD: &str = "_or";

/// Sort clause
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSpec {
    pub field: String,
    pub ascending: bool,
}

impl SortSpec {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            ascending: true,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            ascending: false,
        }
    }
}

/// Sort and pagination handed to storage alongside the predicate
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FindOptions {
    pub sort: Vec<SortSpec>,
    /// `None` only for internal scans; caller fetches always carry a limit
    pub limit: Option<usize>,
    pub offset: usize,
}

impl FindOptions {
    /// Options for a single bounded lookup
    pub fn first() -> Self {
        Self {
            sort: Vec::new(),
            limit: Some(1),
            offset: 0,
        }
    }
}

/// Pagination given at the top level of a multi input. Wins over `terms`.
#[derive(Debug, Clone, Default)]
pub struct PageOverrides {
    pub order_by: Option<Map<String, Value>>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

/// Build the storage predicate for a principal
///
/// Top-level keys name fields; `_and` / `_or` hold arrays of nested objects.
/// A bare value means equality; an object maps operators to operands.
pub fn build_filter(
    schema: &Schema,
    principal: Option<&Principal>,
    terms: &Map<String, Value>,
) -> FilterResult<Predicate> {
    let mut rule_failure: Option<AccessError> = None;
    let predicate = build_filter_inner(schema, principal, terms, &mut rule_failure)?;

    match rule_failure {
        Some(err) => Err(err.into()),
        None => Ok(predicate),
    }
}

fn build_filter_inner(
    schema: &Schema,
    principal: Option<&Principal>,
    terms: &Map<String, Value>,
    rule_failure: &mut Option<AccessError>,
) -> FilterResult<Predicate> {
    let mut predicate = Predicate::new();

    for (key, value) in terms {
        if RESERVED_TERMS.contains(&key.as_str()) {
            continue;
        }

        if key == AND_KEYWORD || key == OR_KEYWORD {
            let groups = parse_group(schema, principal, key, value, rule_failure)?;
            if groups.is_empty() {
                continue;
            }
            predicate.push(if key == AND_KEYWORD {
                Clause::And(groups)
            } else {
                Clause::Or(groups)
            });
            continue;
        }

        let conditions = parse_conditions(key, value)?;

        match field_is_readable(schema, key, principal) {
            Ok(true) => {
                for condition in conditions {
                    predicate.push(Clause::Field(condition));
                }
            }
            Ok(false) => {
                debug!(
                    event = Event::FilterDropped.as_str(),
                    field = %key,
                    "dropped condition on unreadable field"
                );
            }
            Err(message) => {
                debug!(
                    event = Event::FilterDropped.as_str(),
                    field = %key,
                    "dropped condition, read rule failed"
                );
                if rule_failure.is_none() {
                    *rule_failure = Some(AccessError::rule_failure(key.clone(), message));
                }
            }
        }
    }

    Ok(predicate)
}

fn parse_group(
    schema: &Schema,
    principal: Option<&Principal>,
    key: &str,
    value: &Value,
    rule_failure: &mut Option<AccessError>,
) -> FilterResult<Vec<Predicate>> {
    let items = value
        .as_array()
        .ok_or_else(|| FilterError::invalid_condition(key, "expected an array of objects"))?;

    let mut groups = Vec::with_capacity(items.len());
    for item in items {
        let nested = item
            .as_object()
            .ok_or_else(|| FilterError::invalid_condition(key, "expected an array of objects"))?;
        let predicate = build_filter_inner(schema, principal, nested, rule_failure)?;
        // A branch emptied by redaction must not widen an OR into "match all"
        if !predicate.is_empty() {
            groups.push(predicate);
        }
    }
    Ok(groups)
}

fn parse_conditions(field: &str, value: &Value) -> FilterResult<Vec<FieldCondition>> {
    let ops = match value {
        Value::Object(ops) => ops,
        other => return Ok(vec![FieldCondition::eq(field, other.clone())]),
    };

    if ops.is_empty() {
        return Err(FilterError::invalid_condition(field, "empty condition"));
    }

    ops.iter()
        .map(|(name, operand)| {
            let operator =
                FilterOperator::parse(name).ok_or_else(|| FilterError::UnknownOperator {
                    field: field.to_string(),
                    operator: name.clone(),
                })?;
            if operator.takes_list() && !operand.is_array() {
                return Err(FilterError::invalid_condition(
                    field,
                    format!("operator '{}' expects an array", name),
                ));
            }
            Ok(FieldCondition::new(field, operator, operand.clone()))
        })
        .collect()
}

/// Resolve sort, limit and offset
///
/// These are not sensitive and pass through without readability checks.
pub fn resolve_find_options(
    terms: &Map<String, Value>,
    overrides: &PageOverrides,
    config: &QueryConfig,
) -> FilterResult<FindOptions> {
    let mut sort = Vec::new();
    if let Some(order_by) = &overrides.order_by {
        sort = parse_sort(order_by)?;
    } else if let Some(value) = terms.get("orderBy").or_else(|| terms.get("sort")) {
        let spec = value
            .as_object()
            .ok_or_else(|| FilterError::InvalidSort("expected an object".to_string()))?;
        sort = parse_sort(spec)?;
    }

    let limit = match overrides.limit {
        Some(limit) => limit,
        None => match terms.get("limit") {
            Some(v) => parse_count("limit", v)?,
            None => config.default_limit.min(config.max_limit),
        },
    };
    if limit == 0 {
        return Err(FilterError::InvalidPagination("limit must be positive".to_string()));
    }
    if limit > config.max_limit {
        return Err(FilterError::LimitExceeded(limit, config.max_limit));
    }

    let offset = match overrides.offset {
        Some(offset) => offset,
        None => match terms.get("offset").or_else(|| terms.get("skip")) {
            Some(v) => parse_count("offset", v)?,
            None => 0,
        },
    };

    Ok(FindOptions {
        sort,
        limit: Some(limit),
        offset,
    })
}

fn parse_sort(spec: &Map<String, Value>) -> FilterResult<Vec<SortSpec>> {
    spec.iter()
        .map(|(field, direction)| {
            let ascending = match direction {
                Value::String(s) => match s.to_lowercase().as_str() {
                    "asc" => true,
                    "desc" => false,
                    _ => {
                        return Err(FilterError::InvalidSort(format!(
                            "Invalid direction '{}' for {}",
                            s, field
                        )))
                    }
                },
                Value::Number(n) => match n.as_i64() {
                    Some(1) => true,
                    Some(-1) => false,
                    _ => {
                        return Err(FilterError::InvalidSort(format!(
                            "Invalid direction {} for {}",
                            n, field
                        )))
                    }
                },
                _ => {
                    return Err(FilterError::InvalidSort(format!(
                        "Invalid direction for {}",
                        field
                    )))
                }
            };
            Ok(SortSpec {
                field: field.clone(),
                ascending,
            })
        })
        .collect()
}

fn parse_count(name: &str, value: &Value) -> FilterResult<usize> {
    value
        .as_u64()
        .map(|n| n as usize)
        .ok_or_else(|| FilterError::InvalidPagination(format!("Invalid {}: {}", name, value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldDef, ReadRule};
    use serde_json::json;

    fn terms(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    fn movie_schema() -> Schema {
        Schema::new()
            .with_field("_id", FieldDef::string().readable_by(["admins", "members"]))
            .with_field("genre", FieldDef::string().public())
            .with_field("year", FieldDef::int().readable_by(["admins"]))
    }

    #[test]
    fn test_readable_range_condition_kept() {
        let p = Principal::admin("root");
        let conditions = terms(json!({"year": {"gte": 2000}}));
        let predicate = build_filter(&movie_schema(), Some(&p), &conditions).unwrap();

        assert_eq!(predicate.to_native(), json!({"year": {"$gte": 2000}}));
    }

    #[test]
    fn test_unreadable_field_dropped() {
        let p = Principal::new("u1");
        let predicate = build_filter(
            &movie_schema(),
            Some(&p),
            &terms(json!({"year": {"gte": 2000}, "genre": "drama"})),
        )
        .unwrap();

        assert!(!predicate.references("year"));
        assert_eq!(predicate.to_native(), json!({"genre": {"$eq": "drama"}}));
    }

    #[test]
    fn test_unreadable_field_dropped_inside_groups() {
        let p = Principal::new("u1");
        let predicate = build_filter(
            &movie_schema(),
            Some(&p),
            &terms(json!({"_or": [{"year": 1999}, {"genre": "drama"}]})),
        )
        .unwrap();

        assert!(!predicate.references("year"));
        assert_eq!(predicate.to_native(), json!({"$or": [{"genre": {"$eq": "drama"}}]}));
    }

    #[test]
    fn test_undeclared_field_dropped() {
        let p = Principal::admin("root");
        let predicate =
            build_filter(&movie_schema(), Some(&p), &terms(json!({"secret": 1}))).unwrap();
        assert!(predicate.is_empty());
    }

    #[test]
    fn test_unknown_operator_rejected_even_when_unreadable() {
        let p = Principal::new("u1");
        let result = build_filter(
            &movie_schema(),
            Some(&p),
            &terms(json!({"year": {"regex": "^19"}})),
        );
        assert!(matches!(result, Err(FilterError::UnknownOperator { .. })));
    }

    #[test]
    fn test_in_requires_array() {
        let result = build_filter(
            &movie_schema(),
            None,
            &terms(json!({"genre": {"in": "drama"}})),
        );
        assert!(matches!(result, Err(FilterError::InvalidCondition { .. })));
    }

    #[test]
    fn test_reserved_terms_ignored() {
        let predicate = build_filter(
            &movie_schema(),
            None,
            &terms(json!({"limit": 5, "offset": 2, "genre": "drama"})),
        )
        .unwrap();
        assert_eq!(predicate.clauses().len(), 1);
    }

    #[test]
    fn test_failing_rule_reported() {
        let schema = movie_schema().with_field(
            "rating",
            FieldDef::int().with_rule(ReadRule::predicate(|_| Err("down".into()))),
        );
        let result = build_filter(&schema, None, &terms(json!({"rating": 5})));
        assert!(matches!(result, Err(FilterError::Access(_))));
    }

    #[test]
    fn test_default_options() {
        let options =
            resolve_find_options(&Map::new(), &PageOverrides::default(), &QueryConfig::default())
                .unwrap();
        assert_eq!(options.limit, Some(100));
        assert_eq!(options.offset, 0);
        assert!(options.sort.is_empty());
    }

    #[test]
    fn test_terms_pagination_and_sort() {
        let options = resolve_find_options(
            &terms(json!({"limit": 5, "skip": 10, "sort": {"year": -1, "title": 1}})),
            &PageOverrides::default(),
            &QueryConfig::default(),
        )
        .unwrap();

        assert_eq!(options.limit, Some(5));
        assert_eq!(options.offset, 10);
        assert_eq!(options.sort, vec![SortSpec::desc("year"), SortSpec::asc("title")]);
    }

    #[test]
    fn test_overrides_win() {
        let mut order_by = Map::new();
        order_by.insert("title".into(), json!("desc"));
        let overrides = PageOverrides {
            order_by: Some(order_by),
            limit: Some(3),
            offset: Some(1),
        };
        let options = resolve_find_options(
            &terms(json!({"limit": 5, "sort": {"year": 1}})),
            &overrides,
            &QueryConfig::default(),
        )
        .unwrap();

        assert_eq!(options.limit, Some(3));
        assert_eq!(options.offset, 1);
        assert_eq!(options.sort, vec![SortSpec::desc("title")]);
    }

    #[test]
    fn test_limit_bounds() {
        let config = QueryConfig::default();
        let page = PageOverrides::default();

        let too_big = resolve_find_options(&terms(json!({"limit": 5000})), &page, &config);
        assert_eq!(too_big, Err(FilterError::LimitExceeded(5000, 1000)));

        let zero = resolve_find_options(&terms(json!({"limit": 0})), &page, &config);
        assert!(matches!(zero, Err(FilterError::InvalidPagination(_))));

        let negative = resolve_find_options(&terms(json!({"limit": -1})), &page, &config);
        assert!(matches!(negative, Err(FilterError::InvalidPagination(_))));
    }

    #[test]
    fn test_default_limit_capped_by_max_limit() {
        let config: QueryConfig = serde_json::from_str(r#"{"maxLimit": 50}"#).unwrap();

        let options =
            resolve_find_options(&Map::new(), &PageOverrides::default(), &config).unwrap();
        assert_eq!(options.limit, Some(50));

        let explicit = resolve_find_options(
            &terms(json!({"limit": 80})),
            &PageOverrides::default(),
            &config,
        );
        assert_eq!(explicit, Err(FilterError::LimitExceeded(80, 50)));
    }

    #[test]
    fn test_invalid_sort_direction() {
        let result = resolve_find_options(
            &terms(json!({"sort": {"year": "sideways"}})),
            &PageOverrides::default(),
            &QueryConfig::default(),
        );
        assert!(matches!(result, Err(FilterError::InvalidSort(_))));
    }
}
