//! Backend-agnostic metadata filter conditions
//!
//! The harness describes filters as JSON:
//!
//! ```json
//! {"and": [{"color": {"match": {"value": "red"}}}],
//!  "or":  [{"price": {"range": {"gte": 1, "lt": 9}}},
//!          {"location": {"geo": {"lon": 13.4, "lat": 52.5, "radius": 1000.0}}}]}
//! ```
//!
//! [`ConditionParser`] walks that shape once; each backend only supplies the
//! builders that turn single conditions into its native predicate syntax.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use crate::error::{BenchError, Result};

/// Numeric bounds of a range condition; at least one is set
///
/// Bounds keep their JSON number so integer fields stay integers downstream.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RangeBounds {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lt: Option<Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gt: Option<Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lte: Option<Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gte: Option<Number>,
}

impl RangeBounds {
    pub fn is_empty(&self) -> bool {
        self.lt.is_none() && self.gt.is_none() && self.lte.is_none() && self.gte.is_none()
    }
}

/// Geo radius condition; `radius` is in meters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GeoRadius {
    pub lon: f64,
    pub lat: f64,
    pub radius: f64,
}

/// A single condition on one payload field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldCondition {
    Match(Value),
    Range(RangeBounds),
    Geo(GeoRadius),
}

/// Condition bound to the field it applies to
#[derive(Debug, Clone, PartialEq)]
pub struct FieldFilter {
    pub field: String,
    pub condition: FieldCondition,
}

/// Parsed `and`/`or` groups of a condition object
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Conditions {
    pub and: Option<Vec<FieldFilter>>,
    pub or: Option<Vec<FieldFilter>>,
}

impl Conditions {
    /// Parse a harness condition object
    ///
    /// `None`, `null` and `{}` mean "no filter" and yield `Ok(None)`.
    pub fn parse(meta_conditions: Option<&Value>) -> Result<Option<Self>> {
        let obj = match meta_conditions {
            None | Some(Value::Null) => return Ok(None),
            Some(Value::Object(obj)) if obj.is_empty() => return Ok(None),
            Some(Value::Object(obj)) => obj,
            Some(other) => {
                return Err(invalid(format!("expected an object, got {}", other)));
            }
        };

        if let Some(key) = obj.keys().find(|k| *k != "and" && *k != "or") {
            return Err(invalid(format!(
                "unsupported key '{}', expected 'and' or 'or'",
                key
            )));
        }

        Ok(Some(Self {
            and: obj.get("and").map(parse_group).transpose()?,
            or: obj.get("or").map(parse_group).transpose()?,
        }))
    }
}

fn parse_group(entries: &Value) -> Result<Vec<FieldFilter>> {
    let entries = entries
        .as_array()
        .ok_or_else(|| invalid(format!("expected a list of conditions, got {}", entries)))?;

    let mut filters = Vec::new();
    for entry in entries {
        let entry = as_object(entry, "condition entry")?;
        for (field, field_filters) in entry {
            for (kind, condition) in as_object(field_filters, field)? {
                filters.push(FieldFilter {
                    field: field.clone(),
                    condition: parse_condition(field, kind, condition)?,
                });
            }
        }
    }
    Ok(filters)
}

fn parse_condition(field: &str, kind: &str, condition: &Value) -> Result<FieldCondition> {
    match kind {
        "match" => {
            let value = condition
                .get("value")
                .ok_or_else(|| invalid(format!("match on '{}' has no value", field)))?;
            match value {
                Value::String(_) | Value::Number(_) | Value::Bool(_) => {
                    Ok(FieldCondition::Match(value.clone()))
                }
                other => Err(invalid(format!(
                    "match on '{}' needs a string, number or bool, got {}",
                    field, other
                ))),
            }
        }
        "range" => {
            let range: RangeBounds = serde_json::from_value(condition.clone())
                .map_err(|e| invalid(format!("range on '{}': {}", field, e)))?;
            if range.is_empty() {
                return Err(invalid(format!("range on '{}' has no bounds", field)));
            }
            Ok(FieldCondition::Range(range))
        }
        "geo" => {
            let geo: GeoRadius = serde_json::from_value(condition.clone())
                .map_err(|e| invalid(format!("geo on '{}': {}", field, e)))?;
            Ok(FieldCondition::Geo(geo))
        }
        other => Err(invalid(format!(
            "unsupported condition '{}' on '{}'",
            other, field
        ))),
    }
}

fn as_object<'a>(value: &'a Value, what: &str) -> Result<&'a Map<String, Value>> {
    value
        .as_object()
        .ok_or_else(|| invalid(format!("{} must be an object, got {}", what, value)))
}

fn invalid(message: String) -> BenchError {
    BenchError::QueryConstruction(message)
}

/// Translates harness conditions into a backend's native filter
pub trait ConditionParser {
    /// Single translated predicate
    type Clause;
    /// Complete filter attached to a query
    type Filter;

    fn build_exact_match(&self, field: &str, value: &Value) -> Result<Self::Clause>;

    fn build_range(&self, field: &str, range: &RangeBounds) -> Result<Self::Clause>;

    fn build_geo(&self, field: &str, geo: &GeoRadius) -> Result<Self::Clause>;

    /// Combine the translated groups; `None` when nothing is left to filter on
    fn build_condition(
        &self,
        and: Option<Vec<Self::Clause>>,
        or: Option<Vec<Self::Clause>>,
    ) -> Result<Option<Self::Filter>>;

    /// Parse and translate harness conditions in one step
    fn parse(&self, meta_conditions: Option<&Value>) -> Result<Option<Self::Filter>> {
        let Some(conditions) = Conditions::parse(meta_conditions)? else {
            return Ok(None);
        };

        let and = conditions
            .and
            .as_deref()
            .map(|group| self.build_group(group))
            .transpose()?;
        let or = conditions
            .or
            .as_deref()
            .map(|group| self.build_group(group))
            .transpose()?;

        self.build_condition(and, or)
    }

    fn build_group(&self, group: &[FieldFilter]) -> Result<Vec<Self::Clause>> {
        group
            .iter()
            .map(|f| match &f.condition {
                FieldCondition::Match(value) => self.build_exact_match(&f.field, value),
                FieldCondition::Range(range) => self.build_range(&f.field, range),
                FieldCondition::Geo(geo) => self.build_geo(&f.field, geo),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_conditions() {
        assert_eq!(Conditions::parse(None).unwrap(), None);
        assert_eq!(Conditions::parse(Some(&Value::Null)).unwrap(), None);
        assert_eq!(Conditions::parse(Some(&json!({}))).unwrap(), None);
    }

    #[test]
    fn test_parse_and_or() {
        let raw = json!({
            "and": [{"color": {"match": {"value": "red"}}}],
            "or": [
                {"price": {"range": {"gte": 1, "lt": 9.5}}},
                {"location": {"geo": {"lon": 13.4, "lat": 52.5, "radius": 1000.0}}}
            ]
        });
        let parsed = Conditions::parse(Some(&raw)).unwrap().unwrap();

        let and = parsed.and.unwrap();
        assert_eq!(and.len(), 1);
        assert_eq!(and[0].field, "color");
        assert_eq!(and[0].condition, FieldCondition::Match(json!("red")));

        let or = parsed.or.unwrap();
        assert_eq!(
            or[0].condition,
            FieldCondition::Range(RangeBounds {
                gte: Some(1.into()),
                lt: Number::from_f64(9.5),
                ..Default::default()
            })
        );
        assert_eq!(
            or[1].condition,
            FieldCondition::Geo(GeoRadius { lon: 13.4, lat: 52.5, radius: 1000.0 })
        );
    }

    #[test]
    fn test_rejects_malformed() {
        let cases = [
            json!([1, 2]),
            json!({"not": []}),
            json!({"and": {"a": 1}}),
            json!({"and": [{"a": {"fuzzy": {"value": 1}}}]}),
            json!({"and": [{"a": {"match": {}}}]}),
            json!({"and": [{"a": {"match": {"value": [1]}}}]}),
            json!({"and": [{"a": {"range": {}}}]}),
            json!({"and": [{"a": {"range": {"between": 3}}}]}),
            json!({"and": [{"a": {"range": {"lt": "3"}}}]}),
            json!({"and": [{"a": {"geo": {"lon": 1.0}}}]}),
        ];
        for raw in cases {
            let err = Conditions::parse(Some(&raw)).unwrap_err();
            assert!(
                matches!(err, BenchError::QueryConstruction(_)),
                "{} -> {:?}",
                raw,
                err
            );
        }
    }
}
