//! Harness conditions to Weaviate GraphQL `where` filters

use std::fmt;

use serde_json::{Number, Value};

use crate::conditions::{ConditionParser, GeoRadius, RangeBounds};
use crate::error::{BenchError, Result};

/// Comparison operators used by the translated filters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WhereOperator {
    Equal,
    LessThan,
    LessThanEqual,
    GreaterThan,
    GreaterThanEqual,
    WithinGeoRange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupOperator {
    And,
    Or,
}

/// Typed operand value; selects the `value*` key Weaviate expects
#[derive(Debug, Clone, PartialEq)]
pub enum WhereValue {
    Text(String),
    Int(i64),
    Number(f64),
    Boolean(bool),
    GeoRange { lat: f64, lon: f64, max_distance: f64 },
}

/// A `where` argument of a GraphQL `Get` query
#[derive(Debug, Clone, PartialEq)]
pub enum WhereFilter {
    Operand {
        path: String,
        operator: WhereOperator,
        value: WhereValue,
    },
    Group {
        operator: GroupOperator,
        operands: Vec<WhereFilter>,
    },
}

impl WhereFilter {
    fn operand(path: &str, operator: WhereOperator, value: WhereValue) -> Self {
        WhereFilter::Operand {
            path: path.to_string(),
            operator,
            value,
        }
    }

    /// Group `operands`, collapsing a single operand to itself
    fn group(operator: GroupOperator, mut operands: Vec<WhereFilter>) -> Self {
        if operands.len() == 1 {
            return operands.remove(0);
        }
        WhereFilter::Group { operator, operands }
    }
}

impl fmt::Display for WhereOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl fmt::Display for GroupOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl fmt::Display for WhereValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // JSON string escaping is valid GraphQL string syntax
            WhereValue::Text(s) => write!(f, "valueText: {}", Value::String(s.clone())),
            WhereValue::Int(n) => write!(f, "valueInt: {}", n),
            WhereValue::Number(n) => write!(f, "valueNumber: {:?}", n),
            WhereValue::Boolean(b) => write!(f, "valueBoolean: {}", b),
            WhereValue::GeoRange {
                lat,
                lon,
                max_distance,
            } => write!(
                f,
                "valueGeoRange: {{geoCoordinates: {{latitude: {:?}, longitude: {:?}}}, distance: {{max: {:?}}}}}",
                lat, lon, max_distance
            ),
        }
    }
}

impl fmt::Display for WhereFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WhereFilter::Operand {
                path,
                operator,
                value,
            } => write!(
                f,
                "{{path: [{}], operator: {}, {}}}",
                Value::String(path.clone()),
                operator,
                value
            ),
            WhereFilter::Group { operator, operands } => {
                write!(f, "{{operator: {}, operands: [", operator)?;
                for (i, operand) in operands.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", operand)?;
                }
                f.write_str("]}")
            }
        }
    }
}

fn number_value(field: &str, n: &Number) -> Result<WhereValue> {
    if let Some(i) = n.as_i64() {
        return Ok(WhereValue::Int(i));
    }
    match n.as_f64() {
        Some(x) if n.is_f64() => Ok(WhereValue::Number(x)),
        _ => Err(BenchError::QueryConstruction(format!(
            "value {} on '{}' does not fit a Weaviate number",
            n, field
        ))),
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct WeaviateConditionParser;

impl ConditionParser for WeaviateConditionParser {
    type Clause = WhereFilter;
    type Filter = WhereFilter;

    fn build_exact_match(&self, field: &str, value: &Value) -> Result<WhereFilter> {
        let value = match value {
            Value::String(s) => WhereValue::Text(s.clone()),
            Value::Bool(b) => WhereValue::Boolean(*b),
            Value::Number(n) => number_value(field, n)?,
            other => {
                return Err(BenchError::QueryConstruction(format!(
                    "cannot match '{}' against {}",
                    field, other
                )))
            }
        };
        Ok(WhereFilter::operand(field, WhereOperator::Equal, value))
    }

    fn build_range(&self, field: &str, range: &RangeBounds) -> Result<WhereFilter> {
        let bounds = [
            (&range.lt, WhereOperator::LessThan),
            (&range.gt, WhereOperator::GreaterThan),
            (&range.lte, WhereOperator::LessThanEqual),
            (&range.gte, WhereOperator::GreaterThanEqual),
        ];

        let mut operands = Vec::new();
        for (bound, operator) in bounds {
            if let Some(n) = bound {
                operands.push(WhereFilter::operand(field, operator, number_value(field, n)?));
            }
        }
        if operands.is_empty() {
            return Err(BenchError::QueryConstruction(format!(
                "range on '{}' has no bounds",
                field
            )));
        }
        Ok(WhereFilter::group(GroupOperator::And, operands))
    }

    fn build_geo(&self, field: &str, geo: &GeoRadius) -> Result<WhereFilter> {
        Ok(WhereFilter::operand(
            field,
            WhereOperator::WithinGeoRange,
            WhereValue::GeoRange {
                lat: geo.lat,
                lon: geo.lon,
                max_distance: geo.radius,
            },
        ))
    }

    fn build_condition(
        &self,
        and: Option<Vec<WhereFilter>>,
        or: Option<Vec<WhereFilter>>,
    ) -> Result<Option<WhereFilter>> {
        let and = and
            .filter(|f| !f.is_empty())
            .map(|f| WhereFilter::group(GroupOperator::And, f));
        let or = or
            .filter(|f| !f.is_empty())
            .map(|f| WhereFilter::group(GroupOperator::Or, f));

        Ok(match (and, or) {
            (Some(and), Some(or)) => Some(WhereFilter::Group {
                operator: GroupOperator::And,
                operands: vec![and, or],
            }),
            (and, or) => and.or(or),
        })
    }
}
