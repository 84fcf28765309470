//! Harness conditions to Qdrant filters

use serde::Serialize;
use serde_json::Value;

use crate::conditions::{ConditionParser, GeoRadius, RangeBounds};
use crate::error::Result;

/// Qdrant `Filter`; empty groups are omitted
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QdrantFilter {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub must: Vec<QdrantCondition>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub should: Vec<QdrantCondition>,
}

/// Qdrant `FieldCondition`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QdrantCondition {
    pub key: String,
    #[serde(rename = "match", skip_serializing_if = "Option::is_none")]
    pub match_value: Option<MatchValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<RangeBounds>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geo_radius: Option<QdrantGeoRadius>,
}

impl QdrantCondition {
    fn new(key: &str) -> Self {
        Self {
            key: key.to_string(),
            match_value: None,
            range: None,
            geo_radius: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchValue {
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QdrantGeoRadius {
    pub center: GeoPoint,
    pub radius: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeoPoint {
    pub lon: f64,
    pub lat: f64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct QdrantConditionParser;

impl ConditionParser for QdrantConditionParser {
    type Clause = QdrantCondition;
    type Filter = QdrantFilter;

    fn build_exact_match(&self, field: &str, value: &Value) -> Result<QdrantCondition> {
        Ok(QdrantCondition {
            match_value: Some(MatchValue {
                value: value.clone(),
            }),
            ..QdrantCondition::new(field)
        })
    }

    fn build_range(&self, field: &str, range: &RangeBounds) -> Result<QdrantCondition> {
        Ok(QdrantCondition {
            range: Some(range.clone()),
            ..QdrantCondition::new(field)
        })
    }

    fn build_geo(&self, field: &str, geo: &GeoRadius) -> Result<QdrantCondition> {
        Ok(QdrantCondition {
            geo_radius: Some(QdrantGeoRadius {
                center: GeoPoint {
                    lon: geo.lon,
                    lat: geo.lat,
                },
                radius: geo.radius,
            }),
            ..QdrantCondition::new(field)
        })
    }

    fn build_condition(
        &self,
        and: Option<Vec<QdrantCondition>>,
        or: Option<Vec<QdrantCondition>>,
    ) -> Result<Option<QdrantFilter>> {
        let must = and.unwrap_or_default();
        let should = or.unwrap_or_default();
        if must.is_empty() && should.is_empty() {
            return Ok(None);
        }
        Ok(Some(QdrantFilter { must, should }))
    }
}
