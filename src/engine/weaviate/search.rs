//! Weaviate nearest-neighbor queries over GraphQL

use std::fmt::Write as _;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info};
use uuid::Uuid;

use crate::conditions::ConditionParser;
use crate::distance::Distance;
use crate::engine::traits::{SearchHit, Searcher, SearcherState};
use crate::error::{BenchError, Result};

use super::parser::WhereFilter;
use super::{
    WeaviateClient, WeaviateConditionParser, WeaviateConnectionParams, WEAVIATE_CLASS_NAME,
    WEAVIATE_DEFAULT_PORT,
};

/// Query-time handle to the Weaviate benchmark class
#[derive(Default)]
pub struct WeaviateSearcher {
    client: Option<WeaviateClient>,
    search_params: Value,
    parser: WeaviateConditionParser,
    state: SearcherState,
}

impl WeaviateSearcher {
    fn client(&self) -> Result<&WeaviateClient> {
        match (&self.client, self.state.can_search()) {
            (Some(client), true) => Ok(client),
            _ => Err(BenchError::NotInitialized("Weaviate searcher")),
        }
    }

    /// `search_params.vectorIndexConfig.ef`
    fn ef(&self) -> Result<i64> {
        self.search_params
            .get("vectorIndexConfig")
            .and_then(|c| c.get("ef"))
            .and_then(|ef| ef.as_i64())
            .ok_or_else(|| {
                BenchError::Configuration(
                    "search_params.vectorIndexConfig.ef must be an integer".to_string(),
                )
            })
    }
}

/// Render the `Get` query for one vector
fn near_vector_query(vector: &[f32], filter: Option<&WhereFilter>, top: usize) -> Result<String> {
    let mut rendered = String::with_capacity(vector.len() * 12);
    for (i, x) in vector.iter().enumerate() {
        if !x.is_finite() {
            return Err(BenchError::QueryConstruction(format!(
                "vector component {} is not finite",
                i
            )));
        }
        if i > 0 {
            rendered.push_str(", ");
        }
        let _ = write!(rendered, "{:?}", x);
    }

    let mut args = format!("nearVector: {{vector: [{}]}}, limit: {}", rendered, top);
    if let Some(filter) = filter {
        let _ = write!(args, ", where: {}", filter);
    }

    Ok(format!(
        "{{ Get {{ {}({}) {{ _additional {{ id distance }} }} }} }}",
        WEAVIATE_CLASS_NAME, args
    ))
}

/// Pull `(uuid-as-u128, distance)` pairs out of a `Get` response
fn parse_hits(body: &Value) -> Result<Vec<SearchHit>> {
    let objects = body
        .pointer(&format!("/data/Get/{}", WEAVIATE_CLASS_NAME))
        .and_then(|o| o.as_array())
        .ok_or_else(|| {
            malformed(format!(
                "response without a {} list: {}",
                WEAVIATE_CLASS_NAME, body
            ))
        })?;

    objects
        .iter()
        .map(|object| {
            let additional = &object["_additional"];
            let id = additional["id"]
                .as_str()
                .and_then(|s| Uuid::parse_str(s).ok())
                .ok_or_else(|| malformed(format!("object without a valid id: {}", object)))?;
            let distance = additional["distance"]
                .as_f64()
                .ok_or_else(|| malformed(format!("object without a distance: {}", object)))?;
            Ok((id.as_u128(), distance as f32))
        })
        .collect()
}

fn malformed(message: String) -> BenchError {
    BenchError::Backend {
        backend: "Weaviate".to_string(),
        status: 200,
        message,
    }
}

#[async_trait]
impl Searcher for WeaviateSearcher {
    async fn init_client(
        &mut self,
        host: &str,
        distance: Distance,
        connection_params: &Value,
        search_params: &Value,
    ) -> Result<()> {
        let params = WeaviateConnectionParams::parse(connection_params)?;
        let client = WeaviateClient::connect(host, WEAVIATE_DEFAULT_PORT, &params).await?;
        client.class_schema().await?;

        info!(
            "Weaviate searcher ready on '{}' ({})",
            WEAVIATE_CLASS_NAME, distance
        );

        self.client = Some(client);
        self.search_params = search_params.clone();
        self.state = SearcherState::Initialized;
        Ok(())
    }

    async fn setup_search(&mut self) -> Result<()> {
        let client = self.client()?;
        let ef = self.ef()?;

        let mut class = client.class_schema().await?;
        if !class["vectorIndexConfig"].is_object() {
            class["vectorIndexConfig"] = Value::Object(Default::default());
        }
        class["vectorIndexConfig"]["ef"] = ef.into();
        client.update_class(&class).await?;

        debug!("Weaviate vectorIndexConfig.ef set to {}", ef);
        self.state = SearcherState::Configured;
        Ok(())
    }

    async fn search_one(
        &self,
        vector: &[f32],
        meta_conditions: Option<&Value>,
        top: usize,
    ) -> Result<Vec<SearchHit>> {
        let client = self.client()?;
        let filter = self.parser.parse(meta_conditions)?;
        if top == 0 {
            return Ok(Vec::new());
        }

        let query = near_vector_query(vector, filter.as_ref(), top)?;
        let body = client.graphql(query).await?;

        let mut hits = parse_hits(&body)?;
        hits.truncate(top);
        Ok(hits)
    }

    async fn delete_client(&mut self) {
        if self.client.take().is_some() {
            debug!("Closed Weaviate searcher client");
            self.state = SearcherState::Closed;
        }
    }

    fn state(&self) -> SearcherState {
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_near_vector_query() {
        let query = near_vector_query(&[0.5, 1.0], None, 3).unwrap();
        assert_eq!(
            query,
            "{ Get { Benchmark(nearVector: {vector: [0.5, 1.0]}, limit: 3) { _additional { id distance } } } }"
        );

        let filter = WeaviateConditionParser
            .parse(Some(&json!({"and": [{"a": {"match": {"value": 1}}}]})))
            .unwrap();
        let query = near_vector_query(&[0.5], filter.as_ref(), 1).unwrap();
        assert!(query.contains(r#"where: {path: ["a"], operator: Equal, valueInt: 1}"#));

        assert!(matches!(
            near_vector_query(&[f32::NAN], None, 1),
            Err(BenchError::QueryConstruction(_))
        ));
    }

    #[test]
    fn test_parse_hits() {
        let body = json!({"data": {"Get": {"Benchmark": [
            {"_additional": {"id": "00000000-0000-0000-0000-000000000007", "distance": 0.25}},
            {"_additional": {"id": "00000000-0000-0000-0000-00000000000a", "distance": 0.5}}
        ]}}});
        assert_eq!(parse_hits(&body).unwrap(), vec![(7, 0.25), (10, 0.5)]);

        let empty = json!({"data": {"Get": {"Benchmark": []}}});
        assert!(parse_hits(&empty).unwrap().is_empty());

        let broken = json!({"data": {"Get": {"Benchmark": [{"_additional": {"id": "nope"}}]}}});
        assert!(parse_hits(&broken).is_err());
    }

    #[test]
    fn test_parse_hits_rejects_missing_class_list() {
        for body in [
            json!({"data": {"Get": {}}}),
            json!({"data": {"Get": {"Benchmark": null}}}),
            json!({"data": {"Get": {"Benchmark": {"id": 1}}}}),
            json!({}),
        ] {
            assert!(
                matches!(parse_hits(&body), Err(BenchError::Backend { .. })),
                "{}",
                body
            );
        }
    }

    #[test]
    fn test_missing_ef_is_configuration_error() {
        let searcher = WeaviateSearcher {
            search_params: json!({"vectorIndexConfig": {}}),
            ..Default::default()
        };
        assert!(matches!(searcher.ef(), Err(BenchError::Configuration(_))));

        let searcher = WeaviateSearcher {
            search_params: json!({"vectorIndexConfig": {"ef": 128}}),
            ..Default::default()
        };
        assert_eq!(searcher.ef().unwrap(), 128);
    }

    #[tokio::test]
    async fn test_search_before_init_fails_fast() {
        let searcher = WeaviateSearcher::default();
        assert!(matches!(
            searcher.search_one(&[0.1], None, 1).await,
            Err(BenchError::NotInitialized(_))
        ));
    }
}
