//! Qdrant nearest-neighbor queries

use async_trait::async_trait;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::conditions::ConditionParser;
use crate::distance::Distance;
use crate::engine::traits::{SearchHit, Searcher, SearcherState};
use crate::engine::object_params;
use crate::error::{BenchError, Result};

use super::parser::QdrantFilter;
use super::{
    PointId, QdrantClient, QdrantConditionParser, QdrantConnectionParams, QDRANT_COLLECTION_NAME,
    QDRANT_DEFAULT_PORT,
};

#[derive(Serialize)]
struct SearchRequest<'a> {
    vector: &'a [f32],
    limit: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    filter: Option<QdrantFilter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    params: Option<&'a Value>,
    with_payload: bool,
    with_vector: bool,
}

#[derive(Deserialize)]
struct ScoredPoint {
    id: PointId,
    score: f32,
}

/// Query-time handle to the Qdrant benchmark collection
///
/// `search_params.config` (e.g. `hnsw_ef`, `exact`) is sent with every query
/// once [`Searcher::setup_search`] has run.
#[derive(Default)]
pub struct QdrantSearcher {
    client: Option<QdrantClient>,
    search_params: Value,
    query_params: Option<Value>,
    parser: QdrantConditionParser,
    state: SearcherState,
}

impl QdrantSearcher {
    fn client(&self) -> Result<&QdrantClient> {
        match (&self.client, self.state.can_search()) {
            (Some(client), true) => Ok(client),
            _ => Err(BenchError::NotInitialized("Qdrant searcher")),
        }
    }
}

#[async_trait]
impl Searcher for QdrantSearcher {
    async fn init_client(
        &mut self,
        host: &str,
        distance: Distance,
        connection_params: &Value,
        search_params: &Value,
    ) -> Result<()> {
        let params = QdrantConnectionParams::parse(connection_params)?;
        let client = QdrantClient::connect(host, QDRANT_DEFAULT_PORT, &params).await?;
        client.collection_info().await?;

        info!(
            "Qdrant searcher ready on '{}' ({})",
            QDRANT_COLLECTION_NAME, distance
        );

        self.client = Some(client);
        self.search_params = search_params.clone();
        self.query_params = None;
        self.state = SearcherState::Initialized;
        Ok(())
    }

    async fn setup_search(&mut self) -> Result<()> {
        self.client()?;

        let config = self.search_params.get("config").cloned().unwrap_or(Value::Null);
        let config = object_params(&config, "search_params.config")?;

        debug!("Qdrant query params: {:?}", config);
        self.query_params = (!config.is_empty()).then_some(Value::Object(config));
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

        let request = SearchRequest {
            vector,
            limit: top,
            filter,
            params: self.query_params.as_ref(),
            with_payload: false,
            with_vector: false,
        };

        let points: Vec<ScoredPoint> = client
            .send_collection(Method::POST, "/points/search", &request)
            .await?;

        Ok(points
            .into_iter()
            .take(top)
            .map(|p| (p.id.as_u128(), p.score))
            .collect())
    }

    async fn delete_client(&mut self) {
        if self.client.take().is_some() {
            debug!("Closed Qdrant searcher client");
            self.state = SearcherState::Closed;
        }
    }

    fn state(&self) -> SearcherState {
        self.state
    }
}
