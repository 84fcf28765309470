//! Qdrant adapters over the REST API

mod configure;
mod parser;
mod search;
mod upload;

pub use configure::QdrantConfigurator;
pub use parser::{QdrantConditionParser, QdrantFilter};
pub use search::QdrantSearcher;
pub use upload::QdrantUploader;

use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::distance::Distance;
use crate::error::{BenchError, Result};
use crate::http::{check_response, create_client, DEFAULT_TIMEOUT_SECS};

use super::{base_url, typed_params};

pub const QDRANT_COLLECTION_NAME: &str = "benchmark";
pub const QDRANT_DEFAULT_PORT: u16 = 6333;

const BACKEND: &str = "Qdrant";

/// Qdrant's native distance names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) enum QdrantDistance {
    Euclid,
    Cosine,
    Dot,
}

impl From<Distance> for QdrantDistance {
    fn from(distance: Distance) -> Self {
        match distance {
            Distance::L2Squared => QdrantDistance::Euclid,
            Distance::Cosine => QdrantDistance::Cosine,
            Distance::Dot => QdrantDistance::Dot,
        }
    }
}

/// Recognized `connection_params` keys
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct QdrantConnectionParams {
    /// Only the REST transport is spoken; `true` is accepted and logged
    pub prefer_grpc: bool,
    pub port: Option<u16>,
    /// Request timeout in seconds
    pub timeout: Option<u64>,
}

impl QdrantConnectionParams {
    pub fn parse(params: &Value) -> Result<Self> {
        typed_params(params, "Qdrant connection_params")
    }
}

/// Point id as Qdrant reports it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub(crate) enum PointId {
    Num(u64),
    Uuid(Uuid),
}

impl PointId {
    /// Integer ids that fit in u64 stay integers; larger ones become UUIDs
    pub fn from_u128(id: u128) -> Self {
        match u64::try_from(id) {
            Ok(n) => PointId::Num(n),
            Err(_) => PointId::Uuid(Uuid::from_u128(id)),
        }
    }

    pub fn as_u128(self) -> u128 {
        match self {
            PointId::Num(n) => n as u128,
            PointId::Uuid(u) => u.as_u128(),
        }
    }
}

/// Qdrant wraps every payload in `{"result": ..., "status": ..., "time": ...}`
#[derive(Deserialize)]
struct ApiResponse<T> {
    result: T,
}

/// Thin REST client bound to the benchmark collection
#[derive(Clone)]
pub(crate) struct QdrantClient {
    http: Client,
    base_url: String,
}

impl QdrantClient {
    /// Build the client and probe the service root
    pub async fn connect(host: &str, port: u16, params: &QdrantConnectionParams) -> Result<Self> {
        if params.prefer_grpc {
            warn!("Qdrant gRPC transport is not available, using REST");
        }

        let port = params.port.unwrap_or(port);
        let http = create_client(BACKEND, params.timeout.unwrap_or(DEFAULT_TIMEOUT_SECS))?;
        let client = Self {
            http,
            base_url: base_url(host, port),
        };

        let response = client
            .http
            .get(client.url(""))
            .send()
            .await
            .map_err(|e| BenchError::connection(BACKEND, e))?;
        check_response(response, BACKEND).await?;

        info!("Connected to Qdrant at {}", client.base_url);
        Ok(client)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn collection_url(&self, suffix: &str) -> String {
        self.url(&format!("collections/{}{}", QDRANT_COLLECTION_NAME, suffix))
    }

    /// `GET /collections/{name}`; `NotFound` when absent
    pub async fn collection_info(&self) -> Result<Value> {
        let response = self
            .http
            .get(self.collection_url(""))
            .send()
            .await
            .map_err(|e| BenchError::connection(BACKEND, e))?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(BenchError::NotFound(QDRANT_COLLECTION_NAME.to_string()));
        }
        self.read_result(response).await
    }

    /// `DELETE /collections/{name}`; returns whether a collection was dropped
    pub async fn delete_collection(&self) -> Result<bool> {
        debug!("Deleting Qdrant collection '{}'", QDRANT_COLLECTION_NAME);
        let response = self
            .http
            .delete(self.collection_url(""))
            .send()
            .await
            .map_err(|e| BenchError::connection(BACKEND, e))?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        self.read_result(response).await
    }

    /// `PUT /collections/{name}`; rejected params become `Configuration`
    pub async fn create_collection(&self, body: &Value) -> Result<()> {
        debug!("Creating Qdrant collection '{}': {}", QDRANT_COLLECTION_NAME, body);
        let response = self
            .http
            .put(self.collection_url(""))
            .json(body)
            .send()
            .await
            .map_err(|e| BenchError::connection(BACKEND, e))?;

        match check_response(response, BACKEND).await {
            Ok(_) => Ok(()),
            Err(BenchError::Backend { status, message, .. }) if (400..500).contains(&status) => {
                Err(BenchError::Configuration(format!(
                    "Qdrant rejected collection params ({}): {}",
                    status, message
                )))
            }
            Err(e) => Err(e),
        }
    }

    /// POST/PUT a JSON body to a collection sub-path and decode `result`
    pub async fn send_collection<T: DeserializeOwned>(
        &self,
        method: reqwest::Method,
        suffix: &str,
        body: &impl Serialize,
    ) -> Result<T> {
        let response = self
            .http
            .request(method, self.collection_url(suffix))
            .json(body)
            .send()
            .await
            .map_err(|e| BenchError::connection(BACKEND, e))?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(BenchError::NotFound(QDRANT_COLLECTION_NAME.to_string()));
        }
        self.read_result(response).await
    }

    async fn read_result<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let response = check_response(response, BACKEND).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| BenchError::connection(BACKEND, e))?;
        let body: ApiResponse<T> = serde_json::from_slice(&bytes)?;
        Ok(body.result)
    }
}
