//! Weaviate adapters over the REST schema API and GraphQL

mod configure;
mod parser;
mod search;
mod upload;

pub use configure::WeaviateConfigurator;
pub use parser::{WeaviateConditionParser, WhereFilter};
pub use search::WeaviateSearcher;
pub use upload::WeaviateUploader;

use reqwest::{Client, Method, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::distance::Distance;
use crate::error::{BenchError, Result};
use crate::http::{check_response, create_client, DEFAULT_TIMEOUT_SECS};

use super::{base_url, typed_params};

pub const WEAVIATE_CLASS_NAME: &str = "Benchmark";
pub const WEAVIATE_DEFAULT_PORT: u16 = 8090;

const BACKEND: &str = "Weaviate";

/// Weaviate's native distance names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) enum WeaviateDistance {
    #[serde(rename = "l2-squared")]
    L2Squared,
    #[serde(rename = "cosine")]
    Cosine,
    #[serde(rename = "dot")]
    Dot,
}

impl From<Distance> for WeaviateDistance {
    fn from(distance: Distance) -> Self {
        match distance {
            Distance::L2Squared => WeaviateDistance::L2Squared,
            Distance::Cosine => WeaviateDistance::Cosine,
            Distance::Dot => WeaviateDistance::Dot,
        }
    }
}

/// Recognized `connection_params` keys
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct WeaviateConnectionParams {
    pub port: Option<u16>,
    /// Request timeout in seconds
    pub timeout: Option<u64>,
}

impl WeaviateConnectionParams {
    pub fn parse(params: &Value) -> Result<Self> {
        typed_params(params, "Weaviate connection_params")
    }
}

/// Thin REST/GraphQL client bound to the benchmark class
#[derive(Clone)]
pub(crate) struct WeaviateClient {
    http: Client,
    base_url: String,
}

impl WeaviateClient {
    /// Build the client and wait for the readiness probe to answer
    pub async fn connect(host: &str, port: u16, params: &WeaviateConnectionParams) -> Result<Self> {
        let port = params.port.unwrap_or(port);
        let http = create_client(BACKEND, params.timeout.unwrap_or(DEFAULT_TIMEOUT_SECS))?;
        let client = Self {
            http,
            base_url: base_url(host, port),
        };

        let response = client
            .request(Method::GET, "/v1/.well-known/ready")
            .send()
            .await
            .map_err(|e| BenchError::connection(BACKEND, e))?;
        check_response(response, BACKEND).await?;

        info!("Connected to Weaviate at {}", client.base_url);
        Ok(client)
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        self.http.request(method, format!("{}{}", self.base_url, path))
    }

    fn class_path() -> String {
        format!("/v1/schema/{}", WEAVIATE_CLASS_NAME)
    }

    async fn send(&self, builder: reqwest::RequestBuilder) -> Result<reqwest::Response> {
        builder
            .send()
            .await
            .map_err(|e| BenchError::connection(BACKEND, e))
    }

    async fn read_json(response: reqwest::Response) -> Result<Value> {
        let response = check_response(response, BACKEND).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| BenchError::connection(BACKEND, e))?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// `GET /v1/schema/{class}`; `NotFound` when the class is absent
    pub async fn class_schema(&self) -> Result<Value> {
        let response = self.send(self.request(Method::GET, &Self::class_path())).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(BenchError::NotFound(WEAVIATE_CLASS_NAME.to_string()));
        }
        Self::read_json(response).await
    }

    /// `DELETE /v1/schema/{class}`; Weaviate accepts this for missing classes
    pub async fn delete_class(&self) -> Result<()> {
        debug!("Deleting Weaviate class '{}'", WEAVIATE_CLASS_NAME);
        let response = self
            .send(self.request(Method::DELETE, &Self::class_path()))
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        check_response(response, BACKEND).await?;
        Ok(())
    }

    /// `POST /v1/schema`; rejected definitions become `Configuration`
    pub async fn create_class(&self, class: &Value) -> Result<()> {
        debug!("Creating Weaviate class: {}", class);
        let response = self
            .send(self.request(Method::POST, "/v1/schema").json(class))
            .await?;
        match check_response(response, BACKEND).await {
            Ok(_) => Ok(()),
            Err(BenchError::Backend { status, message, .. }) if (400..500).contains(&status) => {
                Err(BenchError::Configuration(format!(
                    "Weaviate rejected class definition ({}): {}",
                    status, message
                )))
            }
            Err(e) => Err(e),
        }
    }

    /// `PUT /v1/schema/{class}` with an updated definition
    pub async fn update_class(&self, class: &Value) -> Result<()> {
        let response = self
            .send(self.request(Method::PUT, &Self::class_path()).json(class))
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(BenchError::NotFound(WEAVIATE_CLASS_NAME.to_string()));
        }
        check_response(response, BACKEND).await?;
        Ok(())
    }

    /// Run a GraphQL query; top-level `errors` surface as `Backend`
    pub async fn graphql(&self, query: String) -> Result<Value> {
        let response = self
            .send(
                self.request(Method::POST, "/v1/graphql")
                    .json(&json!({ "query": query })),
            )
            .await?;
        let status = response.status().as_u16();
        let body = Self::read_json(response).await?;

        if let Some(errors) = body.get("errors").and_then(|e| e.as_array()) {
            if !errors.is_empty() {
                let message = errors
                    .iter()
                    .filter_map(|e| e.get("message").and_then(|m| m.as_str()))
                    .collect::<Vec<_>>()
                    .join("; ");
                return Err(BenchError::Backend {
                    backend: BACKEND.to_string(),
                    status,
                    message,
                });
            }
        }
        Ok(body)
    }

    /// `POST /v1/batch/objects`; returns the per-object results
    pub async fn batch_objects(&self, body: &impl Serialize) -> Result<Vec<Value>> {
        let response = self
            .send(self.request(Method::POST, "/v1/batch/objects").json(body))
            .await?;
        let body = Self::read_json(response).await?;
        serde_json::from_value(body).map_err(BenchError::from)
    }
}
