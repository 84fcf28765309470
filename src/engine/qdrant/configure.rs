//! Qdrant collection lifecycle

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::info;

use crate::distance::Distance;
use crate::engine::traits::Configurator;
use crate::engine::{merge_json, object_params};
use crate::error::{BenchError, Result};

use super::{QdrantClient, QdrantConnectionParams, QdrantDistance, QDRANT_COLLECTION_NAME};

/// Creates, recreates and deletes the benchmark collection on Qdrant
pub struct QdrantConfigurator {
    client: QdrantClient,
    collection_params: Value,
}

impl QdrantConfigurator {
    /// Connect to `host:port`; fails with `Connection` when unreachable
    pub async fn connect(
        host: &str,
        port: u16,
        collection_params: &Value,
        connection_params: &Value,
    ) -> Result<Self> {
        let params = QdrantConnectionParams::parse(connection_params)?;
        let collection_params = Value::Object(object_params(collection_params, "collection_params")?);
        let client = QdrantClient::connect(host, port, &params).await?;

        Ok(Self {
            client,
            collection_params,
        })
    }

    /// Request body for `PUT /collections/{name}`
    fn collection_body(
        &self,
        distance: Distance,
        vector_size: usize,
        collection_params: &Value,
    ) -> Result<Value> {
        if vector_size == 0 {
            return Err(BenchError::Configuration(
                "vector_size must be greater than zero".to_string(),
            ));
        }

        let overlay = Value::Object(object_params(collection_params, "collection_params")?);
        let mut body = self.collection_params.clone();
        merge_json(&mut body, &overlay);

        if body.get("vectors").is_some() {
            return Err(BenchError::Configuration(
                "collection_params must not set 'vectors'; size and distance come from the harness"
                    .to_string(),
            ));
        }

        body["vectors"] = json!({
            "size": vector_size,
            "distance": QdrantDistance::from(distance),
        });
        Ok(body)
    }
}

#[async_trait]
impl Configurator for QdrantConfigurator {
    async fn clean(&self) -> Result<()> {
        if self.client.delete_collection().await? {
            info!("Deleted Qdrant collection '{}'", QDRANT_COLLECTION_NAME);
            Ok(())
        } else {
            Err(BenchError::NotFound(QDRANT_COLLECTION_NAME.to_string()))
        }
    }

    async fn recreate(
        &self,
        distance: Distance,
        vector_size: usize,
        collection_params: &Value,
    ) -> Result<()> {
        let body = self.collection_body(distance, vector_size, collection_params)?;

        self.client.delete_collection().await?;
        self.client.create_collection(&body).await?;

        info!(
            "Created Qdrant collection '{}' ({} dims, {})",
            QDRANT_COLLECTION_NAME, vector_size, distance
        );
        Ok(())
    }
}
