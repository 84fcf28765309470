//! Weaviate class lifecycle

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::info;

use crate::distance::Distance;
use crate::engine::traits::Configurator;
use crate::engine::{merge_json, object_params};
use crate::error::{BenchError, Result};

use super::{WeaviateClient, WeaviateConnectionParams, WeaviateDistance, WEAVIATE_CLASS_NAME};

/// Creates, recreates and deletes the benchmark class on Weaviate
pub struct WeaviateConfigurator {
    client: WeaviateClient,
    collection_params: Value,
}

impl WeaviateConfigurator {
    pub async fn connect(
        host: &str,
        port: u16,
        collection_params: &Value,
        connection_params: &Value,
    ) -> Result<Self> {
        let params = WeaviateConnectionParams::parse(connection_params)?;
        let collection_params = Value::Object(object_params(collection_params, "collection_params")?);
        let client = WeaviateClient::connect(host, port, &params).await?;

        Ok(Self {
            client,
            collection_params,
        })
    }

    /// Class definition for `POST /v1/schema`
    ///
    /// Vector size is not part of a Weaviate class; the first vector written
    /// fixes it, so only the distance is pinned here.
    fn class_definition(&self, distance: Distance, collection_params: &Value) -> Result<Value> {
        let distance = serde_json::to_value(WeaviateDistance::from(distance))?;

        let mut class = json!({
            "class": WEAVIATE_CLASS_NAME,
            "vectorizer": "none",
            "properties": [],
            "vectorIndexConfig": {},
        });
        merge_json(&mut class, &self.collection_params);
        merge_json(
            &mut class,
            &Value::Object(object_params(collection_params, "collection_params")?),
        );

        if class["class"] != WEAVIATE_CLASS_NAME {
            return Err(BenchError::Configuration(format!(
                "collection_params must not rename the class (got {})",
                class["class"]
            )));
        }
        if !class["vectorIndexConfig"].is_object() {
            return Err(BenchError::Configuration(
                "vectorIndexConfig must be a mapping".to_string(),
            ));
        }
        match class["vectorIndexConfig"].get("distance") {
            Some(existing) if *existing != distance => {
                return Err(BenchError::Configuration(format!(
                    "vectorIndexConfig.distance {} conflicts with {}",
                    existing, distance
                )));
            }
            _ => {}
        }

        class["vectorIndexConfig"]["distance"] = distance;
        Ok(class)
    }
}

#[async_trait]
impl Configurator for WeaviateConfigurator {
    async fn clean(&self) -> Result<()> {
        self.client.class_schema().await?;
        self.client.delete_class().await?;
        info!("Deleted Weaviate class '{}'", WEAVIATE_CLASS_NAME);
        Ok(())
    }

    async fn recreate(
        &self,
        distance: Distance,
        vector_size: usize,
        collection_params: &Value,
    ) -> Result<()> {
        if vector_size == 0 {
            return Err(BenchError::Configuration(
                "vector_size must be greater than zero".to_string(),
            ));
        }
        let class = self.class_definition(distance, collection_params)?;

        self.client.delete_class().await?;
        self.client.create_class(&class).await?;

        info!(
            "Created Weaviate class '{}' ({} dims, {})",
            WEAVIATE_CLASS_NAME, vector_size, distance
        );
        Ok(())
    }
}
