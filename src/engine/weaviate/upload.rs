//! Weaviate object ingestion

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;
use uuid::Uuid;

use crate::distance::Distance;
use crate::engine::traits::{Record, Uploader};
use crate::error::{BenchError, Result};

use super::{WeaviateClient, WeaviateConnectionParams, WEAVIATE_CLASS_NAME, WEAVIATE_DEFAULT_PORT};

#[derive(Serialize)]
struct BatchObject<'a> {
    class: &'static str,
    id: Uuid,
    vector: &'a [f32],
    properties: &'a Value,
}

#[derive(Serialize)]
struct BatchRequest<'a> {
    objects: Vec<BatchObject<'a>>,
}

/// Integer ids become UUIDs with the same 128-bit value
pub(crate) fn object_id(id: u128) -> Uuid {
    Uuid::from_u128(id)
}

/// Collect per-object error messages from a batch response
fn batch_errors(results: &[Value]) -> Vec<String> {
    results
        .iter()
        .filter_map(|r| r.pointer("/result/errors/error"))
        .filter_map(|e| e.as_array())
        .flatten()
        .filter_map(|e| e.get("message").and_then(|m| m.as_str()))
        .map(str::to_string)
        .collect()
}

#[derive(Default)]
pub struct WeaviateUploader {
    client: Option<WeaviateClient>,
}

#[async_trait]
impl Uploader for WeaviateUploader {
    async fn init_client(
        &mut self,
        host: &str,
        _distance: Distance,
        connection_params: &Value,
        _upload_params: &Value,
    ) -> Result<()> {
        let params = WeaviateConnectionParams::parse(connection_params)?;
        self.client = Some(WeaviateClient::connect(host, WEAVIATE_DEFAULT_PORT, &params).await?);
        Ok(())
    }

    async fn upload_batch(&self, records: &[Record]) -> Result<()> {
        let client = self
            .client
            .as_ref()
            .ok_or(BenchError::NotInitialized("Weaviate uploader"))?;
        if records.is_empty() {
            return Ok(());
        }

        let empty = Value::Object(Map::new());
        let request = BatchRequest {
            objects: records
                .iter()
                .map(|r| BatchObject {
                    class: WEAVIATE_CLASS_NAME,
                    id: object_id(r.id),
                    vector: &r.vector,
                    properties: r.payload.as_ref().unwrap_or(&empty),
                })
                .collect(),
        };

        let results = client.batch_objects(&request).await?;
        let errors = batch_errors(&results);
        if !errors.is_empty() {
            return Err(BenchError::Backend {
                backend: "Weaviate".to_string(),
                status: 200,
                message: format!("{} objects rejected: {}", errors.len(), errors.join("; ")),
            });
        }

        debug!("Uploaded {} objects to Weaviate", records.len());
        Ok(())
    }

    async fn delete_client(&mut self) {
        self.client = None;
    }
}
