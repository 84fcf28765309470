//! Qdrant point ingestion

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::distance::Distance;
use crate::engine::traits::{Record, Uploader};
use crate::engine::typed_params;
use crate::error::{BenchError, Result};

use super::{PointId, QdrantClient, QdrantConnectionParams, QDRANT_DEFAULT_PORT};

#[derive(Serialize)]
struct PointStruct<'a> {
    id: PointId,
    vector: &'a [f32],
    #[serde(skip_serializing_if = "Option::is_none")]
    payload: Option<&'a Value>,
}

#[derive(Serialize)]
struct UpsertRequest<'a> {
    points: Vec<PointStruct<'a>>,
}

/// Recognized `upload_params` keys
#[derive(Debug, Deserialize)]
#[serde(default)]
struct QdrantUploadParams {
    /// Block each upsert until it is applied
    wait: bool,
    /// Upper bound for `post_upload` to see a green collection
    optimize_timeout_secs: u64,
}

impl Default for QdrantUploadParams {
    fn default() -> Self {
        Self {
            wait: true,
            optimize_timeout_secs: 600,
        }
    }
}

#[derive(Default)]
pub struct QdrantUploader {
    client: Option<QdrantClient>,
    params: QdrantUploadParams,
}

impl QdrantUploader {
    fn client(&self) -> Result<&QdrantClient> {
        self.client
            .as_ref()
            .ok_or(BenchError::NotInitialized("Qdrant uploader"))
    }
}

#[async_trait]
impl Uploader for QdrantUploader {
    async fn init_client(
        &mut self,
        host: &str,
        _distance: Distance,
        connection_params: &Value,
        upload_params: &Value,
    ) -> Result<()> {
        let conn = QdrantConnectionParams::parse(connection_params)?;
        self.params = typed_params(upload_params, "Qdrant upload_params")?;
        self.client = Some(QdrantClient::connect(host, QDRANT_DEFAULT_PORT, &conn).await?);
        Ok(())
    }

    async fn upload_batch(&self, records: &[Record]) -> Result<()> {
        let client = self.client()?;
        if records.is_empty() {
            return Ok(());
        }

        let request = UpsertRequest {
            points: records
                .iter()
                .map(|r| PointStruct {
                    id: PointId::from_u128(r.id),
                    vector: &r.vector,
                    payload: r.payload.as_ref(),
                })
                .collect(),
        };
        let suffix = format!("/points?wait={}", self.params.wait);
        let _: Value = client.send_collection(Method::PUT, &suffix, &request).await?;

        debug!("Uploaded {} points to Qdrant", records.len());
        Ok(())
    }

    async fn post_upload(&self) -> Result<()> {
        let client = self.client()?;
        let limit = Duration::from_secs(self.params.optimize_timeout_secs);

        let wait_green = async {
            loop {
                let info = client.collection_info().await?;
                match info.get("status").and_then(|s| s.as_str()) {
                    Some("green") => return Ok::<(), BenchError>(()),
                    status => debug!("Qdrant collection status: {:?}", status),
                }
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
        };

        tokio::time::timeout(limit, wait_green)
            .await
            .map_err(|_| BenchError::Connection {
                backend: "Qdrant".to_string(),
                message: format!("collection not green after {:?}", limit),
            })??;

        info!("Qdrant collection indexed");
        Ok(())
    }

    async fn delete_client(&mut self) {
        self.client = None;
    }
}
