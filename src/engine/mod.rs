//! Engine module - per-backend configurators, searchers and uploaders

mod qdrant;
mod traits;
mod weaviate;

pub use traits::{Configurator, Record, SearchHit, Searcher, SearcherState, Uploader};

pub use qdrant::{
    QdrantConditionParser, QdrantConfigurator, QdrantFilter, QdrantSearcher, QdrantUploader,
    QDRANT_COLLECTION_NAME, QDRANT_DEFAULT_PORT,
};
pub use weaviate::{
    WeaviateConditionParser, WeaviateConfigurator, WeaviateSearcher, WeaviateUploader,
    WhereFilter, WEAVIATE_CLASS_NAME, WEAVIATE_DEFAULT_PORT,
};

use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{BenchError, Result};

/// Supported vector database backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Engine {
    Qdrant,
    Weaviate,
}

impl Engine {
    pub const ALL: [Engine; 2] = [Engine::Qdrant, Engine::Weaviate];

    pub fn name(self) -> &'static str {
        match self {
            Engine::Qdrant => "qdrant",
            Engine::Weaviate => "weaviate",
        }
    }

    pub fn default_port(self) -> u16 {
        match self {
            Engine::Qdrant => QDRANT_DEFAULT_PORT,
            Engine::Weaviate => WEAVIATE_DEFAULT_PORT,
        }
    }

    /// Connect a configurator for this engine's benchmark collection
    pub async fn configurator(
        self,
        host: &str,
        port: u16,
        collection_params: &Value,
        connection_params: &Value,
    ) -> Result<Box<dyn Configurator>> {
        match self {
            Engine::Qdrant => {
                let c = QdrantConfigurator::connect(host, port, collection_params, connection_params)
                    .await?;
                Ok(Box::new(c))
            }
            Engine::Weaviate => {
                let c =
                    WeaviateConfigurator::connect(host, port, collection_params, connection_params)
                        .await?;
                Ok(Box::new(c))
            }
        }
    }

    /// Create an uninitialized searcher
    pub fn searcher(self) -> Box<dyn Searcher> {
        match self {
            Engine::Qdrant => Box::new(QdrantSearcher::default()),
            Engine::Weaviate => Box::new(WeaviateSearcher::default()),
        }
    }

    /// Create an uninitialized uploader
    pub fn uploader(self) -> Box<dyn Uploader> {
        match self {
            Engine::Qdrant => Box::new(QdrantUploader::default()),
            Engine::Weaviate => Box::new(WeaviateUploader::default()),
        }
    }
}

impl fmt::Display for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Engine {
    type Err = BenchError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "qdrant" => Ok(Engine::Qdrant),
            "weaviate" => Ok(Engine::Weaviate),
            other => Err(BenchError::Configuration(format!(
                "unknown engine '{}', expected one of: qdrant, weaviate",
                other
            ))),
        }
    }
}

/// Base URL for a backend; `host` may already carry a scheme
pub(crate) fn base_url(host: &str, port: u16) -> String {
    let host = host.trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        format!("{}:{}", host, port)
    } else {
        format!("http://{}:{}", host, port)
    }
}

/// Deserialize an opaque params mapping into typed settings
///
/// `null` yields the defaults; unknown keys are left for the backend.
pub(crate) fn typed_params<T>(params: &Value, what: &str) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    if params.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(params.clone())
        .map_err(|e| BenchError::Configuration(format!("invalid {}: {}", what, e)))
}

/// Ensure params are a JSON object (or absent) before they reach a backend
pub(crate) fn object_params(params: &Value, what: &str) -> Result<serde_json::Map<String, Value>> {
    match params {
        Value::Null => Ok(serde_json::Map::new()),
        Value::Object(obj) => Ok(obj.clone()),
        other => Err(BenchError::Configuration(format!(
            "{} must be a mapping, got {}",
            what, other
        ))),
    }
}

/// Recursively overlay `overlay` onto `base`; objects merge, other values replace
pub(crate) fn merge_json(base: &mut Value, overlay: &Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(key) {
                    Some(existing) => merge_json(existing, value),
                    None => {
                        base.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (_, Value::Null) => {}
        (base, overlay) => *base = overlay.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_engine_parse() {
        assert_eq!("Qdrant".parse::<Engine>().unwrap(), Engine::Qdrant);
        assert_eq!("weaviate".parse::<Engine>().unwrap(), Engine::Weaviate);
        assert!("milvus".parse::<Engine>().is_err());
        for engine in Engine::ALL {
            assert_eq!(engine.name().parse::<Engine>().unwrap(), engine);
        }
    }

    #[test]
    fn test_base_url() {
        assert_eq!(base_url("localhost", 6333), "http://localhost:6333");
        assert_eq!(base_url("https://db.example/", 443), "https://db.example:443");
    }

    #[test]
    fn test_merge_json() {
        let mut base = json!({"hnsw_config": {"m": 16, "ef_construct": 100}, "shard_number": 1});
        merge_json(
            &mut base,
            &json!({"hnsw_config": {"ef_construct": 256}, "on_disk_payload": true}),
        );
        assert_eq!(
            base,
            json!({
                "hnsw_config": {"m": 16, "ef_construct": 256},
                "shard_number": 1,
                "on_disk_payload": true
            })
        );

        let mut base = json!({"a": 1});
        merge_json(&mut base, &Value::Null);
        assert_eq!(base, json!({"a": 1}));
    }

    #[test]
    fn test_object_params() {
        assert!(object_params(&Value::Null, "params").unwrap().is_empty());
        assert_eq!(object_params(&json!({"a": 1}), "params").unwrap().len(), 1);
        assert!(matches!(
            object_params(&json!([1]), "params"),
            Err(BenchError::Configuration(_))
        ));
    }
}
