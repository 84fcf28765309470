//! Experiment configuration files
//!
//! Default location: ~/.config/vdb-bench/experiments/<name>.toml
//!
//! Example experiment:
//! ```toml
//! name = "qdrant-m16-ef128"
//! engine = "qdrant"
//!
//! [connection_params]
//! prefer_grpc = false
//! timeout = 30
//!
//! [collection_params]
//! hnsw_config = { m = 16, ef_construct = 128 }
//!
//! [[search_params]]
//! parallel = 8
//! config = { hnsw_ef = 64 }
//!
//! [[search_params]]
//! parallel = 8
//! config = { hnsw_ef = 256 }
//!
//! [upload_params]
//! batch_size = 64
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::engine::Engine;

/// One experiment: an engine plus the opaque params handed to its adapters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentConfig {
    pub name: String,

    pub engine: Engine,

    /// Passed to configurators, searchers and uploaders as-is
    #[serde(default = "empty_params")]
    pub connection_params: Value,

    /// Passed to `recreate` as-is
    #[serde(default = "empty_params")]
    pub collection_params: Value,

    /// One searcher run per entry
    #[serde(default)]
    pub search_params: Vec<Value>,

    #[serde(default = "empty_params")]
    pub upload_params: Value,
}

fn empty_params() -> Value {
    Value::Object(Default::default())
}

impl ExperimentConfig {
    /// Directory holding experiment files
    pub fn experiments_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("vdb-bench")
            .join("experiments")
    }

    /// Resolve a name or path to an experiment file
    ///
    /// Existing paths win; bare names are looked up in [`Self::experiments_dir`].
    pub fn locate(name_or_path: &str) -> PathBuf {
        let path = Path::new(name_or_path);
        if path.exists() {
            return path.to_path_buf();
        }
        let file = if name_or_path.ends_with(".toml") {
            name_or_path.to_string()
        } else {
            format!("{}.toml", name_or_path)
        };
        Self::experiments_dir().join(file)
    }

    /// Load an experiment file
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read experiment {:?}: {}", path, e))?;
        let config = Self::parse(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse experiment {:?}: {}", path, e))?;
        tracing::debug!("Loaded experiment '{}' from {:?}", config.name, path);
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Upload batch size from `upload_params.batch_size`
    pub fn batch_size(&self) -> Option<usize> {
        self.upload_params
            .get("batch_size")
            .and_then(|b| b.as_u64())
            .map(|b| b as usize)
    }
}

/// `parallel` key of a search params entry
pub fn search_parallelism(search_params: &Value) -> Option<usize> {
    search_params
        .get("parallel")
        .and_then(|p| p.as_u64())
        .map(|p| p as usize)
}
