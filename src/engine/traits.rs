//! Adapter contract every backend implements

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::distance::Distance;
use crate::error::Result;

/// `(identifier, distance)` pair, best first in a result list
///
/// Integer ids pass through; UUID ids become their 128-bit value.
pub type SearchHit = (u128, f32);

/// Owns the lifecycle of the benchmark collection on one backend
#[async_trait]
pub trait Configurator: Send + Sync {
    /// Delete the collection; a missing collection is `NotFound`
    async fn clean(&self) -> Result<()>;

    /// Drop (if present) and create an empty collection for `vector_size`
    /// dimensional vectors compared under `distance`
    ///
    /// `collection_params` overlay the params given at construction.
    async fn recreate(
        &self,
        distance: Distance,
        vector_size: usize,
        collection_params: &Value,
    ) -> Result<()>;

    /// Reset the collection from scratch with the construction params
    async fn configure(&self, distance: Distance, vector_size: usize) -> Result<()> {
        match self.clean().await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => debug!("Nothing to clean: {}", e),
            Err(e) => return Err(e),
        }
        self.recreate(distance, vector_size, &Value::Null).await
    }
}

/// Searcher lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearcherState {
    #[default]
    Uninitialized,
    Initialized,
    Configured,
    Closed,
}

impl SearcherState {
    pub fn can_search(self) -> bool {
        matches!(self, SearcherState::Initialized | SearcherState::Configured)
    }
}

/// Query-time handle to the benchmark collection
///
/// One searcher is shared by every query of a run; `search_one` takes `&self`
/// so it can sit behind an `Arc` once setup is done.
#[async_trait]
pub trait Searcher: Send + Sync {
    /// Connect and resolve the existing collection; a missing one is `NotFound`
    async fn init_client(
        &mut self,
        host: &str,
        distance: Distance,
        connection_params: &Value,
        search_params: &Value,
    ) -> Result<()>;

    /// Apply query-time tuning from the search params
    async fn setup_search(&mut self) -> Result<()>;

    /// Return at most `top` best matches for `vector`
    async fn search_one(
        &self,
        vector: &[f32],
        meta_conditions: Option<&Value>,
        top: usize,
    ) -> Result<Vec<SearchHit>>;

    /// Release the connection; no-op when none is held
    async fn delete_client(&mut self);

    fn state(&self) -> SearcherState;
}

/// A vector to ingest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: u128,
    pub vector: Vec<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

/// Ingestion path into the benchmark collection
#[async_trait]
pub trait Uploader: Send + Sync {
    async fn init_client(
        &mut self,
        host: &str,
        distance: Distance,
        connection_params: &Value,
        upload_params: &Value,
    ) -> Result<()>;

    async fn upload_batch(&self, records: &[Record]) -> Result<()>;

    /// Wait for the backend to finish indexing, where it needs that
    async fn post_upload(&self) -> Result<()> {
        Ok(())
    }

    async fn delete_client(&mut self);
}
