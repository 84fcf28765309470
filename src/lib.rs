//! vdb-bench - vector database benchmark harness
//!
//! Backend adapters (configurator, searcher, uploader) behind one contract,
//! plus the dataset, scoring and CLI plumbing that drives them.

pub mod cli;
pub mod conditions;
pub mod config;
pub mod dataset;
pub mod distance;
pub mod engine;
pub mod error;
pub mod http;

pub use distance::Distance;
pub use engine::{Configurator, Engine, SearchHit, Searcher, SearcherState, Uploader};
pub use error::{BenchError, Result};
