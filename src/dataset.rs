//! JSON-lines datasets and result scoring

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::engine::SearchHit;
use crate::error::{BenchError, Result};

pub use crate::engine::Record;

/// One query line: `{"vector": [...], "conditions": {...}, "neighbors": [...]}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Query {
    pub vector: Vec<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditions: Option<Value>,
    /// Ground-truth ids, best first
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub neighbors: Option<Vec<u128>>,
}

/// Read a JSON-lines file, skipping blank lines
pub fn read_jsonl<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let reader = BufReader::new(File::open(path)?);
    let mut items = Vec::new();

    for (lineno, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let item = serde_json::from_str(&line).map_err(|e| {
            BenchError::Configuration(format!("{}:{}: {}", path.display(), lineno + 1, e))
        })?;
        items.push(item);
    }

    Ok(items)
}

/// Fraction of the expected top-`top` ids that came back
///
/// `None` when the query carries no ground truth.
pub fn precision(hits: &[SearchHit], neighbors: Option<&[u128]>, top: usize) -> Option<f64> {
    let neighbors = neighbors?;
    if top == 0 {
        return Some(1.0);
    }
    let expected: HashSet<u128> = neighbors.iter().take(top).copied().collect();
    let found = hits.iter().filter(|(id, _)| expected.contains(id)).count();
    Some(found as f64 / top as f64)
}

/// Aggregate results of one search run
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub queries: usize,
    pub total_time_secs: f64,
    pub rps: f64,
    pub mean_latency_ms: f64,
    pub p50_latency_ms: f64,
    pub p95_latency_ms: f64,
    pub p99_latency_ms: f64,
    pub max_latency_ms: f64,
    /// Mean over scored queries; `None` when nothing was scored
    pub mean_precision: Option<f64>,
}

impl RunSummary {
    pub fn new(latencies: &[Duration], precisions: &[f64], total: Duration) -> Self {
        let mut ms: Vec<f64> = latencies.iter().map(|d| d.as_secs_f64() * 1000.0).collect();
        ms.sort_by(|a, b| a.total_cmp(b));

        let queries = ms.len();
        let total_time_secs = total.as_secs_f64();
        let mean = if queries == 0 {
            0.0
        } else {
            ms.iter().sum::<f64>() / queries as f64
        };

        Self {
            queries,
            total_time_secs,
            rps: if total_time_secs > 0.0 {
                queries as f64 / total_time_secs
            } else {
                0.0
            },
            mean_latency_ms: mean,
            p50_latency_ms: percentile(&ms, 50.0),
            p95_latency_ms: percentile(&ms, 95.0),
            p99_latency_ms: percentile(&ms, 99.0),
            max_latency_ms: ms.last().copied().unwrap_or(0.0),
            mean_precision: (!precisions.is_empty())
                .then(|| precisions.iter().sum::<f64>() / precisions.len() as f64),
        }
    }
}

/// Nearest-rank percentile over sorted values
fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let rank = ((p / 100.0) * sorted.len() as f64).ceil() as usize;
    sorted[rank.clamp(1, sorted.len()) - 1]
}
