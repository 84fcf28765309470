//! Search command - run queries against the benchmark collection

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use clap::Args;
use futures::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use crate::config::search_parallelism;
use crate::dataset::{precision, read_jsonl, Query, RunSummary};
use crate::distance::Distance;
use crate::engine::{Engine, Searcher};

use super::{Target, TargetArgs};

#[derive(Args)]
pub struct SearchArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Distance metric the collection was configured with
    #[arg(long, short = 'd', default_value = "cosine")]
    pub distance: Distance,

    /// JSON-lines file of {"vector", "conditions", "neighbors"} queries
    #[arg(long)]
    pub queries: PathBuf,

    /// Number of results per query
    #[arg(long, default_value = "10")]
    pub top: usize,

    /// Concurrent queries (default: search_params.parallel or 1)
    #[arg(long)]
    pub parallel: Option<usize>,

    /// Output format (text, json)
    #[arg(long, default_value = "text", value_parser = ["text", "json"])]
    pub format: String,
}

/// Results of one search run
#[derive(Debug, Clone, Serialize)]
pub struct SearchReport {
    pub engine: Engine,
    pub search_params: Value,
    pub results: RunSummary,
}

pub async fn run(args: SearchArgs, quiet: bool) -> anyhow::Result<()> {
    let reports = run_benchmark(&args, quiet).await?;

    if args.format == "json" {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        for report in &reports {
            let summary = &report.results;
            println!("\n{} search_params={}", report.engine, report.search_params);
            println!("   queries:   {}", summary.queries);
            println!("   rps:       {:.1}", summary.rps);
            println!(
                "   latency:   mean {:.2}ms  p50 {:.2}ms  p95 {:.2}ms  p99 {:.2}ms  max {:.2}ms",
                summary.mean_latency_ms,
                summary.p50_latency_ms,
                summary.p95_latency_ms,
                summary.p99_latency_ms,
                summary.max_latency_ms
            );
            match summary.mean_precision {
                Some(p) => println!("   precision: {:.4}", p),
                None => println!("   precision: n/a (no neighbors in query file)"),
            }
        }
    }

    Ok(())
}

/// Run every configured search pass and collect its summary
pub async fn run_benchmark(args: &SearchArgs, quiet: bool) -> anyhow::Result<Vec<SearchReport>> {
    let target = args.target.resolve()?;
    let queries: Vec<Query> = read_jsonl(&args.queries)?;

    // Without an experiment there is a single run on engine defaults
    let runs: Vec<Value> = match &target.experiment {
        Some(e) if !e.search_params.is_empty() => e.search_params.clone(),
        _ => vec![Value::Object(Default::default())],
    };

    let mut reports = Vec::with_capacity(runs.len());
    for search_params in runs {
        let results = run_once(&target, args, &queries, &search_params, quiet).await?;
        reports.push(SearchReport {
            engine: target.engine,
            search_params,
            results,
        });
    }
    Ok(reports)
}

/// Search params with no backend settings leave the backend on its defaults
///
/// `parallel` is consumed by the harness and never reaches the backend.
fn needs_setup(search_params: &Value) -> bool {
    match search_params {
        Value::Null => false,
        Value::Object(obj) => obj.keys().any(|k| k != "parallel"),
        _ => true,
    }
}

async fn run_once(
    target: &Target,
    args: &SearchArgs,
    queries: &[Query],
    search_params: &Value,
    quiet: bool,
) -> anyhow::Result<RunSummary> {
    let parallel = args
        .parallel
        .or_else(|| search_parallelism(search_params))
        .unwrap_or(1)
        .max(1);

    let mut searcher = target.engine.searcher();
    searcher
        .init_client(
            &target.host,
            args.distance,
            &target.connection_params,
            search_params,
        )
        .await?;
    if needs_setup(search_params) {
        searcher.setup_search().await?;
    }

    info!(
        "Running {} queries against {} (parallel={}, top={})",
        queries.len(),
        target.engine,
        parallel,
        args.top
    );

    let progress = if quiet {
        ProgressBar::hidden()
    } else {
        ProgressBar::new(queries.len() as u64)
    };
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} ({eta})")?
            .progress_chars("#>-"),
    );

    let shared: Arc<dyn Searcher> = Arc::from(searcher);
    let top = args.top;

    let start = Instant::now();
    let mut results = futures::stream::iter(queries.iter().map(|query| {
        let searcher = Arc::clone(&shared);
        async move {
            let started = Instant::now();
            let hits = searcher
                .search_one(&query.vector, query.conditions.as_ref(), top)
                .await?;
            let latency = started.elapsed();
            Ok::<_, crate::error::BenchError>((
                latency,
                precision(&hits, query.neighbors.as_deref(), top),
            ))
        }
    }))
    .buffer_unordered(parallel);

    let mut latencies = Vec::with_capacity(queries.len());
    let mut precisions = Vec::new();
    while let Some(result) = results.next().await {
        let (latency, precision) = result?;
        latencies.push(latency);
        precisions.extend(precision);
        progress.inc(1);
    }
    drop(results);
    let total = start.elapsed();
    progress.finish_and_clear();

    let mut shared = shared;
    if let Some(searcher) = Arc::get_mut(&mut shared) {
        searcher.delete_client().await;
    }

    Ok(RunSummary::new(&latencies, &precisions, total))
}
