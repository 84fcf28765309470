//! Upload command - ingest vectors into the benchmark collection

use std::path::PathBuf;
use std::time::Instant;

use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use crate::dataset::{read_jsonl, Record};
use crate::distance::Distance;

use super::TargetArgs;

const DEFAULT_BATCH_SIZE: usize = 64;

#[derive(Args)]
pub struct UploadArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Distance metric the collection was configured with
    #[arg(long, short = 'd', default_value = "cosine")]
    pub distance: Distance,

    /// JSON-lines file of {"id", "vector", "payload"} records
    #[arg(long)]
    pub data: PathBuf,

    /// Records per request (default: upload_params.batch_size or 64)
    #[arg(long)]
    pub batch_size: Option<usize>,
}

pub async fn run(args: UploadArgs, quiet: bool) -> anyhow::Result<()> {
    let target = args.target.resolve()?;
    let records: Vec<Record> = read_jsonl(&args.data)?;
    let batch_size = args
        .batch_size
        .or_else(|| target.experiment.as_ref().and_then(|e| e.batch_size()))
        .unwrap_or(DEFAULT_BATCH_SIZE)
        .max(1);

    let upload_params = target
        .experiment
        .as_ref()
        .map(|e| e.upload_params.clone())
        .unwrap_or_default();

    info!(
        "Uploading {} records to {} in batches of {}",
        records.len(),
        target.engine,
        batch_size
    );

    let mut uploader = target.engine.uploader();
    uploader
        .init_client(
            &target.host,
            args.distance,
            &target.connection_params,
            &upload_params,
        )
        .await?;

    let progress = if quiet {
        ProgressBar::hidden()
    } else {
        ProgressBar::new(records.len() as u64)
    };
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} ({eta})")?
            .progress_chars("#>-"),
    );

    let start = Instant::now();
    for batch in records.chunks(batch_size) {
        uploader.upload_batch(batch).await?;
        progress.inc(batch.len() as u64);
    }
    progress.finish_and_clear();
    let upload_time = start.elapsed();

    uploader.post_upload().await?;
    let total_time = start.elapsed();
    uploader.delete_client().await;

    println!(
        "Uploaded {} records in {:.2}s (indexed after {:.2}s)",
        records.len(),
        upload_time.as_secs_f64(),
        total_time.as_secs_f64()
    );
    Ok(())
}
