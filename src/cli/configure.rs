//! Configure and clean commands - collection lifecycle

use clap::Args;
use tracing::info;

use crate::distance::Distance;

use super::TargetArgs;

#[derive(Args)]
pub struct ConfigureArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Distance metric (l2_squared, cosine, dot)
    #[arg(long, short = 'd', default_value = "cosine")]
    pub distance: Distance,

    /// Vector dimensionality
    #[arg(long)]
    pub dim: usize,
}

#[derive(Args)]
pub struct CleanArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Succeed when the collection does not exist
    #[arg(long)]
    pub ignore_missing: bool,
}

pub async fn run(args: ConfigureArgs) -> anyhow::Result<()> {
    let target = args.target.resolve()?;

    let configurator = target
        .engine
        .configurator(
            &target.host,
            target.port,
            &target.collection_params(),
            &target.connection_params,
        )
        .await?;

    configurator.configure(args.distance, args.dim).await?;

    info!(
        "Configured {} collection ({} dims, {})",
        target.engine, args.dim, args.distance
    );
    println!(
        "{} collection ready: {} dims, {} distance",
        target.engine, args.dim, args.distance
    );
    Ok(())
}

pub async fn run_clean(args: CleanArgs) -> anyhow::Result<()> {
    let target = args.target.resolve()?;

    let configurator = target
        .engine
        .configurator(
            &target.host,
            target.port,
            &target.collection_params(),
            &target.connection_params,
        )
        .await?;

    match configurator.clean().await {
        Ok(()) => println!("Deleted {} collection", target.engine),
        Err(e) if e.is_not_found() && args.ignore_missing => {
            println!("No {} collection to delete", target.engine)
        }
        Err(e) => return Err(e.into()),
    }
    Ok(())
}
