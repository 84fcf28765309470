//! CLI module - command definitions and handlers

mod configure;
mod experiment_cmd;
mod search;
mod upload;

use clap::{Args, Parser, Subcommand};
use serde_json::Value;

use crate::config::ExperimentConfig;
use crate::engine::Engine;

pub use configure::{CleanArgs, ConfigureArgs};
pub use experiment_cmd::ExperimentArgs;
pub use search::{run_benchmark, SearchArgs, SearchReport};
pub use upload::UploadArgs;

/// vdb-bench - benchmark vector databases through one adapter contract
#[derive(Parser)]
#[command(name = "vdb-bench")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Drop and create the benchmark collection
    Configure(ConfigureArgs),

    /// Delete the benchmark collection
    Clean(CleanArgs),

    /// Upload vectors from a JSON-lines file
    Upload(UploadArgs),

    /// Run queries from a JSON-lines file and report latency/precision
    Search(SearchArgs),

    /// Manage experiment files
    Experiment(ExperimentArgs),
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Commands::Configure(args) => configure::run(args).await,
            Commands::Clean(args) => configure::run_clean(args).await,
            Commands::Upload(args) => upload::run(args, self.quiet).await,
            Commands::Search(args) => search::run(args, self.quiet).await,
            Commands::Experiment(args) => experiment_cmd::run(args).await,
        }
    }
}

/// Backend selection shared by every command that talks to a database
#[derive(Args, Clone)]
pub struct TargetArgs {
    /// Engine to benchmark (qdrant, weaviate); taken from --experiment when omitted
    #[arg(long, short = 'e')]
    pub engine: Option<String>,

    /// Backend host
    #[arg(long, default_value = "localhost", env = "VDB_BENCH_HOST")]
    pub host: String,

    /// Backend port (default: the engine's standard port)
    #[arg(long)]
    pub port: Option<u16>,

    /// Experiment name or path supplying connection/collection/search params
    #[arg(long, short = 'x')]
    pub experiment: Option<String>,
}

/// Engine, port and params resolved from flags and the experiment file
pub struct Target {
    pub engine: Engine,
    pub host: String,
    pub port: u16,
    pub experiment: Option<ExperimentConfig>,
    pub connection_params: Value,
}

impl TargetArgs {
    pub fn resolve(&self) -> anyhow::Result<Target> {
        let experiment = self
            .experiment
            .as_deref()
            .map(|name| ExperimentConfig::load(&ExperimentConfig::locate(name)))
            .transpose()?;

        let engine = match (&self.engine, &experiment) {
            (Some(engine), _) => engine.parse::<Engine>()?,
            (None, Some(experiment)) => experiment.engine,
            (None, None) => anyhow::bail!("Pass --engine or --experiment"),
        };

        if let Some(experiment) = &experiment {
            if experiment.engine != engine {
                anyhow::bail!(
                    "Experiment '{}' targets {}, not {}",
                    experiment.name,
                    experiment.engine,
                    engine
                );
            }
        }

        let mut connection_params = experiment
            .as_ref()
            .map(|e| e.connection_params.clone())
            .unwrap_or_else(|| Value::Object(Default::default()));
        // Searchers and uploaders read the port from connection_params only
        if let (Some(port), Some(params)) = (self.port, connection_params.as_object_mut()) {
            params.insert("port".to_string(), port.into());
        }

        Ok(Target {
            engine,
            host: self.host.clone(),
            port: self.port.unwrap_or_else(|| engine.default_port()),
            experiment,
            connection_params,
        })
    }
}

impl Target {
    pub fn collection_params(&self) -> Value {
        self.experiment
            .as_ref()
            .map(|e| e.collection_params.clone())
            .unwrap_or_else(|| Value::Object(Default::default()))
    }
}
