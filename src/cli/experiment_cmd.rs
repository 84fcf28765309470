//! Experiment command - manage experiment files

use clap::{Args, Subcommand};

use crate::config::ExperimentConfig;
use crate::engine::Engine;

#[derive(Args)]
pub struct ExperimentArgs {
    #[command(subcommand)]
    pub command: ExperimentCommands,
}

#[derive(Subcommand)]
pub enum ExperimentCommands {
    /// Write an example experiment file for an engine
    Init {
        /// Experiment name
        name: String,

        /// Engine the experiment targets
        #[arg(long, short = 'e', default_value = "qdrant")]
        engine: String,

        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Show a parsed experiment
    Show {
        /// Experiment name or path
        name: String,
    },

    /// List experiments in the experiments directory
    List,

    /// Show the experiments directory
    Path,
}

pub async fn run(args: ExperimentArgs) -> anyhow::Result<()> {
    match args.command {
        ExperimentCommands::Init {
            name,
            engine,
            force,
        } => {
            let engine: Engine = engine.parse()?;
            let path = ExperimentConfig::locate(&name);

            if path.exists() && !force {
                anyhow::bail!(
                    "Experiment already exists at {}. Use --force to overwrite.",
                    path.display()
                );
            }

            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&path, example_experiment(&name, engine))?;
            println!("Created experiment at {}", path.display());
        }

        ExperimentCommands::Show { name } => {
            let path = ExperimentConfig::locate(&name);
            let experiment = ExperimentConfig::load(&path)?;

            println!("Experiment file: {}", path.display());
            println!();
            println!("name = \"{}\"", experiment.name);
            println!("engine = \"{}\"", experiment.engine);
            println!("connection_params = {}", experiment.connection_params);
            println!("collection_params = {}", experiment.collection_params);
            for (i, params) in experiment.search_params.iter().enumerate() {
                println!("search_params[{}] = {}", i, params);
            }
            println!("upload_params = {}", experiment.upload_params);
        }

        ExperimentCommands::List => {
            let dir = ExperimentConfig::experiments_dir();
            if !dir.exists() {
                println!("No experiments directory at {}", dir.display());
                return Ok(());
            }

            let mut count = 0;
            for entry in std::fs::read_dir(&dir)? {
                let path = entry?.path();
                if path.extension().and_then(|e| e.to_str()) != Some("toml") {
                    continue;
                }
                count += 1;
                match ExperimentConfig::load(&path) {
                    Ok(e) => println!(
                        "   {}. {} [{}] ({} search runs)",
                        count,
                        e.name,
                        e.engine,
                        e.search_params.len()
                    ),
                    Err(err) => println!("   {}. {} INVALID: {}", count, path.display(), err),
                }
            }
            if count == 0 {
                println!("   No experiments found");
            }
        }

        ExperimentCommands::Path => {
            println!("{}", ExperimentConfig::experiments_dir().display());
        }
    }

    Ok(())
}

fn example_experiment(name: &str, engine: Engine) -> String {
    match engine {
        Engine::Qdrant => format!(
            r#"name = "{name}"
engine = "qdrant"

[connection_params]
# Only REST is spoken; prefer_grpc = true is accepted and logged
prefer_grpc = false
timeout = 30

[collection_params]
hnsw_config = {{ m = 16, ef_construct = 128 }}

[[search_params]]
parallel = 8
config = {{ hnsw_ef = 64 }}

[[search_params]]
parallel = 8
config = {{ hnsw_ef = 256 }}

[upload_params]
batch_size = 64
"#
        ),
        Engine::Weaviate => format!(
            r#"name = "{name}"
engine = "weaviate"

[connection_params]
port = 8090

[collection_params.vectorIndexConfig]
efConstruction = 128
maxConnections = 16

[[search_params]]
parallel = 8
vectorIndexConfig = {{ ef = 64 }}

[[search_params]]
parallel = 8
vectorIndexConfig = {{ ef = 256 }}

[upload_params]
batch_size = 1024
"#
        ),
    }
}
