mod config;
mod consts;
mod contraction;
mod env;
mod error;
mod graph;
mod rl;
mod training;
mod utils;

use anyhow::{Context, Result};
use burn::{backend::Autodiff, config::Config};
use clap::{Parser, Subcommand};
use config::{ContractionConfig, MaxcutConfig, MimoConfig, load_or};
use consts::MAXCUT_ENV_NAME;
use graph::Adjacency;
use rand::{SeedableRng, rngs::StdRng};
use std::path::{Path, PathBuf};
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use training::checkpoint::next_experiment_dir;
use utils::stop::StopFlag;

#[cfg(not(feature = "cuda"))]
pub type InferenceBackend = burn::backend::NdArray<f32>;
#[cfg(feature = "cuda")]
pub type InferenceBackend = burn::backend::Cuda<f32>;

pub type TrainingBackend = Autodiff<InferenceBackend>;

#[derive(Parser)]
#[command(name = "rlsolver", about = "Learned and random solvers for combinatorial problems")]
struct Cli {
    /// Root under which experiment directories are created
    #[arg(long, global = true, default_value = ".")]
    artifact_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Train the recurrent max-cut optimizer
    Maxcut {
        /// JSON file with a full MaxcutConfig
        #[arg(long)]
        config: Option<PathBuf>,
        /// Adjacency matrix (.npy) or Gset edge list
        #[arg(long)]
        graph: Option<String>,
        /// Train on a random graph with this edge probability instead of a file
        #[arg(long, conflicts_with = "graph")]
        random_graph: Option<f64>,
        /// Checkpoint (.mpk) to start training from
        #[arg(long)]
        resume: Option<PathBuf>,
        #[arg(long)]
        epochs: Option<usize>,
    },
    /// Train the MIMO relay beamforming policy with curriculum learning
    Mimo {
        /// JSON file with a full MimoConfig
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long)]
        epochs: Option<usize>,
    },
    /// Run the random-permutation contraction-order baseline
    Contraction {
        /// JSON file with a full ContractionConfig
        #[arg(long)]
        config: Option<PathBuf>,
        /// Instances as a [num_instances, S, S] .npy array
        #[arg(long)]
        data: Option<String>,
        #[arg(long)]
        samples: Option<usize>,
        #[arg(long)]
        output_dir: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    let stop = StopFlag::new();

    let worker_stop = stop.clone();
    let mut job = tokio::task::spawn_blocking(move || run(cli, &worker_stop));

    tokio::select! {
        result = &mut job => return result?,
        _ = signal::ctrl_c() => {
            warn!("received interrupt, finishing the current epoch; interrupt again to abort");
            stop.request();
        }
    }

    tokio::select! {
        result = job => result?,
        _ = signal::ctrl_c() => {
            warn!("received second interrupt, aborting without a final checkpoint");
            std::process::exit(130);
        }
    }
}

fn run(cli: Cli, stop: &StopFlag) -> Result<()> {
    let device = Default::default();

    match cli.command {
        Command::Maxcut {
            config,
            graph,
            random_graph,
            resume,
            epochs,
        } => {
            let mut config = load_or(config.as_deref(), MaxcutConfig::new)?;
            if let Some(graph) = graph {
                config.graph_path = graph;
            }
            if let Some(epochs) = epochs {
                config.num_epochs = epochs;
            }

            let adjacency = match random_graph {
                Some(sparsity) => {
                    let mut rng = StdRng::seed_from_u64(config.seed);
                    Adjacency::generate_symmetric(config.n, sparsity, &mut rng)?
                }
                None => graph::load_graph(&config.graph_path)
                    .with_context(|| format!("loading graph {}", config.graph_path))?,
            };

            let dir = experiment_dir(&cli.artifact_dir, MAXCUT_ENV_NAME, &config)?;
            let (_, summary) = training::maxcut::train::<TrainingBackend>(
                &config,
                &adjacency,
                &dir,
                resume.as_deref(),
                stop,
                &device,
            )?;
            info!(?summary, "max-cut done");
        }
        Command::Mimo { config, epochs } => {
            let mut config = load_or(config.as_deref(), MimoConfig::new)?;
            if let Some(epochs) = epochs {
                config.num_epochs = epochs;
            }

            let dir = experiment_dir(&cli.artifact_dir, &config.env_name, &config)?;
            let (_, summary) =
                training::curriculum::train::<TrainingBackend>(&config, &dir, stop, &device)?;
            info!(
                epochs = summary.epochs,
                last_loss = ?summary.last_loss,
                path = %summary.checkpoint.display(),
                "MIMO done"
            );
        }
        Command::Contraction {
            config,
            data,
            samples,
            output_dir,
        } => {
            let mut config = load_or(config.as_deref(), ContractionConfig::new)?;
            if data.is_some() {
                config.data_path = data;
            }
            if let Some(samples) = samples {
                config.num_samples = samples;
            }
            if let Some(output_dir) = output_dir {
                config.output_dir = output_dir;
            }

            let data_path = config.data_path();
            let instances = contraction::load_instances(&data_path)
                .with_context(|| format!("loading instances {data_path}"))?;
            let mut rng = StdRng::seed_from_u64(config.seed);
            let report = contraction::run_baseline(&instances, &config, &mut rng, stop)?;

            let output_dir = Path::new(&config.output_dir);
            std::fs::create_dir_all(output_dir)?;
            let (costs, permutations) = report.write_records(output_dir)?;
            info!(
                costs = %costs.display(),
                permutations = %permutations.display(),
                "records written"
            );
        }
    }

    Ok(())
}

/// Creates the next numbered run directory and stores the config beside the checkpoints.
fn experiment_dir<C: Config>(root: &Path, env_name: &str, config: &C) -> Result<PathBuf> {
    let dir = next_experiment_dir(root, env_name)?;
    config.save(dir.join("config.json"))?;
    info!(dir = %dir.display(), "experiment directory");
    Ok(dir)
}
