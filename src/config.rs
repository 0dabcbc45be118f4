use crate::error;
use burn::config::Config;
use std::path::Path;

/// Hyperparameters of the max-cut learned optimizer.
#[derive(Config, Debug)]
pub struct MaxcutConfig {
    /// Number of graph nodes.
    #[config(default = 800)]
    pub n: usize,
    /// LSTM hidden size. Equal to `n` unless a projection head is wanted.
    #[config(default = 800)]
    pub hidden: usize,
    /// Parallel environments per batch.
    #[config(default = 1024)]
    pub num_env: usize,
    #[config(default = 20)]
    pub episode_length: usize,
    #[config(default = 1e-5)]
    pub learning_rate: f64,
    #[config(default = 100000)]
    pub num_epochs: usize,
    /// Steps between optimizer updates. Recurrent state is detached from the
    /// graph at the same boundary.
    #[config(default = 5)]
    pub truncation_interval: usize,
    /// Weight of the cut between consecutive configurations.
    #[config(default = 0.05)]
    pub transition_weight: f32,
    #[config(default = 50)]
    pub eval_interval: usize,
    #[config(default = 1000)]
    pub checkpoint_interval: usize,
    #[config(default = 0)]
    pub seed: u64,
    #[config(default = "String::from(\"./data/gset_G14.npy\")")]
    pub graph_path: String,
}

/// Hyperparameters of the MIMO relay curriculum trainer.
#[derive(Config, Debug)]
pub struct MimoConfig {
    /// Users.
    #[config(default = 4)]
    pub k: usize,
    /// Base station antennas.
    #[config(default = 4)]
    pub n: usize,
    /// Relay antennas.
    #[config(default = 4)]
    pub m: usize,
    /// Transmit power budget of both hops.
    #[config(default = 10.0)]
    pub p: f32,
    #[config(default = 1.0)]
    pub noise_power: f32,
    #[config(default = 4096)]
    pub num_env: usize,
    #[config(default = 6)]
    pub episode_length: usize,
    #[config(default = 512)]
    pub hidden: usize,
    #[config(default = 5e-5)]
    pub learning_rate: f64,
    #[config(default = 400000)]
    pub num_epochs: usize,
    #[config(default = 1000)]
    pub num_epochs_per_subspace: usize,
    #[config(default = 1000)]
    pub num_epochs_to_save_model: usize,
    #[config(default = 1)]
    pub initial_subspace_dim: usize,
    #[config(default = 0)]
    pub seed: u64,
    #[config(default = "String::from(\"mimo_beamforming_relay\")")]
    pub env_name: String,
}

impl MimoConfig {
    /// Upper bound of the relay-to-user channel subspace.
    pub fn max_subspace_dim_h(&self) -> usize {
        2 * self.k * self.m
    }

    /// Upper bound of the base-station-to-relay channel subspace.
    pub fn max_subspace_dim_g(&self) -> usize {
        2 * self.n * self.m
    }
}

/// Parameters of the random-permutation contraction baseline.
#[derive(Config, Debug)]
pub struct ContractionConfig {
    /// Tensor-train length.
    #[config(default = 10)]
    pub n: usize,
    #[config(default = 10000)]
    pub num_samples: usize,
    #[config(default = 0)]
    pub seed: u64,
    #[config(default = "String::from(\".\")")]
    pub output_dir: String,
    /// Instance file. Derived from `n` when absent.
    pub data_path: Option<String>,
}

impl ContractionConfig {
    pub fn data_path(&self) -> String {
        self.data_path
            .clone()
            .unwrap_or_else(|| format!("test_data_tensor_train_N={}.npy", self.n))
    }
}

/// Loads a JSON config if a path is given, otherwise the defaults.
pub fn load_or<C: Config>(path: Option<&Path>, default: impl FnOnce() -> C) -> error::Result<C> {
    match path {
        Some(path) => Ok(C::load(path)?),
        None => Ok(default()),
    }
}
