use crate::graph::Adjacency;
use burn::tensor::{
    Distribution, Tensor,
    backend::{AutodiffBackend, Backend},
};

/// Batched max-cut environment over a fixed graph.
///
/// A configuration is a `[num_env, n]` tensor of soft assignments in `[0, 1]`.
#[derive(Clone, Debug)]
pub struct MaxcutEnv<B: Backend> {
    pub n: usize,
    pub num_env: usize,
    pub episode_length: usize,
    adjacency: Tensor<B, 2>,
    /// Zeroed by `reset` and otherwise untouched: episodes end on the fixed
    /// episode length alone, never on this counter.
    pub num_steps: usize,
    device: B::Device,
}

impl<B: Backend> MaxcutEnv<B> {
    pub fn new(
        adjacency: &Adjacency,
        num_env: usize,
        episode_length: usize,
        device: &B::Device,
    ) -> Self {
        Self {
            n: adjacency.num_nodes(),
            num_env,
            episode_length,
            adjacency: adjacency.to_tensor(device),
            num_steps: 0,
            device: device.clone(),
        }
    }

    /// Draws a fresh uniform configuration batch.
    pub fn reset(&mut self) -> Tensor<B, 2> {
        let configuration = Tensor::random(
            [self.num_env, self.n],
            Distribution::Uniform(0.0, 1.0),
            &self.device,
        );
        self.num_steps = 0;
        configuration
    }

    /// Per-environment `sum_ij a_i * (1 - b_j) * A_ij`, shape `[num_env]`.
    pub fn get_cut_value(&self, a: Tensor<B, 2>, b: Tensor<B, 2>) -> Tensor<B, 1> {
        let complement = b.neg().add_scalar(1.0);
        a.matmul(self.adjacency.clone())
            .mul(complement)
            .sum_dim(1)
            .squeeze(1)
    }

    pub fn device(&self) -> &B::Device {
        &self.device
    }
}

impl<B: AutodiffBackend> MaxcutEnv<B> {
    /// The same environment on the backend without gradient tracking.
    pub fn inner(&self) -> MaxcutEnv<B::InnerBackend> {
        MaxcutEnv {
            n: self.n,
            num_env: self.num_env,
            episode_length: self.episode_length,
            adjacency: self.adjacency.clone().inner(),
            num_steps: self.num_steps,
            device: self.device.clone(),
        }
    }
}

/// Hard-thresholds a configuration to `{0, 1}`.
pub fn binarize<B: Backend>(configuration: Tensor<B, 2>, threshold: f32) -> Tensor<B, 2> {
    configuration.greater_elem(threshold).float()
}
