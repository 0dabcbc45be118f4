pub mod maxcut;
pub mod mimo;
pub mod step;

use burn::tensor::{Tensor, backend::Backend};
use step::Step;

/// A batched, differentiable environment driven by continuous actions.
pub trait Env<B: Backend> {
    /// Starts a new episode and returns the first observation batch.
    fn reset(&mut self) -> Tensor<B, 2>;

    fn step(&mut self, action: Tensor<B, 2>) -> Step<B>;

    fn obs_dim(&self) -> usize;

    fn act_dim(&self) -> usize;
}
