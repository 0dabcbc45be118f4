use super::{Env, step::Step};
use crate::config::MimoConfig;
use crate::consts::EPS;
use crate::utils::complex::ComplexTensor;
use burn::tensor::{Distribution, Tensor, backend::Backend};
use std::f32::consts::LN_2;

/// Two-hop MIMO relay downlink: a base station with `n` antennas serves `k`
/// single-antenna users through an amplify-and-forward relay with `m` antennas.
///
/// Channels live in random subspaces whose dimensions the curriculum widens
/// over training. Every step the policy proposes a precoder `W` and a relay
/// matrix `F`, and the reward is the sum rate of the resulting link.
#[derive(Clone, Debug)]
pub struct MimoRelayEnv<B: Backend> {
    pub k: usize,
    pub n: usize,
    pub m: usize,
    pub p: f32,
    pub noise_power: f32,
    pub num_env: usize,
    pub episode_length: usize,
    pub subspace_dim_h: usize,
    pub subspace_dim_g: usize,
    basis_h: Tensor<B, 2>,
    basis_g: Tensor<B, 2>,
    h: Option<ComplexTensor<B>>,
    g: Option<ComplexTensor<B>>,
    num_steps: usize,
    device: B::Device,
}

impl<B: Backend> MimoRelayEnv<B> {
    pub fn new(config: &MimoConfig, device: &B::Device) -> Self {
        let dim_h = config.max_subspace_dim_h();
        let dim_g = config.max_subspace_dim_g();
        // Entries of variance 1/2 give unit-variance complex channel taps.
        let basis = |dim: usize| -> Tensor<B, 2> {
            Tensor::random([dim, dim], Distribution::Normal(0.0, 0.5f64.sqrt()), device)
        };

        Self {
            k: config.k,
            n: config.n,
            m: config.m,
            p: config.p,
            noise_power: config.noise_power,
            num_env: config.num_env,
            episode_length: config.episode_length,
            subspace_dim_h: config.initial_subspace_dim.clamp(1, dim_h),
            subspace_dim_g: config.initial_subspace_dim.clamp(1, dim_g),
            basis_h: basis(dim_h),
            basis_g: basis(dim_g),
            h: None,
            g: None,
            num_steps: 0,
            device: device.clone(),
        }
    }

    pub fn max_subspace_dim_h(&self) -> usize {
        2 * self.k * self.m
    }

    pub fn max_subspace_dim_g(&self) -> usize {
        2 * self.n * self.m
    }

    /// Widens each channel subspace by one dimension unless it is already full.
    pub fn widen_subspaces(&mut self) {
        if self.subspace_dim_h < self.max_subspace_dim_h() {
            self.subspace_dim_h += 1;
        }
        if self.subspace_dim_g < self.max_subspace_dim_g() {
            self.subspace_dim_g += 1;
        }
    }

    fn sample_channel(
        &self,
        basis: &Tensor<B, 2>,
        dim: usize,
        rows: usize,
        cols: usize,
    ) -> ComplexTensor<B> {
        let total = 2 * rows * cols;
        let coefficients = Tensor::random(
            [self.num_env, dim],
            Distribution::Normal(0.0, (1.0 / dim as f64).sqrt()),
            &self.device,
        );
        let directions = basis.clone().slice([0..dim, 0..total]);
        ComplexTensor::from_flat(coefficients.matmul(directions), rows, cols)
    }

    fn random_action(&self, rows: usize, cols: usize) -> ComplexTensor<B> {
        let shape = [self.num_env, rows, cols];
        ComplexTensor::new(
            Tensor::random(shape, Distribution::Normal(0.0, 1.0), &self.device),
            Tensor::random(shape, Distribution::Normal(0.0, 1.0), &self.device),
        )
    }

    fn channels(&self) -> (&ComplexTensor<B>, &ComplexTensor<B>) {
        match (&self.h, &self.g) {
            (Some(h), Some(g)) => (h, g),
            _ => panic!("MimoRelayEnv::step called before reset"),
        }
    }

    fn state(&self, w: &ComplexTensor<B>, f: &ComplexTensor<B>) -> Tensor<B, 2> {
        let (h, g) = self.channels();
        Tensor::cat(vec![h.flatten(), g.flatten(), w.flatten(), f.flatten()], 1)
    }

    /// Scales `w` to the base station budget and `f` so the relay transmits
    /// with power `p`, counting the relay noise it forwards.
    pub fn project(
        &self,
        w: ComplexTensor<B>,
        f: ComplexTensor<B>,
    ) -> (ComplexTensor<B>, ComplexTensor<B>) {
        let (_, g) = self.channels();
        let w = w.normalize_power(self.p, EPS);

        let relay_power = f
            .matmul(g)
            .matmul(&w)
            .norm_sq()
            .add(f.norm_sq().mul_scalar(self.noise_power))
            .add_scalar(EPS);
        let f = f.scale(relay_power.recip().mul_scalar(self.p).sqrt());

        (w, f)
    }

    /// Per-environment sum rate in bits/s/Hz, shape `[num_env]`.
    pub fn sum_rate(&self, w: &ComplexTensor<B>, f: &ComplexTensor<B>) -> Tensor<B, 1> {
        let (h, g) = self.channels();
        let hf = h.matmul(f);
        // Entry (k, j) is the gain of stream j at user k.
        let gains = hf.matmul(g).matmul(w).abs_sq();

        let eye: Tensor<B, 3> = Tensor::<B, 2>::eye(self.k, &self.device).unsqueeze();
        let signal = (gains.clone() * eye).sum_dim(2);
        let interference = gains.sum_dim(2) - signal.clone();
        let noise = hf.abs_sq().sum_dim(2).add_scalar(1.0).mul_scalar(self.noise_power);

        let sinr = signal / (interference + noise);
        sinr.add_scalar(1.0)
            .log()
            .div_scalar(LN_2)
            .sum_dim(1)
            .reshape([self.num_env])
    }
}

impl<B: Backend> Env<B> for MimoRelayEnv<B> {
    fn reset(&mut self) -> Tensor<B, 2> {
        self.h = Some(self.sample_channel(&self.basis_h, self.subspace_dim_h, self.k, self.m));
        self.g = Some(self.sample_channel(&self.basis_g, self.subspace_dim_g, self.m, self.n));
        self.num_steps = 0;

        let w = self.random_action(self.n, self.k);
        let f = self.random_action(self.m, self.m);
        let (w, f) = self.project(w, f);
        self.state(&w, &f)
    }

    fn step(&mut self, action: Tensor<B, 2>) -> Step<B> {
        let split = 2 * self.n * self.k;
        let [batch, width] = action.dims();

        let w = action.clone().slice([0..batch, 0..split]);
        let w = ComplexTensor::from_flat(w, self.n, self.k);
        let f = ComplexTensor::from_flat(action.slice([0..batch, split..width]), self.m, self.m);
        let (w, f) = self.project(w, f);

        let reward = self.sum_rate(&w, &f);
        self.num_steps += 1;

        Step::new(self.state(&w, &f), reward, self.num_steps >= self.episode_length)
    }

    fn obs_dim(&self) -> usize {
        2 * (self.k * self.m + self.m * self.n) + self.act_dim()
    }

    fn act_dim(&self) -> usize {
        2 * (self.n * self.k + self.m * self.m)
    }
}
