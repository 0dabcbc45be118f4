use burn::{
    config::Config,
    module::Module,
    nn::{Initializer, Linear, LinearConfig},
    tensor::{
        Tensor,
        activation::{relu, tanh},
        backend::Backend,
    },
};

/// Configuration for the beamforming policy network.
#[derive(Config, Debug)]
pub struct PolicyConfig {
    /// Users.
    pub k: usize,
    /// Base station antennas.
    pub n: usize,
    /// Relay antennas.
    pub m: usize,
    pub hidden: usize,
}

impl PolicyConfig {
    /// Flattened `H`, `G`, `W` and `F`.
    pub fn obs_dim(&self) -> usize {
        2 * (self.k * self.m + self.m * self.n) + self.act_dim()
    }

    pub fn act_dim(&self) -> usize {
        self.precoder_dim() + self.relay_dim()
    }

    fn precoder_dim(&self) -> usize {
        2 * self.n * self.k
    }

    fn relay_dim(&self) -> usize {
        2 * self.m * self.m
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> Policy<B> {
        let kaiming = Initializer::KaimingNormal {
            gain: 1.0,
            fan_out_only: false,
        };
        let head = |width: usize| {
            LinearConfig::new(self.hidden, width)
                .with_initializer(Initializer::Normal {
                    mean: 0.0,
                    std: 0.01,
                })
                .init(device)
        };

        Policy {
            fc1: LinearConfig::new(self.obs_dim(), self.hidden)
                .with_initializer(kaiming.clone())
                .init(device),
            fc2: LinearConfig::new(self.hidden, self.hidden)
                .with_initializer(kaiming)
                .init(device),
            precoder: head(self.precoder_dim()),
            relay: head(self.relay_dim()),
        }
    }
}

/// Shared trunk with one head for the precoder `W` and one for the relay matrix `F`.
#[derive(Module, Debug)]
pub struct Policy<B: Backend> {
    fc1: Linear<B>,
    fc2: Linear<B>,
    precoder: Linear<B>,
    relay: Linear<B>,
}

impl<B: Backend> Policy<B> {
    /// Action laid out as flattened `W` then flattened `F`, every entry in
    /// `(-1, 1)`. Power scaling is left to the environment.
    pub fn forward(&self, state: Tensor<B, 2>) -> Tensor<B, 2> {
        let x = relu(self.fc1.forward(state));
        let x = relu(self.fc2.forward(x));

        Tensor::cat(
            vec![
                tanh(self.precoder.forward(x.clone())),
                tanh(self.relay.forward(x)),
            ],
            1,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MimoConfig;
    use crate::env::{Env, mimo::MimoRelayEnv};
    use burn::{backend::NdArray, tensor::Distribution};

    type B = NdArray<f32>;

    #[test]
    fn widths_match_the_relay_environment() {
        let mimo = MimoConfig::new().with_k(2).with_n(3).with_m(4);
        let env = MimoRelayEnv::<B>::new(&mimo, &Default::default());

        let config = PolicyConfig::new(2, 3, 4, 16);

        assert_eq!(config.obs_dim(), env.obs_dim());
        assert_eq!(config.act_dim(), env.act_dim());
    }

    #[test]
    fn action_is_bounded() {
        let device = Default::default();
        let config = PolicyConfig::new(1, 2, 2, 16);
        let policy: Policy<B> = config.init(&device);
        let state = Tensor::random(
            [3, config.obs_dim()],
            Distribution::Normal(0.0, 100.0),
            &device,
        );

        let action = policy.forward(state);

        assert_eq!(action.dims(), [3, config.act_dim()]);
        let values = action.into_data().to_vec::<f32>().unwrap();
        assert!(values.iter().all(|v| v.abs() <= 1.0));
    }
}
