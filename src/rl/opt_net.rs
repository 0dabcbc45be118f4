use burn::{
    config::Config,
    module::Module,
    nn::{Linear, LinearConfig, Lstm, LstmConfig, LstmState},
    tensor::{Tensor, activation::sigmoid, backend::Backend},
};

/// Configuration for the recurrent max-cut optimizer.
#[derive(Config, Debug)]
pub struct OptNetConfig {
    /// Number of graph nodes, i.e. the width of a configuration.
    pub n: usize,
    pub hidden: usize,
}

impl OptNetConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> OptNet<B> {
        // The LSTM output is the configuration when the widths agree.
        let head = (self.hidden != self.n)
            .then(|| LinearConfig::new(self.hidden, self.n).init(device));

        OptNet {
            lstm: LstmConfig::new(self.n, self.hidden, true).init(device),
            head,
            hidden: self.hidden,
        }
    }
}

/// Recurrent policy that maps the previous configuration to the next one.
#[derive(Module, Debug)]
pub struct OptNet<B: Backend> {
    lstm: Lstm<B>,
    head: Option<Linear<B>>,
    hidden: usize,
}

impl<B: Backend> OptNet<B> {
    /// One rollout step: `[batch, n]` configuration in, `[batch, n]` configuration
    /// in `(0, 1)` out, together with the updated recurrent state.
    pub fn forward(
        &self,
        configuration: Tensor<B, 2>,
        state: LstmState<B, 2>,
    ) -> (Tensor<B, 2>, LstmState<B, 2>) {
        let [batch, n] = configuration.dims();
        let (output, state) = self
            .lstm
            .forward(configuration.reshape([batch, 1, n]), Some(state));

        let x = output.reshape([batch, self.hidden]);
        let x = match &self.head {
            Some(head) => head.forward(x),
            None => x,
        };

        (sigmoid(x), state)
    }

    /// Zeroed `(cell, hidden)` state for a batch.
    pub fn zero_state(&self, batch: usize, device: &B::Device) -> LstmState<B, 2> {
        LstmState::new(
            Tensor::zeros([batch, self.hidden], device),
            Tensor::zeros([batch, self.hidden], device),
        )
    }
}

/// Cuts the recurrent state out of the autodiff graph without resetting it.
pub fn detach_state<B: Backend>(state: LstmState<B, 2>) -> LstmState<B, 2> {
    LstmState::new(state.cell.detach(), state.hidden.detach())
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use burn::tensor::Distribution;

    type B = NdArray<f32>;

    #[test]
    fn forward_keeps_batch_and_node_width() {
        let device = Default::default();
        for hidden in [6, 4] {
            let net: OptNet<B> = OptNetConfig::new(6, hidden).init(&device);
            let state = net.zero_state(3, &device);
            let input = Tensor::random([3, 6], Distribution::Default, &device);

            let (output, state) = net.forward(input, state);

            assert_eq!(output.dims(), [3, 6]);
            assert_eq!(state.hidden.dims(), [3, hidden]);
            assert_eq!(state.cell.dims(), [3, hidden]);
            let values = output.into_data().to_vec::<f32>().unwrap();
            assert!(values.iter().all(|v| *v > 0.0 && *v < 1.0));
        }
    }

    #[test]
    fn zero_state_is_zero() {
        let device = Default::default();
        let net: OptNet<B> = OptNetConfig::new(5, 5).init(&device);

        let state = net.zero_state(2, &device);

        let sum: f32 =
            state.hidden.abs().sum().into_scalar() + state.cell.abs().sum().into_scalar();
        assert_eq!(sum, 0.0);
    }

    #[test]
    fn detach_keeps_state_values() {
        type A = burn::backend::Autodiff<B>;
        let device = Default::default();
        let net: OptNet<A> = OptNetConfig::new(4, 3).init(&device);
        let input = Tensor::<A, 2>::from_data([[0.2, 0.8, 0.5, 0.1]], &device);
        let (_, state) = net.forward(input, net.zero_state(1, &device));
        let values = |state: &LstmState<A, 2>| {
            let mut values = state.cell.clone().into_data().to_vec::<f32>().unwrap();
            values.extend(state.hidden.clone().into_data().to_vec::<f32>().unwrap());
            values
        };
        let before = values(&state);

        let detached = detach_state(state);

        assert_eq!(values(&detached), before);
        assert!(before.iter().any(|v| *v != 0.0));
    }
}
