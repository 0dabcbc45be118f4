use super::checkpoint;
use crate::config::MimoConfig;
use crate::consts::MIMO_FINAL_CHECKPOINT;
use crate::env::{Env, mimo::MimoRelayEnv};
use crate::error::{Error, Result};
use crate::rl::policy::{Policy, PolicyConfig};
use crate::utils::stop::StopFlag;
use burn::{
    optim::{AdamConfig, GradientsParams, Optimizer},
    tensor::cast::ToElement,
    tensor::{Tensor, backend::AutodiffBackend},
};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Clone, Debug)]
pub struct CurriculumSummary {
    pub epochs: usize,
    pub last_loss: Option<f32>,
    /// `(subspace_dim_h, subspace_dim_g)` at the start and after every widening
    /// that changed them.
    pub subspace_history: Vec<(usize, usize)>,
    pub checkpoint: PathBuf,
}

/// Trains the beamforming policy with one Adam step per episode while the
/// channel subspaces widen every `num_epochs_per_subspace` epochs.
///
/// Whether the run completes or `stop` is raised, the final policy is written
/// to `{save_dir}/policy_net_mimo_1`.
pub fn train<B: AutodiffBackend>(
    config: &MimoConfig,
    save_dir: &Path,
    stop: &StopFlag,
    device: &B::Device,
) -> Result<(Policy<B>, CurriculumSummary)> {
    if config.num_epochs_per_subspace == 0 || config.num_epochs_to_save_model == 0 {
        return Err(Error::InvalidConfig(
            "num_epochs_per_subspace and num_epochs_to_save_model must be positive".to_owned(),
        ));
    }

    B::seed(config.seed);

    let mut env = MimoRelayEnv::<B>::new(config, device);
    let policy_config = PolicyConfig::new(config.k, config.n, config.m, config.hidden);
    debug_assert_eq!(policy_config.obs_dim(), env.obs_dim());
    debug_assert_eq!(policy_config.act_dim(), env.act_dim());
    let mut policy: Policy<B> = policy_config.init(device);
    let mut optimizer = AdamConfig::new().init();

    let mut last_loss = None;
    let mut subspace_history = vec![(env.subspace_dim_h, env.subspace_dim_g)];
    let mut epochs = 0;

    for epoch in 0..config.num_epochs {
        if stop.is_requested() {
            warn!(epoch, "stop requested, saving MIMO policy");
            break;
        }

        let mut state = env.reset();
        let mut loss = Tensor::<B, 1>::zeros([1], device);
        loop {
            let action = policy.forward(state);
            let step = env.step(action);
            loss = loss - step.reward.mean();
            state = step.next_state;

            if step.done {
                break;
            }
        }

        let loss_value = loss.clone().into_scalar().to_f32();
        let grads = GradientsParams::from_grads(loss.backward(), &policy);
        policy = optimizer.step(config.learning_rate, policy, grads);

        info!(epoch, training_loss = loss_value, "mimo");
        last_loss = Some(loss_value);
        epochs = epoch + 1;

        if epoch % config.num_epochs_to_save_model == 0 {
            checkpoint::save::<B, _>(&policy, save_dir, &epoch.to_string())?;
        }

        if (epoch + 1) % config.num_epochs_per_subspace == 0 {
            env.widen_subspaces();
            let dims = (env.subspace_dim_h, env.subspace_dim_g);
            if subspace_history.last() != Some(&dims) {
                debug!(subspace_dim_h = dims.0, subspace_dim_g = dims.1, "curriculum step");
                subspace_history.push(dims);
            }
        }
    }

    let checkpoint = checkpoint::save::<B, _>(&policy, save_dir, MIMO_FINAL_CHECKPOINT)?;
    info!(epochs, path = %checkpoint.display(), "MIMO training finished");

    Ok((
        policy,
        CurriculumSummary {
            epochs,
            last_loss,
            subspace_history,
            checkpoint,
        },
    ))
}
