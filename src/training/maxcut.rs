use super::checkpoint;
use crate::config::MaxcutConfig;
use crate::consts::{BINARIZE_THRESHOLD, MAXCUT_FINAL_CHECKPOINT};
use crate::env::maxcut::{MaxcutEnv, binarize};
use crate::error::{Error, Result};
use crate::graph::Adjacency;
use crate::rl::opt_net::{OptNet, OptNetConfig, detach_state};
use crate::utils::stop::StopFlag;
use burn::{
    module::AutodiffModule,
    optim::{AdamConfig, GradientsParams, Optimizer},
    tensor::cast::ToElement,
    tensor::{
        Tensor,
        backend::{AutodiffBackend, Backend},
    },
};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Clone, Debug)]
pub struct MaxcutSummary {
    /// Epochs that ran to completion.
    pub epochs: usize,
    /// Best relaxed cut seen during training.
    pub best_train_cut: f32,
    /// Best binarized cut of the most recent evaluation pass.
    pub best_eval_cut: Option<f32>,
    pub checkpoint: PathBuf,
}

/// Trains the recurrent optimizer on one graph, optionally starting from a
/// checkpoint written by an earlier run.
pub fn train<B: AutodiffBackend>(
    config: &MaxcutConfig,
    adjacency: &Adjacency,
    artifact_dir: &Path,
    resume: Option<&Path>,
    stop: &StopFlag,
    device: &B::Device,
) -> Result<(OptNet<B>, MaxcutSummary)> {
    if adjacency.num_nodes() != config.n {
        return Err(Error::InvalidConfig(format!(
            "graph has {} nodes but n = {}",
            adjacency.num_nodes(),
            config.n
        )));
    }
    if config.truncation_interval == 0 || config.eval_interval == 0 {
        return Err(Error::InvalidConfig(
            "truncation_interval and eval_interval must be positive".to_owned(),
        ));
    }

    B::seed(config.seed);

    let mut opt_net: OptNet<B> = OptNetConfig::new(config.n, config.hidden).init(device);
    if let Some(path) = resume {
        opt_net = checkpoint::load::<B, _>(opt_net, path, device)?;
        info!(path = %path.display(), "resuming from checkpoint");
    }

    fit(config, opt_net, adjacency, artifact_dir, stop, device)
}

/// Every `truncation_interval` steps the accumulated loss is backpropagated,
/// Adam takes a step and the LSTM state is detached (but kept). A trailing
/// window shorter than the interval is dropped at the end of the episode.
fn fit<B: AutodiffBackend>(
    config: &MaxcutConfig,
    mut opt_net: OptNet<B>,
    adjacency: &Adjacency,
    artifact_dir: &Path,
    stop: &StopFlag,
    device: &B::Device,
) -> Result<(OptNet<B>, MaxcutSummary)> {
    let mut env = MaxcutEnv::<B>::new(adjacency, config.num_env, config.episode_length, device);
    let mut optimizer = AdamConfig::new().init();

    let mut best_train_cut = f32::NEG_INFINITY;
    let mut best_eval_cut = None;
    let mut epochs = 0;

    for epoch in 0..config.num_epochs {
        if stop.is_requested() {
            warn!(epoch, "stop requested, finishing max-cut training");
            break;
        }

        let mut state = opt_net.zero_state(config.num_env, device);
        let mut prev = env.reset();
        let mut loss: Option<Tensor<B, 1>> = None;
        let mut epoch_best = f32::NEG_INFINITY;

        for step in 0..config.episode_length {
            let (action, next_state) = opt_net.forward(prev.clone(), state);
            state = next_state;

            let cut = env.get_cut_value(action.clone(), action.clone());
            epoch_best = epoch_best.max(cut.clone().max().into_scalar().to_f32());

            let transition = env.get_cut_value(prev, action.clone());
            let step_loss = cut.sum().neg() - transition.sum().mul_scalar(config.transition_weight);
            loss = Some(match loss {
                Some(loss) => loss + step_loss,
                None => step_loss,
            });
            prev = action.detach();

            if (step + 1) % config.truncation_interval == 0 {
                if let Some(loss) = loss.take() {
                    debug!(epoch, step, loss = loss.clone().into_scalar().to_f32(), "update");
                    let grads = GradientsParams::from_grads(loss.backward(), &opt_net);
                    opt_net = optimizer.step(config.learning_rate, opt_net, grads);
                }
                state = detach_state(state);
            }
        }

        best_train_cut = best_train_cut.max(epoch_best);
        epochs = epoch + 1;

        if epoch % config.eval_interval == 0 {
            info!(epoch, best_cut = epoch_best, "train");
            let eval_cut = evaluate(
                &opt_net.valid(),
                &mut env.inner(),
                2 * config.episode_length,
            );
            info!(epoch, best_cut = eval_cut, "eval");
            best_eval_cut = Some(eval_cut);
        }

        if epoch > 0 && epoch % config.checkpoint_interval.max(1) == 0 {
            checkpoint::save::<B, _>(&opt_net, artifact_dir, &format!("opt_net_{epoch}"))?;
        }
    }

    let checkpoint = checkpoint::save::<B, _>(&opt_net, artifact_dir, MAXCUT_FINAL_CHECKPOINT)?;
    info!(epochs, best_train_cut, path = %checkpoint.display(), "max-cut training finished");

    Ok((
        opt_net,
        MaxcutSummary {
            epochs,
            best_train_cut,
            best_eval_cut,
            checkpoint,
        },
    ))
}

/// Rolls the policy out for `steps` steps without gradients and returns the
/// best cut of the binarized configurations.
pub fn evaluate<B: Backend>(opt_net: &OptNet<B>, env: &mut MaxcutEnv<B>, steps: usize) -> f32 {
    let mut state = opt_net.zero_state(env.num_env, env.device());
    let mut configuration = env.reset();
    let mut best = f32::NEG_INFINITY;

    for _ in 0..steps {
        let (next, next_state) = opt_net.forward(configuration, state);
        state = next_state;

        let hard = binarize(next.clone(), BINARIZE_THRESHOLD);
        let cut = env.get_cut_value(hard.clone(), hard);
        best = best.max(cut.max().into_scalar().to_f32());

        configuration = next;
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::parse_gset;
    use crate::training::checkpoint::tests::scratch_dir;
    use burn::backend::{Autodiff, NdArray};

    type B = Autodiff<NdArray<f32>>;

    const TRIANGLE_WITH_TAIL: &str = "4 4\n1 2 1\n2 3 2\n1 3 4\n3 4 8\n";

    /// Output of one step from a zero state on a fixed configuration.
    fn outputs_on_fixed_input(net: &OptNet<B>) -> Vec<f32> {
        let device = Default::default();
        let input = Tensor::<B, 2>::from_data([[0.9, 0.1, 0.7, 0.3]], &device);
        net.forward(input, net.zero_state(1, &device))
            .0
            .into_data()
            .to_vec::<f32>()
            .unwrap()
    }

    fn max_difference(a: &[f32], b: &[f32]) -> f32 {
        assert_eq!(a.len(), b.len());
        a.iter().zip(b).map(|(x, y)| (x - y).abs()).fold(0.0, f32::max)
    }

    fn tiny_config() -> MaxcutConfig {
        MaxcutConfig::new()
            .with_n(4)
            .with_hidden(4)
            .with_num_env(3)
            .with_episode_length(4)
            .with_truncation_interval(2)
            .with_num_epochs(3)
            .with_eval_interval(1)
            .with_learning_rate(1e-2)
    }

    #[test]
    fn final_checkpoint_restores_trained_policy() {
        let device = Default::default();
        let graph = parse_gset(TRIANGLE_WITH_TAIL).unwrap();
        let dir = scratch_dir("maxcut-train");

        let (trained, summary) =
            train::<B>(&tiny_config(), &graph, &dir, None, &StopFlag::new(), &device).unwrap();

        assert_eq!(summary.epochs, 3);
        let total_weight = 1.0 + 2.0 + 4.0 + 8.0;
        let eval = summary.best_eval_cut.unwrap();
        assert!((0.0..=total_weight).contains(&eval));
        assert!(summary.best_train_cut > 0.0);

        let restored = checkpoint::load::<B, _>(
            OptNetConfig::new(4, 4).init::<B>(&device),
            &summary.checkpoint,
            &device,
        )
        .unwrap();
        // CompactRecorder stores half precision.
        assert!(max_difference(&outputs_on_fixed_input(&trained), &outputs_on_fixed_input(&restored)) < 1e-2);
    }

    #[test]
    fn resume_loads_the_given_checkpoint() {
        let device = Default::default();
        let graph = parse_gset(TRIANGLE_WITH_TAIL).unwrap();
        let saved: OptNet<B> = OptNetConfig::new(4, 4).init(&device);
        let dir = scratch_dir("maxcut-resume");
        let path = checkpoint::save::<B, _>(&saved, &dir, "start").unwrap();

        let config = tiny_config().with_num_epochs(0);
        let (resumed, _) =
            train::<B>(&config, &graph, &dir, Some(&path), &StopFlag::new(), &device).unwrap();

        assert!(max_difference(&outputs_on_fixed_input(&saved), &outputs_on_fixed_input(&resumed)) < 1e-2);
    }

    #[test]
    fn trailing_partial_window_never_updates() {
        let device = Default::default();
        let graph = parse_gset(TRIANGLE_WITH_TAIL).unwrap();
        let initial: OptNet<B> = OptNetConfig::new(4, 4).init(&device);
        // The whole episode is shorter than one window.
        let config = tiny_config().with_truncation_interval(5);

        let (trained, _) = fit(
            &config,
            initial.clone(),
            &graph,
            &scratch_dir("maxcut-partial-window"),
            &StopFlag::new(),
            &device,
        )
        .unwrap();

        assert_eq!(outputs_on_fixed_input(&initial), outputs_on_fixed_input(&trained));
    }

    #[test]
    fn full_window_updates_the_policy() {
        let device = Default::default();
        let graph = parse_gset(TRIANGLE_WITH_TAIL).unwrap();
        let initial: OptNet<B> = OptNetConfig::new(4, 4).init(&device);
        let config = tiny_config().with_truncation_interval(4);

        let (trained, _) = fit(
            &config,
            initial.clone(),
            &graph,
            &scratch_dir("maxcut-full-window"),
            &StopFlag::new(),
            &device,
        )
        .unwrap();

        assert!(max_difference(&outputs_on_fixed_input(&initial), &outputs_on_fixed_input(&trained)) > 1e-6);
    }

    #[test]
    fn stop_before_start_still_checkpoints() {
        let device = Default::default();
        let graph = parse_gset(TRIANGLE_WITH_TAIL).unwrap();
        let dir = scratch_dir("maxcut-stop");
        let stop = StopFlag::new();
        stop.request();

        let (_, summary) = train::<B>(&tiny_config(), &graph, &dir, None, &stop, &device).unwrap();

        assert_eq!(summary.epochs, 0);
        assert!(summary.best_eval_cut.is_none());
        assert_eq!(std::fs::read_dir(&dir).unwrap().count(), 1);
    }

    #[test]
    fn rejects_mismatched_graph() {
        let graph = parse_gset(TRIANGLE_WITH_TAIL).unwrap();
        let config = tiny_config().with_n(5);

        let result = train::<B>(
            &config,
            &graph,
            &scratch_dir("maxcut-mismatch"),
            None,
            &StopFlag::new(),
            &Default::default(),
        );

        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn evaluation_cut_is_bounded_by_total_weight() {
        let device = Default::default();
        let graph = parse_gset(TRIANGLE_WITH_TAIL).unwrap();
        let net: OptNet<NdArray<f32>> = OptNetConfig::new(4, 4).init(&device);
        let mut env = MaxcutEnv::new(&graph, 5, 4, &device);

        let best = evaluate(&net, &mut env, 8);

        assert!((0.0..=15.0).contains(&best));
    }
}
