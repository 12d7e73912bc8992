use std::path::Path;

use burn::grad_clipping::GradientClippingConfig;
use burn::module::AutodiffModule;
use burn::nn::loss::{HuberLossConfig, Reduction};
use burn::optim::adaptor::OptimizerAdaptor;
use burn::optim::{Adam, AdamConfig, GradientsParams, Optimizer};
use burn::tensor::backend::{AutodiffBackend, Backend};
use burn::tensor::{Int, Tensor, TensorData};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

use super::checkpoint;
use super::config::AgentConfig;
use super::demonstration::Demonstration;
use super::encoding::{EncodedState, StateEncoder, batch_tensor};
use super::exploration::ExplorationPolicy;
use super::metrics::{
    EvaluationProgress, EvaluationSummary, RunningMean, TrainingObserver, TrainingProgress,
    TrainingSummary, WinnerLog,
};
use super::network::ValueFunction;
use super::replay::{ReplayBuffer, Transition, TransitionBatch};
use super::target::{TargetRule, argmax, expected_values};
use crate::action::{ActionIndex, JointAction};
use crate::env::Environment;
use crate::error::AgentError;
use crate::grid::Grid;
use crate::state::StepOutcome;

const HUBER_DELTA: f32 = 1.0;

/// Optimizer and replay memory, present only between `initialize_training` and
/// `initialize_testing`.
struct TrainingState<B, M>
where
    B: AutodiffBackend,
    M: AutodiffModule<B>,
{
    optimizer: OptimizerAdaptor<Adam, M, B>,
    buffer: ReplayBuffer,
}

/// Double DQN agent driving an [`Environment`].
///
/// The policy network lives on the autodiff backend and is the only thing the
/// optimizer touches. The target network is held as the policy's inner module,
/// so it cannot take part in backpropagation and is written only by
/// [`DqnAgent::sync_target`].
pub struct DqnAgent<B, M, E>
where
    B: AutodiffBackend,
    M: ValueFunction<B> + AutodiffModule<B>,
    M::InnerModule: ValueFunction<B::InnerBackend>,
    E: Environment,
{
    env: E,
    config: AgentConfig,
    encoder: StateEncoder,
    action_count: usize,
    policy: M,
    target: M::InnerModule,
    training: Option<TrainingState<B, M>>,
    exploration: ExplorationPolicy,
    rng: StdRng,
    device: B::Device,
    optimizer_steps: usize,
}

impl<B, M, E> DqnAgent<B, M, E>
where
    B: AutodiffBackend,
    M: ValueFunction<B> + AutodiffModule<B>,
    M::InnerModule: ValueFunction<B::InnerBackend>,
    E: Environment,
{
    /// Builds an agent in testing mode with the target synchronized to `policy`.
    pub fn new(
        env: E,
        policy: M,
        config: AgentConfig,
        device: B::Device,
    ) -> Result<Self, AgentError> {
        config.validate()?;
        let encoder = StateEncoder::new(env.observation_space());
        let action_count = env.action_count();
        if action_count == 0 {
            return Err(AgentError::InvalidConfiguration(
                "environment exposes no actions".to_string(),
            ));
        }
        let [channels, height, width] = encoder.shape();
        let zero_output = policy
            .valid()
            .forward(Tensor::zeros([1, channels, height, width], &device));
        let outputs = zero_output.dims()[1];
        if outputs != action_count {
            return Err(AgentError::InvalidConfiguration(format!(
                "network produces {outputs} action values, environment has {action_count} actions"
            )));
        }
        let target = policy.valid();
        let exploration = ExplorationPolicy::pinned(config.epsilon_end);
        let rng = StdRng::seed_from_u64(config.seed);
        Ok(Self {
            env,
            config,
            encoder,
            action_count,
            policy,
            target,
            training: None,
            exploration,
            rng,
            device,
            optimizer_steps: 0,
        })
    }

    /// Restores policy parameters from `path` and synchronizes the target.
    pub fn load_policy(&mut self, path: &Path) -> Result<(), AgentError> {
        let policy = checkpoint::load_policy::<B, M>(self.policy.clone(), path, &self.device)?;
        self.policy = policy;
        self.sync_target();
        info!("loaded policy from {}", path.display());
        Ok(())
    }

    pub fn save_policy(&self, path: &Path) -> Result<(), AgentError> {
        checkpoint::save_policy::<B, M>(&self.policy, path)?;
        debug!("saved policy to {}", path.display());
        Ok(())
    }

    /// Creates a fresh optimizer and replay buffer and restarts exploration at
    /// `epsilon_start`.
    pub fn initialize_training(&mut self) {
        let optimizer = AdamConfig::new()
            .with_grad_clipping(Some(GradientClippingConfig::Value(
                self.config.gradient_clip,
            )))
            .init();
        self.training = Some(TrainingState {
            optimizer,
            buffer: ReplayBuffer::new(self.config.buffer_capacity),
        });
        self.exploration = ExplorationPolicy::new(
            self.config.epsilon_start,
            self.config.epsilon_end,
            self.config.epsilon_decay,
        );
        self.optimizer_steps = 0;
    }

    /// Drops the optimizer and replay buffer and pins epsilon to `epsilon_end`.
    pub fn initialize_testing(&mut self) {
        self.training = None;
        self.exploration = ExplorationPolicy::pinned(self.config.epsilon_end);
    }

    pub fn is_training(&self) -> bool {
        self.training.is_some()
    }

    pub fn encode(&self, grid: &Grid) -> Result<EncodedState, AgentError> {
        Ok(self.encoder.encode(grid)?)
    }

    /// Epsilon-greedy action for `state`. Decays epsilon on every call.
    pub fn act(&mut self, state: &EncodedState) -> Result<ActionIndex, AgentError> {
        if self.exploration.should_explore(&mut self.rng) {
            return Ok(self.rng.gen_range(0..self.action_count));
        }
        self.greedy_action(state)
    }

    /// First action with the highest policy value, computed without gradient tracking.
    pub fn greedy_action(&self, state: &EncodedState) -> Result<ActionIndex, AgentError> {
        let values = self
            .policy
            .valid()
            .forward(state.to_batch::<B::InnerBackend>(&self.device));
        Ok(argmax(&tensor_values(values)?))
    }

    /// Inserts a transition into the replay buffer.
    pub fn remember(&mut self, transition: Transition) -> Result<(), AgentError> {
        let training = self.training.as_mut().ok_or(AgentError::NotTraining)?;
        training.buffer.push(transition);
        Ok(())
    }

    /// One gradient step on a uniformly sampled batch. Returns `Ok(None)` and
    /// leaves every parameter untouched while the buffer holds fewer than
    /// `batch_size` transitions.
    pub fn optimize(&mut self) -> Result<Option<f32>, AgentError> {
        let batch = {
            let training = self.training.as_ref().ok_or(AgentError::NotTraining)?;
            match training.buffer.sample(self.config.batch_size, &mut self.rng) {
                Some(sampled) => TransitionBatch::from_transitions(&sampled),
                None => return Ok(None),
            }
        };

        let bootstrap = self.bootstrap_values(&batch)?;
        let expected = expected_values(
            &batch.rewards,
            &bootstrap,
            &batch.dones,
            self.config.discount_factor,
        );

        let rows = batch.rows();
        let states = batch_tensor::<B>(batch.states, batch.state_shape, &self.device);
        let actions = Tensor::<B, 1, Int>::from_ints(batch.actions.as_slice(), &self.device)
            .reshape([rows, 1]);
        let expected =
            Tensor::<B, 2>::from_data(TensorData::new(expected, [rows, 1]), &self.device);

        let state_values = self.policy.forward(states).gather(1, actions);
        let loss = HuberLossConfig::new(HUBER_DELTA)
            .init()
            .forward(state_values, expected, Reduction::Mean);
        let loss_value = tensor_values(loss.clone())?
            .first()
            .copied()
            .unwrap_or_default();

        let grads = GradientsParams::from_grads(loss.backward(), &self.policy);
        let training = self.training.as_mut().ok_or(AgentError::NotTraining)?;
        self.policy = training
            .optimizer
            .step(self.config.learning_rate, self.policy.clone(), grads);
        self.optimizer_steps += 1;
        Ok(Some(loss_value))
    }

    /// Bootstrap value per batch row; exactly zero for terminal rows. Only the
    /// non-terminal next states are run through the networks.
    fn bootstrap_values(&self, batch: &TransitionBatch) -> Result<Vec<f32>, AgentError> {
        let mut bootstrap = vec![0.0; batch.rows()];
        let rows = batch.non_terminal();
        if rows.is_empty() {
            return Ok(bootstrap);
        }
        let next_states = batch_tensor::<B::InnerBackend>(
            batch.next_states_for(&rows),
            batch.state_shape,
            &self.device,
        );
        let target = tensor_values(self.target.forward(next_states.clone()))?;
        let online = match self.config.target_rule {
            TargetRule::Double => tensor_values(self.policy.valid().forward(next_states))?,
            TargetRule::Vanilla => target.clone(),
        };
        let values = self
            .config
            .target_rule
            .bootstrap(&online, &target, self.action_count);
        for (row, value) in rows.into_iter().zip(values) {
            bootstrap[row] = value;
        }
        Ok(bootstrap)
    }

    /// Copies every policy parameter into the target network.
    pub fn sync_target(&mut self) {
        self.target = self.policy.valid();
        debug!("target network synchronized");
    }

    /// Replays the demonstrated actions from a fresh episode, storing each
    /// transition `demonstration_copies` times, and returns how many entries were
    /// pushed. Stops at the first terminal step.
    pub fn ingest_demonstration(
        &mut self,
        demonstration: &Demonstration,
    ) -> Result<usize, AgentError> {
        if self.training.is_none() {
            return Err(AgentError::NotTraining);
        }
        if let Some(&action) = demonstration
            .human_actions
            .iter()
            .find(|&&action| action >= self.action_count)
        {
            return Err(AgentError::InvalidAction {
                action,
                action_count: self.action_count,
            });
        }

        let copies = self.config.demonstration_copies;
        let mut pushed = 0;
        let mut state = self.encoder.encode(&self.env.reset())?;
        for &action in &demonstration.human_actions {
            let outcome = self.env.step(JointAction::solo(action));
            let next_state = self.encoder.encode(&outcome.state)?;
            let transition = Transition::new(
                state,
                action,
                outcome.reward,
                next_state.clone(),
                outcome.done,
            );
            for _ in 0..copies {
                self.remember(transition.clone())?;
            }
            pushed += copies;
            if outcome.done {
                break;
            }
            state = next_state;
        }
        Ok(pushed)
    }

    /// Ingests `demonstration`, then runs `pretrain_steps` optimization steps,
    /// syncing the target every `target_update` steps and once more at the end.
    /// Returns the last loss, if any step ran.
    pub fn pretrain(&mut self, demonstration: &Demonstration) -> Result<Option<f32>, AgentError> {
        let pushed = self.ingest_demonstration(demonstration)?;
        debug!("demonstration contributed {pushed} transitions");
        let mut last_loss = None;
        for step in 0..self.config.pretrain_steps {
            if let Some(loss) = self.optimize()? {
                last_loss = Some(loss);
            }
            if (step + 1) % self.config.target_update == 0 {
                self.sync_target();
            }
        }
        info!(
            "Pretraining with demonstration... Completed with loss {:.6}",
            last_loss.unwrap_or_default()
        );
        self.sync_target();
        Ok(last_loss)
    }

    pub fn pretrain_from_file(&mut self, path: &Path) -> Result<Option<f32>, AgentError> {
        let demonstration = Demonstration::load(path)?;
        self.pretrain(&demonstration)
    }

    /// Runs `total_episodes` training episodes.
    ///
    /// Episodes with positive reward are appended to the winner log. Progress is
    /// reported every `log_interval` episodes. Every `target_update` episodes the
    /// policy is written to `checkpoint_path` and the target is synchronized.
    /// Both cadences include episode 0.
    pub fn train(
        &mut self,
        checkpoint_path: &Path,
        observer: &mut dyn TrainingObserver,
    ) -> Result<TrainingSummary, AgentError> {
        if self.training.is_none() {
            return Err(AgentError::NotTraining);
        }
        let winners = WinnerLog::new(&self.config.winner_log);
        let total = self.config.total_episodes;
        let mut losses = RunningMean::default();
        let mut rewards = RunningMean::default();
        let mut winning_episodes = 0;

        for episode in 0..total {
            let mut state = self.encoder.encode(&self.env.reset())?;
            let mut episode_reward = 0.0f32;
            let mut episode_loss = 0.0f32;
            loop {
                let action = self.act(&state)?;
                let outcome = self.env.step(JointAction::solo(action));
                episode_reward += outcome.reward;
                let next_state = self.encoder.encode(&outcome.state)?;
                self.remember(Transition::new(
                    state,
                    action,
                    outcome.reward,
                    next_state.clone(),
                    outcome.done,
                ))?;
                episode_loss += self.optimize()?.unwrap_or_default();
                state = next_state;
                if outcome.done {
                    break;
                }
            }

            losses.push(episode_loss);
            rewards.push(episode_reward);
            if episode_reward > 0.0 {
                winning_episodes += 1;
                winners.append(episode, episode_reward)?;
            }
            if episode % self.config.log_interval == 0 {
                observer.on_progress(&TrainingProgress {
                    episode,
                    total_episodes: total,
                    average_loss: losses.mean(),
                    average_reward: rewards.mean(),
                    epsilon: self.exploration.epsilon(),
                });
            }
            if episode % self.config.target_update == 0 {
                self.save_policy(checkpoint_path)?;
                self.sync_target();
            }
        }

        Ok(TrainingSummary {
            episodes: total,
            average_loss: losses.mean(),
            average_reward: rewards.mean(),
            winning_episodes,
            optimizer_steps: self.optimizer_steps,
            final_epsilon: self.exploration.epsilon(),
        })
    }

    /// Plays `episodes` episodes with epsilon pinned to `epsilon_end` and no
    /// learning side effects.
    ///
    /// Requires testing mode: fails with [`AgentError::TrainingActive`] while an
    /// optimizer and replay buffer are live, so they are never discarded here.
    /// Call [`DqnAgent::initialize_testing`] first.
    pub fn evaluate(
        &mut self,
        episodes: usize,
        observer: &mut dyn TrainingObserver,
    ) -> Result<EvaluationSummary, AgentError> {
        if self.training.is_some() {
            return Err(AgentError::TrainingActive);
        }
        let mut rewards = RunningMean::default();
        let mut winning_episodes = 0;
        for episode in 0..episodes {
            let reward = self.play_episode(|_, _| {})?;
            rewards.push(reward);
            if reward > 0.0 {
                winning_episodes += 1;
            }
            if episode % self.config.evaluation_report_interval == 0 {
                observer.on_evaluation(&EvaluationProgress {
                    episode,
                    total_episodes: episodes,
                    average_reward: rewards.mean(),
                });
            }
        }
        Ok(EvaluationSummary {
            episodes,
            average_reward: rewards.mean(),
            winning_episodes,
        })
    }

    /// Plays one episode without storing or learning. `on_state` sees the reset
    /// grid first, then every step outcome. Returns the cumulative reward.
    pub fn play_episode<F>(&mut self, mut on_state: F) -> Result<f32, AgentError>
    where
        F: FnMut(&Grid, Option<&StepOutcome>),
    {
        let grid = self.env.reset();
        on_state(&grid, None);
        let mut state = self.encoder.encode(&grid)?;
        let mut cumulative = 0.0f32;
        loop {
            let action = self.act(&state)?;
            let outcome = self.env.step(JointAction::solo(action));
            on_state(&outcome.state, Some(&outcome));
            cumulative += outcome.reward;
            if outcome.done {
                return Ok(cumulative);
            }
            state = self.encoder.encode(&outcome.state)?;
        }
    }

    pub fn policy_network(&self) -> &M {
        &self.policy
    }

    pub fn target_network(&self) -> &M::InnerModule {
        &self.target
    }

    /// Replay buffer, when training state is initialized.
    pub fn buffer(&self) -> Option<&ReplayBuffer> {
        self.training.as_ref().map(|training| &training.buffer)
    }

    pub fn epsilon(&self) -> f64 {
        self.exploration.epsilon()
    }

    pub fn optimizer_steps(&self) -> usize {
        self.optimizer_steps
    }

    pub fn action_count(&self) -> usize {
        self.action_count
    }

    pub fn encoder(&self) -> &StateEncoder {
        &self.encoder
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn device(&self) -> &B::Device {
        &self.device
    }
}

fn tensor_values<BK: Backend, const D: usize>(
    tensor: Tensor<BK, D>,
) -> Result<Vec<f32>, AgentError> {
    tensor
        .into_data()
        .to_vec::<f32>()
        .map_err(|err| AgentError::Tensor(format!("{err:?}")))
}
