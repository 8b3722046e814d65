//! Collect/update training loop
//!
//! One shared policy drives every agent. Each update collects
//! `rollout_horizon` ticks from a freshly reset environment, flattens all
//! agents into a single [`RolloutBuffer`], computes GAE and runs a PPO update.
//! The loop stops once the step budget, counted as agents x ticks, is spent.

use std::path::Path;

use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use tch::{Device, Tensor};
use tracing::{debug, info};

use super::ppo::{PPOConfig, PPOTrainer, TrainingStats};
use crate::buffer::RolloutBuffer;
use crate::env::{ACT_DIM, AgentAction, AgentMap, AgentObservation, OBS_DIM, ParallelEnvironment};
use crate::policy::{GaussianPolicy, PolicyValueModel};

/// Training run configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainConfig {
    /// Seed for torch sampling and minibatch shuffling
    pub seed: u64,

    /// Step budget, counted as agents x ticks
    pub total_steps: usize,

    /// Ticks collected per agent before each update
    pub rollout_horizon: usize,

    /// Hidden layer width of the policy and value networks
    pub hidden_dim: usize,

    /// PPO hyperparameters
    pub ppo: PPOConfig,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            total_steps: 30_000,
            rollout_horizon: 256,
            hidden_dim: 128,
            ppo: PPOConfig::default(),
        }
    }
}

impl TrainConfig {
    /// Create a new default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<()> {
        if self.total_steps == 0 {
            return Err(anyhow!("total_steps must be positive"));
        }
        if self.rollout_horizon == 0 {
            return Err(anyhow!("rollout_horizon must be positive"));
        }
        if self.hidden_dim == 0 {
            return Err(anyhow!("hidden_dim must be positive"));
        }
        self.ppo.validate()
    }

    /// Set random seed
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set step budget
    pub fn total_steps(mut self, steps: usize) -> Self {
        self.total_steps = steps;
        self
    }

    /// Set rollout horizon per agent
    pub fn rollout_horizon(mut self, horizon: usize) -> Self {
        self.rollout_horizon = horizon;
        self
    }

    /// Set hidden layer width
    pub fn hidden_dim(mut self, dim: usize) -> Self {
        self.hidden_dim = dim;
        self
    }

    /// Set PPO hyperparameters
    pub fn ppo(mut self, ppo: PPOConfig) -> Self {
        self.ppo = ppo;
        self
    }
}

/// Outcome of a training run
#[derive(Debug, Clone, Default, Serialize)]
pub struct TrainingSummary {
    /// PPO updates performed
    pub updates: usize,

    /// Environment steps consumed (agents x ticks)
    pub total_steps: usize,

    /// Episodes that ended with every agent done
    pub episodes: usize,

    /// Actions sent to agents that were still active
    pub active_agent_steps: usize,

    /// Mean per-agent return of the episodes seen in each collection phase
    pub mean_episode_returns: Vec<f32>,

    /// Statistics of the final update
    pub last_stats: Option<TrainingStats>,
}

/// Result of one collection phase
#[derive(Debug, Clone, Default)]
pub struct Collection {
    /// Ticks stepped
    pub ticks: usize,

    /// Episodes that ended with every agent done
    pub episodes: usize,

    /// Actions sent to agents that were still active
    pub active_agent_steps: usize,

    /// Mean per-agent return of every episode segment, including the one
    /// cut off by the end of the phase
    pub episode_returns: Vec<f32>,
}

impl Collection {
    /// Mean over the collected episode returns, 0 when there are none
    pub fn mean_return(&self) -> f32 {
        if self.episode_returns.is_empty() {
            return 0.0;
        }
        self.episode_returns.iter().sum::<f32>() / self.episode_returns.len() as f32
    }
}

/// Drives collect/update cycles of a shared policy over a parallel environment
pub struct TrainingLoop<E, P: PolicyValueModel = GaussianPolicy> {
    env: E,
    trainer: PPOTrainer<P>,
    config: TrainConfig,
    total_steps: usize,
}

impl<E> TrainingLoop<E, GaussianPolicy>
where
    E: ParallelEnvironment<Observation = AgentObservation, Action = AgentAction>,
{
    /// Create a loop with a fresh Gaussian policy
    ///
    /// Seeds torch with `config.seed` before the networks are initialized.
    pub fn new(env: E, config: TrainConfig) -> Result<Self> {
        config.validate()?;
        tch::manual_seed(config.seed as i64);
        let policy = GaussianPolicy::new(OBS_DIM as i64, ACT_DIM as i64, config.hidden_dim as i64);
        Self::with_policy(env, policy, config)
    }
}

impl<E, P> TrainingLoop<E, P>
where
    E: ParallelEnvironment<Observation = AgentObservation, Action = AgentAction>,
    P: PolicyValueModel,
{
    /// Create a loop around an existing policy
    pub fn with_policy(env: E, policy: P, config: TrainConfig) -> Result<Self> {
        config.validate()?;
        if env.num_agents() == 0 {
            return Err(anyhow!("environment has no agents"));
        }
        let trainer = PPOTrainer::new(config.ppo.clone(), policy, config.seed)?;

        Ok(Self { env, trainer, config, total_steps: 0 })
    }

    /// Get the environment
    pub fn env(&self) -> &E {
        &self.env
    }

    /// Get the environment mutably
    pub fn env_mut(&mut self) -> &mut E {
        &mut self.env
    }

    /// Get the policy
    pub fn policy(&self) -> &P {
        self.trainer.policy()
    }

    /// Get the trainer
    pub fn trainer(&self) -> &PPOTrainer<P> {
        &self.trainer
    }

    /// Get the configuration
    pub fn config(&self) -> &TrainConfig {
        &self.config
    }

    /// Steps consumed so far
    pub fn total_steps(&self) -> usize {
        self.total_steps
    }

    /// Fresh buffer sized for one collection phase
    pub fn new_buffer(&self) -> RolloutBuffer {
        RolloutBuffer::new(self.config.rollout_horizon * self.env.num_agents(), OBS_DIM, ACT_DIM)
    }

    /// Fill `buffer` from a freshly reset environment
    ///
    /// Every tick writes one row per agent in configured order. Agents that
    /// were already done before the tick get a zero action, zero log-prob and
    /// zero value. The environment is reset whenever every agent is done.
    pub fn collect(&mut self, buffer: &mut RolloutBuffer) -> Result<Collection> {
        let agents: Vec<String> = self.env.agents().to_vec();
        let n = agents.len();
        let device = self.trainer.policy().device();

        let (mut observations, _) = self.env.reset();
        let mut done = vec![false; n];
        let mut returns = vec![0.0_f32; n];
        let mut segment_ticks = 0;
        let mut collection = Collection::default();

        while buffer.len() + n <= buffer.capacity() {
            let rows: Vec<AgentObservation> =
                agents.iter().map(|a| observations.get(a).copied().unwrap_or([0.0; OBS_DIM])).collect();
            let (actions, log_probs, values) = self.sample(&rows, device)?;

            let mut action_map = AgentMap::with_capacity(n);
            for (i, agent) in agents.iter().enumerate() {
                if !done[i] {
                    action_map.insert(agent.clone(), AgentAction::from_slice(&actions[i * ACT_DIM..(i + 1) * ACT_DIM]));
                }
            }

            collection.active_agent_steps += action_map.len();
            let step = self.env.step(&action_map);
            collection.ticks += 1;
            segment_ticks += 1;

            for (i, agent) in agents.iter().enumerate() {
                let reward = step.rewards.get(agent).copied().unwrap_or(0.0);
                let agent_done = step.is_done(agent);

                if done[i] {
                    buffer.add(&rows[i], &[0.0; ACT_DIM], reward, 0.0, 0.0, agent_done);
                } else {
                    let action = &actions[i * ACT_DIM..(i + 1) * ACT_DIM];
                    buffer.add(&rows[i], action, reward, values[i], log_probs[i], agent_done);
                    returns[i] += reward;
                }
                done[i] = agent_done;
            }

            observations = step.observations;
            self.total_steps += n;

            if done.iter().all(|&d| d) {
                let mean = returns.iter().sum::<f32>() / n as f32;
                debug!("episode done, mean agent return {:.3}", mean);
                collection.episode_returns.push(mean);
                collection.episodes += 1;

                (observations, _) = self.env.reset();
                done.fill(false);
                returns.fill(0.0);
                segment_ticks = 0;
            }
        }

        if segment_ticks > 0 {
            collection.episode_returns.push(returns.iter().sum::<f32>() / n as f32);
        }
        Ok(collection)
    }

    fn sample(&self, rows: &[AgentObservation], device: Device) -> Result<(Vec<f32>, Vec<f32>, Vec<f32>)> {
        let flat: Vec<f32> = rows.iter().flatten().copied().collect();
        let obs = Tensor::from_slice(&flat).view([rows.len() as i64, OBS_DIM as i64]).to_device(device);

        let (actions, log_probs, values) = tch::no_grad(|| self.trainer.policy().act(&obs));

        let actions = Vec::<f32>::try_from(&actions.to_device(Device::Cpu).flatten(0, -1))?;
        let log_probs = Vec::<f32>::try_from(&log_probs.to_device(Device::Cpu))?;
        let values = Vec::<f32>::try_from(&values.to_device(Device::Cpu))?;
        Ok((actions, log_probs, values))
    }

    /// Run collect/update cycles until the step budget is spent
    pub fn run(&mut self) -> Result<TrainingSummary> {
        let mut summary = TrainingSummary::default();
        let ppo = self.config.ppo.clone();

        info!(
            "training {} agents for {} steps (horizon {})",
            self.env.num_agents(),
            self.config.total_steps,
            self.config.rollout_horizon
        );

        while self.total_steps < self.config.total_steps {
            let mut buffer = self.new_buffer();
            let collection = self.collect(&mut buffer)?;

            buffer.compute_returns_advantages(ppo.gamma as f32, ppo.gae_lambda as f32, 0.0);
            let stats = self.trainer.update(&buffer)?;

            summary.updates += 1;
            summary.episodes += collection.episodes;
            summary.active_agent_steps += collection.active_agent_steps;
            summary.mean_episode_returns.push(collection.mean_return());

            info!(
                "Update {} | Steps {} | Return: {:.3} | Loss: {:.3} | Policy: {:.3} | Value: {:.3} | Entropy: {:.3}",
                summary.updates,
                self.total_steps,
                collection.mean_return(),
                stats.total_loss,
                stats.policy_loss,
                stats.value_loss,
                stats.entropy,
            );
            summary.last_stats = Some(stats);
        }

        summary.total_steps = self.total_steps;
        self.env.close();
        Ok(summary)
    }

    /// Consume the loop, returning the trained policy
    pub fn into_policy(self) -> P {
        self.trainer.into_policy()
    }
}

impl<E> TrainingLoop<E, GaussianPolicy>
where
    E: ParallelEnvironment<Observation = AgentObservation, Action = AgentAction>,
{
    /// Save the policy parameters
    pub fn save_checkpoint(&self, path: impl AsRef<Path>) -> Result<()> {
        self.policy().save(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EnvConfig;
    use crate::env::MultiDroneEnv;
    use crate::sim::OfflineSimulator;

    fn offline_env(config: EnvConfig) -> MultiDroneEnv<OfflineSimulator> {
        let sim = OfflineSimulator::new(config.agent_names());
        MultiDroneEnv::new(config, sim)
    }

    fn tiny_config() -> TrainConfig {
        TrainConfig::new()
            .total_steps(48)
            .rollout_horizon(8)
            .hidden_dim(16)
            .ppo(PPOConfig::new().n_epochs(2).batch_size(8))
    }

    fn cpu_loop(env: MultiDroneEnv<OfflineSimulator>, config: TrainConfig) -> TrainingLoop<MultiDroneEnv<OfflineSimulator>> {
        tch::manual_seed(config.seed as i64);
        let policy = GaussianPolicy::with_device(OBS_DIM as i64, ACT_DIM as i64, config.hidden_dim as i64, Device::Cpu);
        TrainingLoop::with_policy(env, policy, config).unwrap()
    }

    #[test]
    fn test_train_config_validation() {
        assert!(TrainConfig::default().validate().is_ok());
        assert!(TrainConfig::new().rollout_horizon(0).validate().is_err());
        assert!(TrainConfig::new().total_steps(0).validate().is_err());
        assert!(TrainConfig::new().ppo(PPOConfig::new().batch_size(0)).validate().is_err());
    }

    #[test]
    fn test_collect_fills_buffer() {
        let mut training = cpu_loop(offline_env(EnvConfig::default()), tiny_config());
        let mut buffer = training.new_buffer();
        assert_eq!(buffer.capacity(), 24);

        let collection = training.collect(&mut buffer).unwrap();

        assert!(buffer.is_full());
        assert_eq!(collection.ticks, 8);
        assert_eq!(training.total_steps(), 24);
        assert_eq!(training.env().reset_count(), 1);
        assert!(buffer.log_probs().iter().all(|lp| lp.is_finite() && *lp <= 0.0));
    }

    #[test]
    fn test_collect_resets_when_all_done() {
        // max_steps 3 with horizon 8: episodes end at ticks 3 and 6
        let env = offline_env(EnvConfig::default().max_steps(3));
        let mut training = cpu_loop(env, tiny_config());
        let mut buffer = training.new_buffer();

        let collection = training.collect(&mut buffer).unwrap();

        assert_eq!(collection.episodes, 2);
        assert_eq!(collection.episode_returns.len(), 3);
        assert_eq!(training.env().reset_count(), 3);
        // rows of tick 3 are the first truncations
        let dones = buffer.dones();
        assert!(dones[6..9].iter().all(|&d| d));
        assert!(dones[..6].iter().all(|&d| !d));
    }

    #[test]
    fn test_done_agents_write_zero_rows() {
        // Drone1 starts inside its goal radius and terminates on the first tick
        let mut config = EnvConfig::default();
        config.agents[0].goal = config.agents[0].spawn;
        let mut training = cpu_loop(offline_env(config), tiny_config());
        let mut buffer = training.new_buffer();

        let collection = training.collect(&mut buffer).unwrap();

        assert!(buffer.dones()[0]);
        // Drone1 is commanded on the first tick only
        let sim = training.env().simulator();
        let drone1 = sim.command_log().iter().filter(|c| sim.vehicle_name(c.vehicle) == Some("Drone1")).count();
        assert_eq!(drone1, 1);
        assert_eq!(sim.command_log().len(), collection.active_agent_steps);
        // tick 2, agent 0
        assert_eq!(buffer.action(3), &[0.0; ACT_DIM]);
        assert_eq!(buffer.log_probs()[3], 0.0);
        assert_eq!(buffer.values()[3], 0.0);
        assert_ne!(buffer.log_probs()[4], 0.0);
    }

    #[test]
    fn test_run_spends_budget() {
        let mut training = cpu_loop(offline_env(EnvConfig::default()), tiny_config());
        let summary = training.run().unwrap();

        // 24 steps per update, budget 48
        assert_eq!(summary.updates, 2);
        assert_eq!(summary.total_steps, 48);
        assert_eq!(summary.mean_episode_returns.len(), 2);
        assert!(summary.last_stats.is_some_and(|s| s.total_loss.is_finite()));
        assert_eq!(training.trainer().total_gradient_steps(), 2 * 2 * 3);
    }
}
