//! PPO Trainer implementation
//!
//! This module contains the main PPOTrainer struct and its update loop
//! over a filled [`RolloutBuffer`].

use super::{config::PPOConfig, loss::*, stats::TrainingStats};
use crate::buffer::{Minibatch, RolloutBuffer};
use crate::policy::PolicyValueModel;
use anyhow::{Result, anyhow};
use rand::{SeedableRng, rngs::StdRng};
use tch::{
    Device, Tensor,
    nn::{self, OptimizerConfig},
};
use tracing::{debug, warn};

/// PPO Trainer for policy optimization
///
/// Owns the policy and its Adam optimizer. Each call to [`PPOTrainer::update`]
/// runs `n_epochs` shuffled passes over the buffer with no early stopping.
pub struct PPOTrainer<P: PolicyValueModel> {
    config: PPOConfig,
    policy: P,
    optimizer: nn::Optimizer,
    rng: StdRng,
    total_updates: usize,
    total_gradient_steps: usize,
}

impl<P: PolicyValueModel> std::fmt::Debug for PPOTrainer<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PPOTrainer")
            .field("config", &self.config)
            .field("total_updates", &self.total_updates)
            .field("total_gradient_steps", &self.total_gradient_steps)
            .finish()
    }
}

impl<P: PolicyValueModel> PPOTrainer<P> {
    /// Create a new PPO trainer
    ///
    /// # Arguments
    ///
    /// * `config` - PPO configuration parameters
    /// * `policy` - Policy network; its var store is handed to Adam
    /// * `seed` - Seed for minibatch shuffling
    pub fn new(config: PPOConfig, policy: P, seed: u64) -> Result<Self> {
        config.validate()?;
        let optimizer = nn::Adam::default().build(policy.var_store(), config.learning_rate)?;

        Ok(Self {
            config,
            policy,
            optimizer,
            rng: StdRng::seed_from_u64(seed),
            total_updates: 0,
            total_gradient_steps: 0,
        })
    }

    /// Get reference to the policy
    pub fn policy(&self) -> &P {
        &self.policy
    }

    /// Get mutable reference to the policy
    pub fn policy_mut(&mut self) -> &mut P {
        &mut self.policy
    }

    /// Consume the trainer, returning the policy
    pub fn into_policy(self) -> P {
        self.policy
    }

    /// Get the configuration
    pub fn config(&self) -> &PPOConfig {
        &self.config
    }

    /// Number of completed calls to [`PPOTrainer::update`]
    pub fn total_updates(&self) -> usize {
        self.total_updates
    }

    /// Number of minibatch gradient steps taken so far
    pub fn total_gradient_steps(&self) -> usize {
        self.total_gradient_steps
    }

    /// Train for one PPO update
    ///
    /// This performs:
    /// 1. `n_epochs` shuffled passes over the buffer
    /// 2. Per-minibatch advantage normalization
    /// 3. Clipped policy loss, MSE value loss and entropy bonus
    /// 4. Gradient clipping and an Adam step per minibatch
    ///
    /// The buffer must already hold returns and advantages. Returns the
    /// statistics averaged over every minibatch step.
    pub fn update(&mut self, buffer: &RolloutBuffer) -> Result<TrainingStats> {
        if buffer.is_empty() {
            return Err(anyhow!("cannot update from an empty rollout buffer"));
        }

        let device = self.policy.device();
        let mut stats_sum = TrainingStats::default();

        for epoch in 0..self.config.n_epochs {
            let batches = buffer.get_with_rng(self.config.batch_size, &mut self.rng);
            debug!("PPO epoch {} with {} minibatches", epoch, batches.num_batches());

            for minibatch in batches {
                stats_sum += self.train_minibatch(&minibatch, device);
            }
        }

        self.total_updates += 1;
        self.total_gradient_steps += stats_sum.gradient_steps;

        Ok(stats_sum.mean())
    }

    fn train_minibatch(&mut self, minibatch: &Minibatch, device: Device) -> TrainingStats {
        let (n, obs_dim) = minibatch.obs_shape();
        let (_, act_dim) = minibatch.action_shape();
        let n = n as i64;

        let mb_obs = Tensor::from_slice(&minibatch.observations).view([n, obs_dim as i64]).to_device(device);
        let mb_actions = Tensor::from_slice(&minibatch.actions).view([n, act_dim as i64]).to_device(device);
        let mb_old_log_probs = Tensor::from_slice(&minibatch.old_log_probs).to_device(device);
        let mb_returns = Tensor::from_slice(&minibatch.returns).to_device(device);
        let mb_advantages = Tensor::from_slice(&minibatch.advantages).to_device(device);

        // Normalize advantages at minibatch level (SB3-style)
        let mb_advantages = normalize_advantages(&mb_advantages);

        let (log_probs, entropy, values) = self.policy.evaluate_actions(&mb_obs, &mb_actions);

        let (policy_loss, clip_fraction, approx_kl) =
            compute_policy_loss(&log_probs, &mb_old_log_probs, &mb_advantages, self.config.clip_range);
        let (value_loss, explained_var) = compute_value_loss(&values, &mb_returns);
        let entropy_loss = compute_entropy_loss(&entropy);

        let policy_loss_val = f64::try_from(&policy_loss).unwrap_or(0.0);
        let value_loss_val = f64::try_from(&value_loss).unwrap_or(0.0);
        let entropy_val = -f64::try_from(&entropy_loss).unwrap_or(0.0);

        // loss = pg + vf_coef * v - ent_coef * H
        let loss = &policy_loss + self.config.vf_coef * &value_loss + self.config.ent_coef * &entropy_loss;
        let total_loss_val = f64::try_from(&loss).unwrap_or(f64::NAN);

        if !total_loss_val.is_finite() {
            warn!("non-finite PPO loss (policy {}, value {})", policy_loss_val, value_loss_val);
        }

        self.optimizer.zero_grad();
        loss.backward();
        self.optimizer.clip_grad_norm(self.config.max_grad_norm);
        self.optimizer.step();

        TrainingStats {
            policy_loss: policy_loss_val,
            value_loss: value_loss_val,
            entropy: entropy_val,
            total_loss: total_loss_val,
            clip_fraction,
            approx_kl,
            explained_var,
            gradient_steps: 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::GaussianPolicy;

    fn filled_buffer(n: usize) -> RolloutBuffer {
        let mut buffer = RolloutBuffer::new(n, 17, 4);
        for i in 0..n {
            let obs = [i as f32 * 0.1; 17];
            let act = [0.5_f32, -0.5, 0.0, 0.1];
            buffer.add(&obs, &act, if i % 2 == 0 { 1.0 } else { -1.0 }, 0.0, -3.7, i == n - 1);
        }
        buffer.compute_returns_advantages(0.99, 0.95, 0.0);
        buffer
    }

    fn cpu_trainer(config: PPOConfig) -> PPOTrainer<GaussianPolicy> {
        let policy = GaussianPolicy::with_device(17, 4, 16, Device::Cpu);
        PPOTrainer::new(config, policy, 7).unwrap()
    }

    #[test]
    fn test_rejects_invalid_config() {
        let policy = GaussianPolicy::with_device(17, 4, 16, Device::Cpu);
        assert!(PPOTrainer::new(PPOConfig::new().n_epochs(0), policy, 0).is_err());
    }

    #[test]
    fn test_update_runs_all_epochs() {
        // 10 samples, batch 4 -> 3 minibatches per epoch, no early stop
        let mut trainer = cpu_trainer(PPOConfig::new().n_epochs(3).batch_size(4));
        let stats = trainer.update(&filled_buffer(10)).unwrap();

        assert_eq!(trainer.total_updates(), 1);
        assert_eq!(trainer.total_gradient_steps(), 9);
        assert_eq!(stats.gradient_steps, 9);
        assert!(stats.total_loss.is_finite());
        assert!(stats.value_loss >= 0.0);
    }

    #[test]
    fn test_update_changes_parameters() {
        let mut trainer = cpu_trainer(PPOConfig::new().n_epochs(2).batch_size(8).learning_rate(1e-2));
        let obs = Tensor::full([1, 17], 0.3, (tch::Kind::Float, Device::Cpu));
        let before = trainer.policy().value(&obs);

        trainer.update(&filled_buffer(16)).unwrap();

        let after = trainer.policy().value(&obs);
        let diff = f64::try_from((after - before).abs().sum(tch::Kind::Float)).unwrap();
        assert!(diff > 0.0, "value head did not move");
    }

    #[test]
    fn test_update_empty_buffer_errors() {
        let mut trainer = cpu_trainer(PPOConfig::new());
        assert!(trainer.update(&RolloutBuffer::new(4, 17, 4)).is_err());
    }
}
