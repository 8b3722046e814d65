//! Proximal Policy Optimization (PPO) algorithm
//!
//! This module implements the PPO update used to train the shared drone
//! policy. PPO is a policy gradient method that uses a clipped surrogate
//! objective to keep each update close to the policy that collected the data.
//!
//! # Algorithm Overview
//!
//! ```text
//! For each update:
//!   1. Collect horizon * n_agents transitions with the current policy
//!   2. Compute advantages using GAE
//!   3. For n_epochs:
//!      a. Shuffle the buffer into minibatches
//!      b. Normalize advantages per minibatch
//!      c. loss = clipped_pg + vf_coef * mse - ent_coef * entropy
//!      d. Clip gradients and take an Adam step
//! ```
//!
//! # References
//!
//! - [Proximal Policy Optimization Algorithms](https://arxiv.org/abs/1707.06347)
//! - [OpenAI Spinning Up: PPO](https://spinningup.openai.com/en/latest/algorithms/ppo.html)

pub mod config;
pub mod loss;
pub mod stats;
pub mod trainer;

pub use config::PPOConfig;
pub use loss::{compute_entropy_loss, compute_policy_loss, compute_value_loss, normalize_advantages};
pub use stats::TrainingStats;
pub use trainer::PPOTrainer;
