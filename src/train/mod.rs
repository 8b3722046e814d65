//! Training algorithms
//!
//! This module implements the PPO update and the collect/update loop that
//! trains one policy shared by every agent.

pub mod ppo;
pub mod runner;

pub use ppo::{
    PPOConfig, PPOTrainer, TrainingStats, compute_entropy_loss, compute_policy_loss, compute_value_loss,
    normalize_advantages,
};
pub use runner::{Collection, TrainConfig, TrainingLoop, TrainingSummary};
