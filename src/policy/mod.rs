//! Policy and neural network wrappers
//!
//! This module provides policy implementations using tch-rs for neural
//! networks.

use tch::{Device, Tensor, nn};

pub mod gaussian;

pub use gaussian::GaussianPolicy;

/// Stochastic policy with a value head, as consumed by the PPO updater
///
/// All tensors are batched along the first dimension.
pub trait PolicyValueModel {
    /// Sample actions: `(actions [B, act], log_probs [B], values [B])`
    fn act(&self, obs: &Tensor) -> (Tensor, Tensor, Tensor);

    /// Score stored actions: `(log_probs [B], entropy [B], values [B])`
    fn evaluate_actions(&self, obs: &Tensor, actions: &Tensor) -> (Tensor, Tensor, Tensor);

    /// Value estimates [B]
    fn value(&self, obs: &Tensor) -> Tensor;

    /// Trainable parameters
    fn var_store(&self) -> &nn::VarStore;

    /// Device holding the parameters
    fn device(&self) -> Device;
}
