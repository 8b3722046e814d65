//! Experience buffers

pub mod rollout;

pub use rollout::{Minibatch, RolloutBuffer};
