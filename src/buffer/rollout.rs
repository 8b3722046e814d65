//! Rollout buffer for storing and processing trajectories
//!
//! This module implements experience storage for PPO training, including:
//! - Flat transition storage shared by all agents
//! - GAE (Generalized Advantage Estimation) computation
//! - Shuffled minibatch sampling
//!
//! # Example
//!
//! ```rust
//! use swarm_ppo::buffer::rollout::RolloutBuffer;
//!
//! // 128 ticks for 3 agents, 17-d observations, 4-d actions
//! let mut buffer = RolloutBuffer::new(128 * 3, 17, 4);
//!
//! let stored = buffer.add(
//!     &[0.0; 17],            // observation
//!     &[1.0, 0.0, 0.0, 0.0], // action
//!     1.0,                   // reward
//!     0.5,                   // value estimate
//!     -0.1,                  // log probability
//!     false,                 // done
//! );
//! assert!(stored);
//!
//! buffer.compute_returns_advantages(0.99, 0.95, 0.0);
//! for batch in buffer.get(64) {
//!     assert_eq!(batch.obs_shape(), (1, 17));
//! }
//! ```

pub mod gae;
pub mod sampling;
pub mod storage;

mod tests;

pub use gae::compute_gae;
pub use sampling::{Minibatch, MinibatchIter};
pub use storage::RolloutBuffer;
