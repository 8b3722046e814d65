//! # Swarm PPO
//!
//! Multi-agent reinforcement learning for drone swarms navigating to goals
//! around radio jammers.
//!
//! A [`env::MultiDroneEnv`] steps every drone in lock-step through a
//! [`sim::SimulatorAdapter`], composing progress, jammer, collision and
//! bounds terms into a per-agent reward. One Gaussian policy is shared by all
//! drones and trained with PPO (via tch-rs).
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use swarm_ppo::prelude::*;
//!
//! let config = EnvConfig::default();
//! let sim = OfflineSimulator::new(config.agent_names());
//! let mut env = MultiDroneEnv::new(config, sim);
//! let (observations, _) = env.reset();
//! assert_eq!(observations.len(), env.num_agents());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Environment contract and the drone swarm environment
pub mod env;

/// Simulator adapter boundary, offline simulator and jammer telemetry
pub mod sim;

/// Rollout storage and advantage estimation
pub mod buffer;

/// File and command-line configuration
pub mod config;

/// Utility functions and helpers
pub mod utils;

/// Policy and neural network implementations (requires training feature)
#[cfg(feature = "training")]
pub mod policy;

/// Training algorithms (PPO, etc.) (requires training feature)
#[cfg(feature = "training")]
pub mod train;

/// Prelude module for convenient imports
///
/// This module re-exports commonly used types and traits for convenience.
pub mod prelude {
    pub use crate::buffer::RolloutBuffer;
    pub use crate::config::{AgentSpec, EnvConfig};
    pub use crate::env::{
        AgentAction, AgentMap, AgentObservation, FaultPolicy, MultiAgentStep, MultiDroneEnv,
        ParallelEnvironment,
    };
    pub use crate::sim::{AdapterFault, JammerLocator, OfflineSimulator, SimulatorAdapter};

    #[cfg(feature = "training")]
    pub use crate::config::AppConfig;
    #[cfg(feature = "training")]
    pub use crate::policy::{GaussianPolicy, PolicyValueModel};
    #[cfg(feature = "training")]
    pub use crate::train::{PPOConfig, TrainConfig, TrainingLoop, TrainingSummary};
}

/// Current version of swarm-ppo
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
