//! Run configuration
//!
//! Environment settings are plain serde structs with defaults for every
//! field, so a TOML file only needs the keys it changes. Precedence is
//! built-in defaults, then the file, then command-line overrides.

use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::{
    env::reward::{JammerPenaltyMode, RewardWeights},
    utils::{Bounds, Vec3},
};

/// One vehicle: identifier, spawn point and goal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSpec {
    /// Vehicle identifier used by the simulator
    pub name: String,

    /// Spawn position on reset
    pub spawn: Vec3,

    /// Goal position
    pub goal: Vec3,
}

impl AgentSpec {
    /// Create an agent description
    pub fn new(name: impl Into<String>, spawn: Vec3, goal: Vec3) -> Self {
        Self { name: name.into(), spawn, goal }
    }
}

/// Environment configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvConfig {
    /// Control interval per tick (s)
    pub dt: f32,

    /// Step limit per episode
    pub max_steps: usize,

    /// Velocity limit per axis (m/s)
    pub v_max: f32,

    /// Yaw-rate limit (deg/s)
    pub yaw_rate_max_deg: f32,

    /// Distance at which the goal counts as reached (m)
    pub goal_radius: f32,

    /// Radius inside which the distance-mode jammer term applies (m)
    pub jammer_radius: f32,

    /// World box as `[min, max]` per axis
    pub world_bounds: Bounds,

    /// Scene-object name patterns identifying jammers
    pub jammer_patterns: Vec<String>,

    /// Jammer term of the reward
    pub jammer_penalty_mode: JammerPenaltyMode,

    /// Vehicles in configured order
    pub agents: Vec<AgentSpec>,

    /// Reward coefficients
    pub reward: RewardWeights,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            dt: 0.2,
            max_steps: 500,
            v_max: 4.0,
            yaw_rate_max_deg: 90.0,
            goal_radius: 1.5,
            jammer_radius: 6.0,
            world_bounds: [[-60.0, 60.0], [-60.0, 60.0], [-25.0, -1.0]],
            jammer_patterns: ["Jammer*", "JammerActor*", "BP_Jammer*"].map(String::from).to_vec(),
            jammer_penalty_mode: JammerPenaltyMode::Distance,
            agents: vec![
                AgentSpec::new("Drone1", [-10.0, 0.0, -3.0], [20.0, 20.0, -5.0]),
                AgentSpec::new("Drone2", [0.0, -10.0, -3.0], [-20.0, 20.0, -5.0]),
                AgentSpec::new("Drone3", [10.0, 0.0, -3.0], [0.0, -20.0, -5.0]),
            ],
            reward: RewardWeights::default(),
        }
    }
}

impl EnvConfig {
    /// Create a new default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Agent identifiers in configured order
    pub fn agent_names(&self) -> Vec<String> {
        self.agents.iter().map(|a| a.name.clone()).collect()
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<()> {
        if !(self.dt > 0.0) {
            return Err(anyhow!("dt must be positive"));
        }
        if self.max_steps == 0 {
            return Err(anyhow!("max_steps must be positive"));
        }
        if !(self.v_max > 0.0) {
            return Err(anyhow!("v_max must be positive"));
        }
        if self.yaw_rate_max_deg < 0.0 {
            return Err(anyhow!("yaw_rate_max_deg must be non-negative"));
        }
        if self.goal_radius < 0.0 {
            return Err(anyhow!("goal_radius must be non-negative"));
        }
        if self.jammer_radius < 0.0 {
            return Err(anyhow!("jammer_radius must be non-negative"));
        }
        for (axis, [lo, hi]) in ["x", "y", "z"].iter().zip(self.world_bounds) {
            if lo > hi {
                return Err(anyhow!("world_bounds {} has min {} above max {}", axis, lo, hi));
            }
        }
        if self.agents.is_empty() {
            return Err(anyhow!("agents must not be empty"));
        }
        for (i, agent) in self.agents.iter().enumerate() {
            if agent.name.is_empty() {
                return Err(anyhow!("agent {} has an empty name", i));
            }
            if self.agents[..i].iter().any(|a| a.name == agent.name) {
                return Err(anyhow!("agent name {} is duplicated", agent.name));
            }
        }
        Ok(())
    }

    /// Set control interval
    pub fn dt(mut self, dt: f32) -> Self {
        self.dt = dt;
        self
    }

    /// Set step limit
    pub fn max_steps(mut self, steps: usize) -> Self {
        self.max_steps = steps;
        self
    }

    /// Set velocity limit
    pub fn v_max(mut self, v: f32) -> Self {
        self.v_max = v;
        self
    }

    /// Set yaw-rate limit
    pub fn yaw_rate_max_deg(mut self, rate: f32) -> Self {
        self.yaw_rate_max_deg = rate;
        self
    }

    /// Set goal radius
    pub fn goal_radius(mut self, radius: f32) -> Self {
        self.goal_radius = radius;
        self
    }

    /// Set jamming radius
    pub fn jammer_radius(mut self, radius: f32) -> Self {
        self.jammer_radius = radius;
        self
    }

    /// Set world bounds
    pub fn world_bounds(mut self, bounds: Bounds) -> Self {
        self.world_bounds = bounds;
        self
    }

    /// Set jammer name patterns
    pub fn jammer_patterns(mut self, patterns: Vec<String>) -> Self {
        self.jammer_patterns = patterns;
        self
    }

    /// Set jammer reward mode
    pub fn jammer_penalty_mode(mut self, mode: JammerPenaltyMode) -> Self {
        self.jammer_penalty_mode = mode;
        self
    }

    /// Replace the agent list
    pub fn agents(mut self, agents: Vec<AgentSpec>) -> Self {
        self.agents = agents;
        self
    }

    /// Set reward weights
    pub fn reward(mut self, weights: RewardWeights) -> Self {
        self.reward = weights;
        self
    }
}

#[cfg(feature = "training")]
pub use app::{AppConfig, Overrides};

#[cfg(feature = "training")]
mod app {
    use std::path::Path;

    use anyhow::Context;

    use super::*;
    use crate::train::TrainConfig;

    /// Root configuration with `[env]` and `[train]` tables
    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    #[serde(default)]
    pub struct AppConfig {
        /// Environment settings
        pub env: EnvConfig,

        /// Training settings
        pub train: TrainConfig,
    }

    /// Command-line values that take precedence over the file
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct Overrides {
        /// Random seed
        pub seed: Option<u64>,

        /// Step budget
        pub total_steps: Option<usize>,

        /// Rollout horizon per agent
        pub horizon: Option<usize>,
    }

    impl AppConfig {
        /// Load configuration from a TOML file
        pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
            let path = path.as_ref();
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config {}", path.display()))?;
            Self::from_toml_str(&content)
                .with_context(|| format!("failed to parse config {}", path.display()))
        }

        /// Parse configuration from a TOML string
        pub fn from_toml_str(content: &str) -> Result<Self> {
            Ok(toml::from_str(content)?)
        }

        /// Defaults, or the file at `path` when given, with overrides applied
        pub fn load(path: Option<&Path>, overrides: &Overrides) -> Result<Self> {
            let base = match path {
                Some(p) => Self::from_file(p)?,
                None => Self::default(),
            };
            let config = base.with_overrides(overrides);
            config.validate()?;
            Ok(config)
        }

        /// Apply command-line overrides
        pub fn with_overrides(mut self, overrides: &Overrides) -> Self {
            if let Some(seed) = overrides.seed {
                self.train.seed = seed;
            }
            if let Some(steps) = overrides.total_steps {
                self.train.total_steps = steps;
            }
            if let Some(horizon) = overrides.horizon {
                self.train.rollout_horizon = horizon;
            }
            self
        }

        /// Validate both tables
        pub fn validate(&self) -> Result<()> {
            self.env.validate().context("invalid [env] table")?;
            self.train.validate().context("invalid [train] table")?;
            Ok(())
        }
    }
}
