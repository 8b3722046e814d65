//! Multi-agent environment interface and the drone swarm environment
//!
//! This module defines the parallel multi-agent contract consumed by the
//! training loop, together with the building blocks of the drone
//! environment: observation assembly, reward composition, termination and
//! action clipping.

use std::ops::Index;

pub mod action;
pub mod drone;
pub mod observation;
pub mod reward;
pub mod termination;

pub use action::{ACT_DIM, ActionClipper, AgentAction};
pub use drone::{EpisodeState, EpisodeStats, FaultPolicy, MultiDroneEnv};
pub use observation::{AgentObservation, OBS_DIM, ObservationBuilder};
pub use reward::{JammerPenaltyMode, JammerSignal, RewardComposer, RewardInfo, RewardWeights};
pub use termination::TerminationChecker;

/// Parallel multi-agent environment
///
/// Every agent acts at every tick. Results are keyed by stable agent
/// identifiers and iterate in the configured agent order.
pub trait ParallelEnvironment {
    /// Per-agent observation type
    type Observation;

    /// Per-agent action type
    type Action;

    /// Per-agent diagnostic record
    type Info;

    /// Agent identifiers in configured order
    fn agents(&self) -> &[String];

    /// Start a new episode for every agent
    fn reset(&mut self) -> (AgentMap<Self::Observation>, AgentMap<Self::Info>);

    /// Apply one action per agent and advance one tick
    ///
    /// Agents missing from `actions` issue no command this tick.
    fn step(
        &mut self,
        actions: &AgentMap<Self::Action>,
    ) -> MultiAgentStep<Self::Observation, Self::Info>;

    /// Observation space of an agent, `None` for unknown agents
    fn observation_space(&self, agent: &str) -> Option<SpaceInfo>;

    /// Action space of an agent, `None` for unknown agents
    fn action_space(&self, agent: &str) -> Option<SpaceInfo>;

    /// Release simulator resources held by the agents
    fn close(&mut self);

    /// Number of agents
    fn num_agents(&self) -> usize {
        self.agents().len()
    }
}

/// Insertion-ordered map from agent identifier to a value
#[derive(Debug, Clone, PartialEq)]
pub struct AgentMap<T> {
    entries: Vec<(String, T)>,
}

impl<T> AgentMap<T> {
    /// Create an empty map
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    /// Create an empty map with room for `n` agents
    pub fn with_capacity(n: usize) -> Self {
        Self { entries: Vec::with_capacity(n) }
    }

    /// Insert or replace the value of `agent`, keeping its original position
    pub fn insert(&mut self, agent: impl Into<String>, value: T) {
        let agent = agent.into();
        match self.entries.iter_mut().find(|(k, _)| *k == agent) {
            Some((_, v)) => *v = value,
            None => self.entries.push((agent, value)),
        }
    }

    /// Value for `agent`
    pub fn get(&self, agent: &str) -> Option<&T> {
        self.entries.iter().find(|(k, _)| k == agent).map(|(_, v)| v)
    }

    /// Whether `agent` has an entry
    pub fn contains(&self, agent: &str) -> bool {
        self.get(agent).is_some()
    }

    /// Agent identifiers in order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// Values in order
    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.entries.iter().map(|(_, v)| v)
    }

    /// `(agent, value)` pairs in order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the map is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T> Default for AgentMap<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Into<String>, T> FromIterator<(K, T)> for AgentMap<T> {
    fn from_iter<I: IntoIterator<Item = (K, T)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

impl<T> Index<&str> for AgentMap<T> {
    type Output = T;

    fn index(&self, agent: &str) -> &T {
        match self.get(agent) {
            Some(v) => v,
            None => panic!("no entry for agent {agent}"),
        }
    }
}

/// Result of one parallel step
///
/// All five maps share the same keys in the same order.
#[derive(Debug, Clone)]
pub struct MultiAgentStep<O, I> {
    /// Observation after the tick
    pub observations: AgentMap<O>,

    /// Reward for the tick
    pub rewards: AgentMap<f32>,

    /// Task-defined end reached (sticky until reset)
    pub terminated: AgentMap<bool>,

    /// Step limit reached (sticky until reset)
    pub truncated: AgentMap<bool>,

    /// Diagnostics
    pub infos: AgentMap<I>,
}

impl<O, I> MultiAgentStep<O, I> {
    /// Whether `agent` is terminated or truncated
    pub fn is_done(&self, agent: &str) -> bool {
        self.terminated.get(agent).copied().unwrap_or(false)
            || self.truncated.get(agent).copied().unwrap_or(false)
    }

    /// Check if all agents are done (either terminated or truncated)
    pub fn all_done(&self) -> bool {
        self.terminated.keys().all(|a| self.is_done(a))
    }

    /// Check if any agent is done
    pub fn any_done(&self) -> bool {
        self.terminated.keys().any(|a| self.is_done(a))
    }

    /// Sum of rewards over agents
    pub fn total_reward(&self) -> f32 {
        self.rewards.values().sum()
    }
}

/// Shape and bounds of an observation or action space
#[derive(Debug, Clone, PartialEq)]
pub struct SpaceInfo {
    /// Shape of the space
    pub shape: Vec<usize>,

    /// Per-component lower bound
    pub low: Vec<f32>,

    /// Per-component upper bound
    pub high: Vec<f32>,
}

impl SpaceInfo {
    /// Unbounded box of `dim` components
    pub fn unbounded(dim: usize) -> Self {
        Self { shape: vec![dim], low: vec![f32::NEG_INFINITY; dim], high: vec![f32::INFINITY; dim] }
    }

    /// Bounded box
    pub fn bounded(low: Vec<f32>, high: Vec<f32>) -> Self {
        Self { shape: vec![low.len()], low, high }
    }

    /// Flat number of components
    pub fn dim(&self) -> usize {
        self.shape.iter().product()
    }

    /// Whether `x` lies inside the bounds
    pub fn contains(&self, x: &[f32]) -> bool {
        x.len() == self.dim()
            && x.iter().zip(self.low.iter().zip(&self.high)).all(|(v, (lo, hi))| lo <= v && v <= hi)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_map_order() {
        let mut map: AgentMap<i32> = [("b", 1), ("a", 2), ("c", 3)].into_iter().collect();
        map.insert("a", 20);

        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["b", "a", "c"]);
        assert_eq!(map["a"], 20);
        assert_eq!(map.get("z"), None);
        assert_eq!(map.len(), 3);
    }

    #[test]
    fn test_step_done_flags() {
        let keys = ["A", "B"];
        let step: MultiAgentStep<(), ()> = MultiAgentStep {
            observations: keys.iter().map(|k| (*k, ())).collect(),
            rewards: keys.iter().map(|k| (*k, 1.0)).collect(),
            terminated: [("A", true), ("B", false)].into_iter().collect(),
            truncated: [("A", false), ("B", false)].into_iter().collect(),
            infos: keys.iter().map(|k| (*k, ())).collect(),
        };

        assert!(step.any_done());
        assert!(!step.all_done());
        assert_eq!(step.total_reward(), 2.0);
    }

    #[test]
    fn test_space_contains() {
        let space = SpaceInfo::bounded(vec![-1.0, -2.0], vec![1.0, 2.0]);
        assert_eq!(space.dim(), 2);
        assert!(space.contains(&[0.5, -2.0]));
        assert!(!space.contains(&[1.5, 0.0]));
        assert!(!space.contains(&[0.0]));
        assert!(SpaceInfo::unbounded(17).contains(&[1e9; 17]));
    }
}
