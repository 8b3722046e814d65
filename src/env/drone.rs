//! Multi-drone episode controller
//!
//! Drives every configured vehicle through one synchronous tick at a time:
//! commands are issued agent by agent and each one completes before the next
//! is sent, then every agent's state is read back and scored. Agents that
//! reached a terminal or time-limit condition stop receiving commands but
//! keep producing observations until the next reset, so per-tick results
//! always cover the full agent list.
//!
//! Adapter faults never escape `reset`/`step`. How they are absorbed is an
//! explicit [`FaultPolicy`]; either way they are counted in
//! [`EpisodeStats`].

use tracing::{debug, info, warn};

use super::{
    AgentMap, MultiAgentStep, ParallelEnvironment, SpaceInfo,
    action::{ActionClipper, AgentAction},
    observation::{AgentObservation, OBS_DIM, ObservationBuilder},
    reward::{JammerPenaltyMode, JammerSignal, RewardComposer, RewardInfo},
    termination::TerminationChecker,
};
use crate::{
    config::{AgentSpec, EnvConfig},
    sim::{AdapterFault, JammerLocator, KinematicState, SimulatorAdapter},
    utils::geometry,
};

/// What the controller does with an adapter fault
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FaultPolicy {
    /// Log and continue; the failed sub-operation has no effect
    #[default]
    IgnoreAndProceed,

    /// As `IgnoreAndProceed`, but a lost connection truncates every agent
    /// for the rest of the episode
    TruncateOnConnectionLost,
}

/// Progress state of one agent within an episode
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EpisodeState {
    /// Goal distance at the previous evaluation
    pub prev_goal_distance: Option<f32>,

    /// Task-defined end reached
    pub terminated: bool,

    /// Step limit reached
    pub truncated: bool,
}

impl EpisodeState {
    /// Whether the agent is in an absorbing state
    pub fn is_done(&self) -> bool {
        self.terminated || self.truncated
    }
}

/// Per-episode counters
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EpisodeStats {
    /// Ticks since the last reset
    pub steps: usize,

    /// Reward accumulated by each agent while it was active
    pub returns: AgentMap<f32>,

    /// Faults that only affected a single call
    pub transient_faults: usize,

    /// Connection-level faults
    pub connection_faults: usize,
}

impl EpisodeStats {
    /// Sum of agent returns
    pub fn total_return(&self) -> f32 {
        self.returns.values().sum()
    }

    /// Mean agent return
    pub fn mean_return(&self) -> f32 {
        if self.returns.is_empty() { 0.0 } else { self.total_return() / self.returns.len() as f32 }
    }
}

#[derive(Debug, Clone)]
struct AgentSlot {
    spec: AgentSpec,
    state: EpisodeState,
    last_action: AgentAction,
    kinematics: KinematicState,
    episode_return: f32,
}

impl AgentSlot {
    fn new(spec: AgentSpec) -> Self {
        let kinematics = KinematicState { position: spec.spawn, ..Default::default() };
        Self {
            spec,
            state: EpisodeState::default(),
            last_action: AgentAction::default(),
            kinematics,
            episode_return: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct FaultLedger {
    policy: FaultPolicy,
    transient: usize,
    connection: usize,
    connection_lost: bool,
}

impl FaultLedger {
    fn absorb(&mut self, op: &str, fault: &AdapterFault) {
        if fault.is_transient() {
            self.transient += 1;
            debug!("{} failed, proceeding: {}", op, fault);
        } else {
            self.connection += 1;
            self.connection_lost = true;
            warn!("{} failed, proceeding: {}", op, fault);
        }
    }

    fn force_truncation(&self) -> bool {
        self.policy == FaultPolicy::TruncateOnConnectionLost && self.connection_lost
    }
}

/// Parallel multi-agent drone environment over a [`SimulatorAdapter`]
#[derive(Debug)]
pub struct MultiDroneEnv<S: SimulatorAdapter> {
    config: EnvConfig,
    names: Vec<String>,
    sim: S,
    jammers: JammerLocator,
    observer: ObservationBuilder,
    rewards: RewardComposer,
    termination: TerminationChecker,
    clipper: ActionClipper,
    slots: Vec<AgentSlot>,
    faults: FaultLedger,
    steps: usize,
    resets: usize,
}

impl<S: SimulatorAdapter> MultiDroneEnv<S> {
    /// Create an environment; the configuration is fixed from here on
    pub fn new(config: EnvConfig, sim: S) -> Self {
        let jammers = JammerLocator::new(config.jammer_patterns.clone());
        Self::with_jammer_locator(config, sim, jammers)
    }

    /// Create an environment with a preconfigured jammer locator
    pub fn with_jammer_locator(config: EnvConfig, sim: S, jammers: JammerLocator) -> Self {
        let rewards =
            RewardComposer::new(config.reward, config.jammer_radius, config.jammer_penalty_mode);
        Self {
            names: config.agent_names(),
            slots: config.agents.iter().cloned().map(AgentSlot::new).collect(),
            termination: TerminationChecker::new(config.max_steps),
            clipper: ActionClipper::new(config.v_max, config.yaw_rate_max_deg),
            observer: ObservationBuilder,
            faults: FaultLedger::default(),
            steps: 0,
            resets: 0,
            rewards,
            jammers,
            sim,
            config,
        }
    }

    /// Set how adapter faults are absorbed
    pub fn with_fault_policy(mut self, policy: FaultPolicy) -> Self {
        self.faults.policy = policy;
        self
    }

    /// Environment configuration
    pub fn config(&self) -> &EnvConfig {
        &self.config
    }

    /// Underlying simulator adapter
    pub fn simulator(&self) -> &S {
        &self.sim
    }

    /// Mutable access to the simulator adapter
    pub fn simulator_mut(&mut self) -> &mut S {
        &mut self.sim
    }

    /// Jammer cache
    pub fn jammers(&self) -> &JammerLocator {
        &self.jammers
    }

    /// Ticks since the last reset
    pub fn step_count(&self) -> usize {
        self.steps
    }

    /// Number of resets performed
    pub fn reset_count(&self) -> usize {
        self.resets
    }

    /// Progress state of an agent
    pub fn episode_state(&self, agent: &str) -> Option<EpisodeState> {
        self.slot(agent).map(|s| s.state)
    }

    /// Last successfully issued command of an agent
    pub fn last_action(&self, agent: &str) -> Option<AgentAction> {
        self.slot(agent).map(|s| s.last_action)
    }

    /// Whether every agent is terminated or truncated
    pub fn all_done(&self) -> bool {
        self.slots.iter().all(|s| s.state.is_done())
    }

    /// Counters for the current episode
    pub fn episode_stats(&self) -> EpisodeStats {
        EpisodeStats {
            steps: self.steps,
            returns: self.slots.iter().map(|s| (s.spec.name.clone(), s.episode_return)).collect(),
            transient_faults: self.faults.transient,
            connection_faults: self.faults.connection,
        }
    }

    fn slot(&self, agent: &str) -> Option<&AgentSlot> {
        self.slots.iter().find(|s| s.spec.name == agent)
    }

    /// Read kinematics, falling back to the cached value on failure
    fn read_kinematics(sim: &mut S, faults: &mut FaultLedger, slot: &mut AgentSlot) -> KinematicState {
        match sim.get_state(&slot.spec.name) {
            Ok(state) => slot.kinematics = state,
            Err(fault) => faults.absorb("get_state", &fault),
        }
        slot.kinematics
    }

    fn observe(&self, slot: &AgentSlot) -> (AgentObservation, f32) {
        let k = &slot.kinematics;
        let (jammer_vector, jammer_distance) = self.jammers.nearest_jammer_vector(&k.position);
        let obs = self.observer.build(
            &k.position,
            &k.velocity,
            k.yaw,
            &slot.spec.goal,
            &jammer_vector,
            &slot.last_action,
        );
        (obs, jammer_distance)
    }

    fn issue_commands(&mut self, actions: &AgentMap<AgentAction>) {
        for slot in self.slots.iter_mut() {
            if slot.state.is_done() {
                continue;
            }
            let Some(requested) = actions.get(&slot.spec.name) else {
                continue;
            };

            let command = self.clipper.clip(requested);
            match self.sim.move_velocity(&slot.spec.name, &command, self.config.dt) {
                Ok(()) => slot.last_action = command,
                Err(fault) => self.faults.absorb("move_velocity", &fault),
            }
        }

        for agent in actions.keys().filter(|a| !self.names.iter().any(|n| n == a)) {
            debug!("ignoring action for unknown agent {}", agent);
        }
    }

    fn evaluate(&mut self, index: usize) -> (AgentObservation, f32, RewardInfo) {
        let slot = &mut self.slots[index];
        Self::read_kinematics(&mut self.sim, &mut self.faults, slot);
        let collided = self.sim.get_collision(&slot.spec.name).unwrap_or_else(|fault| {
            self.faults.absorb("get_collision", &fault);
            false
        });

        let slot = &self.slots[index];
        let (obs, jammer_distance) = self.observe(slot);
        let position = slot.kinematics.position;
        let dist_to_goal = geometry::distance(&slot.spec.goal, &position);
        let out_of_bounds = !geometry::in_bounds(&position, &self.config.world_bounds);
        let reached_goal = dist_to_goal <= self.config.goal_radius;

        let signal = match self.rewards.mode() {
            JammerPenaltyMode::Distance => JammerSignal::Distance(jammer_distance),
            JammerPenaltyMode::Power => {
                JammerSignal::Power(self.jammers.nearest_jammer_power(&position))
            }
        };
        let (reward, mut info) = self.rewards.compute(
            slot.state.prev_goal_distance,
            dist_to_goal,
            signal,
            collided,
            out_of_bounds,
            reached_goal,
        );
        info.nearest_jammer_dist = Some(jammer_distance);

        (obs, reward, info)
    }
}

impl<S: SimulatorAdapter> ParallelEnvironment for MultiDroneEnv<S> {
    type Observation = AgentObservation;
    type Action = AgentAction;
    type Info = RewardInfo;

    fn agents(&self) -> &[String] {
        &self.names
    }

    fn reset(&mut self) -> (AgentMap<AgentObservation>, AgentMap<RewardInfo>) {
        self.steps = 0;
        self.resets += 1;
        self.faults = FaultLedger { policy: self.faults.policy, ..Default::default() };
        self.jammers.refresh(&mut self.sim);

        for slot in self.slots.iter_mut() {
            if let Err(fault) = self.sim.spawn_and_takeoff(&slot.spec.name, slot.spec.spawn) {
                self.faults.absorb("spawn_and_takeoff", &fault);
            }
        }

        let mut observations = AgentMap::with_capacity(self.slots.len());
        let mut infos = AgentMap::with_capacity(self.slots.len());
        for i in 0..self.slots.len() {
            let spawn = self.slots[i].spec.spawn;
            let slot = &mut self.slots[i];
            slot.state = EpisodeState::default();
            slot.last_action = AgentAction::default();
            slot.episode_return = 0.0;
            slot.kinematics = KinematicState { position: spawn, ..Default::default() };
            let k = Self::read_kinematics(&mut self.sim, &mut self.faults, slot);
            slot.state.prev_goal_distance = Some(geometry::distance(&slot.spec.goal, &k.position));

            let slot = &self.slots[i];
            let (obs, jammer_distance) = self.observe(slot);
            let info = RewardInfo {
                dist_to_goal: slot.state.prev_goal_distance.unwrap_or_default(),
                nearest_jammer_dist: Some(jammer_distance),
                ..Default::default()
            };
            observations.insert(slot.spec.name.clone(), obs);
            infos.insert(slot.spec.name.clone(), info);
        }

        debug!(
            "reset {} with {} agents and {} jammers",
            self.resets,
            self.slots.len(),
            self.jammers.jammer_count()
        );
        (observations, infos)
    }

    fn step(&mut self, actions: &AgentMap<AgentAction>) -> MultiAgentStep<AgentObservation, RewardInfo> {
        self.issue_commands(actions);
        self.steps += 1;

        let n = self.slots.len();
        let mut result = MultiAgentStep {
            observations: AgentMap::with_capacity(n),
            rewards: AgentMap::with_capacity(n),
            terminated: AgentMap::with_capacity(n),
            truncated: AgentMap::with_capacity(n),
            infos: AgentMap::with_capacity(n),
        };

        for i in 0..n {
            let (obs, reward, info) = self.evaluate(i);
            let (done_now, truncated_now) = self.termination.check(
                info.collided,
                info.out_of_bounds,
                info.reached_goal,
                self.steps,
            );
            let force_truncation = self.faults.force_truncation();

            let slot = &mut self.slots[i];
            if !slot.state.is_done() {
                slot.episode_return += reward;
            }
            slot.state.prev_goal_distance = Some(info.dist_to_goal);
            slot.state.terminated |= done_now;
            slot.state.truncated |= truncated_now || force_truncation;

            let name = slot.spec.name.clone();
            result.terminated.insert(name.clone(), slot.state.terminated);
            result.truncated.insert(name.clone(), slot.state.truncated);
            result.observations.insert(name.clone(), obs);
            result.rewards.insert(name.clone(), reward);
            result.infos.insert(name, info);
        }

        if self.all_done() {
            let stats = self.episode_stats();
            debug!(
                "episode finished after {} steps, mean return {:.3}, faults {}/{}",
                stats.steps,
                stats.mean_return(),
                stats.transient_faults,
                stats.connection_faults
            );
        }

        result
    }

    fn observation_space(&self, agent: &str) -> Option<SpaceInfo> {
        self.slot(agent).map(|_| SpaceInfo::unbounded(OBS_DIM))
    }

    fn action_space(&self, agent: &str) -> Option<SpaceInfo> {
        self.slot(agent).map(|_| {
            let (low, high) = self.clipper.bounds();
            SpaceInfo::bounded(low.to_vec(), high.to_vec())
        })
    }

    fn close(&mut self) {
        for slot in &self.slots {
            if let Err(fault) = self.sim.shutdown(&slot.spec.name) {
                self.faults.absorb("shutdown", &fault);
            }
        }
        info!("closed environment after {} resets", self.resets);
    }
}
