//! Simulator adapter boundary
//!
//! The episode controller never talks to a simulation engine directly. It
//! goes through [`SimulatorAdapter`], a small capability set covering vehicle
//! commands, state queries and scene lookups. Every method returns an
//! explicit [`AdapterFault`] instead of panicking, so the controller can
//! decide per call what a failure means.
//!
//! Two implementations live in this crate:
//! - [`offline::OfflineSimulator`]: velocity integration, used for tests and
//!   smoke runs without a running engine
//! - anything user-provided that wraps a real RPC client

use thiserror::Error;

use crate::{env::action::AgentAction, utils::Vec3};

pub mod jammer;
pub mod offline;

pub use jammer::{JammerLocator, JammerPowerSource, StaticPowerTable, TelemetryFault};
pub use offline::OfflineSimulator;

/// Failure reported by a simulator adapter call
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdapterFault {
    /// The simulator did not acknowledge a command
    #[error("command for {agent} was not acknowledged: {reason}")]
    CommandRejected {
        /// Vehicle the command targeted
        agent: String,
        /// Adapter-provided detail
        reason: String,
    },

    /// A state, collision or scene query failed
    #[error("query for {target} failed: {reason}")]
    StateUnavailable {
        /// Vehicle or scene object being queried
        target: String,
        /// Adapter-provided detail
        reason: String,
    },

    /// The connection to the simulator is gone
    #[error("simulator connection lost: {0}")]
    ConnectionLost(String),
}

impl AdapterFault {
    /// Whether the fault only affects the single call that produced it
    pub fn is_transient(&self) -> bool {
        !matches!(self, AdapterFault::ConnectionLost(_))
    }
}

/// Kinematic state of one vehicle as reported by the simulator
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct KinematicState {
    /// World position (m)
    pub position: Vec3,

    /// Linear velocity (m/s)
    pub velocity: Vec3,

    /// Heading (radians)
    pub yaw: f32,
}

/// Capability set the episode controller consumes from a simulator
///
/// Calls are synchronous: `move_velocity` returns only once the command has
/// run for its full `duration` (or failed). The controller relies on this to
/// give every agent the same control interval per tick.
pub trait SimulatorAdapter {
    /// Teleport `agent` to `position`, arm it and wait for takeoff to finish
    fn spawn_and_takeoff(&mut self, agent: &str, position: Vec3) -> Result<(), AdapterFault>;

    /// Fly `agent` with a world-frame velocity and yaw rate (deg/s) for
    /// `duration` seconds
    fn move_velocity(
        &mut self,
        agent: &str,
        command: &AgentAction,
        duration: f32,
    ) -> Result<(), AdapterFault>;

    /// Current position, velocity and yaw of `agent`
    fn get_state(&mut self, agent: &str) -> Result<KinematicState, AdapterFault>;

    /// Whether `agent` has collided since it was spawned
    fn get_collision(&mut self, agent: &str) -> Result<bool, AdapterFault>;

    /// Names of scene objects matching a `*` wildcard pattern
    fn list_scene_objects(&mut self, _pattern: &str) -> Result<Vec<String>, AdapterFault> {
        Ok(Vec::new())
    }

    /// World position of a named scene object
    fn object_position(&mut self, name: &str) -> Result<Vec3, AdapterFault> {
        Err(AdapterFault::StateUnavailable {
            target: name.to_string(),
            reason: "scene queries not supported by this adapter".to_string(),
        })
    }

    /// Hover, land and disarm `agent`
    fn shutdown(&mut self, _agent: &str) -> Result<(), AdapterFault> {
        Ok(())
    }
}

/// Match `name` against a pattern where `*` stands for any run of characters
pub fn wildcard_match(pattern: &str, name: &str) -> bool {
    let parts: Vec<&str> = pattern.split('*').collect();
    if parts.len() == 1 {
        return pattern == name;
    }

    let (first, last) = (parts[0], parts[parts.len() - 1]);
    if !name.starts_with(first) || name.len() < first.len() + last.len() {
        return false;
    }

    let mut rest = &name[first.len()..];
    for part in &parts[1..parts.len() - 1] {
        match rest.find(part) {
            Some(idx) => rest = &rest[idx + part.len()..],
            None => return false,
        }
    }
    rest.ends_with(last)
}
