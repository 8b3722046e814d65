//! Offline simulator adapter
//!
//! Integrates commanded velocities directly into positions, with no
//! attitude or aerodynamic model. Scene objects, collisions and adapter
//! faults can be scripted, which makes it the adapter used by tests and by
//! `swarm-train` when no engine is running.

use std::collections::{BTreeMap, HashMap};

use super::{AdapterFault, KinematicState, SimulatorAdapter, wildcard_match};
use crate::{
    env::action::AgentAction,
    utils::{Vec3, geometry},
};

/// Start position of a vehicle that has not been spawned yet
pub const DEFAULT_POSITION: Vec3 = [0.0, 0.0, -3.0];

/// Adapter operations that can be scripted to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SimOp {
    /// `spawn_and_takeoff`
    Spawn,
    /// `move_velocity`
    Move,
    /// `get_state`
    State,
    /// `get_collision`
    Collision,
}

/// A command accepted by the simulator
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IssuedCommand {
    /// Index into the simulator's vehicle list
    pub vehicle: usize,
    /// Command as received
    pub action: AgentAction,
    /// Requested duration (s)
    pub duration: f32,
}

#[derive(Debug, Clone)]
struct Vehicle {
    name: String,
    position: Vec3,
    velocity: Vec3,
    orientation: [f32; 4],
    collided: bool,
    airborne: bool,
}

impl Vehicle {
    fn new(name: String) -> Self {
        Self {
            name,
            position: DEFAULT_POSITION,
            velocity: [0.0; 3],
            orientation: [1.0, 0.0, 0.0, 0.0],
            collided: false,
            airborne: false,
        }
    }

    fn yaw(&self) -> f32 {
        let [w, x, y, z] = self.orientation;
        geometry::quat_to_yaw(w, x, y, z)
    }
}

/// Velocity-integration simulator implementing [`SimulatorAdapter`]
#[derive(Debug, Clone, Default)]
pub struct OfflineSimulator {
    vehicles: Vec<Vehicle>,
    scene: BTreeMap<String, Vec3>,
    faults: HashMap<(SimOp, String), AdapterFault>,
    disconnected: bool,
    log: Vec<IssuedCommand>,
}

impl OfflineSimulator {
    /// Create a simulator with the given vehicles at [`DEFAULT_POSITION`]
    pub fn new<I, N>(agents: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<String>,
    {
        Self { vehicles: agents.into_iter().map(|n| Vehicle::new(n.into())).collect(), ..Default::default() }
    }

    /// Add a named scene object
    pub fn with_scene_object(mut self, name: impl Into<String>, position: Vec3) -> Self {
        self.set_scene_object(name, position);
        self
    }

    /// Add or move a named scene object
    pub fn set_scene_object(&mut self, name: impl Into<String>, position: Vec3) {
        self.scene.insert(name.into(), position);
    }

    /// Force the collision flag of a vehicle until its next spawn
    pub fn set_collision(&mut self, agent: &str, collided: bool) {
        if let Some(v) = self.vehicle_mut(agent) {
            v.collided = collided;
        }
    }

    /// Make the next `op` call for `agent` fail with `fault`
    pub fn fail_next(&mut self, op: SimOp, agent: &str, fault: AdapterFault) {
        self.faults.insert((op, agent.to_string()), fault);
    }

    /// Drop or restore the connection; every call fails while dropped
    pub fn set_connected(&mut self, connected: bool) {
        self.disconnected = !connected;
    }

    /// Commands accepted so far, in issue order
    pub fn command_log(&self) -> &[IssuedCommand] {
        &self.log
    }

    /// Name of the vehicle a logged command targeted
    pub fn vehicle_name(&self, index: usize) -> Option<&str> {
        self.vehicles.get(index).map(|v| v.name.as_str())
    }

    /// Whether a vehicle is currently flying
    pub fn is_airborne(&self, agent: &str) -> bool {
        self.vehicles.iter().any(|v| v.name == agent && v.airborne)
    }

    fn vehicle_mut(&mut self, agent: &str) -> Option<&mut Vehicle> {
        self.vehicles.iter_mut().find(|v| v.name == agent)
    }

    fn index_of(&self, agent: &str) -> Option<usize> {
        self.vehicles.iter().position(|v| v.name == agent)
    }

    fn check(&mut self, op: SimOp, agent: &str) -> Result<(), AdapterFault> {
        if self.disconnected {
            return Err(AdapterFault::ConnectionLost("offline simulator disconnected".to_string()));
        }
        match self.faults.remove(&(op, agent.to_string())) {
            Some(fault) => Err(fault),
            None => Ok(()),
        }
    }

    fn unknown(agent: &str) -> AdapterFault {
        AdapterFault::StateUnavailable { target: agent.to_string(), reason: "unknown vehicle".to_string() }
    }
}

impl SimulatorAdapter for OfflineSimulator {
    fn spawn_and_takeoff(&mut self, agent: &str, position: Vec3) -> Result<(), AdapterFault> {
        self.check(SimOp::Spawn, agent)?;
        if self.index_of(agent).is_none() {
            self.vehicles.push(Vehicle::new(agent.to_string()));
        }
        let vehicle = self.vehicle_mut(agent).ok_or_else(|| Self::unknown(agent))?;
        *vehicle = Vehicle { position, airborne: true, ..Vehicle::new(agent.to_string()) };
        Ok(())
    }

    fn move_velocity(
        &mut self,
        agent: &str,
        command: &AgentAction,
        duration: f32,
    ) -> Result<(), AdapterFault> {
        self.check(SimOp::Move, agent)?;
        let index = self.index_of(agent).ok_or_else(|| AdapterFault::CommandRejected {
            agent: agent.to_string(),
            reason: "unknown vehicle".to_string(),
        })?;

        let vehicle = &mut self.vehicles[index];
        let velocity = [command.vx, command.vy, command.vz];
        for (p, v) in vehicle.position.iter_mut().zip(velocity) {
            *p += v * duration;
        }
        vehicle.velocity = velocity;
        let yaw = geometry::normalize_yaw(vehicle.yaw() + command.yaw_rate.to_radians() * duration);
        vehicle.orientation = geometry::yaw_to_quat(yaw);

        self.log.push(IssuedCommand { vehicle: index, action: *command, duration });
        Ok(())
    }

    fn get_state(&mut self, agent: &str) -> Result<KinematicState, AdapterFault> {
        self.check(SimOp::State, agent)?;
        let vehicle = self.vehicle_mut(agent).ok_or_else(|| Self::unknown(agent))?;
        Ok(KinematicState { position: vehicle.position, velocity: vehicle.velocity, yaw: vehicle.yaw() })
    }

    fn get_collision(&mut self, agent: &str) -> Result<bool, AdapterFault> {
        self.check(SimOp::Collision, agent)?;
        self.vehicle_mut(agent).map(|v| v.collided).ok_or_else(|| Self::unknown(agent))
    }

    fn list_scene_objects(&mut self, pattern: &str) -> Result<Vec<String>, AdapterFault> {
        if self.disconnected {
            return Err(AdapterFault::ConnectionLost("offline simulator disconnected".to_string()));
        }
        Ok(self.scene.keys().filter(|name| wildcard_match(pattern, name)).cloned().collect())
    }

    fn object_position(&mut self, name: &str) -> Result<Vec3, AdapterFault> {
        self.scene.get(name).copied().ok_or_else(|| Self::unknown(name))
    }

    fn shutdown(&mut self, agent: &str) -> Result<(), AdapterFault> {
        if self.disconnected {
            return Err(AdapterFault::ConnectionLost("offline simulator disconnected".to_string()));
        }
        let vehicle = self.vehicle_mut(agent).ok_or_else(|| Self::unknown(agent))?;
        vehicle.velocity = [0.0; 3];
        vehicle.airborne = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_velocity_integration() {
        let mut sim = OfflineSimulator::new(["Drone1"]);
        sim.spawn_and_takeoff("Drone1", [1.0, 2.0, -3.0]).unwrap();
        sim.move_velocity("Drone1", &AgentAction::new(1.0, -2.0, 0.5, 0.0), 0.5).unwrap();

        let state = sim.get_state("Drone1").unwrap();
        assert_eq!(state.position, [1.5, 1.0, -2.75]);
        assert_eq!(state.velocity, [1.0, -2.0, 0.5]);
        assert!(state.yaw.abs() < 1e-6);
        assert_eq!(sim.command_log().len(), 1);
        assert_eq!(sim.vehicle_name(sim.command_log()[0].vehicle), Some("Drone1"));
    }

    #[test]
    fn test_yaw_rate_integration() {
        let mut sim = OfflineSimulator::new(["Drone1"]);
        sim.move_velocity("Drone1", &AgentAction::new(0.0, 0.0, 0.0, 90.0), 1.0).unwrap();

        let yaw = sim.get_state("Drone1").unwrap().yaw;
        assert!((yaw - std::f32::consts::FRAC_PI_2).abs() < 1e-5, "yaw {}", yaw);
    }

    #[test]
    fn test_spawn_resets_vehicle() {
        let mut sim = OfflineSimulator::new(["Drone1"]);
        sim.move_velocity("Drone1", &AgentAction::new(2.0, 0.0, 0.0, 30.0), 1.0).unwrap();
        sim.set_collision("Drone1", true);

        sim.spawn_and_takeoff("Drone1", [5.0, 5.0, -4.0]).unwrap();
        let state = sim.get_state("Drone1").unwrap();
        assert_eq!(state.position, [5.0, 5.0, -4.0]);
        assert_eq!(state.velocity, [0.0; 3]);
        assert!(!sim.get_collision("Drone1").unwrap());
        assert!(sim.is_airborne("Drone1"));
    }

    #[test]
    fn test_fault_injection_is_one_shot() {
        let mut sim = OfflineSimulator::new(["Drone1"]);
        let fault = AdapterFault::StateUnavailable { target: "Drone1".into(), reason: "timeout".into() };
        sim.fail_next(SimOp::State, "Drone1", fault.clone());

        assert_eq!(sim.get_state("Drone1"), Err(fault));
        assert!(sim.get_state("Drone1").is_ok());
    }

    #[test]
    fn test_disconnect() {
        let mut sim = OfflineSimulator::new(["Drone1"]);
        sim.set_connected(false);
        assert!(matches!(
            sim.move_velocity("Drone1", &AgentAction::default(), 0.1),
            Err(AdapterFault::ConnectionLost(_))
        ));
        assert!(sim.command_log().is_empty());

        sim.set_connected(true);
        assert!(sim.move_velocity("Drone1", &AgentAction::default(), 0.1).is_ok());
    }

    #[test]
    fn test_unknown_vehicle() {
        let mut sim = OfflineSimulator::new(["Drone1"]);
        assert!(matches!(
            sim.move_velocity("Ghost", &AgentAction::default(), 0.1),
            Err(AdapterFault::CommandRejected { .. })
        ));
        assert!(sim.get_state("Ghost").is_err());
    }

    #[test]
    fn test_scene_listing() {
        let mut sim = OfflineSimulator::new(["Drone1"])
            .with_scene_object("JammerActor_2", [0.0; 3])
            .with_scene_object("Jammer_1", [1.0, 0.0, 0.0])
            .with_scene_object("Wall", [0.0; 3]);

        assert_eq!(sim.list_scene_objects("Jammer*").unwrap(), vec!["JammerActor_2", "Jammer_1"]);
        assert_eq!(sim.object_position("Jammer_1").unwrap(), [1.0, 0.0, 0.0]);
        assert!(sim.object_position("Missing").is_err());
    }

    #[test]
    fn test_shutdown_lands() {
        let mut sim = OfflineSimulator::new(["Drone1"]);
        sim.spawn_and_takeoff("Drone1", [0.0, 0.0, -3.0]).unwrap();
        sim.shutdown("Drone1").unwrap();
        assert!(!sim.is_airborne("Drone1"));
    }
}
