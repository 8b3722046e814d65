//! Jammer discovery and nearest-jammer queries
//!
//! Scene jammers are enumerated through the simulator adapter and their
//! positions cached. The cache is refreshed once per environment reset;
//! per-step queries only read it.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use thiserror::Error;
use tracing::{debug, warn};

use super::SimulatorAdapter;
use crate::utils::{Vec3, geometry};

/// Failure of a jammer power lookup
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TelemetryFault {
    /// The source has no reading for this jammer
    #[error("no power reading for jammer {0}")]
    Missing(String),

    /// The source could not be reached
    #[error("telemetry source unavailable: {0}")]
    Unavailable(String),
}

/// Source of per-jammer received power
pub trait JammerPowerSource {
    /// Current power of the named jammer
    fn power(&mut self, jammer: &str) -> Result<f32, TelemetryFault>;
}

/// Power readings held in memory
#[derive(Debug, Clone, Default)]
pub struct StaticPowerTable {
    powers: HashMap<String, f32>,
}

impl StaticPowerTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the power of a jammer
    pub fn with_power(mut self, jammer: impl Into<String>, power: f32) -> Self {
        self.powers.insert(jammer.into(), power);
        self
    }
}

impl JammerPowerSource for StaticPowerTable {
    fn power(&mut self, jammer: &str) -> Result<f32, TelemetryFault> {
        self.powers.get(jammer).copied().ok_or_else(|| TelemetryFault::Missing(jammer.to_string()))
    }
}

/// Caches jammer positions and answers nearest-jammer queries
pub struct JammerLocator {
    patterns: Vec<String>,
    names: Vec<String>,
    positions: BTreeMap<String, Vec3>,
    powers: HashMap<String, f32>,
    power_source: Option<Box<dyn JammerPowerSource>>,
}

impl JammerLocator {
    /// Distance reported when no jammer is known
    pub const NO_JAMMER_DISTANCE: f32 = 1e6;

    /// Create a locator for the given name patterns
    pub fn new(patterns: Vec<String>) -> Self {
        Self {
            patterns,
            names: Vec::new(),
            positions: BTreeMap::new(),
            powers: HashMap::new(),
            power_source: None,
        }
    }

    /// Attach a power source; powers are then fetched on every refresh
    pub fn with_power_source(mut self, source: Box<dyn JammerPowerSource>) -> Self {
        self.power_source = Some(source);
        self
    }

    /// Enumerate jammer objects for every pattern (sorted, deduplicated)
    pub fn discover<S: SimulatorAdapter + ?Sized>(&mut self, sim: &mut S) {
        let mut names = BTreeSet::new();
        for pattern in &self.patterns {
            match sim.list_scene_objects(pattern) {
                Ok(found) => names.extend(found),
                Err(fault) => warn!("jammer discovery for pattern {} failed: {}", pattern, fault),
            }
        }
        self.names = names.into_iter().collect();
        debug!("discovered {} jammers", self.names.len());
    }

    /// Re-read jammer positions and powers
    ///
    /// Discovery runs on the first refresh only. Jammers whose position
    /// cannot be read are skipped; failed power lookups read as zero.
    pub fn refresh<S: SimulatorAdapter + ?Sized>(&mut self, sim: &mut S) {
        self.positions.clear();
        self.powers.clear();
        if self.names.is_empty() {
            self.discover(sim);
        }

        for name in &self.names {
            match sim.object_position(name) {
                Ok(pos) => {
                    self.positions.insert(name.clone(), pos);
                }
                Err(fault) => warn!("jammer {} position unavailable: {}", name, fault),
            }
        }

        if let Some(source) = self.power_source.as_mut() {
            for name in &self.names {
                let power = source.power(name).unwrap_or_else(|fault| {
                    warn!("jammer power degraded to 0: {}", fault);
                    0.0
                });
                self.powers.insert(name.clone(), power);
            }
        }
    }

    /// Number of jammers with a known position
    pub fn jammer_count(&self) -> usize {
        self.positions.len()
    }

    /// Cached position of a jammer
    pub fn position(&self, name: &str) -> Option<Vec3> {
        self.positions.get(name).copied()
    }

    fn nearest(&self, position: &Vec3) -> Option<(&str, Vec3, f32)> {
        let mut best: Option<(&str, Vec3, f32)> = None;
        for (name, jammer) in &self.positions {
            let vec = geometry::sub(jammer, position);
            let d = geometry::norm(&vec);
            if best.is_none_or(|(_, _, best_d)| d < best_d) {
                best = Some((name.as_str(), vec, d));
            }
        }
        best
    }

    /// `(jammer - position, distance)` to the nearest jammer
    ///
    /// Returns a zero vector and [`Self::NO_JAMMER_DISTANCE`] when none is known.
    pub fn nearest_jammer_vector(&self, position: &Vec3) -> (Vec3, f32) {
        self.nearest(position)
            .map_or(([0.0; 3], Self::NO_JAMMER_DISTANCE), |(_, vec, d)| (vec, d))
    }

    /// Power of the nearest jammer, or zero when unknown
    pub fn nearest_jammer_power(&self, position: &Vec3) -> f32 {
        self.nearest(position)
            .and_then(|(name, _, _)| self.powers.get(name).copied())
            .unwrap_or(0.0)
    }
}

impl std::fmt::Debug for JammerLocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JammerLocator")
            .field("patterns", &self.patterns)
            .field("positions", &self.positions)
            .field("powers", &self.powers)
            .field("has_power_source", &self.power_source.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::OfflineSimulator;

    fn patterns() -> Vec<String> {
        vec!["Jammer*".to_string(), "BP_Jammer*".to_string()]
    }

    #[test]
    fn test_no_jammers_sentinel() {
        let mut sim = OfflineSimulator::new(["Drone1"]);
        let mut locator = JammerLocator::new(patterns());
        locator.refresh(&mut sim);

        let (vec, d) = locator.nearest_jammer_vector(&[1.0, 2.0, 3.0]);
        assert_eq!(vec, [0.0, 0.0, 0.0]);
        assert_eq!(d, JammerLocator::NO_JAMMER_DISTANCE);
        assert_eq!(locator.nearest_jammer_power(&[0.0; 3]), 0.0);
    }

    #[test]
    fn test_nearest_vector() {
        let mut sim = OfflineSimulator::new(["Drone1"])
            .with_scene_object("Jammer_A", [10.0, 0.0, -3.0])
            .with_scene_object("BP_Jammer_B", [0.0, 3.0, -3.0])
            .with_scene_object("Tree", [0.0, 0.5, -3.0]);
        let mut locator = JammerLocator::new(patterns());
        locator.refresh(&mut sim);

        assert_eq!(locator.jammer_count(), 2);
        let (vec, d) = locator.nearest_jammer_vector(&[0.0, 0.0, -3.0]);
        assert_eq!(vec, [0.0, 3.0, 0.0]);
        assert!((d - 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_power_degrades_to_zero() {
        let mut sim = OfflineSimulator::new(["Drone1"])
            .with_scene_object("Jammer_A", [1.0, 0.0, 0.0])
            .with_scene_object("Jammer_B", [-5.0, 0.0, 0.0]);
        let table = StaticPowerTable::new().with_power("Jammer_B", 7.5);
        let mut locator = JammerLocator::new(patterns()).with_power_source(Box::new(table));
        locator.refresh(&mut sim);

        assert_eq!(locator.nearest_jammer_power(&[0.0, 0.0, 0.0]), 0.0);
        assert_eq!(locator.nearest_jammer_power(&[-4.0, 0.0, 0.0]), 7.5);
    }

    #[test]
    fn test_refresh_tracks_moved_jammer() {
        let mut sim = OfflineSimulator::new(["Drone1"]).with_scene_object("Jammer_A", [1.0, 0.0, 0.0]);
        let mut locator = JammerLocator::new(patterns());
        locator.refresh(&mut sim);
        assert_eq!(locator.position("Jammer_A"), Some([1.0, 0.0, 0.0]));

        sim.set_scene_object("Jammer_A", [2.0, 0.0, 0.0]);
        assert_eq!(locator.position("Jammer_A"), Some([1.0, 0.0, 0.0]));
        locator.refresh(&mut sim);
        assert_eq!(locator.position("Jammer_A"), Some([2.0, 0.0, 0.0]));
    }
}
