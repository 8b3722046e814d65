//! Per-agent observation assembly
//!
//! Layout (17 floats, order is part of the checkpoint contract):
//!
//! | slice   | content                          |
//! |---------|----------------------------------|
//! | 0..3    | position                         |
//! | 3..6    | linear velocity                  |
//! | 6       | yaw (radians)                    |
//! | 7..10   | goal - position                  |
//! | 10..13  | nearest jammer - position        |
//! | 13..17  | last issued action               |

use super::action::AgentAction;
use crate::utils::{Vec3, geometry::sub};

/// Width of an observation vector
pub const OBS_DIM: usize = 17;

/// Fixed-width observation for one agent
pub type AgentObservation = [f32; OBS_DIM];

/// Builds [`AgentObservation`]s from raw kinematic and jammer signals
#[derive(Debug, Clone, Copy, Default)]
pub struct ObservationBuilder;

impl ObservationBuilder {
    /// Concatenate the observation components in their fixed order
    pub fn build(
        &self,
        position: &Vec3,
        velocity: &Vec3,
        yaw: f32,
        goal: &Vec3,
        jammer_vector: &Vec3,
        last_action: &AgentAction,
    ) -> AgentObservation {
        let mut obs = [0.0; OBS_DIM];
        obs[0..3].copy_from_slice(position);
        obs[3..6].copy_from_slice(velocity);
        obs[6] = yaw;
        obs[7..10].copy_from_slice(&sub(goal, position));
        obs[10..13].copy_from_slice(jammer_vector);
        obs[13..17].copy_from_slice(&last_action.to_array());
        obs
    }
}
