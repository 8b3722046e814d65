//! Reward composition for goal seeking under jamming

use serde::{Deserialize, Serialize};

/// Coefficients of the reward terms, fixed for a training run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardWeights {
    /// Scale of the goal-distance improvement term
    pub progress: f32,

    /// Scale of the jammer term
    pub jammer_penalty: f32,

    /// Constant cost per step
    pub step_penalty: f32,

    /// Bonus when the goal radius is reached
    pub success_bonus: f32,

    /// Cost of a collision
    pub collision_penalty: f32,

    /// Cost of leaving the world bounds
    pub oob_penalty: f32,
}

impl Default for RewardWeights {
    fn default() -> Self {
        Self {
            progress: 1.0,
            jammer_penalty: 0.5,
            step_penalty: 0.01,
            success_bonus: 100.0,
            collision_penalty: 50.0,
            oob_penalty: 20.0,
        }
    }
}

/// How the jammer term is computed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JammerPenaltyMode {
    /// Linear in the depth of penetration into the jamming radius
    #[default]
    Distance,

    /// Linear in the received jammer power
    Power,
}

/// Jammer signal fed to the composer for one agent
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum JammerSignal {
    /// Distance to the nearest jammer (m)
    Distance(f32),

    /// Received power of the nearest jammer
    Power(f32),
}

/// Diagnostic record accompanying each reward
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RewardInfo {
    /// Distance to the goal after the step
    pub dist_to_goal: f32,

    /// Goal radius reached
    pub reached_goal: bool,

    /// Vehicle reported a collision
    pub collided: bool,

    /// Vehicle is outside the world bounds
    pub out_of_bounds: bool,

    /// Distance to the nearest jammer (always set in distance mode)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nearest_jammer_dist: Option<f32>,

    /// Nearest jammer power (power mode only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jammer_power: Option<f32>,

    /// Jammer term subtracted from the reward
    pub jammer_penalty: f32,
}

/// Computes scalar rewards from goal, jammer, collision and bounds signals
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RewardComposer {
    weights: RewardWeights,
    jammer_radius: f32,
    mode: JammerPenaltyMode,
}

impl RewardComposer {
    /// Create a composer
    pub fn new(weights: RewardWeights, jammer_radius: f32, mode: JammerPenaltyMode) -> Self {
        Self { weights, jammer_radius, mode }
    }

    /// Selected jammer mode
    pub fn mode(&self) -> JammerPenaltyMode {
        self.mode
    }

    /// Reward weights
    pub fn weights(&self) -> &RewardWeights {
        &self.weights
    }

    /// Jammer term for the configured mode
    ///
    /// Distance mode is zero at or beyond `jammer_radius`. Power mode is
    /// unbounded above.
    pub fn jammer_penalty(&self, signal: JammerSignal) -> f32 {
        match signal {
            JammerSignal::Distance(d) => {
                self.weights.jammer_penalty * (self.jammer_radius - d).max(0.0)
            }
            JammerSignal::Power(p) => self.weights.jammer_penalty * p,
        }
    }

    /// Reward and info for one agent at one step
    ///
    /// `prev_goal_distance` is `None` only for the first evaluation after a
    /// reset, in which case there is no progress term.
    pub fn compute(
        &self,
        prev_goal_distance: Option<f32>,
        dist_to_goal: f32,
        signal: JammerSignal,
        collided: bool,
        out_of_bounds: bool,
        reached_goal: bool,
    ) -> (f32, RewardInfo) {
        let w = &self.weights;
        let progress = prev_goal_distance.map_or(0.0, |prev| prev - dist_to_goal);
        let penalty = self.jammer_penalty(signal);

        let mut reward = w.progress * progress - penalty - w.step_penalty;
        if reached_goal {
            reward += w.success_bonus;
        }
        if collided {
            reward -= w.collision_penalty;
        }
        if out_of_bounds {
            reward -= w.oob_penalty;
        }

        let mut info = RewardInfo {
            dist_to_goal,
            reached_goal,
            collided,
            out_of_bounds,
            jammer_penalty: penalty,
            ..Default::default()
        };
        match signal {
            JammerSignal::Distance(d) => info.nearest_jammer_dist = Some(d),
            JammerSignal::Power(p) => info.jammer_power = Some(p),
        }

        (reward, info)
    }
}
