//! Continuous velocity actions and their bounds

use serde::{Deserialize, Serialize};

/// Width of an action vector: `vx, vy, vz, yaw_rate`
pub const ACT_DIM: usize = 4;

/// World-frame velocity command for one vehicle
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AgentAction {
    /// Velocity along x (m/s)
    pub vx: f32,

    /// Velocity along y (m/s)
    pub vy: f32,

    /// Velocity along z (m/s, NED so negative climbs)
    pub vz: f32,

    /// Yaw rate (deg/s)
    pub yaw_rate: f32,
}

impl AgentAction {
    /// Build an action from its raw components
    pub fn new(vx: f32, vy: f32, vz: f32, yaw_rate: f32) -> Self {
        Self { vx, vy, vz, yaw_rate }
    }

    /// Build an action from a `[vx, vy, vz, yaw_rate]` slice
    ///
    /// Missing trailing components are zero.
    pub fn from_slice(values: &[f32]) -> Self {
        let get = |i: usize| values.get(i).copied().unwrap_or(0.0);
        Self::new(get(0), get(1), get(2), get(3))
    }

    /// Components in observation order
    pub fn to_array(&self) -> [f32; ACT_DIM] {
        [self.vx, self.vy, self.vz, self.yaw_rate]
    }
}

impl From<[f32; ACT_DIM]> for AgentAction {
    fn from(a: [f32; ACT_DIM]) -> Self {
        Self::new(a[0], a[1], a[2], a[3])
    }
}

/// Clamps requested actions to symmetric velocity and yaw-rate limits
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActionClipper {
    v_max: f32,
    yaw_rate_max_deg: f32,
}

impl ActionClipper {
    /// Create a clipper for `|v| <= v_max` and `|yaw_rate| <= yaw_rate_max_deg`
    pub fn new(v_max: f32, yaw_rate_max_deg: f32) -> Self {
        Self { v_max: v_max.abs(), yaw_rate_max_deg: yaw_rate_max_deg.abs() }
    }

    /// Velocity limit (m/s)
    pub fn v_max(&self) -> f32 {
        self.v_max
    }

    /// Yaw-rate limit (deg/s)
    pub fn yaw_rate_max_deg(&self) -> f32 {
        self.yaw_rate_max_deg
    }

    /// Clamp every component into bounds; non-finite components become zero
    pub fn clip(&self, requested: &AgentAction) -> AgentAction {
        let clamp = |x: f32, limit: f32| if x.is_finite() { x.clamp(-limit, limit) } else { 0.0 };
        AgentAction {
            vx: clamp(requested.vx, self.v_max),
            vy: clamp(requested.vy, self.v_max),
            vz: clamp(requested.vz, self.v_max),
            yaw_rate: clamp(requested.yaw_rate, self.yaw_rate_max_deg),
        }
    }

    /// Lower and upper bounds per component
    pub fn bounds(&self) -> ([f32; ACT_DIM], [f32; ACT_DIM]) {
        let (v, w) = (self.v_max, self.yaw_rate_max_deg);
        ([-v, -v, -v, -w], [v, v, v, w])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clip_out_of_range() {
        let clipper = ActionClipper::new(4.0, 90.0);
        let clipped = clipper.clip(&AgentAction::new(999.0, -999.0, 1.5, 400.0));

        assert_eq!(clipped.vx, 4.0);
        assert_eq!(clipped.vy, -4.0);
        assert_eq!(clipped.vz, 1.5);
        assert_eq!(clipped.yaw_rate, 90.0);
    }

    #[test]
    fn test_clip_non_finite() {
        let clipper = ActionClipper::new(4.0, 90.0);
        let clipped = clipper.clip(&AgentAction::new(f32::NAN, f32::INFINITY, -1.0, f32::NAN));

        assert_eq!(clipped, AgentAction::new(0.0, 0.0, -1.0, 0.0));
    }

    #[test]
    fn test_from_slice_pads() {
        let a = AgentAction::from_slice(&[1.0, 2.0]);
        assert_eq!(a.to_array(), [1.0, 2.0, 0.0, 0.0]);
    }

    #[test]
    fn test_bounds() {
        let (low, high) = ActionClipper::new(-4.0, 90.0).bounds();
        assert_eq!(low, [-4.0, -4.0, -4.0, -90.0]);
        assert_eq!(high, [4.0, 4.0, 4.0, 90.0]);
    }
}
