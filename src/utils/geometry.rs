//! 3-D geometry helpers shared by the environment and simulator adapters
//!
//! Positions, velocities and offsets are plain `[f32; 3]` arrays in the
//! simulator's world frame (NED: z grows downwards).

/// A point or vector in world coordinates
pub type Vec3 = [f32; 3];

/// Axis-aligned world bounds as `[min, max]` per axis
pub type Bounds = [[f32; 2]; 3];

/// Component-wise `a - b`
pub fn sub(a: &Vec3, b: &Vec3) -> Vec3 {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

/// Euclidean norm of a vector
pub fn norm(v: &Vec3) -> f32 {
    (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt()
}

/// Euclidean distance between two points
pub fn distance(a: &Vec3, b: &Vec3) -> f32 {
    norm(&sub(a, b))
}

/// Whether `pos` lies inside `bounds` (inclusive on both ends)
pub fn in_bounds(pos: &Vec3, bounds: &Bounds) -> bool {
    pos.iter().zip(bounds.iter()).all(|(&p, &[lo, hi])| lo <= p && p <= hi)
}

/// Extract yaw (radians) from a `(w, x, y, z)` quaternion
pub fn quat_to_yaw(w: f32, x: f32, y: f32, z: f32) -> f32 {
    let siny_cosp = 2.0 * (w * z + x * y);
    let cosy_cosp = 1.0 - 2.0 * (y * y + z * z);
    siny_cosp.atan2(cosy_cosp)
}

/// Quaternion `(w, x, y, z)` for a pure rotation of `yaw` radians about z
pub fn yaw_to_quat(yaw: f32) -> [f32; 4] {
    let half = 0.5 * yaw;
    [half.cos(), 0.0, 0.0, half.sin()]
}

/// Wrap an angle in radians into `[-pi, pi]`
///
/// Terminates for any finite input, however large.
pub fn normalize_yaw(yaw: f32) -> f32 {
    use std::f32::consts::PI;

    (yaw + PI).rem_euclid(2.0 * PI) - PI
}
