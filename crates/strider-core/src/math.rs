//! Small geometric helpers shared by the controller.
//!
//! World frame: Z up, X forward at zero yaw, Y to the left. Horizontal
//! angles are in degrees, counter-clockwise positive when seen from above.

use nalgebra::{Unit, Vector3};
use serde::{Deserialize, Serialize};

/// Below this length a vector is treated as zero.
pub const EPSILON: f64 = 1e-9;

/// World down as a unit direction, for terrain queries.
pub fn down_axis() -> Unit<Vector3<f64>> {
    Unit::new_unchecked(Vector3::new(0.0, 0.0, -1.0))
}

/// Project onto the horizontal plane.
pub fn flatten(v: &Vector3<f64>) -> Vector3<f64> {
    Vector3::new(v.x, v.y, 0.0)
}

/// Signed horizontal angle from `from` to `to`, in degrees.
///
/// Returns `None` when either vector has no horizontal component.
pub fn signed_angle_deg(from: &Vector3<f64>, to: &Vector3<f64>) -> Option<f64> {
    let f = flatten(from);
    let t = flatten(to);
    if f.norm() < EPSILON || t.norm() < EPSILON {
        return None;
    }
    let cross = f.x * t.y - f.y * t.x;
    let dot = f.x * t.x + f.y * t.y;
    Some(cross.atan2(dot).to_degrees())
}

/// Wrap an angle in degrees into `(-180, 180]`.
pub fn wrap_degrees(angle: f64) -> f64 {
    let a = angle % 360.0;
    if a <= -180.0 {
        a + 360.0
    } else if a > 180.0 {
        a - 360.0
    } else {
        a
    }
}

/// Wrap an angle in radians into `(-pi, pi]`.
pub fn wrap_radians(angle: f64) -> f64 {
    wrap_degrees(angle.to_degrees()).to_radians()
}

pub fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

/// Critically damped approach of `current` toward `target`.
///
/// `velocity` carries state between calls. The result never overshoots.
pub fn smooth_damp(current: f64, target: f64, velocity: &mut f64, smooth_time: f64, dt: f64) -> f64 {
    if dt <= 0.0 {
        return current;
    }
    let smooth_time = smooth_time.max(1e-4);
    let omega = 2.0 / smooth_time;
    let x = omega * dt;
    let decay = 1.0 / (1.0 + x + 0.48 * x * x + 0.235 * x * x * x);
    let change = current - target;
    let temp = (*velocity + omega * change) * dt;
    *velocity = (*velocity - omega * temp) * decay;
    let output = target + (change + temp) * decay;

    if (target - current > 0.0) == (output > target) {
        *velocity = 0.0;
        return target;
    }
    output
}

/// [`smooth_damp`] for angles in radians, taking the short way round.
pub fn smooth_damp_angle(
    current: f64,
    target: f64,
    velocity: &mut f64,
    smooth_time: f64,
    dt: f64,
) -> f64 {
    let target = current + wrap_radians(target - current);
    smooth_damp(current, target, velocity, smooth_time, dt)
}

// ---------------------------------------------------------------------------
// Axis
// ---------------------------------------------------------------------------

/// A world axis, used to pick the lift direction of a swing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    X,
    Y,
    #[default]
    Z,
}

impl Axis {
    pub const fn index(self) -> usize {
        match self {
            Self::X => 0,
            Self::Y => 1,
            Self::Z => 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::f64::consts::PI;

    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn signed_angle_is_ccw_positive() {
        let fwd = Vector3::x();
        let left = Vector3::y();
        assert_relative_eq!(signed_angle_deg(&fwd, &left).unwrap(), 90.0, epsilon = 1e-12);
        assert_relative_eq!(signed_angle_deg(&left, &fwd).unwrap(), -90.0, epsilon = 1e-12);
        assert_relative_eq!(
            signed_angle_deg(&fwd, &Vector3::new(-1.0, 0.0, 0.0)).unwrap(),
            180.0,
            epsilon = 1e-12
        );
    }

    #[test]
    fn signed_angle_ignores_height() {
        let a = signed_angle_deg(&Vector3::x(), &Vector3::new(1.0, 1.0, 7.0)).unwrap();
        assert_relative_eq!(a, 45.0, epsilon = 1e-12);
    }

    #[test]
    fn signed_angle_of_vertical_vector_is_none() {
        assert!(signed_angle_deg(&Vector3::x(), &Vector3::z()).is_none());
    }

    #[test]
    fn wrap_degrees_range() {
        assert_relative_eq!(wrap_degrees(190.0), -170.0);
        assert_relative_eq!(wrap_degrees(-190.0), 170.0);
        assert_relative_eq!(wrap_degrees(180.0), 180.0);
        assert_relative_eq!(wrap_degrees(-180.0), 180.0);
        assert_relative_eq!(wrap_degrees(720.0 + 30.0), 30.0);
    }

    #[test]
    fn smooth_damp_converges_without_overshoot() {
        let mut v = 0.0;
        let mut x = 0.0;
        for _ in 0..500 {
            x = smooth_damp(x, 1.0, &mut v, 0.3, 0.02);
            assert!(x <= 1.0);
        }
        assert_relative_eq!(x, 1.0, epsilon = 1e-3);
    }

    #[test]
    fn smooth_damp_zero_dt_is_identity() {
        let mut v = 0.5;
        assert_relative_eq!(smooth_damp(0.2, 1.0, &mut v, 0.3, 0.0), 0.2);
        assert_relative_eq!(v, 0.5);
    }

    #[test]
    fn smooth_damp_angle_takes_short_way() {
        let mut v = 0.0;
        let start = 170.0_f64.to_radians();
        let target = -170.0_f64.to_radians();
        let next = smooth_damp_angle(start, target, &mut v, 0.3, 0.02);
        // Heading through 180, not back through 0.
        assert!(next > start);
        assert!(next < PI + 0.2);
    }

    #[test]
    fn axis_index() {
        assert_eq!(Axis::X.index(), 0);
        assert_eq!(Axis::Z.index(), 2);
        assert_eq!(Axis::default(), Axis::Z);
    }
}
