//! Body solver: center of mass, corrective tilt and ride height.
//!
//! Every tick the solver recomputes the weighted center of mass of the body
//! and its limbs, derives a pitch and roll that follow the terrain under the
//! limb tips, and blends the body toward that pose. Tilt is held while any
//! limb is in the air; height only moves once the tilt has converged.

use nalgebra::Vector3;
use strider_core::math::EPSILON;
use strider_core::terrain::TerrainOracle;
use strider_core::types::{BodyFrame, LimbChain};
use tracing::warn;

/// Height error below which the body snaps to its target.
pub const POSITION_TOLERANCE: f64 = 0.05;

/// Tilt error, in degrees, below which the body snaps to its target.
pub const ANGLE_TOLERANCE_DEG: f64 = 1.1;

// ---------------------------------------------------------------------------
// Center of mass
// ---------------------------------------------------------------------------

/// Body weight plus the weight of every limb joint counted toward the CoM.
///
/// Never returns less than [`EPSILON`].
pub fn total_weight<'a>(
    body_weight: f64,
    chains: impl IntoIterator<Item = &'a LimbChain>,
    count_tip: bool,
) -> f64 {
    let total = body_weight
        + chains
            .into_iter()
            .map(|c| c.weights().sum(count_tip))
            .sum::<f64>();
    if total <= EPSILON {
        warn!(total, "total weight is not positive; clamping");
        return EPSILON;
    }
    total
}

/// Weighted average of the body position and every limb joint.
pub fn center_of_mass<'a>(
    body: &BodyFrame,
    chains: impl IntoIterator<Item = &'a LimbChain> + Clone,
    count_tip: bool,
) -> Vector3<f64> {
    let total = total_weight(body.weight, chains.clone(), count_tip);
    let sum = chains
        .into_iter()
        .fold(body.position * body.weight, |acc, chain| {
            acc + chain.weighted_sum(count_tip).0
        });
    sum / total
}

// ---------------------------------------------------------------------------
// Tilt
// ---------------------------------------------------------------------------

/// Unsigned tilt implied by two tips, or zero below `threshold`.
///
/// The tips form a right triangle whose legs are their height difference
/// and their horizontal separation; the smaller of its two acute angles is
/// returned.
pub fn pair_tilt(a: &Vector3<f64>, b: &Vector3<f64>, threshold: f64) -> f64 {
    let rise = (a.z - b.z).abs();
    if rise < threshold {
        return 0.0;
    }
    let run = Vector3::new(a.x - b.x, a.y - b.y, 0.0).norm();
    let hyp = rise.hypot(run);
    if hyp < EPSILON {
        return 0.0;
    }
    let theta = (rise / hyp).clamp(-1.0, 1.0).asin();
    let gamma = (run / hyp).clamp(-1.0, 1.0).asin();
    theta.min(gamma)
}

/// Pitch contribution of a pair: negative (nose up) when the forward tip is higher.
pub fn pitch_contribution(
    a: &Vector3<f64>,
    b: &Vector3<f64>,
    forward: &Vector3<f64>,
    threshold: f64,
) -> f64 {
    let tilt = pair_tilt(a, b, threshold);
    if tilt <= 0.0 {
        return 0.0;
    }
    let (front, back) = if (a - b).dot(forward) >= 0.0 { (a, b) } else { (b, a) };
    if front.z > back.z { -tilt } else { tilt }
}

/// Roll contribution of a pair: positive when the left tip is higher.
pub fn roll_contribution(
    a: &Vector3<f64>,
    b: &Vector3<f64>,
    left: &Vector3<f64>,
    threshold: f64,
) -> f64 {
    let tilt = pair_tilt(a, b, threshold);
    if tilt <= 0.0 {
        return 0.0;
    }
    let (port, starboard) = if (a - b).dot(left) >= 0.0 { (a, b) } else { (b, a) };
    if port.z > starboard.z { tilt } else { -tilt }
}

/// Target `(pitch, roll)` from the limb tips, in radians.
///
/// Pitch pairs are `(i, i + 2)`, roll pairs `(i, i + 1)` for even `i`.
pub fn target_tilt(tips: &[Vector3<f64>], body: &BodyFrame, threshold: f64) -> (f64, f64) {
    let forward = body.forward();
    let left = body.left();

    let pitch: Vec<f64> = tips
        .iter()
        .zip(tips.iter().skip(2))
        .map(|(a, b)| pitch_contribution(a, b, &forward, threshold))
        .collect();
    let roll: Vec<f64> = tips
        .chunks_exact(2)
        .map(|pair| roll_contribution(&pair[0], &pair[1], &left, threshold))
        .collect();
    (mean(&pitch), mean(&roll))
}

#[allow(clippy::cast_precision_loss)]
fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

// ---------------------------------------------------------------------------
// BodySolver
// ---------------------------------------------------------------------------

/// Result of one solver step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyUpdate {
    pub center_of_mass: Vector3<f64>,
    pub target_pitch: Option<f64>,
    pub target_roll: Option<f64>,
    pub target_height: Option<f64>,
    pub rotating: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BodySolver {
    realignment_speed: f64,
    realignment_threshold: f64,
    count_tip_weight: bool,
    ride_height: f64,
    center_of_mass: Vector3<f64>,
    rotating: bool,
}

impl BodySolver {
    pub fn new(realignment_speed: f64, realignment_threshold: f64, ride_height: f64) -> Self {
        Self {
            realignment_speed,
            realignment_threshold,
            count_tip_weight: true,
            ride_height,
            center_of_mass: Vector3::zeros(),
            rotating: false,
        }
    }

    #[must_use]
    pub const fn with_count_tip_weight(mut self, count_tip_weight: bool) -> Self {
        self.count_tip_weight = count_tip_weight;
        self
    }

    pub const fn center_of_mass(&self) -> Vector3<f64> {
        self.center_of_mass
    }

    pub const fn ride_height(&self) -> f64 {
        self.ride_height
    }

    pub const fn count_tip_weight(&self) -> bool {
        self.count_tip_weight
    }

    /// True while the body is still blending toward its target tilt.
    pub const fn is_rotating(&self) -> bool {
        self.rotating
    }

    /// Recompute the CoM without moving the body.
    pub fn refresh<'a>(
        &mut self,
        body: &BodyFrame,
        chains: impl IntoIterator<Item = &'a LimbChain> + Clone,
    ) -> Vector3<f64> {
        self.center_of_mass = center_of_mass(body, chains, self.count_tip_weight);
        self.center_of_mass
    }

    /// Blend factor for one tick.
    pub fn blend(&self, body_weight: f64, dt: f64) -> f64 {
        (dt * self.realignment_speed / body_weight.max(EPSILON)).clamp(0.0, 1.0)
    }

    pub fn reset(&mut self) {
        self.rotating = false;
        self.center_of_mass = Vector3::zeros();
    }

    /// Move `body` one tick toward the pose implied by the limbs and terrain.
    pub fn step<'a>(
        &mut self,
        body: &mut BodyFrame,
        chains: impl IntoIterator<Item = &'a LimbChain> + Clone,
        tips: &[Vector3<f64>],
        any_swinging: bool,
        terrain: &dyn TerrainOracle,
        dt: f64,
    ) -> BodyUpdate {
        let com = self.refresh(body, chains);
        let mut update = BodyUpdate {
            center_of_mass: com,
            target_pitch: None,
            target_roll: None,
            target_height: None,
            rotating: false,
        };
        let Some(ground) = terrain.ground_below(&com) else {
            self.rotating = false;
            return update;
        };
        let t = self.blend(body.weight, dt);

        self.rotating = false;
        if !any_swinging {
            let (pitch, roll) = target_tilt(tips, body, self.realignment_threshold);
            let error = (pitch - body.pitch).abs().max((roll - body.roll).abs());
            if error.to_degrees() > ANGLE_TOLERANCE_DEG {
                body.pitch += (pitch - body.pitch) * t;
                body.roll += (roll - body.roll) * t;
                self.rotating = true;
            } else {
                body.pitch = pitch;
                body.roll = roll;
            }
            update.target_pitch = Some(pitch);
            update.target_roll = Some(roll);
        }
        update.rotating = self.rotating;

        if !self.rotating {
            let height = ground.point.z + self.ride_height;
            if (height - body.position.z).abs() > POSITION_TOLERANCE {
                body.position.z += (height - body.position.z) * t;
            } else {
                body.position.z = height;
            }
            update.target_height = Some(height);
        }
        update
    }
}
