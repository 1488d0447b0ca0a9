//! Core data types: limb identifiers, joint weights, limb chains and the body frame.

use std::fmt;

use nalgebra::{UnitQuaternion, Vector3};

use crate::error::RigError;
use crate::math::EPSILON;

// ---------------------------------------------------------------------------
// LimbId
// ---------------------------------------------------------------------------

/// Index of a limb within its rig.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LimbId(pub usize);

impl LimbId {
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for LimbId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "limb{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// JointWeights
// ---------------------------------------------------------------------------

pub const MIN_WEIGHT: f64 = 0.0;
pub const MAX_WEIGHT: f64 = 10.0;

/// Mass weights for the three joints of a limb.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointWeights {
    pub root: f64,
    pub mid: f64,
    pub tip: f64,
}

impl Default for JointWeights {
    fn default() -> Self {
        Self::uniform(1.0)
    }
}

impl JointWeights {
    pub const fn uniform(weight: f64) -> Self {
        Self {
            root: weight,
            mid: weight,
            tip: weight,
        }
    }

    pub fn average(&self) -> f64 {
        (self.root + self.mid + self.tip) / 3.0
    }

    /// Sum of the weights, optionally leaving out the tip.
    pub fn sum(&self, count_tip: bool) -> f64 {
        let tip = if count_tip { self.tip } else { 0.0 };
        self.root + self.mid + tip
    }

    /// Reject weights outside `[0, 10]`.
    pub fn validate(&self, limb: usize) -> Result<(), RigError> {
        for (name, value) in [("root", self.root), ("mid", self.mid), ("tip", self.tip)] {
            check_weight(&format!("limb{limb}.{name}"), value)?;
        }
        Ok(())
    }
}

pub fn check_weight(what: &str, value: f64) -> Result<(), RigError> {
    if value.is_finite() && (MIN_WEIGHT..=MAX_WEIGHT).contains(&value) {
        Ok(())
    } else {
        Err(RigError::WeightOutOfRange {
            what: what.to_owned(),
            value,
        })
    }
}

// ---------------------------------------------------------------------------
// JointPoses / LimbChain
// ---------------------------------------------------------------------------

/// World positions of a limb's root, mid and tip joints.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointPoses {
    pub root: Vector3<f64>,
    pub mid: Vector3<f64>,
    pub tip: Vector3<f64>,
}

impl JointPoses {
    pub const fn new(root: Vector3<f64>, mid: Vector3<f64>, tip: Vector3<f64>) -> Self {
        Self { root, mid, tip }
    }

    /// Resolve a bone chain ordered from the limb root to its deepest child.
    ///
    /// Root is the first joint, tip the last, mid the joint halfway down.
    pub fn from_bone_chain(limb: usize, joints: &[Vector3<f64>]) -> Result<Self, RigError> {
        if joints.len() < 3 {
            return Err(RigError::ChainTooShort {
                limb,
                joints: joints.len(),
            });
        }
        let last = joints.len() - 1;
        Ok(Self::new(joints[0], joints[last / 2], joints[last]))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Vector3<f64>> {
        [&self.root, &self.mid, &self.tip].into_iter()
    }

    pub fn is_finite(&self) -> bool {
        self.iter().all(|p| p.iter().all(|c| c.is_finite()))
    }

    /// Length of root→mid plus mid→tip.
    pub fn chain_length(&self) -> f64 {
        (self.mid - self.root).norm() + (self.tip - self.mid).norm()
    }
}

/// One limb: its joints, their weights and the reach measured at setup.
#[derive(Debug, Clone, PartialEq)]
pub struct LimbChain {
    poses: JointPoses,
    weights: JointWeights,
    length: f64,
}

impl LimbChain {
    pub fn new(poses: JointPoses, weights: JointWeights) -> Self {
        let length = poses.chain_length();
        Self {
            poses,
            weights,
            length,
        }
    }

    /// Reach measured when the chain was built. Later pose updates do not change it.
    pub const fn length(&self) -> f64 {
        self.length
    }

    pub fn is_degenerate(&self) -> bool {
        self.length < EPSILON
    }

    pub const fn poses(&self) -> &JointPoses {
        &self.poses
    }

    pub const fn weights(&self) -> &JointWeights {
        &self.weights
    }

    pub const fn root(&self) -> Vector3<f64> {
        self.poses.root
    }

    pub const fn mid(&self) -> Vector3<f64> {
        self.poses.mid
    }

    pub const fn tip(&self) -> Vector3<f64> {
        self.poses.tip
    }

    pub fn set_poses(&mut self, poses: JointPoses) {
        self.poses = poses;
    }

    pub fn set_tip(&mut self, tip: Vector3<f64>) {
        self.poses.tip = tip;
    }

    /// Weighted sum of joint positions, paired with the weight it carries.
    pub fn weighted_sum(&self, count_tip: bool) -> (Vector3<f64>, f64) {
        let w = &self.weights;
        let mut sum = self.poses.root * w.root + self.poses.mid * w.mid;
        if count_tip {
            sum += self.poses.tip * w.tip;
        }
        (sum, w.sum(count_tip))
    }
}

// ---------------------------------------------------------------------------
// BodyFrame
// ---------------------------------------------------------------------------

/// Pose and weight of the body the limbs hang from.
///
/// Orientation is yaw about world Z, then pitch about the body's Y, then
/// roll about its X. Positive pitch lowers the nose; positive roll raises
/// the left side.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyFrame {
    pub position: Vector3<f64>,
    pub yaw: f64,
    pub pitch: f64,
    pub roll: f64,
    pub weight: f64,
}

impl Default for BodyFrame {
    fn default() -> Self {
        Self {
            position: Vector3::zeros(),
            yaw: 0.0,
            pitch: 0.0,
            roll: 0.0,
            weight: 1.0,
        }
    }
}

impl BodyFrame {
    pub fn new(position: Vector3<f64>) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn with_yaw(mut self, yaw: f64) -> Self {
        self.yaw = yaw;
        self
    }

    #[must_use]
    pub const fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    /// Full orientation including tilt.
    pub fn rotation(&self) -> UnitQuaternion<f64> {
        UnitQuaternion::from_euler_angles(self.roll, self.pitch, self.yaw)
    }

    /// Yaw-only orientation.
    pub fn heading(&self) -> UnitQuaternion<f64> {
        UnitQuaternion::from_euler_angles(0.0, 0.0, self.yaw)
    }

    /// Horizontal forward direction.
    pub fn forward(&self) -> Vector3<f64> {
        Vector3::new(self.yaw.cos(), self.yaw.sin(), 0.0)
    }

    /// Horizontal left direction.
    pub fn left(&self) -> Vector3<f64> {
        Vector3::new(-self.yaw.sin(), self.yaw.cos(), 0.0)
    }

    /// Tilted up axis of the body.
    pub fn up(&self) -> Vector3<f64> {
        self.rotation() * Vector3::z()
    }

    /// Express a world point in the body's full frame.
    pub fn to_local(&self, world: &Vector3<f64>) -> Vector3<f64> {
        self.rotation().inverse() * (world - self.position)
    }

    pub fn to_world(&self, local: &Vector3<f64>) -> Vector3<f64> {
        self.position + self.rotation() * local
    }

    /// Express a world point in the yaw-only frame.
    pub fn to_heading_local(&self, world: &Vector3<f64>) -> Vector3<f64> {
        self.heading().inverse() * (world - self.position)
    }

    pub fn heading_to_world(&self, local: &Vector3<f64>) -> Vector3<f64> {
        self.position + self.heading() * local
    }
}
