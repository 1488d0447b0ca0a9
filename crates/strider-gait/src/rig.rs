//! Rig setup: validates the body and limbs, wires neighbors, measures ride
//! height and seeds the starting gait.

use nalgebra::Vector3;
use strider_core::config::{LimbOverrides, LocomotionConfig};
use strider_core::error::{RigError, StriderError};
use strider_core::math::EPSILON;
use strider_core::terrain::TerrainOracle;
use strider_core::types::{BodyFrame, JointPoses, JointWeights, LimbChain, LimbId, check_weight};
use tracing::{debug, warn};

use crate::anchor::GroundAnchor;
use crate::body::center_of_mass;
use crate::collider;
use crate::limb::{LimbController, Neighbors, Reach, StepParams};
use crate::system::{JointSource, LocomotionSystem, Parts};

/// Step by which a staggered target is pulled back while out of reach.
pub const STAGGER_DECREMENT: f64 = 0.005;

// ---------------------------------------------------------------------------
// LimbSpec
// ---------------------------------------------------------------------------

/// One limb as declared by the host.
#[derive(Debug, Clone, PartialEq)]
pub struct LimbSpec {
    pub poses: JointPoses,
    pub weights: JointWeights,
    pub overrides: LimbOverrides,
    /// Explicit neighbor wiring; the pairing convention applies when unset.
    pub neighbors: Option<Neighbors>,
}

impl LimbSpec {
    pub fn new(poses: JointPoses) -> Self {
        Self {
            poses,
            weights: JointWeights::default(),
            overrides: LimbOverrides::default(),
            neighbors: None,
        }
    }

    #[must_use]
    pub const fn with_weights(mut self, weights: JointWeights) -> Self {
        self.weights = weights;
        self
    }

    #[must_use]
    pub const fn with_overrides(mut self, overrides: LimbOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    #[must_use]
    pub const fn with_neighbors(mut self, neighbors: Neighbors) -> Self {
        self.neighbors = Some(neighbors);
        self
    }
}

impl From<JointPoses> for LimbSpec {
    fn from(poses: JointPoses) -> Self {
        Self::new(poses)
    }
}

// ---------------------------------------------------------------------------
// Stagger
// ---------------------------------------------------------------------------

/// Signed forward offset for limb `index` of `count` at the start of a walk.
///
/// Magnitude grows with the index; signs run `-, +, +, -, -, +, +, -, ...` so
/// that each lateral pair starts split and consecutive pairs alternate.
#[allow(clippy::cast_precision_loss)]
pub fn stagger_offset(index: usize, count: usize, step_size: f64) -> f64 {
    let n = count.max(1) as f64;
    let magnitude = step_size / (2.0 * n) + step_size / (4.0 * n) * index as f64;
    if (index + 1) / 2 % 2 == 1 {
        magnitude
    } else {
        -magnitude
    }
}

fn stagger(body: &BodyFrame, limbs: &[LimbController], anchors: &mut [GroundAnchor]) {
    let forward = body.forward();
    let count = limbs.len();
    for (i, (limb, anchor)) in limbs.iter().zip(anchors.iter_mut()).enumerate() {
        let offset = stagger_offset(i, count, limb.params().step_size);
        let sign = offset.signum();
        let base = anchor.position();
        let mut magnitude = offset.abs();
        while magnitude > 0.0
            && !matches!(limb.reach(&(base + forward * sign * magnitude)), Reach::Reachable)
        {
            magnitude -= STAGGER_DECREMENT;
        }
        let magnitude = magnitude.max(0.0);
        anchor.displace(body, &(forward * sign * magnitude));
    }
}

// ---------------------------------------------------------------------------
// RigBuilder
// ---------------------------------------------------------------------------

/// Builds a [`LocomotionSystem`] from a body, its limbs and a configuration.
#[derive(Debug, Clone)]
pub struct RigBuilder {
    config: LocomotionConfig,
    body: Option<BodyFrame>,
    limbs: Vec<LimbSpec>,
    joint_source: JointSource,
}

impl RigBuilder {
    pub fn new(config: LocomotionConfig) -> Self {
        Self {
            config,
            body: None,
            limbs: Vec::new(),
            joint_source: JointSource::Kinematic,
        }
    }

    #[must_use]
    pub fn with_body(mut self, body: BodyFrame) -> Self {
        self.body = Some(body);
        self
    }

    #[must_use]
    pub fn with_limb(mut self, limb: impl Into<LimbSpec>) -> Self {
        self.limbs.push(limb.into());
        self
    }

    #[must_use]
    pub fn with_limbs<L: Into<LimbSpec>>(mut self, limbs: impl IntoIterator<Item = L>) -> Self {
        self.limbs.extend(limbs.into_iter().map(Into::into));
        self
    }

    /// Add a limb from its bone chain, ordered from the root to the deepest joint.
    pub fn with_bone_chain(self, joints: &[Vector3<f64>]) -> Result<Self, RigError> {
        let poses = JointPoses::from_bone_chain(self.limbs.len(), joints)?;
        Ok(self.with_limb(poses))
    }

    #[must_use]
    pub const fn with_joint_source(mut self, joint_source: JointSource) -> Self {
        self.joint_source = joint_source;
        self
    }

    pub fn limb_count(&self) -> usize {
        self.limbs.len()
    }

    /// Validate and assemble. `terrain` is used to measure ride height when
    /// the configuration does not fix it.
    pub fn build(self, terrain: &dyn TerrainOracle) -> Result<LocomotionSystem, StriderError> {
        let config = self.config;
        config.validate()?;
        let body = self.body.ok_or(RigError::MissingBody)?;
        if self.limbs.is_empty() {
            return Err(RigError::NoLimbs.into());
        }
        check_weight("body", body.weight)?;
        if body.weight < EPSILON {
            return Err(RigError::BodyWeightNotPositive(body.weight).into());
        }

        let count = self.limbs.len();
        let mut limbs = Vec::with_capacity(count);
        for (i, spec) in self.limbs.into_iter().enumerate() {
            spec.weights.validate(i)?;
            spec.overrides.validate()?;
            if !spec.poses.is_finite() {
                return Err(RigError::DegenerateChain { limb: i }.into());
            }
            let neighbors = match spec.neighbors {
                Some(n) => {
                    validate_neighbors(i, count, &n)?;
                    n
                }
                None => Neighbors::conventional(i, count),
            };
            let chain = LimbChain::new(spec.poses, spec.weights);
            if chain.is_degenerate() {
                warn!(limb = i, "limb chain has zero length");
            }
            let params = StepParams {
                step_size: spec.overrides.step_size(&config),
                step_height: spec.overrides.step_height(&config),
                speed: spec.overrides.step_speed(&config),
                max_range: config.max_range_override().unwrap_or(chain.length()),
            };
            limbs.push(LimbController::new(LimbId(i), chain, neighbors, params));
        }

        let ride_height = match config.ride_height {
            Some(h) => h,
            None => measure_ride_height(&body, &limbs, config.count_tip_weight, terrain),
        };

        let mut anchors: Vec<GroundAnchor> = limbs
            .iter()
            .map(|l| GroundAnchor::new(&body, l.chain().tip(), config.anchor_mode))
            .collect();
        if config.stagger_start {
            stagger(&body, &limbs, &mut anchors);
        }

        let colliders = collider::generate(
            config.collider_generation,
            &body,
            limbs.iter().map(LimbController::chain),
        );
        debug!(limbs = count, ride_height, "rig assembled");

        Ok(LocomotionSystem::assemble(Parts {
            config,
            joint_source: self.joint_source,
            body,
            limbs,
            anchors,
            ride_height,
            colliders,
        }))
    }
}

fn validate_neighbors(limb: usize, count: usize, neighbors: &Neighbors) -> Result<(), RigError> {
    match neighbors.iter().find(|n| n.index() >= count || n.index() == limb) {
        Some(bad) => Err(RigError::InvalidNeighbor {
            limb,
            neighbor: bad.index(),
        }),
        None => Ok(()),
    }
}

fn measure_ride_height(
    body: &BodyFrame,
    limbs: &[LimbController],
    count_tip: bool,
    terrain: &dyn TerrainOracle,
) -> f64 {
    let com = center_of_mass(body, limbs.iter().map(LimbController::chain), count_tip);
    if let Some(hit) = terrain.ground_below(&com) {
        body.position.z - hit.point.z
    } else {
        warn!(?com, "no ground below the body at setup; ride height is 0");
        0.0
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use strider_core::config::ColliderGeneration;
    use strider_core::error::ConfigError;
    use strider_core::terrain::TerrainScene;
    use strider_core::presets::{GROUND_HEIGHT, quadruped_legs};

    use super::*;

    fn config() -> LocomotionConfig {
        LocomotionConfig {
            stagger_start: false,
            ..LocomotionConfig::default()
        }
    }

    fn builder(config: LocomotionConfig) -> RigBuilder {
        RigBuilder::new(config)
            .with_body(BodyFrame::default())
            .with_limbs(quadruped_legs())
    }

    #[test]
    fn stagger_signs_and_magnitudes() {
        let signs: Vec<f64> = (0..8).map(|i| stagger_offset(i, 8, 1.0).signum()).collect();
        assert_eq!(signs, vec![-1.0, 1.0, 1.0, -1.0, -1.0, 1.0, 1.0, -1.0]);
        assert_relative_eq!(stagger_offset(0, 4, 1.0), -0.125);
        assert_relative_eq!(stagger_offset(1, 4, 1.0), 0.125 + 0.0625);
        assert_relative_eq!(stagger_offset(3, 4, 1.0), -(0.125 + 0.1875));
    }

    #[test]
    fn missing_body_is_error() {
        let terrain = TerrainScene::flat(GROUND_HEIGHT);
        let err = RigBuilder::new(config())
            .with_limbs(quadruped_legs())
            .build(&terrain)
            .unwrap_err();
        assert!(matches!(err, StriderError::Rig(RigError::MissingBody)));
    }

    #[test]
    fn no_limbs_is_error() {
        let terrain = TerrainScene::flat(GROUND_HEIGHT);
        let err = RigBuilder::new(config())
            .with_body(BodyFrame::default())
            .build(&terrain)
            .unwrap_err();
        assert!(matches!(err, StriderError::Rig(RigError::NoLimbs)));
    }

    #[test]
    fn invalid_config_is_error() {
        let terrain = TerrainScene::flat(GROUND_HEIGHT);
        let err = builder(LocomotionConfig {
            step_speed: 0.0,
            ..config()
        })
        .build(&terrain)
        .unwrap_err();
        assert!(matches!(
            err,
            StriderError::Config(ConfigError::OutOfRange { .. })
        ));
    }

    #[test]
    fn invalid_weight_is_error() {
        let terrain = TerrainScene::flat(GROUND_HEIGHT);
        let legs = quadruped_legs();
        let err = RigBuilder::new(config())
            .with_body(BodyFrame::default())
            .with_limb(LimbSpec::new(legs[0]).with_weights(JointWeights::uniform(12.0)))
            .build(&terrain)
            .unwrap_err();
        assert!(matches!(
            err,
            StriderError::Rig(RigError::WeightOutOfRange { .. })
        ));
    }

    #[test]
    fn weightless_body_is_error() {
        let terrain = TerrainScene::flat(GROUND_HEIGHT);
        let err = RigBuilder::new(config())
            .with_body(BodyFrame::default().with_weight(0.0))
            .with_limbs(quadruped_legs())
            .build(&terrain)
            .unwrap_err();
        assert!(matches!(
            err,
            StriderError::Rig(RigError::BodyWeightNotPositive(_))
        ));

        let system = RigBuilder::new(config())
            .with_body(BodyFrame::default().with_weight(0.5))
            .with_limbs(quadruped_legs())
            .build(&terrain)
            .unwrap();
        assert_relative_eq!(system.body().weight, 0.5);
    }

    #[test]
    fn bad_neighbor_is_error() {
        let terrain = TerrainScene::flat(GROUND_HEIGHT);
        let legs = quadruped_legs();
        let neighbors = Neighbors {
            opposite: Some(LimbId(7)),
            ..Neighbors::default()
        };
        let err = RigBuilder::new(config())
            .with_body(BodyFrame::default())
            .with_limb(LimbSpec::new(legs[0]).with_neighbors(neighbors))
            .with_limb(legs[1])
            .build(&terrain)
            .unwrap_err();
        assert!(matches!(
            err,
            StriderError::Rig(RigError::InvalidNeighbor {
                limb: 0,
                neighbor: 7
            })
        ));
    }

    #[test]
    fn non_finite_pose_is_error() {
        let terrain = TerrainScene::flat(GROUND_HEIGHT);
        let mut leg = quadruped_legs()[0];
        leg.mid.x = f64::NAN;
        let err = RigBuilder::new(config())
            .with_body(BodyFrame::default())
            .with_limb(leg)
            .build(&terrain)
            .unwrap_err();
        assert!(matches!(
            err,
            StriderError::Rig(RigError::DegenerateChain { limb: 0 })
        ));
    }

    #[test]
    fn bone_chain_resolves_to_triple() {
        let joints = [
            Vector3::new(0.0, 0.5, 0.0),
            Vector3::new(0.0, 1.0, 0.0),
            Vector3::new(0.0, 1.5, 0.0),
            Vector3::new(0.0, 1.5, -0.5),
            Vector3::new(0.0, 1.5, -1.0),
        ];
        let terrain = TerrainScene::flat(GROUND_HEIGHT);
        let system = RigBuilder::new(config())
            .with_body(BodyFrame::default())
            .with_bone_chain(&joints)
            .unwrap()
            .build(&terrain)
            .unwrap();
        let chain = system.limbs()[0].chain();
        assert_relative_eq!(chain.mid(), joints[2]);
        assert_relative_eq!(chain.tip(), joints[4]);
        assert_relative_eq!(chain.length(), 2.0);
    }

    #[test]
    fn conventional_wiring_and_reach() {
        let terrain = TerrainScene::flat(GROUND_HEIGHT);
        let system = builder(config()).build(&terrain).unwrap();
        assert_eq!(system.limb_count(), 4);
        let limb = &system.limbs()[2];
        assert_eq!(limb.neighbors().opposite, Some(LimbId(3)));
        assert_eq!(limb.neighbors().behind, Some(LimbId(0)));
        assert_relative_eq!(limb.params().max_range, 2.0);

        let system = builder(LocomotionConfig {
            max_range: Some(3.0),
            ..config()
        })
        .build(&terrain)
        .unwrap();
        assert_relative_eq!(system.limbs()[0].params().max_range, 3.0);
    }

    #[test]
    fn per_limb_step_size_override() {
        let terrain = TerrainScene::flat(GROUND_HEIGHT);
        let legs = quadruped_legs();
        let system = RigBuilder::new(config())
            .with_body(BodyFrame::default())
            .with_limb(LimbSpec::new(legs[0]).with_overrides(LimbOverrides::default().with_step_size(0.3)))
            .with_limb(LimbSpec::new(legs[1]).with_overrides(LimbOverrides::default().with_step_size(-1.0)))
            .build(&terrain)
            .unwrap();
        assert_relative_eq!(system.limbs()[0].params().step_size, 0.3);
        assert_relative_eq!(system.limbs()[1].params().step_size, 1.0);
    }

    #[test]
    fn out_of_range_limb_overrides_are_rejected() {
        let terrain = TerrainScene::flat(GROUND_HEIGHT);
        let legs = quadruped_legs();
        let build = |overrides: LimbOverrides| {
            RigBuilder::new(config())
                .with_body(BodyFrame::default())
                .with_limb(LimbSpec::new(legs[0]).with_overrides(overrides))
                .with_limb(legs[1])
                .build(&terrain)
        };

        let err = build(LimbOverrides::default().with_step_height(0.0)).unwrap_err();
        assert!(matches!(
            err,
            StriderError::Config(ConfigError::OutOfRange {
                field: "overrides.step_height",
                ..
            })
        ));
        let err = build(LimbOverrides::default().with_step_speed(80.0)).unwrap_err();
        assert!(matches!(
            err,
            StriderError::Config(ConfigError::OutOfRange {
                field: "overrides.step_speed",
                ..
            })
        ));

        let system = build(LimbOverrides::default().with_step_height(0.2).with_step_speed(8.0)).unwrap();
        assert_relative_eq!(system.limbs()[0].params().step_height, 0.2);
        assert_relative_eq!(system.limbs()[0].params().speed, 8.0);
    }

    #[test]
    fn ride_height_measured_or_configured() {
        let terrain = TerrainScene::flat(GROUND_HEIGHT);
        let system = builder(config()).build(&terrain).unwrap();
        assert_relative_eq!(system.solver().ride_height(), -GROUND_HEIGHT, epsilon = 1e-12);

        let system = builder(LocomotionConfig {
            ride_height: Some(0.7),
            ..config()
        })
        .build(&terrain)
        .unwrap();
        assert_relative_eq!(system.solver().ride_height(), 0.7);

        let system = builder(config()).build(&TerrainScene::new()).unwrap();
        assert_relative_eq!(system.solver().ride_height(), 0.0);
    }

    #[test]
    fn stagger_offsets_initial_targets() {
        let terrain = TerrainScene::flat(GROUND_HEIGHT);
        let staggered = builder(LocomotionConfig::default()).build(&terrain).unwrap();
        let plain = builder(config()).build(&terrain).unwrap();
        for i in 0..4 {
            let id = LimbId(i);
            let delta = staggered.target(id).unwrap() - plain.target(id).unwrap();
            assert_relative_eq!(delta.x, stagger_offset(i, 4, 1.0), epsilon = 1e-12);
            assert_relative_eq!(delta.y, 0.0);
        }
    }

    #[test]
    fn stagger_is_pulled_back_into_reach() {
        let terrain = TerrainScene::flat(GROUND_HEIGHT);
        let system = builder(LocomotionConfig {
            max_range: Some(1.42),
            ..LocomotionConfig::default()
        })
        .build(&terrain)
        .unwrap();
        for limb in system.limbs() {
            let target = system.target(limb.id()).unwrap();
            assert!((limb.chain().root() - target).norm() <= 1.42 + 1e-9);
        }
    }

    #[test]
    fn colliders_follow_configuration() {
        let terrain = TerrainScene::flat(GROUND_HEIGHT);
        let system = builder(LocomotionConfig {
            collider_generation: ColliderGeneration::EachLimb,
            ..config()
        })
        .build(&terrain)
        .unwrap();
        assert_eq!(system.colliders().len(), 8);
        let system = builder(config()).build(&terrain).unwrap();
        assert!(system.colliders().is_empty());
    }
}
