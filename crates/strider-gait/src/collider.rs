//! Collider descriptors for hosts that want physics shapes on the rig.
//!
//! Nothing here simulates; the host turns these into colliders of its own.

use nalgebra::{Unit, Vector3};
use strider_core::config::ColliderGeneration;
use strider_core::math::EPSILON;
use strider_core::types::{BodyFrame, LimbChain, LimbId};

/// Capsule radius as a fraction of its height.
pub const CAPSULE_RADIUS_RATIO: f64 = 1.0 / 8.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ColliderDesc {
    /// One bone of a limb.
    Capsule {
        limb: LimbId,
        center: Vector3<f64>,
        axis: Unit<Vector3<f64>>,
        height: f64,
        radius: f64,
    },
    /// The whole body, axis aligned.
    Box {
        center: Vector3<f64>,
        half_extents: Vector3<f64>,
    },
}

impl ColliderDesc {
    fn bone(limb: LimbId, from: &Vector3<f64>, to: &Vector3<f64>) -> Option<Self> {
        let delta = to - from;
        let height = delta.norm();
        (height > EPSILON).then(|| Self::Capsule {
            limb,
            center: from + delta * 0.5,
            axis: Unit::new_unchecked(delta / height),
            height,
            radius: height * CAPSULE_RADIUS_RATIO,
        })
    }
}

/// Collider descriptors for `mode`, in world space at setup.
pub fn generate<'a>(
    mode: ColliderGeneration,
    body: &BodyFrame,
    chains: impl IntoIterator<Item = &'a LimbChain>,
) -> Vec<ColliderDesc> {
    match mode {
        ColliderGeneration::None => Vec::new(),
        ColliderGeneration::EachLimb => chains
            .into_iter()
            .enumerate()
            .flat_map(|(i, chain)| {
                let p = chain.poses();
                [
                    ColliderDesc::bone(LimbId(i), &p.root, &p.mid),
                    ColliderDesc::bone(LimbId(i), &p.mid, &p.tip),
                ]
            })
            .flatten()
            .collect(),
        ColliderGeneration::CompleteBody => {
            let (min, max) = chains
                .into_iter()
                .flat_map(|c| c.poses().iter().copied())
                .fold((body.position, body.position), |(lo, hi), p| {
                    (lo.inf(&p), hi.sup(&p))
                });
            // Upper half of the bounds: the body and the top of the limbs.
            let extent = max - min;
            let half_extents = Vector3::new(extent.x * 0.5, extent.y * 0.5, extent.z * 0.25);
            let center = Vector3::new(
                (min.x + max.x) * 0.5,
                (min.y + max.y) * 0.5,
                max.z - half_extents.z,
            );
            vec![ColliderDesc::Box {
                center,
                half_extents,
            }]
        }
    }
}
