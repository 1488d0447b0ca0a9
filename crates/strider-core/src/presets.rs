//! Ready-made rigs and terrains.
//!
//! Every preset leg has a horizontal upper segment and a vertical lower
//! segment of length 1, so its chain length is 2 and its foot rests on
//! [`GROUND_HEIGHT`] when the body sits at the origin. The terrains are sized
//! for those rigs.

use nalgebra::Vector3;

use crate::terrain::{Aabb, Plane, SurfaceTag, TerrainScene};
use crate::types::JointPoses;

/// Height of the ground plane under a body at the origin.
pub const GROUND_HEIGHT: f64 = -1.0;

/// Lateral offset of a leg root from the body center line.
pub const HIP_WIDTH: f64 = 0.5;

/// Lateral offset of knee and foot from the body center line.
pub const FOOT_WIDTH: f64 = 1.5;

/// Distance between consecutive leg pairs along the body.
pub const PAIR_SPACING: f64 = 1.0;

/// Half-size of the finite slabs used by the terrains.
const EXTENT: f64 = 100.0;

// ---------------------------------------------------------------------------
// Rigs
// ---------------------------------------------------------------------------

/// One leg at longitudinal offset `x`; `side` is `1.0` for left, `-1.0` for right.
pub fn leg(x: f64, side: f64) -> JointPoses {
    JointPoses::new(
        Vector3::new(x, HIP_WIDTH * side, 0.0),
        Vector3::new(x, FOOT_WIDTH * side, 0.0),
        Vector3::new(x, FOOT_WIDTH * side, GROUND_HEIGHT),
    )
}

/// `pairs` lateral pairs centered on the origin, back to front, left before right.
#[allow(clippy::cast_precision_loss)]
pub fn n_pedal_legs(pairs: usize) -> Vec<JointPoses> {
    let center = (pairs.max(1) - 1) as f64 / 2.0;
    (0..pairs)
        .flat_map(|k| {
            let x = (k as f64 - center) * PAIR_SPACING;
            [leg(x, 1.0), leg(x, -1.0)]
        })
        .collect()
}

pub fn quadruped_legs() -> Vec<JointPoses> {
    n_pedal_legs(2)
}

pub fn hexapod_legs() -> Vec<JointPoses> {
    n_pedal_legs(3)
}

// ---------------------------------------------------------------------------
// Terrains
// ---------------------------------------------------------------------------

pub fn flat() -> TerrainScene {
    TerrainScene::flat(GROUND_HEIGHT)
}

/// Ground rising by `grade_x` per unit of x and `grade_y` per unit of y.
pub fn slope(grade_x: f64, grade_y: f64) -> TerrainScene {
    TerrainScene::new().with_plane(Plane::slope(GROUND_HEIGHT, grade_x, grade_y))
}

/// Ground that ends at `edge_x`, with a floor `depth` below it beyond the edge.
pub fn ledge(edge_x: f64, depth: f64) -> TerrainScene {
    TerrainScene::new()
        .with_box(Aabb::new(
            Vector3::new(-EXTENT, -EXTENT, GROUND_HEIGHT - depth),
            Vector3::new(edge_x, EXTENT, GROUND_HEIGHT),
            SurfaceTag::Ground,
        ))
        .with_plane(Plane::horizontal(GROUND_HEIGHT - depth))
}

/// Flat ground with an untraversable wall of the given thickness starting at `x`.
pub fn wall(x: f64, thickness: f64) -> TerrainScene {
    flat().with_box(Aabb::new(
        Vector3::new(x, -EXTENT, GROUND_HEIGHT),
        Vector3::new(x + thickness, EXTENT, GROUND_HEIGHT + 3.0),
        SurfaceTag::Untraversable,
    ))
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::terrain::TerrainOracle;

    #[test]
    fn quadruped_layout() {
        let legs = quadruped_legs();
        assert_eq!(legs.len(), 4);
        assert_relative_eq!(legs[0].root, Vector3::new(-0.5, 0.5, 0.0));
        assert_relative_eq!(legs[1].root, Vector3::new(-0.5, -0.5, 0.0));
        assert_relative_eq!(legs[3].tip, Vector3::new(0.5, -1.5, -1.0));
    }

    #[test]
    fn legs_have_unit_segments() {
        for poses in hexapod_legs() {
            assert_relative_eq!(poses.chain_length(), 2.0);
        }
    }

    #[test]
    fn pairs_run_back_to_front() {
        let legs = n_pedal_legs(3);
        assert_eq!(legs.len(), 6);
        assert!(legs[0].tip.y > 0.0 && legs[1].tip.y < 0.0);
        assert_relative_eq!(legs[4].root.x - legs[0].root.x, 2.0 * PAIR_SPACING);
        assert!(n_pedal_legs(0).is_empty());
    }

    #[test]
    fn feet_rest_on_flat_ground() {
        let scene = flat();
        for poses in quadruped_legs() {
            let hit = scene.ground_below(&(poses.tip + Vector3::z())).unwrap();
            assert_relative_eq!(hit.point, poses.tip, epsilon = 1e-12);
        }
    }

    #[test]
    fn ledge_drops_past_edge() {
        let scene = ledge(1.0, 3.0);
        let near = scene.ground_below(&Vector3::new(0.0, 0.0, 0.0)).unwrap();
        assert_relative_eq!(near.point.z, GROUND_HEIGHT, epsilon = 1e-12);
        let far = scene.ground_below(&Vector3::new(2.0, 0.0, 0.0)).unwrap();
        assert_relative_eq!(far.point.z, GROUND_HEIGHT - 3.0, epsilon = 1e-12);
    }

    #[test]
    fn wall_obstructs_crossing() {
        let scene = wall(1.0, 0.2);
        assert!(scene.is_obstructed(&Vector3::zeros(), &Vector3::new(2.0, 0.0, -0.5)));
        assert!(!scene.is_obstructed(&Vector3::zeros(), &Vector3::new(0.8, 0.0, -0.5)));
    }

    #[test]
    fn slope_rises_along_both_grades() {
        let scene = slope(0.25, 0.0);
        let hit = scene.ground_below(&Vector3::new(2.0, 0.0, 5.0)).unwrap();
        assert_relative_eq!(hit.point.z, GROUND_HEIGHT + 0.5, epsilon = 1e-12);

        let scene = slope(0.0, 0.25);
        let hit = scene.ground_below(&Vector3::new(0.0, 2.0, 5.0)).unwrap();
        assert_relative_eq!(hit.point.z, GROUND_HEIGHT + 0.5, epsilon = 1e-12);
    }
}
