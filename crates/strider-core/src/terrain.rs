//! Terrain queries.
//!
//! The controller never owns geometry. Everything it needs to know about the
//! world comes through [`TerrainOracle`], implemented by the host over its
//! physics engine, or by the analytic shapes in this module.

use nalgebra::{Unit, Vector3};

use crate::math::{EPSILON, down_axis};

/// Classification of a surface hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SurfaceTag {
    #[default]
    Ground,
    /// Limbs may not step across this surface.
    Untraversable,
}

/// Result of a ray or segment query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub point: Vector3<f64>,
    /// Surface normal, facing the query origin.
    pub normal: Vector3<f64>,
    /// Distance from the query origin.
    pub distance: f64,
    pub tag: SurfaceTag,
}

/// Read-only access to the world's surfaces.
pub trait TerrainOracle {
    /// Closest hit along `direction` within `max_distance`.
    fn raycast(
        &self,
        origin: &Vector3<f64>,
        direction: &Unit<Vector3<f64>>,
        max_distance: f64,
    ) -> Option<RayHit>;

    /// Every surface crossed by the segment `a → b`, nearest first.
    fn linecast_all(&self, a: &Vector3<f64>, b: &Vector3<f64>) -> Vec<RayHit>;

    /// First surface crossed by the segment `a → b`.
    fn linecast(&self, a: &Vector3<f64>, b: &Vector3<f64>) -> Option<RayHit> {
        self.linecast_all(a, b)
            .into_iter()
            .min_by(|x, y| x.distance.total_cmp(&y.distance))
    }

    /// True when the segment crosses an untraversable surface.
    fn is_obstructed(&self, a: &Vector3<f64>, b: &Vector3<f64>) -> bool {
        self.linecast_all(a, b)
            .iter()
            .any(|hit| hit.tag == SurfaceTag::Untraversable)
    }

    /// Surface straight below `point`.
    fn ground_below(&self, point: &Vector3<f64>) -> Option<RayHit> {
        self.raycast(point, &down_axis(), f64::INFINITY)
    }
}

// ---------------------------------------------------------------------------
// Analytic shapes
// ---------------------------------------------------------------------------

/// An infinite plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    pub point: Vector3<f64>,
    pub normal: Unit<Vector3<f64>>,
    pub tag: SurfaceTag,
}

impl Plane {
    /// Horizontal ground at height `z`.
    pub fn horizontal(z: f64) -> Self {
        Self {
            point: Vector3::new(0.0, 0.0, z),
            normal: Vector3::z_axis(),
            tag: SurfaceTag::Ground,
        }
    }

    /// Ground through `(0, 0, z)` rising by `grade_x` per unit x and `grade_y` per unit y.
    pub fn slope(z: f64, grade_x: f64, grade_y: f64) -> Self {
        Self {
            point: Vector3::new(0.0, 0.0, z),
            normal: Unit::new_normalize(Vector3::new(-grade_x, -grade_y, 1.0)),
            tag: SurfaceTag::Ground,
        }
    }

    fn raycast(&self, origin: &Vector3<f64>, dir: &Unit<Vector3<f64>>, max: f64) -> Option<RayHit> {
        let denom = self.normal.dot(&**dir);
        if denom.abs() < EPSILON {
            return None;
        }
        let t = self.normal.dot(&(self.point - origin)) / denom;
        if !(0.0..=max).contains(&t) {
            return None;
        }
        let normal = if denom > 0.0 {
            -self.normal.into_inner()
        } else {
            self.normal.into_inner()
        };
        Some(RayHit {
            point: origin + dir.into_inner() * t,
            normal,
            distance: t,
            tag: self.tag,
        })
    }
}

/// An axis-aligned box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vector3<f64>,
    pub max: Vector3<f64>,
    pub tag: SurfaceTag,
}

impl Aabb {
    pub fn new(min: Vector3<f64>, max: Vector3<f64>, tag: SurfaceTag) -> Self {
        Self {
            min: min.inf(&max),
            max: min.sup(&max),
            tag,
        }
    }

    fn contains(&self, p: &Vector3<f64>) -> bool {
        (0..3).all(|i| p[i] >= self.min[i] && p[i] <= self.max[i])
    }

    fn raycast(&self, origin: &Vector3<f64>, dir: &Unit<Vector3<f64>>, max: f64) -> Option<RayHit> {
        let mut t_near = f64::NEG_INFINITY;
        let mut t_far = f64::INFINITY;
        let mut near_axis = 0;
        let mut far_axis = 0;
        for i in 0..3 {
            if dir[i].abs() < EPSILON {
                if origin[i] < self.min[i] || origin[i] > self.max[i] {
                    return None;
                }
                continue;
            }
            let a = (self.min[i] - origin[i]) / dir[i];
            let b = (self.max[i] - origin[i]) / dir[i];
            let (lo, hi) = if a < b { (a, b) } else { (b, a) };
            if lo > t_near {
                t_near = lo;
                near_axis = i;
            }
            if hi < t_far {
                t_far = hi;
                far_axis = i;
            }
        }
        if t_far < t_near.max(0.0) {
            return None;
        }
        // From inside the box the ray reports its exit face.
        let (t, axis, sign) = if t_near >= 0.0 {
            (t_near, near_axis, -dir[near_axis].signum())
        } else {
            (t_far, far_axis, dir[far_axis].signum())
        };
        if t > max {
            return None;
        }
        let mut normal = Vector3::zeros();
        normal[axis] = sign;
        Some(RayHit {
            point: origin + dir.into_inner() * t,
            normal,
            distance: t,
            tag: self.tag,
        })
    }
}

/// A single analytic surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Surface {
    Plane(Plane),
    Box(Aabb),
}

impl Surface {
    fn raycast(&self, origin: &Vector3<f64>, dir: &Unit<Vector3<f64>>, max: f64) -> Option<RayHit> {
        match self {
            Self::Plane(p) => p.raycast(origin, dir, max),
            Self::Box(b) => b.raycast(origin, dir, max),
        }
    }

    fn contains(&self, p: &Vector3<f64>) -> bool {
        match self {
            Self::Plane(_) => false,
            Self::Box(b) => b.contains(p),
        }
    }
}

/// A collection of analytic surfaces answering terrain queries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TerrainScene {
    surfaces: Vec<Surface>,
}

impl TerrainScene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scene with a single horizontal ground plane.
    pub fn flat(z: f64) -> Self {
        Self::new().with_plane(Plane::horizontal(z))
    }

    #[must_use]
    pub fn with_plane(mut self, plane: Plane) -> Self {
        self.surfaces.push(Surface::Plane(plane));
        self
    }

    #[must_use]
    pub fn with_box(mut self, aabb: Aabb) -> Self {
        self.surfaces.push(Surface::Box(aabb));
        self
    }

    pub fn surfaces(&self) -> &[Surface] {
        &self.surfaces
    }
}

impl TerrainOracle for TerrainScene {
    fn raycast(
        &self,
        origin: &Vector3<f64>,
        direction: &Unit<Vector3<f64>>,
        max_distance: f64,
    ) -> Option<RayHit> {
        self.surfaces
            .iter()
            .filter_map(|s| s.raycast(origin, direction, max_distance))
            .min_by(|a, b| a.distance.total_cmp(&b.distance))
    }

    fn linecast_all(&self, a: &Vector3<f64>, b: &Vector3<f64>) -> Vec<RayHit> {
        let delta = b - a;
        let length = delta.norm();
        if length < EPSILON {
            return Vec::new();
        }
        let dir = Unit::new_unchecked(delta / length);
        let mut hits: Vec<RayHit> = self
            .surfaces
            .iter()
            // Segments starting inside a solid report nothing for it.
            .filter(|s| !s.contains(a))
            .filter_map(|s| s.raycast(a, &dir, length))
            .collect();
        hits.sort_by(|x, y| x.distance.total_cmp(&y.distance));
        hits
    }
}
