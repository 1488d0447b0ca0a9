//! Mock terrain oracles.

use std::sync::atomic::{AtomicUsize, Ordering};

use nalgebra::{Unit, Vector3};
use strider_core::terrain::{RayHit, TerrainOracle};

// ---------------------------------------------------------------------------
// VoidTerrain
// ---------------------------------------------------------------------------

/// Terrain with no surfaces: every query misses.
#[derive(Debug, Clone, Copy, Default)]
pub struct VoidTerrain;

impl TerrainOracle for VoidTerrain {
    fn raycast(&self, _: &Vector3<f64>, _: &Unit<Vector3<f64>>, _: f64) -> Option<RayHit> {
        None
    }

    fn linecast_all(&self, _: &Vector3<f64>, _: &Vector3<f64>) -> Vec<RayHit> {
        Vec::new()
    }
}

// ---------------------------------------------------------------------------
// CountingTerrain
// ---------------------------------------------------------------------------

/// Wraps another oracle and counts the queries made against it.
#[derive(Debug, Default)]
pub struct CountingTerrain<T> {
    inner: T,
    raycasts: AtomicUsize,
    linecasts: AtomicUsize,
}

impl<T> CountingTerrain<T> {
    pub const fn new(inner: T) -> Self {
        Self {
            inner,
            raycasts: AtomicUsize::new(0),
            linecasts: AtomicUsize::new(0),
        }
    }

    pub fn raycasts(&self) -> usize {
        self.raycasts.load(Ordering::Relaxed)
    }

    pub fn linecasts(&self) -> usize {
        self.linecasts.load(Ordering::Relaxed)
    }

    pub fn reset(&self) {
        self.raycasts.store(0, Ordering::Relaxed);
        self.linecasts.store(0, Ordering::Relaxed);
    }
}

impl<T: TerrainOracle> TerrainOracle for CountingTerrain<T> {
    fn raycast(
        &self,
        origin: &Vector3<f64>,
        direction: &Unit<Vector3<f64>>,
        max_distance: f64,
    ) -> Option<RayHit> {
        self.raycasts.fetch_add(1, Ordering::Relaxed);
        self.inner.raycast(origin, direction, max_distance)
    }

    fn linecast_all(&self, a: &Vector3<f64>, b: &Vector3<f64>) -> Vec<RayHit> {
        self.linecasts.fetch_add(1, Ordering::Relaxed);
        self.inner.linecast_all(a, b)
    }
}
