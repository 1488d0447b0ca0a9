//! Ground anchor: a limb's step target, carried with the body and pinned to the terrain.
//!
//! The anchor keeps a fixed offset in the body's heading frame. Each update
//! it probes the terrain from above that point and snaps to the surface.

use nalgebra::{Unit, Vector3};
use strider_core::config::AnchorMode;
use strider_core::math::{EPSILON, down_axis};
use strider_core::terrain::TerrainOracle;
use strider_core::types::BodyFrame;
use tracing::trace;

/// How far above the candidate the downward probe starts.
pub const PROBE_HEIGHT: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnchorOutcome {
    Projected,
    /// Projected, then pulled back inside the limb's reach.
    Clamped,
    /// No surface below; the previous position stands.
    Missed,
    /// The body is realigning; nothing was updated.
    Suspended,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroundAnchor {
    local: Vector3<f64>,
    ground_point: Vector3<f64>,
    position: Vector3<f64>,
    mode: AnchorMode,
    clamp_pending: bool,
}

impl GroundAnchor {
    /// Anchor at world `position`, remembering its offset from `body`.
    pub fn new(body: &BodyFrame, position: Vector3<f64>, mode: AnchorMode) -> Self {
        Self {
            local: body.to_heading_local(&position),
            ground_point: position,
            position,
            mode,
            clamp_pending: false,
        }
    }

    /// Published target: the ground point, clamped to reach when requested.
    pub const fn position(&self) -> Vector3<f64> {
        self.position
    }

    /// Last terrain projection, never clamped.
    pub const fn ground_point(&self) -> Vector3<f64> {
        self.ground_point
    }

    pub const fn local_offset(&self) -> Vector3<f64> {
        self.local
    }

    /// Move the anchor by a world-space delta.
    pub fn displace(&mut self, body: &BodyFrame, delta: &Vector3<f64>) {
        self.ground_point += delta;
        self.position += delta;
        self.local = body.to_heading_local(&self.ground_point);
    }

    /// Clamp the next update to the limb's reach.
    pub fn request_clamp(&mut self) {
        self.clamp_pending = true;
    }

    pub fn update(
        &mut self,
        body: &BodyFrame,
        root: &Vector3<f64>,
        reach: f64,
        suspended: bool,
        terrain: &dyn TerrainOracle,
    ) -> AnchorOutcome {
        if suspended {
            return AnchorOutcome::Suspended;
        }
        let candidate = body.heading_to_world(&self.local);
        let down = match self.mode {
            AnchorMode::Geometric => down_axis(),
            AnchorMode::Local => Unit::new_normalize(-body.up()),
        };
        let origin = candidate - down.into_inner() * PROBE_HEIGHT;
        let Some(hit) = terrain.raycast(&origin, &down, f64::INFINITY) else {
            trace!(?candidate, "no ground under step target");
            return AnchorOutcome::Missed;
        };
        self.ground_point = hit.point;
        self.position = hit.point;

        if !std::mem::take(&mut self.clamp_pending) {
            return AnchorOutcome::Projected;
        }
        let offset = hit.point - root;
        let distance = offset.norm();
        if distance > reach && distance > EPSILON {
            self.position = root + offset * (reach / distance);
        }
        AnchorOutcome::Clamped
    }
}
