//! Movement limiter.
//!
//! A limb whose target has left its reach registers an exclusion arc around
//! the direction of that target. While any arc covers the requested travel
//! direction, the body does not move.

use nalgebra::Vector3;
use strider_core::math::signed_angle_deg;
use strider_core::types::LimbId;
use tracing::debug;

/// Half-width of an exclusion arc, in degrees.
pub const ARC_HALF_WIDTH: f64 = 30.0;

/// An angular range of forbidden travel directions, relative to body forward.
///
/// Angles are in degrees, counter-clockwise positive. `(0, 0)` means no exclusion.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ExclusionArc {
    pub from: f64,
    pub to: f64,
}

impl ExclusionArc {
    pub const NONE: Self = Self { from: 0.0, to: 0.0 };

    pub const fn new(from: f64, to: f64) -> Self {
        Self { from, to }
    }

    #[allow(clippy::float_cmp)]
    pub fn is_empty(&self) -> bool {
        self.from == 0.0 && self.to == 0.0
    }

    /// Arc of ±30° around `angle`, with the endpoint nearer a multiple of 90° snapped onto it.
    pub fn around(angle: f64) -> Self {
        let snap = |a: f64| (a / 90.0).round() * 90.0;
        let mut from = angle - ARC_HALF_WIDTH;
        let mut to = angle + ARC_HALF_WIDTH;
        if (snap(from) - from).abs() < (snap(to) - to).abs() {
            from = snap(from);
        } else {
            to = snap(to);
        }
        Self { from, to }
    }

    /// Arc toward `target` as seen from the center of mass.
    ///
    /// `None` when the target is straight above or below the center of mass.
    pub fn toward(
        forward: &Vector3<f64>,
        center_of_mass: &Vector3<f64>,
        target: &Vector3<f64>,
    ) -> Option<Self> {
        signed_angle_deg(forward, &(target - center_of_mass)).map(Self::around)
    }

    /// True when `angle` (degrees from forward) falls inside the arc, ends included.
    pub fn contains(&self, angle: f64) -> bool {
        let (a, b) = (90.0 - self.from, 90.0 - self.to);
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        let d = 90.0 - angle;
        [d, d - 360.0, d + 360.0]
            .iter()
            .any(|x| (lo..=hi).contains(x))
    }
}

/// Holds one exclusion slot per limb and gates travel directions against them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MovementLimiter {
    enabled: bool,
    arcs: Vec<ExclusionArc>,
}

impl MovementLimiter {
    pub fn new(enabled: bool, limb_count: usize) -> Self {
        Self {
            enabled,
            arcs: vec![ExclusionArc::NONE; limb_count],
        }
    }

    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn arc(&self, limb: LimbId) -> ExclusionArc {
        self.arcs.get(limb.index()).copied().unwrap_or_default()
    }

    /// Register `arc` for `limb`. Returns true if the slot changed.
    pub fn set_arc(&mut self, limb: LimbId, arc: ExclusionArc) -> bool {
        let i = limb.index();
        if i >= self.arcs.len() {
            self.arcs.resize(i + 1, ExclusionArc::NONE);
        }
        if self.arcs[i] == arc {
            return false;
        }
        if !arc.is_empty() {
            debug!(%limb, from = arc.from, to = arc.to, "exclusion arc registered");
        }
        self.arcs[i] = arc;
        true
    }

    /// Clear `limb`'s slot. Returns true if it held an arc.
    pub fn clear_arc(&mut self, limb: LimbId) -> bool {
        self.set_arc(limb, ExclusionArc::NONE)
    }

    pub fn clear(&mut self) {
        self.arcs.fill(ExclusionArc::NONE);
    }

    pub fn active(&self) -> impl Iterator<Item = (LimbId, ExclusionArc)> + '_ {
        self.arcs
            .iter()
            .enumerate()
            .filter(|(_, a)| !a.is_empty())
            .map(|(i, a)| (LimbId(i), *a))
    }

    /// Whether travel at `angle` degrees from body forward is allowed.
    pub fn permits_angle(&self, angle: f64) -> bool {
        !self.enabled
            || self
                .arcs
                .iter()
                .filter(|a| !a.is_empty())
                .all(|a| !a.contains(angle))
    }

    /// Whether travel along the body-relative `direction` (x forward, y left) is allowed.
    pub fn permits(&self, direction: &Vector3<f64>) -> bool {
        match signed_angle_deg(&Vector3::x(), direction) {
            Some(angle) => self.permits_angle(angle),
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn arc_snaps_nearer_endpoint() {
        let arc = ExclusionArc::around(20.0);
        // -10 is 10 from 0; 50 is 40 from 90.
        assert_relative_eq!(arc.from, 0.0);
        assert_relative_eq!(arc.to, 50.0);

        let arc = ExclusionArc::around(-75.0);
        // -105 is 15 from -90; -45 is 45 from either multiple.
        assert_relative_eq!(arc.from, -90.0);
        assert_relative_eq!(arc.to, -45.0);
    }

    #[test]
    fn arc_tie_snaps_upper_endpoint() {
        let arc = ExclusionArc::around(45.0);
        assert_relative_eq!(arc.from, 15.0);
        assert_relative_eq!(arc.to, 90.0);
    }

    #[test]
    fn arc_toward_target() {
        let arc = ExclusionArc::toward(
            &Vector3::x(),
            &Vector3::zeros(),
            &Vector3::new(0.0, 3.0, -1.0),
        )
        .unwrap();
        // Target 90° to the left; both endpoints sit 30° from 90, so `to` snaps.
        assert_relative_eq!(arc.from, 60.0);
        assert_relative_eq!(arc.to, 90.0);
        assert!(ExclusionArc::toward(&Vector3::x(), &Vector3::zeros(), &Vector3::z()).is_none());
    }

    #[test]
    fn contains_is_inclusive() {
        let arc = ExclusionArc::new(0.0, 50.0);
        assert!(arc.contains(0.0));
        assert!(arc.contains(25.0));
        assert!(arc.contains(50.0));
        assert!(!arc.contains(50.5));
        assert!(!arc.contains(-1.0));
    }

    #[test]
    fn contains_handles_wrap() {
        let arc = ExclusionArc::new(150.0, 210.0);
        assert!(arc.contains(180.0));
        assert!(arc.contains(-170.0));
        assert!(!arc.contains(0.0));

        let arc = ExclusionArc::new(-210.0, -150.0);
        assert!(arc.contains(170.0));
        assert!(arc.contains(-180.0));
    }

    #[test]
    fn reversed_endpoints_are_normalized() {
        let arc = ExclusionArc::new(40.0, -20.0);
        assert!(arc.contains(0.0));
        assert!(!arc.contains(60.0));
    }

    #[test]
    fn disabled_limiter_permits_everything() {
        let mut limiter = MovementLimiter::new(false, 2);
        limiter.set_arc(LimbId(0), ExclusionArc::new(-30.0, 30.0));
        assert!(limiter.permits_angle(0.0));
        limiter.set_enabled(true);
        assert!(!limiter.permits_angle(0.0));
        assert!(limiter.permits_angle(90.0));
    }

    #[test]
    fn slots_set_and_clear() {
        let mut limiter = MovementLimiter::new(true, 4);
        assert!(limiter.set_arc(LimbId(2), ExclusionArc::around(0.0)));
        assert!(!limiter.set_arc(LimbId(2), ExclusionArc::around(0.0)));
        assert_eq!(limiter.active().count(), 1);
        assert!(!limiter.permits(&Vector3::new(1.0, 0.0, 0.0)));
        assert!(limiter.permits(&Vector3::new(-1.0, 0.0, 0.0)));

        assert!(limiter.clear_arc(LimbId(2)));
        assert!(!limiter.clear_arc(LimbId(2)));
        assert_eq!(limiter.arc(LimbId(2)), ExclusionArc::NONE);
        assert!(limiter.permits(&Vector3::new(1.0, 0.0, 0.0)));
    }

    #[test]
    fn slots_grow_for_unknown_limbs() {
        let mut limiter = MovementLimiter::new(true, 1);
        limiter.set_arc(LimbId(5), ExclusionArc::new(80.0, 100.0));
        assert!(!limiter.permits_angle(90.0));
        assert_eq!(limiter.arc(LimbId(9)), ExclusionArc::NONE);
    }
}
