//! Per-limb stepping state machine.
//!
//! A limb is either planted, holding its effector on the rest anchor, or
//! swinging toward a latched landing point. Each tick a planted limb decides
//! whether its target has drifted far enough, is reachable, is not blocked by
//! a swinging neighbor and can be reached without crossing an untraversable
//! surface.

use nalgebra::Vector3;
use strider_core::math::EPSILON;
use strider_core::terrain::TerrainOracle;
use strider_core::types::{LimbChain, LimbId};
use tracing::trace;

use crate::swing::SwingRequest;

/// Fraction of the CoM→target segment checked for obstructions.
pub const TRAVERSE_FRACTION: f64 = 0.98;

/// Exponent damping the sprint multiplier's effect on swing speed.
pub const SPRINT_SWING_EXPONENT: f64 = 1.4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StepState {
    #[default]
    Planted,
    Swinging,
}

// ---------------------------------------------------------------------------
// Neighbors
// ---------------------------------------------------------------------------

/// Limbs that may not swing at the same time as this one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Neighbors {
    pub opposite: Option<LimbId>,
    pub ahead: Option<LimbId>,
    pub behind: Option<LimbId>,
}

impl Neighbors {
    /// Pairs are (left, right) at indices (2k, 2k+1); pair k+1 is ahead of pair k.
    pub fn conventional(index: usize, count: usize) -> Self {
        let in_range = |i: usize| (i < count && i != index).then_some(LimbId(i));
        let opposite = if index % 2 == 0 {
            in_range(index + 1)
        } else {
            in_range(index - 1)
        };
        Self {
            opposite,
            ahead: in_range(index + 2),
            behind: index.checked_sub(2).and_then(in_range),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = LimbId> {
        [self.opposite, self.ahead, self.behind].into_iter().flatten()
    }
}

// ---------------------------------------------------------------------------
// Step parameters
// ---------------------------------------------------------------------------

/// Gait parameters resolved for one limb.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepParams {
    pub step_size: f64,
    pub step_height: f64,
    pub speed: f64,
    /// Reach from root; chain length unless overridden.
    pub max_range: f64,
}

/// Everything a limb needs to know about the rest of the body for one decision.
pub struct StepContext<'a> {
    /// Current terrain-projected target, unclamped.
    pub target: Vector3<f64>,
    pub center_of_mass: Vector3<f64>,
    pub neighbor_swinging: bool,
    /// Sprint multiplier when sprinting is requested and enabled.
    pub sprint: Option<f64>,
    pub terrain: &'a dyn TerrainOracle,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reach {
    Reachable,
    Unreachable { distance: f64 },
}

impl Reach {
    pub const fn is_reachable(&self) -> bool {
        matches!(self, Self::Reachable)
    }
}

/// Why a planted limb did not step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Blocker {
    TooClose,
    OutOfReach,
    NeighborSwinging,
    Untraversable,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StepDecision {
    Swing(SwingRequest),
    Hold(Blocker),
}

/// Outcome of evaluating a planted limb.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LimbUpdate {
    pub reach: Reach,
    pub decision: StepDecision,
}

// ---------------------------------------------------------------------------
// LimbController
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct LimbController {
    id: LimbId,
    chain: LimbChain,
    neighbors: Neighbors,
    params: StepParams,
    effector: Vector3<f64>,
    rest: Vector3<f64>,
    state: StepState,
}

impl LimbController {
    pub fn new(id: LimbId, chain: LimbChain, neighbors: Neighbors, params: StepParams) -> Self {
        let tip = chain.tip();
        Self {
            id,
            chain,
            neighbors,
            params,
            effector: tip,
            rest: tip,
            state: StepState::Planted,
        }
    }

    pub const fn id(&self) -> LimbId {
        self.id
    }

    pub const fn chain(&self) -> &LimbChain {
        &self.chain
    }

    pub fn chain_mut(&mut self) -> &mut LimbChain {
        &mut self.chain
    }

    pub const fn neighbors(&self) -> &Neighbors {
        &self.neighbors
    }

    pub const fn params(&self) -> &StepParams {
        &self.params
    }

    /// Where the tip is being driven.
    pub const fn effector(&self) -> Vector3<f64> {
        self.effector
    }

    /// Where the limb last landed.
    pub const fn rest(&self) -> Vector3<f64> {
        self.rest
    }

    pub const fn state(&self) -> StepState {
        self.state
    }

    pub fn is_swinging(&self) -> bool {
        self.state == StepState::Swinging
    }

    /// Reachability of `target` from the limb root.
    pub fn reach(&self, target: &Vector3<f64>) -> Reach {
        let distance = (self.chain.root() - target).norm();
        if distance > self.params.max_range {
            Reach::Unreachable { distance }
        } else {
            Reach::Reachable
        }
    }

    /// Swing duration: average joint weight over (optionally sprinting) speed.
    pub fn swing_duration(&self, sprint: Option<f64>) -> f64 {
        let speed = match sprint {
            Some(multiplier) => (self.params.speed * multiplier).powf(1.0 / SPRINT_SWING_EXPONENT),
            None => self.params.speed,
        };
        self.chain.weights().average() / speed.max(EPSILON)
    }

    /// First condition that forbids stepping to `ctx.target`, checked cheapest first.
    pub fn step_blocker(&self, ctx: &StepContext<'_>, reach: Reach) -> Option<Blocker> {
        if (self.effector - ctx.target).norm() <= self.params.step_size {
            return Some(Blocker::TooClose);
        }
        if !reach.is_reachable() {
            return Some(Blocker::OutOfReach);
        }
        if ctx.neighbor_swinging {
            return Some(Blocker::NeighborSwinging);
        }
        if !is_traversable(&ctx.center_of_mass, &ctx.target, ctx.terrain) {
            return Some(Blocker::Untraversable);
        }
        None
    }

    /// Decide for this tick. Returns `None` while swinging.
    pub fn evaluate(&mut self, ctx: &StepContext<'_>) -> Option<LimbUpdate> {
        if self.is_swinging() {
            return None;
        }
        let reach = self.reach(&ctx.target);
        let decision = match self.step_blocker(ctx, reach) {
            None => {
                self.state = StepState::Swinging;
                StepDecision::Swing(SwingRequest {
                    limb: self.id,
                    start: self.effector,
                    end: ctx.target,
                    duration: self.swing_duration(ctx.sprint),
                    step_height: self.params.step_height,
                })
            }
            Some(blocker) => {
                trace!(limb = %self.id, ?blocker, "holding");
                self.effector = self.rest;
                StepDecision::Hold(blocker)
            }
        };
        Some(LimbUpdate { reach, decision })
    }

    /// Follow the swing trajectory.
    pub fn follow_swing(&mut self, position: Vector3<f64>) {
        self.effector = position;
    }

    /// Finish a swing; the landing point becomes the new rest.
    pub fn land(&mut self, position: Vector3<f64>) {
        self.state = StepState::Planted;
        self.effector = position;
        self.rest = position;
    }

    /// Put the limb back at `tip`, planted.
    pub fn reset(&mut self, chain: LimbChain) {
        let tip = chain.tip();
        self.chain = chain;
        self.effector = tip;
        self.rest = tip;
        self.state = StepState::Planted;
    }
}

/// True unless the path from the center of mass toward `target` crosses an
/// untraversable surface.
pub fn is_traversable(
    center_of_mass: &Vector3<f64>,
    target: &Vector3<f64>,
    terrain: &dyn TerrainOracle,
) -> bool {
    let end = center_of_mass + (target - center_of_mass) * TRAVERSE_FRACTION;
    !terrain.is_obstructed(center_of_mass, &end)
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use strider_core::terrain::{Aabb, SurfaceTag, TerrainScene};
    use strider_core::types::{JointPoses, JointWeights};

    use super::*;

    fn limb() -> LimbController {
        let poses = JointPoses::new(
            Vector3::new(0.5, 0.5, 0.0),
            Vector3::new(0.5, 1.5, 0.0),
            Vector3::new(0.5, 1.5, -1.0),
        );
        let chain = LimbChain::new(poses, JointWeights::default());
        let params = StepParams {
            step_size: 1.0,
            step_height: 0.5,
            speed: 4.0,
            max_range: chain.length(),
        };
        LimbController::new(LimbId(2), chain, Neighbors::conventional(2, 4), params)
    }

    fn ctx<'a>(target: Vector3<f64>, terrain: &'a TerrainScene) -> StepContext<'a> {
        StepContext {
            target,
            center_of_mass: Vector3::new(0.0, 0.0, -0.3),
            neighbor_swinging: false,
            sprint: None,
            terrain,
        }
    }

    fn wall_at(x: f64) -> TerrainScene {
        TerrainScene::flat(-1.0).with_box(Aabb::new(
            Vector3::new(x, -5.0, -1.0),
            Vector3::new(x + 0.2, 5.0, 2.0),
            SurfaceTag::Untraversable,
        ))
    }

    #[test]
    fn conventional_neighbors() {
        let n = Neighbors::conventional(0, 4);
        assert_eq!(n.opposite, Some(LimbId(1)));
        assert_eq!(n.ahead, Some(LimbId(2)));
        assert_eq!(n.behind, None);

        let n = Neighbors::conventional(3, 4);
        assert_eq!(n.opposite, Some(LimbId(2)));
        assert_eq!(n.ahead, None);
        assert_eq!(n.behind, Some(LimbId(1)));

        // Unpaired last limb of an odd rig.
        let n = Neighbors::conventional(2, 3);
        assert_eq!(n.opposite, None);
        assert_eq!(n.iter().collect::<Vec<_>>(), vec![LimbId(0)]);
    }

    #[test]
    fn swings_when_every_condition_holds() {
        let terrain = TerrainScene::flat(-1.0);
        let mut limb = limb();
        let target = Vector3::new(1.7, 1.5, -1.0);
        let update = limb.evaluate(&ctx(target, &terrain)).unwrap();
        assert_eq!(update.reach, Reach::Reachable);
        match update.decision {
            StepDecision::Swing(req) => {
                assert_eq!(req.limb, LimbId(2));
                assert_relative_eq!(req.start, Vector3::new(0.5, 1.5, -1.0));
                assert_relative_eq!(req.end, target);
                assert_relative_eq!(req.duration, 0.25);
            }
            StepDecision::Hold(b) => panic!("unexpected hold: {b:?}"),
        }
        assert!(limb.is_swinging());
        assert!(limb.evaluate(&ctx(target, &terrain)).is_none());
    }

    #[test]
    fn each_condition_alone_blocks() {
        let flat = TerrainScene::flat(-1.0);
        let limb = limb();
        let far = Vector3::new(1.7, 1.5, -1.0);

        let near = Vector3::new(1.4, 1.5, -1.0);
        assert_eq!(
            limb.step_blocker(&ctx(near, &flat), limb.reach(&near)),
            Some(Blocker::TooClose)
        );

        let unreachable = Vector3::new(3.0, 1.5, -1.0);
        assert_eq!(
            limb.step_blocker(&ctx(unreachable, &flat), limb.reach(&unreachable)),
            Some(Blocker::OutOfReach)
        );

        let mut locked = ctx(far, &flat);
        locked.neighbor_swinging = true;
        assert_eq!(
            limb.step_blocker(&locked, limb.reach(&far)),
            Some(Blocker::NeighborSwinging)
        );

        let walled = wall_at(1.0);
        assert_eq!(
            limb.step_blocker(&ctx(far, &walled), limb.reach(&far)),
            Some(Blocker::Untraversable)
        );

        assert_eq!(limb.step_blocker(&ctx(far, &flat), limb.reach(&far)), None);
    }

    #[test]
    fn planted_limb_returns_to_rest() {
        let terrain = TerrainScene::flat(-1.0);
        let mut limb = limb();
        limb.follow_swing(Vector3::new(-0.5, 1.5, -0.7));
        let mut locked = ctx(Vector3::new(1.7, 1.5, -1.0), &terrain);
        locked.neighbor_swinging = true;
        let update = limb.evaluate(&locked).unwrap();
        assert_eq!(update.decision, StepDecision::Hold(Blocker::NeighborSwinging));
        assert_relative_eq!(limb.effector(), limb.rest());
    }

    #[test]
    fn unreachable_reports_distance() {
        let limb = limb();
        let target = Vector3::new(0.5, 0.5, -3.0);
        match limb.reach(&target) {
            Reach::Unreachable { distance } => assert_relative_eq!(distance, 3.0),
            Reach::Reachable => panic!("expected unreachable"),
        }
        assert!(limb.reach(&Vector3::new(0.5, 0.5, -2.0)).is_reachable());
    }

    #[test]
    fn sprint_shortens_swing_with_damped_exponent() {
        let limb = limb();
        assert_relative_eq!(limb.swing_duration(None), 0.25);
        let expected = 1.0 / 8.0_f64.powf(1.0 / 1.4);
        assert_relative_eq!(limb.swing_duration(Some(2.0)), expected);
    }

    #[test]
    fn landing_snapshots_rest() {
        let mut limb = limb();
        let terrain = TerrainScene::flat(-1.0);
        let target = Vector3::new(1.7, 1.5, -1.0);
        limb.evaluate(&ctx(target, &terrain));
        limb.land(target);
        assert_eq!(limb.state(), StepState::Planted);
        assert_relative_eq!(limb.rest(), target);
        assert_relative_eq!(limb.effector(), target);
    }

    #[test]
    fn traversability_ignores_far_side_of_target() {
        // Wall just beyond the target is outside the checked 98 %.
        let terrain = wall_at(2.0);
        let com = Vector3::new(0.0, 0.0, 0.0);
        assert!(is_traversable(&com, &Vector3::new(1.9, 0.0, 0.0), &terrain));
        assert!(!is_traversable(&com, &Vector3::new(2.5, 0.0, 0.0), &terrain));
    }
}
