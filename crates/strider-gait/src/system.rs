//! The locomotion system: every component of one body, advanced by `tick`.
//!
//! Order within a tick:
//!
//! 1. **Movement** - the limiter gates the input, the body turns and translates.
//! 2. **Joints** - root and mid follow the body (kinematic source only).
//! 3. **Anchoring** - step targets are re-projected onto the terrain.
//! 4. **Decisions** - planted limbs step or hold, reach is reported to the limiter.
//! 5. **Swings** - active swings advance; landings plant their limb.
//! 6. **Body** - center of mass, tilt and ride height are updated.

use nalgebra::Vector3;
use strider_core::config::LocomotionConfig;
use strider_core::error::RigError;
use strider_core::terrain::TerrainOracle;
use strider_core::types::{BodyFrame, JointPoses, LimbChain, LimbId};
use tracing::trace;

use crate::anchor::GroundAnchor;
use crate::body::BodySolver;
use crate::collider::ColliderDesc;
use crate::limb::{LimbController, Reach, StepContext, StepDecision};
use crate::limiter::{ExclusionArc, MovementLimiter};
use crate::movement::{LocomotionInput, MoveOutcome, MovementController};
use crate::swing::{SwingEvent, SwingScheduler};

/// Who moves the limb joints between ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JointSource {
    /// Root and mid ride rigidly on the body; the tip sits on the effector.
    #[default]
    Kinematic,
    /// The host solves the limbs and reports poses through
    /// [`LocomotionSystem::set_joint_poses`].
    External,
}

/// What happened during one tick.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TickReport {
    pub movement: MoveOutcome,
    pub swings_started: Vec<LimbId>,
    pub swings_landed: Vec<LimbId>,
    /// Limbs whose exclusion arc was registered or cleared.
    pub arcs_changed: Vec<LimbId>,
    pub center_of_mass: Vector3<f64>,
    pub rotating: bool,
}

impl TickReport {
    pub fn blocked(&self) -> bool {
        self.movement == MoveOutcome::Blocked
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Attachment {
    root: Vector3<f64>,
    mid: Vector3<f64>,
}

#[derive(Debug, Clone)]
struct Snapshot {
    body: BodyFrame,
    chains: Vec<LimbChain>,
    anchors: Vec<GroundAnchor>,
}

/// Components assembled by the rig builder.
pub(crate) struct Parts {
    pub config: LocomotionConfig,
    pub joint_source: JointSource,
    pub body: BodyFrame,
    pub limbs: Vec<LimbController>,
    pub anchors: Vec<GroundAnchor>,
    pub ride_height: f64,
    pub colliders: Vec<ColliderDesc>,
}

#[derive(Debug, Clone)]
pub struct LocomotionSystem {
    config: LocomotionConfig,
    joint_source: JointSource,
    body: BodyFrame,
    limbs: Vec<LimbController>,
    anchors: Vec<GroundAnchor>,
    attachments: Vec<Attachment>,
    swings: SwingScheduler,
    solver: BodySolver,
    limiter: MovementLimiter,
    movement: MovementController,
    colliders: Vec<ColliderDesc>,
    initial: Snapshot,
    elapsed: f64,
}

impl LocomotionSystem {
    pub(crate) fn assemble(parts: Parts) -> Self {
        let Parts {
            config,
            joint_source,
            body,
            limbs,
            anchors,
            ride_height,
            colliders,
        } = parts;

        let attachments = limbs
            .iter()
            .map(|l| Attachment {
                root: body.to_local(&l.chain().root()),
                mid: body.to_local(&l.chain().mid()),
            })
            .collect();
        let mut solver = BodySolver::new(
            config.realignment_speed,
            config.realignment_threshold,
            ride_height,
        )
        .with_count_tip_weight(config.count_tip_weight);
        solver.refresh(&body, limbs.iter().map(LimbController::chain));

        let initial = Snapshot {
            body,
            chains: limbs.iter().map(|l| l.chain().clone()).collect(),
            anchors: anchors.clone(),
        };

        Self {
            swings: SwingScheduler::new(config.lift_axis),
            limiter: MovementLimiter::new(config.limiter.enabled, limbs.len()),
            movement: MovementController::new(config.movement.clone(), config.sprint.clone()),
            config,
            joint_source,
            body,
            limbs,
            anchors,
            attachments,
            solver,
            colliders,
            initial,
            elapsed: 0.0,
        }
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub const fn config(&self) -> &LocomotionConfig {
        &self.config
    }

    pub const fn joint_source(&self) -> JointSource {
        self.joint_source
    }

    pub const fn body(&self) -> &BodyFrame {
        &self.body
    }

    /// Direct access to the body pose, for hosts that move it themselves.
    pub fn body_mut(&mut self) -> &mut BodyFrame {
        &mut self.body
    }

    pub fn limbs(&self) -> &[LimbController] {
        &self.limbs
    }

    pub fn limb(&self, id: LimbId) -> Option<&LimbController> {
        self.limbs.get(id.index())
    }

    pub fn limb_count(&self) -> usize {
        self.limbs.len()
    }

    /// Published step target of `id`: the terrain projection, pulled inside
    /// reach for one update after the limb reports it unreachable.
    ///
    /// Step decisions and swing destinations use the unclamped
    /// [`GroundAnchor::ground_point`], so this can differ from where the
    /// limb next steps while its exclusion arc is active.
    pub fn target(&self, id: LimbId) -> Option<Vector3<f64>> {
        self.anchors.get(id.index()).map(GroundAnchor::position)
    }

    pub fn anchors(&self) -> &[GroundAnchor] {
        &self.anchors
    }

    pub const fn limiter(&self) -> &MovementLimiter {
        &self.limiter
    }

    pub const fn swings(&self) -> &SwingScheduler {
        &self.swings
    }

    pub const fn solver(&self) -> &BodySolver {
        &self.solver
    }

    pub const fn center_of_mass(&self) -> Vector3<f64> {
        self.solver.center_of_mass()
    }

    pub fn colliders(&self) -> &[ColliderDesc] {
        &self.colliders
    }

    /// Seconds simulated since setup or the last reset.
    pub const fn elapsed(&self) -> f64 {
        self.elapsed
    }

    // -----------------------------------------------------------------------
    // Host commands
    // -----------------------------------------------------------------------

    /// Report solved joint poses for one limb. Overwritten by the next tick
    /// under [`JointSource::Kinematic`].
    pub fn set_joint_poses(&mut self, id: LimbId, poses: JointPoses) -> Result<(), RigError> {
        let limb = self
            .limbs
            .get_mut(id.index())
            .ok_or(RigError::UnknownLimb(id.index()))?;
        limb.chain_mut().set_poses(poses);
        Ok(())
    }

    /// Shift a limb's step target by a world-space delta.
    pub fn displace_target(&mut self, id: LimbId, delta: &Vector3<f64>) -> Result<(), RigError> {
        let anchor = self
            .anchors
            .get_mut(id.index())
            .ok_or(RigError::UnknownLimb(id.index()))?;
        anchor.displace(&self.body, delta);
        Ok(())
    }

    pub fn set_limiter_enabled(&mut self, enabled: bool) {
        self.limiter.set_enabled(enabled);
    }

    /// Restore the body, limbs and targets to their state after setup.
    pub fn reset(&mut self) {
        self.body = self.initial.body;
        for (limb, chain) in self.limbs.iter_mut().zip(&self.initial.chains) {
            limb.reset(chain.clone());
        }
        self.anchors.clone_from(&self.initial.anchors);
        self.swings.clear();
        self.limiter.clear();
        self.movement.reset();
        self.solver.reset();
        self.solver
            .refresh(&self.body, self.limbs.iter().map(LimbController::chain));
        self.elapsed = 0.0;
    }

    // -----------------------------------------------------------------------
    // Tick
    // -----------------------------------------------------------------------

    /// Advance the whole body by `dt` seconds.
    pub fn tick(
        &mut self,
        dt: f64,
        input: &LocomotionInput,
        terrain: &dyn TerrainOracle,
    ) -> TickReport {
        let dt = dt.max(0.0);
        self.elapsed += dt;
        let mut report = TickReport {
            movement: self
                .movement
                .drive(&mut self.body, input, &self.limiter, dt),
            ..TickReport::default()
        };

        if self.joint_source == JointSource::Kinematic {
            self.follow_body();
        }

        let suspended = self.solver.is_rotating();
        for (limb, anchor) in self.limbs.iter().zip(&mut self.anchors) {
            anchor.update(
                &self.body,
                &limb.chain().root(),
                limb.params().max_range,
                suspended,
                terrain,
            );
        }

        self.decide(input, terrain, &mut report);

        for event in self.swings.advance(dt) {
            match event {
                SwingEvent::Moved { limb, position } => {
                    self.limbs[limb.index()].follow_swing(position);
                }
                SwingEvent::Landed { limb, position } => {
                    self.limbs[limb.index()].land(position);
                    report.swings_landed.push(limb);
                }
            }
        }

        if self.joint_source == JointSource::Kinematic {
            for limb in &mut self.limbs {
                let effector = limb.effector();
                limb.chain_mut().set_tip(effector);
            }
        }

        let tips: Vec<Vector3<f64>> = self.limbs.iter().map(|l| l.chain().tip()).collect();
        let any_swinging = self.limbs.iter().any(LimbController::is_swinging);
        let update = self.solver.step(
            &mut self.body,
            self.limbs.iter().map(LimbController::chain),
            &tips,
            any_swinging,
            terrain,
            dt,
        );
        report.center_of_mass = update.center_of_mass;
        report.rotating = update.rotating;
        report
    }

    fn follow_body(&mut self) {
        for (limb, attach) in self.limbs.iter_mut().zip(&self.attachments) {
            let poses = JointPoses::new(
                self.body.to_world(&attach.root),
                self.body.to_world(&attach.mid),
                limb.effector(),
            );
            limb.chain_mut().set_poses(poses);
        }
    }

    /// Limbs furthest from their targets decide first; ties go to the one further forward.
    fn priority_order(&self) -> Vec<usize> {
        let forward = self.body.forward();
        let key = |i: usize| {
            let target = self.anchors[i].ground_point();
            (
                (self.limbs[i].effector() - target).norm(),
                target.dot(&forward),
            )
        };
        let mut order: Vec<usize> = (0..self.limbs.len()).collect();
        order.sort_by(|&a, &b| {
            let (dist_a, fwd_a) = key(a);
            let (dist_b, fwd_b) = key(b);
            dist_b
                .total_cmp(&dist_a)
                .then(fwd_b.total_cmp(&fwd_a))
                .then(a.cmp(&b))
        });
        order
    }

    fn decide(
        &mut self,
        input: &LocomotionInput,
        terrain: &dyn TerrainOracle,
        report: &mut TickReport,
    ) {
        let sprint = self.movement.sprint_multiplier(input);
        let com = self.solver.center_of_mass();
        let forward = self.body.forward();

        for i in self.priority_order() {
            let id = LimbId(i);
            let neighbor_swinging = self.limbs[i]
                .neighbors()
                .iter()
                .any(|n| self.limbs.get(n.index()).is_some_and(LimbController::is_swinging));
            let ctx = StepContext {
                target: self.anchors[i].ground_point(),
                center_of_mass: com,
                neighbor_swinging,
                sprint,
                terrain,
            };
            let Some(update) = self.limbs[i].evaluate(&ctx) else {
                continue;
            };

            let arc_changed = match update.reach {
                Reach::Reachable => self.limiter.clear_arc(id),
                Reach::Unreachable { distance } => {
                    trace!(limb = %id, distance, "target out of reach");
                    self.anchors[i].request_clamp();
                    ExclusionArc::toward(&forward, &com, &ctx.target)
                        .is_some_and(|arc| self.limiter.set_arc(id, arc))
                }
            };
            if arc_changed {
                report.arcs_changed.push(id);
            }

            if let StepDecision::Swing(request) = update.decision {
                if self.swings.schedule(request) {
                    report.swings_started.push(id);
                }
            }
        }
    }
}
