//! Procedural locomotion for bodies with any number of limbs.
//!
//! Each tick the [`LocomotionSystem`] runs a fixed pipeline:
//!
//! 1. **Movement** - steer and translate the body unless an exclusion arc forbids it
//! 2. **Anchoring** - carry every step target with the body and project it onto the terrain
//! 3. **Stepping** - planted limbs whose target drifted past the step size start a swing
//! 4. **Swings** - parabolic foot arcs advance and land
//! 5. **Body** - center of mass, terrain-following tilt and ride height
//!
//! Limbs are ordered in lateral pairs: indices `2k` (left) and `2k + 1`
//! (right), with pair `k + 1` ahead of pair `k`. Rigs are assembled with
//! [`RigBuilder`].

pub mod anchor;
pub mod body;
pub mod collider;
pub mod limb;
pub mod limiter;
pub mod movement;
#[cfg(feature = "bevy")]
pub mod plugin;
pub mod rig;
pub mod swing;
pub mod system;

pub use anchor::{AnchorOutcome, GroundAnchor};
pub use body::{BodySolver, BodyUpdate, center_of_mass, target_tilt};
pub use collider::ColliderDesc;
pub use limb::{Blocker, LimbController, Neighbors, Reach, StepDecision, StepParams, StepState};
pub use limiter::{ExclusionArc, MovementLimiter};
pub use movement::{LocomotionInput, MoveOutcome, MovementController};
#[cfg(feature = "bevy")]
pub use plugin::{LocomotionDriver, StriderLocomotionPlugin};
pub use rig::{LimbSpec, RigBuilder, stagger_offset};
pub use swing::{SwingEvent, SwingRequest, SwingScheduler, SwingTask, swing_position};
pub use system::{JointSource, LocomotionSystem, TickReport};

pub mod prelude {
    pub use strider_core::prelude::*;

    pub use crate::{
        ColliderDesc, ExclusionArc, JointSource, LimbSpec, LocomotionInput, LocomotionSystem,
        MoveOutcome, Neighbors, RigBuilder, TickReport,
    };
}
