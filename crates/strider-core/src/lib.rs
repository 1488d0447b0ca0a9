// strider-core: types, terrain queries, config and errors for the strider locomotion controller.

pub mod config;
pub mod error;
pub mod math;
pub mod presets;
pub mod terrain;
pub mod types;

pub mod prelude {
    pub use crate::config::{
        AnchorMode, ColliderGeneration, LimbOverrides, LimiterConfig, LocomotionConfig,
        MovementConfig, SprintConfig,
    };
    pub use crate::error::{ConfigError, RigError, StriderError};
    pub use crate::math::Axis;
    pub use crate::presets;
    pub use crate::terrain::{Aabb, Plane, RayHit, SurfaceTag, TerrainOracle, TerrainScene};
    pub use crate::types::{BodyFrame, JointPoses, JointWeights, LimbChain, LimbId};
}
