//! Bevy plugin that ticks a [`LocomotionSystem`] every frame.
//!
//! Insert a [`LocomotionDriver`] after building the rig. The current
//! [`LocomotionInput`] resource steers it; the body pose is written back to
//! the `Transform` of `body_entity` when one is set.

use bevy::prelude::*;
use strider_core::terrain::TerrainOracle;
use strider_core::types::BodyFrame;

use crate::movement::LocomotionInput;
use crate::system::{LocomotionSystem, TickReport};

pub struct StriderLocomotionPlugin;

impl Plugin for StriderLocomotionPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<LocomotionInput>()
            .add_systems(Update, locomotion_system);
    }
}

/// A built rig together with the terrain it walks on.
#[derive(Resource)]
pub struct LocomotionDriver {
    pub system: LocomotionSystem,
    pub terrain: Box<dyn TerrainOracle + Send + Sync>,
    /// Entity whose `Transform` mirrors the body.
    pub body_entity: Option<Entity>,
    pub last_report: TickReport,
}

impl LocomotionDriver {
    pub fn new(system: LocomotionSystem, terrain: impl TerrainOracle + Send + Sync + 'static) -> Self {
        Self {
            system,
            terrain: Box::new(terrain),
            body_entity: None,
            last_report: TickReport::default(),
        }
    }

    #[must_use]
    pub const fn with_body_entity(mut self, entity: Entity) -> Self {
        self.body_entity = Some(entity);
        self
    }
}

/// Bevy transform for a body pose.
#[allow(clippy::cast_possible_truncation)]
pub fn body_transform(body: &BodyFrame) -> Transform {
    let p = body.position;
    Transform::from_xyz(p.x as f32, p.y as f32, p.z as f32).with_rotation(Quat::from_euler(
        EulerRot::ZYX,
        body.yaw as f32,
        body.pitch as f32,
        body.roll as f32,
    ))
}

#[allow(clippy::needless_pass_by_value)]
fn locomotion_system(
    time: Res<Time>,
    input: Res<LocomotionInput>,
    driver: Option<ResMut<LocomotionDriver>>,
    mut transforms: Query<&mut Transform>,
) {
    let Some(mut driver) = driver else {
        return;
    };
    let driver = &mut *driver;
    let dt = time.delta().as_secs_f64();
    driver.last_report = driver.system.tick(dt, &input, driver.terrain.as_ref());

    let Some(entity) = driver.body_entity else {
        return;
    };
    if let Ok(mut transform) = transforms.get_mut(entity) {
        *transform = body_transform(driver.system.body());
    }
}
