//! Movement controller: turns and translates the body from a steering input.

use nalgebra::{Vector2, Vector3};
use strider_core::config::{MovementConfig, SprintConfig};
use strider_core::math::{EPSILON, smooth_damp_angle};
use strider_core::types::BodyFrame;

use crate::limiter::MovementLimiter;

/// Inputs shorter than this are ignored.
pub const MIN_INPUT: f64 = 0.1;

/// Per-tick steering input.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "bevy", derive(bevy::prelude::Resource))]
pub struct LocomotionInput {
    /// Desired travel direction relative to the body: x forward, y left.
    pub direction: Vector2<f64>,
    pub sprint: bool,
}

impl LocomotionInput {
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            direction: Vector2::new(x, y),
            sprint: false,
        }
    }

    #[must_use]
    pub const fn with_sprint(mut self, sprint: bool) -> Self {
        self.sprint = sprint;
        self
    }

    pub fn idle() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum MoveOutcome {
    #[default]
    Idle,
    /// An exclusion arc covers the requested direction.
    Blocked,
    Moved { displacement: Vector3<f64> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct MovementController {
    config: MovementConfig,
    sprint: SprintConfig,
    yaw_velocity: f64,
}

impl MovementController {
    pub fn new(config: MovementConfig, sprint: SprintConfig) -> Self {
        Self {
            config,
            sprint,
            yaw_velocity: 0.0,
        }
    }

    /// Sprint multiplier in effect for `input`, if any.
    pub fn sprint_multiplier(&self, input: &LocomotionInput) -> Option<f64> {
        (input.sprint && self.sprint.enabled).then_some(self.sprint.multiplier)
    }

    pub fn reset(&mut self) {
        self.yaw_velocity = 0.0;
    }

    /// Steer and translate `body` for one tick.
    pub fn drive(
        &mut self,
        body: &mut BodyFrame,
        input: &LocomotionInput,
        limiter: &MovementLimiter,
        dt: f64,
    ) -> MoveOutcome {
        let magnitude = input.direction.norm();
        if magnitude < MIN_INPUT || dt <= 0.0 {
            return MoveOutcome::Idle;
        }
        let local = Vector3::new(input.direction.x, input.direction.y, 0.0) / magnitude;
        if !limiter.permits(&local) {
            return MoveOutcome::Blocked;
        }

        let world = body.heading() * local;
        let target_yaw = world.y.atan2(world.x);
        let weight = body.weight.max(EPSILON);
        body.yaw = smooth_damp_angle(
            body.yaw,
            target_yaw,
            &mut self.yaw_velocity,
            weight / self.config.turn_speed,
            dt,
        );

        let speed = self.config.speed / weight * self.sprint_multiplier(input).unwrap_or(1.0);
        let displacement = world * speed * dt;
        body.position += displacement;
        MoveOutcome::Moved { displacement }
    }
}
