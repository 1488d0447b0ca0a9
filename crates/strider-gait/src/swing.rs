//! Swing scheduler.
//!
//! A swing moves a limb's effector from where it stood to a latched landing
//! point over a fixed duration. Horizontal motion is linear; along the lift
//! axis the effector follows a parabola peaking at `step_height` halfway
//! through. Each swing is a polled task advanced by `dt`; landing is
//! reported through [`SwingEvent::Landed`].

use nalgebra::Vector3;
use strider_core::math::{Axis, lerp};
use strider_core::types::LimbId;
use tracing::debug;

/// Swings shorter than this snap to their end on the first tick.
pub const SNAP_DISTANCE: f64 = 0.01;

/// Lift above the straight start→end line at normalized time `step`.
///
/// Zero at both ends, `step_height` at `step = 0.5`.
pub fn parabolic_offset(distance: f64, step: f64, step_height: f64) -> f64 {
    if distance <= 0.0 {
        return 0.0;
    }
    let m = 4.0 * step_height / (distance * distance);
    let x = step * distance;
    (-x * x + distance * x) * m
}

/// Position along a swing at normalized time `step` in `[0, 1]`.
pub fn swing_position(
    start: &Vector3<f64>,
    end: &Vector3<f64>,
    axis: Axis,
    step: f64,
    step_height: f64,
) -> Vector3<f64> {
    let t = step.clamp(0.0, 1.0);
    let distance = (end - start).norm();
    if distance <= SNAP_DISTANCE {
        return *end;
    }
    let mut p = start.lerp(end, t);
    let i = axis.index();
    p[i] = lerp(start[i], end[i], t) + parabolic_offset(distance, t, step_height);
    p
}

// ---------------------------------------------------------------------------
// SwingTask
// ---------------------------------------------------------------------------

/// What a task produced on one advance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SwingSample {
    InFlight(Vector3<f64>),
    Landed(Vector3<f64>),
}

impl SwingSample {
    pub const fn position(&self) -> Vector3<f64> {
        match self {
            Self::InFlight(p) | Self::Landed(p) => *p,
        }
    }
}

/// One limb's swing in progress.
#[derive(Debug, Clone, PartialEq)]
pub struct SwingTask {
    limb: LimbId,
    start: Vector3<f64>,
    end: Vector3<f64>,
    axis: Axis,
    step_height: f64,
    duration: f64,
    elapsed: f64,
    landed: bool,
}

impl SwingTask {
    pub fn new(limb: LimbId, start: Vector3<f64>, end: Vector3<f64>, duration: f64) -> Self {
        Self {
            limb,
            start,
            end,
            axis: Axis::Z,
            step_height: 0.5,
            duration: duration.max(0.0),
            elapsed: 0.0,
            landed: false,
        }
    }

    #[must_use]
    pub const fn with_axis(mut self, axis: Axis) -> Self {
        self.axis = axis;
        self
    }

    #[must_use]
    pub const fn with_step_height(mut self, step_height: f64) -> Self {
        self.step_height = step_height;
        self
    }

    pub const fn limb(&self) -> LimbId {
        self.limb
    }

    pub const fn start(&self) -> Vector3<f64> {
        self.start
    }

    pub const fn end(&self) -> Vector3<f64> {
        self.end
    }

    pub const fn duration(&self) -> f64 {
        self.duration
    }

    pub const fn elapsed(&self) -> f64 {
        self.elapsed
    }

    pub const fn is_landed(&self) -> bool {
        self.landed
    }

    /// Normalized progress in `[0, 1]`.
    pub fn progress(&self) -> f64 {
        if self.duration <= 0.0 {
            return 1.0;
        }
        (self.elapsed / self.duration).clamp(0.0, 1.0)
    }

    /// Current position without advancing.
    pub fn position(&self) -> Vector3<f64> {
        if self.landed {
            return self.end;
        }
        swing_position(&self.start, &self.end, self.axis, self.progress(), self.step_height)
    }

    /// Advance by `dt`. Returns `None` once the task has landed.
    pub fn advance(&mut self, dt: f64) -> Option<SwingSample> {
        if self.landed {
            return None;
        }
        self.elapsed += dt.max(0.0);
        let degenerate = (self.end - self.start).norm() <= SNAP_DISTANCE;
        if degenerate || self.elapsed >= self.duration {
            self.landed = true;
            return Some(SwingSample::Landed(self.end));
        }
        Some(SwingSample::InFlight(self.position()))
    }

    /// The remaining trajectory sampled at fixed `dt`, ending with the landing.
    pub fn samples(self, dt: f64) -> SwingSamples {
        SwingSamples { task: self, dt }
    }
}

/// Iterator over a task's remaining samples. Always finite for `dt > 0`.
#[derive(Debug, Clone)]
pub struct SwingSamples {
    task: SwingTask,
    dt: f64,
}

impl Iterator for SwingSamples {
    type Item = SwingSample;

    fn next(&mut self) -> Option<Self::Item> {
        if self.dt <= 0.0 && !self.task.landed {
            // A non-advancing clock would never land.
            self.task.elapsed = self.task.duration;
        }
        self.task.advance(self.dt)
    }
}

// ---------------------------------------------------------------------------
// SwingScheduler
// ---------------------------------------------------------------------------

/// A landing point handed over by a limb that decided to step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SwingRequest {
    pub limb: LimbId,
    pub start: Vector3<f64>,
    pub end: Vector3<f64>,
    pub duration: f64,
    pub step_height: f64,
}

/// Emitted by [`SwingScheduler::advance`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SwingEvent {
    Moved { limb: LimbId, position: Vector3<f64> },
    Landed { limb: LimbId, position: Vector3<f64> },
}

impl SwingEvent {
    pub const fn limb(&self) -> LimbId {
        match self {
            Self::Moved { limb, .. } | Self::Landed { limb, .. } => *limb,
        }
    }
}

/// Owns every swing in flight. Tasks of different limbs never interact.
#[derive(Debug, Clone, Default)]
pub struct SwingScheduler {
    axis: Axis,
    tasks: Vec<SwingTask>,
}

impl SwingScheduler {
    pub fn new(axis: Axis) -> Self {
        Self {
            axis,
            tasks: Vec::new(),
        }
    }

    /// Start a fresh swing. Returns false if the limb is already swinging.
    pub fn schedule(&mut self, request: SwingRequest) -> bool {
        if self.is_swinging(request.limb) {
            return false;
        }
        debug!(
            limb = %request.limb,
            duration = request.duration,
            distance = (request.end - request.start).norm(),
            "swing started"
        );
        self.tasks.push(
            SwingTask::new(request.limb, request.start, request.end, request.duration)
                .with_axis(self.axis)
                .with_step_height(request.step_height),
        );
        true
    }

    /// Advance every task, dropping the ones that land.
    pub fn advance(&mut self, dt: f64) -> Vec<SwingEvent> {
        let mut events = Vec::with_capacity(self.tasks.len());
        for task in &mut self.tasks {
            match task.advance(dt) {
                Some(SwingSample::InFlight(position)) => events.push(SwingEvent::Moved {
                    limb: task.limb(),
                    position,
                }),
                Some(SwingSample::Landed(position)) => {
                    debug!(limb = %task.limb(), "swing landed");
                    events.push(SwingEvent::Landed {
                        limb: task.limb(),
                        position,
                    });
                }
                None => {}
            }
        }
        self.tasks.retain(|t| !t.is_landed());
        events
    }

    pub fn is_swinging(&self, limb: LimbId) -> bool {
        self.tasks.iter().any(|t| t.limb() == limb)
    }

    pub fn task(&self, limb: LimbId) -> Option<&SwingTask> {
        self.tasks.iter().find(|t| t.limb() == limb)
    }

    pub fn active(&self) -> impl Iterator<Item = &SwingTask> {
        self.tasks.iter()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn clear(&mut self) {
        self.tasks.clear();
    }
}
