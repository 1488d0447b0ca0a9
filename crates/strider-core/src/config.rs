use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::math::Axis;

// ---------------------------------------------------------------------------
// Serde default functions
// ---------------------------------------------------------------------------

const fn default_step_size() -> f64 {
    1.0
}
const fn default_step_height() -> f64 {
    0.5
}
const fn default_step_speed() -> f64 {
    4.0
}
const fn default_realignment_speed() -> f64 {
    25.0
}
const fn default_realignment_threshold() -> f64 {
    0.1
}
const fn default_true() -> bool {
    true
}
const fn default_sprint_multiplier() -> f64 {
    2.0
}
const fn default_move_speed() -> f64 {
    3.0
}
const fn default_turn_speed() -> f64 {
    3.0
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Direction of the ground anchor's downward probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnchorMode {
    /// World down.
    #[default]
    Geometric,
    /// The body's tilted down axis.
    Local,
}

/// Which collider descriptors the rig builder emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColliderGeneration {
    #[default]
    None,
    CompleteBody,
    EachLimb,
}

// ---------------------------------------------------------------------------
// LocomotionConfig
// ---------------------------------------------------------------------------

/// Gait, stabilization and movement parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocomotionConfig {
    /// Distance a target must drift from rest before the limb steps (default: 1.0).
    #[serde(default = "default_step_size")]
    pub step_size: f64,

    /// Overrides every limb's chain length as reach when set and positive.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_range: Option<f64>,

    /// Peak lift of a swing (default: 0.5).
    #[serde(default = "default_step_height")]
    pub step_height: f64,

    /// Swing speed; duration is average limb weight / speed (default: 4.0).
    #[serde(default = "default_step_speed")]
    pub step_speed: f64,

    /// Body pose blend rate, divided by body weight (default: 25.0).
    #[serde(default = "default_realignment_speed")]
    pub realignment_speed: f64,

    /// Tip height difference below which a limb pair adds no tilt (default: 0.1).
    #[serde(default = "default_realignment_threshold")]
    pub realignment_threshold: f64,

    /// Offset initial targets so limbs do not all step at once.
    #[serde(default = "default_true")]
    pub stagger_start: bool,

    /// Axis the swing arc lifts along.
    #[serde(default)]
    pub lift_axis: Axis,

    /// Include tip weights in the center of mass.
    #[serde(default = "default_true")]
    pub count_tip_weight: bool,

    /// Body height above ground under the center of mass. Measured at setup when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ride_height: Option<f64>,

    #[serde(default)]
    pub anchor_mode: AnchorMode,

    #[serde(default)]
    pub collider_generation: ColliderGeneration,

    #[serde(default)]
    pub sprint: SprintConfig,

    #[serde(default)]
    pub movement: MovementConfig,

    #[serde(default)]
    pub limiter: LimiterConfig,
}

impl Default for LocomotionConfig {
    fn default() -> Self {
        Self {
            step_size: default_step_size(),
            max_range: None,
            step_height: default_step_height(),
            step_speed: default_step_speed(),
            realignment_speed: default_realignment_speed(),
            realignment_threshold: default_realignment_threshold(),
            stagger_start: true,
            lift_axis: Axis::Z,
            count_tip_weight: true,
            ride_height: None,
            anchor_mode: AnchorMode::Geometric,
            collider_generation: ColliderGeneration::None,
            sprint: SprintConfig::default(),
            movement: MovementConfig::default(),
            limiter: LimiterConfig::default(),
        }
    }
}

impl LocomotionConfig {
    /// Validate configuration. Returns Err on invalid values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        ConfigError::check_range("step_size", self.step_size, 0.1, f64::MAX)?;
        ConfigError::check_range("step_height", self.step_height, 0.1, f64::MAX)?;
        ConfigError::check_range("step_speed", self.step_speed, 0.1, 50.0)?;
        ConfigError::check_range("realignment_speed", self.realignment_speed, 0.1, 50.0)?;
        ConfigError::check_range(
            "realignment_threshold",
            self.realignment_threshold,
            0.01,
            1.0,
        )?;
        if let Some(h) = self.ride_height {
            ConfigError::check_range("ride_height", h, 0.0, f64::MAX)?;
        }
        if let Some(r) = self.max_range.filter(|r| !r.is_finite()) {
            return Err(ConfigError::InvalidValue {
                field: "max_range".into(),
                message: format!("{r} is not finite"),
            });
        }
        self.sprint.validate()?;
        self.movement.validate()?;
        Ok(())
    }

    /// Reach override, when set and positive.
    pub fn max_range_override(&self) -> Option<f64> {
        self.max_range.filter(|r| *r > 0.0)
    }

    /// Load from TOML file.
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse and validate a TOML document.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }
}

// ---------------------------------------------------------------------------
// SprintConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SprintConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Multiplies movement speed and, damped, swing speed (default: 2.0).
    #[serde(default = "default_sprint_multiplier")]
    pub multiplier: f64,
}

impl Default for SprintConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            multiplier: default_sprint_multiplier(),
        }
    }
}

impl SprintConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        ConfigError::check_range("sprint.multiplier", self.multiplier, 1.0, 10.0)
    }
}

// ---------------------------------------------------------------------------
// MovementConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovementConfig {
    /// Body travel speed before division by body weight (default: 3.0).
    #[serde(default = "default_move_speed")]
    pub speed: f64,

    /// Turning rate; yaw smooth time is body weight / turn speed (default: 3.0).
    #[serde(default = "default_turn_speed")]
    pub turn_speed: f64,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            speed: default_move_speed(),
            turn_speed: default_turn_speed(),
        }
    }
}

impl MovementConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        ConfigError::check_range("movement.speed", self.speed, 0.1, 10.0)?;
        ConfigError::check_range("movement.turn_speed", self.turn_speed, 0.1, 10.0)
    }
}

// ---------------------------------------------------------------------------
// LimiterConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LimiterConfig {
    /// Block travel toward directions where a limb cannot reach.
    #[serde(default)]
    pub enabled: bool,
}

// ---------------------------------------------------------------------------
// LimbOverrides
// ---------------------------------------------------------------------------

/// Per-limb replacements for the global gait parameters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LimbOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_size: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_height: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_speed: Option<f64>,
}

impl LimbOverrides {
    /// Check set heights and speeds against the ranges of their global counterparts.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(h) = self.step_height {
            ConfigError::check_range("overrides.step_height", h, 0.1, f64::MAX)?;
        }
        if let Some(s) = self.step_speed {
            ConfigError::check_range("overrides.step_speed", s, 0.1, 50.0)?;
        }
        Ok(())
    }

    #[must_use]
    pub const fn with_step_size(mut self, step_size: f64) -> Self {
        self.step_size = Some(step_size);
        self
    }

    #[must_use]
    pub const fn with_step_height(mut self, step_height: f64) -> Self {
        self.step_height = Some(step_height);
        self
    }

    #[must_use]
    pub const fn with_step_speed(mut self, step_speed: f64) -> Self {
        self.step_speed = Some(step_speed);
        self
    }

    /// Step size for this limb; the override wins only when positive.
    pub fn step_size(&self, config: &LocomotionConfig) -> f64 {
        self.step_size
            .filter(|s| *s > 0.0)
            .unwrap_or(config.step_size)
    }

    pub fn step_height(&self, config: &LocomotionConfig) -> f64 {
        self.step_height.unwrap_or(config.step_height)
    }

    pub fn step_speed(&self, config: &LocomotionConfig) -> f64 {
        self.step_speed.unwrap_or(config.step_speed)
    }
}
