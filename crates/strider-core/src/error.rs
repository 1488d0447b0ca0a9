use thiserror::Error;

/// Top-level error type for strider.
#[derive(Debug, Error)]
pub enum StriderError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Rig error: {0}")]
    Rig(#[from] RigError),
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("{field} = {value} is out of range [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

impl ConfigError {
    /// Check `value` against an inclusive range, naming the offending field.
    pub fn check_range(field: &'static str, value: f64, min: f64, max: f64) -> Result<(), Self> {
        if value.is_finite() && (min..=max).contains(&value) {
            Ok(())
        } else {
            Err(Self::OutOfRange {
                field,
                value,
                min,
                max,
            })
        }
    }
}

/// Rig setup errors. Raised once, before the first tick.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RigError {
    #[error("No body was supplied")]
    MissingBody,

    #[error("Rig has no limbs")]
    NoLimbs,

    #[error("Limb {limb}: bone chain needs at least 3 joints, got {joints}")]
    ChainTooShort { limb: usize, joints: usize },

    #[error("Limb {limb}: non-finite joint position")]
    DegenerateChain { limb: usize },

    #[error("Weight {what} = {value} is out of range [0, 10]")]
    WeightOutOfRange { what: String, value: f64 },

    #[error("Body weight must be positive, got {0}")]
    BodyWeightNotPositive(f64),

    #[error("Unknown limb id: {0}")]
    UnknownLimb(usize),

    #[error("Limb {limb}: neighbor {neighbor} is out of range or refers to itself")]
    InvalidNeighbor { limb: usize, neighbor: usize },
}
