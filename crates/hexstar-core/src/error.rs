//! Configuration errors.

use thiserror::Error;

/// Rejected mission parameters. Always raised before any vehicle command.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("{which} radius must be positive and finite, got {value}")]
    InvalidRadius { which: &'static str, value: f64 },

    #[error("flight plan needs at least one layer")]
    NoLayers,

    #[error("flight plan allows at most {max} layers, got {layers}")]
    TooManyLayers { layers: u32, max: u32 },

    #[error("altitude decrement per layer must be non-negative, got {0}")]
    NegativeDecrement(f64),

    #[error("radius decay factor must be positive and finite, got {0}")]
    InvalidDecay(f64),

    #[error("initial altitude must be positive and finite, got {0}")]
    InvalidAltitude(f64),

    #[error("altitude floor must be positive and finite, got {0}")]
    InvalidFloor(f64),

    #[error("initial altitude {altitude} m is below the safety floor {floor} m")]
    BelowFloor { altitude: f64, floor: f64 },

    #[error("{which} speed must be positive and finite, got {value}")]
    InvalidSpeed { which: &'static str, value: f64 },

    #[error("{0} poll interval must be non-zero")]
    ZeroInterval(&'static str),

    #[error("{which} must be positive and finite, got {value}")]
    InvalidTolerance { which: &'static str, value: f64 },

    #[error("{which} must be a non-negative, representable number of seconds, got {value}")]
    InvalidDuration { which: &'static str, value: f64 },

    #[error("takeoff completion ratio must be in (0, 1], got {0}")]
    InvalidTakeoffRatio(f64),

    #[error("link address must not be empty")]
    EmptyLinkAddress,
}
