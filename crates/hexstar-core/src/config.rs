//! Mission configuration, loaded from environment with built-in defaults.

use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;
use crate::models::Stage;

pub const DEFAULT_LINK_ADDRESS: &str = "udp:127.0.0.1:14551";
pub const DEFAULT_INITIAL_ALTITUDE_M: f64 = 30.0;
pub const DEFAULT_OUTER_RADIUS_M: f64 = 50.0;
pub const DEFAULT_INNER_RADIUS_M: f64 = 28.0;
pub const DEFAULT_CRUISE_SPEED_MPS: f64 = 8.0;
pub const DEFAULT_APPROACH_SPEED_MPS: f64 = 15.0;
pub const DEFAULT_LAYERS: u32 = 3;
pub const DEFAULT_ALTITUDE_DECREMENT_M: f64 = 5.0;
pub const DEFAULT_RADIUS_DECAY: f64 = 0.8;
/// Layers are never flown below this altitude.
pub const DEFAULT_ALTITUDE_FLOOR_M: f64 = 5.0;
pub const MAX_LAYERS: u32 = 100;

/// Parameters for a layered star mission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MissionConfig {
    /// Vehicle link address, e.g. `udp:127.0.0.1:14551` or `sim`
    pub link_address: String,
    /// Takeoff altitude and altitude of the first layer
    pub initial_altitude_m: f64,
    pub outer_radius_m: f64,
    pub inner_radius_m: f64,
    /// Speed for every leg after the first in a layer
    pub cruise_speed_mps: f64,
    /// Speed for the leg onto a layer's first point
    pub approach_speed_mps: f64,
    pub layers: u32,
    pub altitude_decrement_m: f64,
    /// Multiplier applied to both radii from one layer to the next
    pub radius_decay: f64,
    pub altitude_floor_m: f64,
    pub timing: MissionTiming,
}

impl Default for MissionConfig {
    fn default() -> Self {
        Self {
            link_address: DEFAULT_LINK_ADDRESS.to_string(),
            initial_altitude_m: DEFAULT_INITIAL_ALTITUDE_M,
            outer_radius_m: DEFAULT_OUTER_RADIUS_M,
            inner_radius_m: DEFAULT_INNER_RADIUS_M,
            cruise_speed_mps: DEFAULT_CRUISE_SPEED_MPS,
            approach_speed_mps: DEFAULT_APPROACH_SPEED_MPS,
            layers: DEFAULT_LAYERS,
            altitude_decrement_m: DEFAULT_ALTITUDE_DECREMENT_M,
            radius_decay: DEFAULT_RADIUS_DECAY,
            altitude_floor_m: DEFAULT_ALTITUDE_FLOOR_M,
            timing: MissionTiming::default(),
        }
    }
}

impl MissionConfig {
    /// Read `HEXSTAR_*` variables, falling back to defaults for anything unset
    /// or unparsable.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let mut timing = MissionTiming::default();

        if let Some(delay) = env_duration("HEXSTAR_DRAW_DELAY_SECS") {
            timing.draw_delay = delay;
        }
        if env::var("HEXSTAR_UNBOUNDED_WAITS")
            .map(|v| matches!(v.as_str(), "1" | "true" | "yes"))
            .unwrap_or(false)
        {
            timing.stall = StallPolicy::Unbounded;
        } else if let Some(arrival) = env_duration("HEXSTAR_ARRIVAL_TIMEOUT_SECS") {
            timing.stall = StallPolicy::Bounded(StallTimeouts {
                arrival,
                ..StallTimeouts::default()
            });
        }

        Self {
            link_address: env::var("HEXSTAR_LINK").unwrap_or(defaults.link_address),
            initial_altitude_m: env_parse("HEXSTAR_ALTITUDE").unwrap_or(defaults.initial_altitude_m),
            outer_radius_m: env_parse("HEXSTAR_OUTER_RADIUS").unwrap_or(defaults.outer_radius_m),
            inner_radius_m: env_parse("HEXSTAR_INNER_RADIUS").unwrap_or(defaults.inner_radius_m),
            cruise_speed_mps: env_parse("HEXSTAR_CRUISE_SPEED").unwrap_or(defaults.cruise_speed_mps),
            approach_speed_mps: env_parse("HEXSTAR_APPROACH_SPEED")
                .unwrap_or(defaults.approach_speed_mps),
            layers: env_parse("HEXSTAR_LAYERS").unwrap_or(defaults.layers),
            altitude_decrement_m: env_parse("HEXSTAR_ALTITUDE_DECREMENT")
                .unwrap_or(defaults.altitude_decrement_m),
            radius_decay: env_parse("HEXSTAR_RADIUS_DECAY").unwrap_or(defaults.radius_decay),
            altitude_floor_m: env_parse("HEXSTAR_ALTITUDE_FLOOR").unwrap_or(defaults.altitude_floor_m),
            timing,
        }
    }

    /// Check the parameters the flight plan is built from.
    pub fn validate_geometry(&self) -> Result<(), ConfigError> {
        positive(self.outer_radius_m)
            .map_err(|value| ConfigError::InvalidRadius { which: "outer", value })?;
        positive(self.inner_radius_m)
            .map_err(|value| ConfigError::InvalidRadius { which: "inner", value })?;

        if self.layers == 0 {
            return Err(ConfigError::NoLayers);
        }
        if self.layers > MAX_LAYERS {
            return Err(ConfigError::TooManyLayers { layers: self.layers, max: MAX_LAYERS });
        }
        if !(self.altitude_decrement_m >= 0.0 && self.altitude_decrement_m.is_finite()) {
            return Err(ConfigError::NegativeDecrement(self.altitude_decrement_m));
        }
        if !(self.radius_decay > 0.0 && self.radius_decay.is_finite()) {
            return Err(ConfigError::InvalidDecay(self.radius_decay));
        }
        if !(self.initial_altitude_m > 0.0 && self.initial_altitude_m.is_finite()) {
            return Err(ConfigError::InvalidAltitude(self.initial_altitude_m));
        }
        positive(self.altitude_floor_m).map_err(ConfigError::InvalidFloor)?;
        if self.initial_altitude_m < self.altitude_floor_m {
            return Err(ConfigError::BelowFloor {
                altitude: self.initial_altitude_m,
                floor: self.altitude_floor_m,
            });
        }
        Ok(())
    }

    /// Full validation: geometry, speeds, link address and timing.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_geometry()?;

        positive(self.cruise_speed_mps)
            .map_err(|value| ConfigError::InvalidSpeed { which: "cruise", value })?;
        positive(self.approach_speed_mps)
            .map_err(|value| ConfigError::InvalidSpeed { which: "approach", value })?;

        if self.link_address.trim().is_empty() {
            return Err(ConfigError::EmptyLinkAddress);
        }

        self.timing.validate()
    }
}

/// Poll rates, tolerances and delays used while flying.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MissionTiming {
    /// One-time pause before the first layer is drawn
    pub draw_delay: Duration,
    /// Interval for armable, armed and altitude checks
    pub status_poll: Duration,
    /// Interval for waypoint arrival checks
    pub arrival_poll: Duration,
    pub horizontal_tolerance_m: f64,
    pub vertical_tolerance_m: f64,
    /// Fraction of the target altitude that completes takeoff
    pub takeoff_ratio: f64,
    /// Altitude below which the vehicle counts as landed
    pub landed_altitude_m: f64,
    pub stall: StallPolicy,
}

impl Default for MissionTiming {
    fn default() -> Self {
        Self {
            draw_delay: Duration::from_secs(10),
            status_poll: Duration::from_secs(1),
            arrival_poll: Duration::from_millis(500),
            horizontal_tolerance_m: 1.5,
            vertical_tolerance_m: 1.0,
            takeoff_ratio: 0.95,
            landed_altitude_m: 0.3,
            stall: StallPolicy::default(),
        }
    }
}

impl MissionTiming {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.status_poll.is_zero() {
            return Err(ConfigError::ZeroInterval("status"));
        }
        if self.arrival_poll.is_zero() {
            return Err(ConfigError::ZeroInterval("arrival"));
        }
        positive(self.horizontal_tolerance_m).map_err(|value| {
            ConfigError::InvalidTolerance { which: "horizontal tolerance", value }
        })?;
        positive(self.vertical_tolerance_m).map_err(|value| {
            ConfigError::InvalidTolerance { which: "vertical tolerance", value }
        })?;
        positive(self.landed_altitude_m).map_err(|value| {
            ConfigError::InvalidTolerance { which: "landed altitude", value }
        })?;
        if !(self.takeoff_ratio > 0.0 && self.takeoff_ratio <= 1.0) {
            return Err(ConfigError::InvalidTakeoffRatio(self.takeoff_ratio));
        }
        Ok(())
    }
}

/// How long a poll loop may go without seeing its success condition.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StallPolicy {
    /// Wait forever; only operator cancellation ends a stalled loop
    Unbounded,
    /// Fail with a timeout once a stage exceeds its limit
    Bounded(StallTimeouts),
}

impl Default for StallPolicy {
    fn default() -> Self {
        StallPolicy::Bounded(StallTimeouts::default())
    }
}

impl StallPolicy {
    /// Time limit for `stage`, or `None` when waiting is unbounded.
    pub fn limit(&self, stage: Stage) -> Option<Duration> {
        match self {
            StallPolicy::Unbounded => None,
            StallPolicy::Bounded(timeouts) => Some(timeouts.for_stage(stage)),
        }
    }
}

/// Per-stage stall limits.
///
/// `arrival` is a base allowance per waypoint; the navigator adds twice the
/// leg's expected travel time at the commanded speed on top of it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StallTimeouts {
    pub preflight: Duration,
    pub arming: Duration,
    pub takeoff: Duration,
    pub arrival: Duration,
    pub landing: Duration,
}

impl Default for StallTimeouts {
    fn default() -> Self {
        Self {
            preflight: Duration::from_secs(300),
            arming: Duration::from_secs(60),
            takeoff: Duration::from_secs(120),
            arrival: Duration::from_secs(120),
            landing: Duration::from_secs(180),
        }
    }
}

impl StallTimeouts {
    pub fn for_stage(&self, stage: Stage) -> Duration {
        match stage {
            Stage::Preflight => self.preflight,
            Stage::Arming => self.arming,
            Stage::Takeoff => self.takeoff,
            Stage::Arrival => self.arrival,
            Stage::Landing => self.landing,
        }
    }
}

/// Whole or fractional seconds as a `Duration`.
///
/// Rejects negative, NaN, infinite and overflowing values instead of
/// panicking like `Duration::from_secs_f64`.
pub fn seconds(which: &'static str, secs: f64) -> Result<Duration, ConfigError> {
    Duration::try_from_secs_f64(secs).map_err(|_| ConfigError::InvalidDuration { which, value: secs })
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|s| s.trim().parse().ok())
}

fn env_duration(key: &'static str) -> Option<Duration> {
    env_parse::<f64>(key).and_then(|secs| seconds(key, secs.max(0.0)).ok())
}

fn positive(value: f64) -> Result<(), f64> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = MissionConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.link_address, "udp:127.0.0.1:14551");
        assert_eq!(config.timing.draw_delay, Duration::from_secs(10));
    }

    #[test]
    fn test_rejects_non_positive_radius() {
        let config = MissionConfig { inner_radius_m: 0.0, ..MissionConfig::default() };
        assert_eq!(
            config.validate_geometry(),
            Err(ConfigError::InvalidRadius { which: "inner", value: 0.0 })
        );

        let config = MissionConfig { outer_radius_m: -3.0, ..MissionConfig::default() };
        assert!(matches!(
            config.validate_geometry(),
            Err(ConfigError::InvalidRadius { which: "outer", .. })
        ));
    }

    #[test]
    fn test_rejects_zero_layers_and_negative_decrement() {
        let config = MissionConfig { layers: 0, ..MissionConfig::default() };
        assert_eq!(config.validate_geometry(), Err(ConfigError::NoLayers));

        let config = MissionConfig { altitude_decrement_m: -1.0, ..MissionConfig::default() };
        assert_eq!(config.validate_geometry(), Err(ConfigError::NegativeDecrement(-1.0)));
    }

    #[test]
    fn test_rejects_altitude_below_floor() {
        let config = MissionConfig { initial_altitude_m: 3.0, ..MissionConfig::default() };
        assert!(matches!(config.validate_geometry(), Err(ConfigError::BelowFloor { .. })));
    }

    #[test]
    fn test_rejects_non_positive_floor() {
        for floor in [0.0, -20.0, f64::NAN, f64::INFINITY] {
            let config = MissionConfig { altitude_floor_m: floor, layers: 12, ..MissionConfig::default() };
            assert!(
                matches!(config.validate(), Err(ConfigError::InvalidFloor(_))),
                "floor {} accepted",
                floor
            );
        }
    }

    #[test]
    fn test_rejects_excessive_layer_count() {
        let config = MissionConfig { layers: 4_000_000_000, ..MissionConfig::default() };
        assert_eq!(
            config.validate_geometry(),
            Err(ConfigError::TooManyLayers { layers: 4_000_000_000, max: MAX_LAYERS })
        );

        let config = MissionConfig { layers: MAX_LAYERS, ..MissionConfig::default() };
        assert!(config.validate_geometry().is_ok());
    }

    #[test]
    fn test_seconds_rejects_unrepresentable_values() {
        assert_eq!(seconds("draw delay", 2.5), Ok(Duration::from_millis(2_500)));
        assert_eq!(seconds("draw delay", 0.0), Ok(Duration::ZERO));
        for secs in [f64::INFINITY, 1e30, -1.0, f64::NAN] {
            assert!(matches!(
                seconds("draw delay", secs),
                Err(ConfigError::InvalidDuration { which: "draw delay", .. })
            ));
        }
    }

    #[test]
    fn test_env_overflowing_delay_falls_back_to_default() {
        // Only test in this crate that touches the process environment
        env::set_var("HEXSTAR_DRAW_DELAY_SECS", "inf");
        env::set_var("HEXSTAR_ARRIVAL_TIMEOUT_SECS", "1e30");
        let config = MissionConfig::from_env();
        env::remove_var("HEXSTAR_DRAW_DELAY_SECS");
        env::remove_var("HEXSTAR_ARRIVAL_TIMEOUT_SECS");

        assert_eq!(config.timing.draw_delay, MissionTiming::default().draw_delay);
        assert_eq!(config.timing.stall, StallPolicy::default());
    }

    #[test]
    fn test_rejects_bad_speed_and_timing() {
        let config = MissionConfig { cruise_speed_mps: 0.0, ..MissionConfig::default() };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidSpeed { which: "cruise", .. })));

        let mut config = MissionConfig::default();
        config.timing.arrival_poll = Duration::ZERO;
        assert_eq!(config.validate(), Err(ConfigError::ZeroInterval("arrival")));

        let mut config = MissionConfig::default();
        config.timing.takeoff_ratio = 1.5;
        assert_eq!(config.validate(), Err(ConfigError::InvalidTakeoffRatio(1.5)));
    }

    #[test]
    fn test_stall_policy_limits() {
        assert_eq!(StallPolicy::Unbounded.limit(Stage::Arrival), None);
        assert_eq!(
            StallPolicy::default().limit(Stage::Arming),
            Some(Duration::from_secs(60))
        );
    }

    #[test]
    fn test_config_deserializes_partial_json() {
        let config: MissionConfig =
            serde_json::from_str(r#"{"layers": 5, "link_address": "sim"}"#).unwrap();
        assert_eq!(config.layers, 5);
        assert_eq!(config.link_address, "sim");
        assert_eq!(config.outer_radius_m, DEFAULT_OUTER_RADIUS_M);
    }
}
