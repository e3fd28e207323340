//! Kinematic simulated vehicle.
//!
//! Time is taken from tokio's clock, so tests running with a paused runtime
//! fly whole missions instantly and deterministically.

use std::time::Duration;

use tokio::time::Instant;

use crate::address::LinkAddress;
use crate::error::LinkError;
use crate::link::{CommandLog, Connector, FlightMode, LinkCommand, LocalPosition, VehicleLink};

/// Simulated airframe behaviour.
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Time after connecting before the vehicle reports armable
    pub warmup: Duration,
    pub climb_rate_mps: f64,
    pub land_rate_mps: f64,
    /// Ground speed until a speed command is received
    pub default_speed_mps: f64,
    /// Report unknown local axes until the warm-up is over
    pub delayed_local_origin: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            warmup: Duration::from_secs(2),
            climb_rate_mps: 2.5,
            land_rate_mps: 1.5,
            default_speed_mps: 5.0,
            delayed_local_origin: true,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Target {
    north: f64,
    east: f64,
    altitude: f64,
}

/// In-process vehicle that integrates its position on every link call.
pub struct SimulatedVehicle {
    config: SimConfig,
    log: CommandLog,
    connected_at: Instant,
    last_update: Instant,
    north: f64,
    east: f64,
    altitude: f64,
    heading_deg: f64,
    speed_mps: f64,
    armed: bool,
    mode: FlightMode,
    target: Option<Target>,
    closed: bool,
}

impl SimulatedVehicle {
    pub fn new(config: SimConfig) -> Self {
        Self::with_log(config, CommandLog::new())
    }

    /// Create a vehicle that records its commands into an existing log.
    pub fn with_log(config: SimConfig, log: CommandLog) -> Self {
        let now = Instant::now();
        Self {
            speed_mps: config.default_speed_mps,
            config,
            log,
            connected_at: now,
            last_update: now,
            north: 0.0,
            east: 0.0,
            altitude: 0.0,
            heading_deg: 0.0,
            armed: false,
            mode: FlightMode::Other("STABILIZE".to_string()),
            target: None,
            closed: false,
        }
    }

    pub fn command_log(&self) -> CommandLog {
        self.log.clone()
    }

    pub fn mode(&self) -> &FlightMode {
        &self.mode
    }

    pub fn heading_deg(&self) -> f64 {
        self.heading_deg
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn warmed_up(&self) -> bool {
        Instant::now().saturating_duration_since(self.connected_at) >= self.config.warmup
    }

    fn ensure_open(&self) -> Result<(), LinkError> {
        if self.closed {
            Err(LinkError::Closed)
        } else {
            Ok(())
        }
    }

    fn record(&self, command: LinkCommand) {
        tracing::debug!(?command, "sim command");
        self.log.push(command);
    }

    /// Integrate motion since the last call.
    fn advance(&mut self) {
        let now = Instant::now();
        let dt = now.saturating_duration_since(self.last_update).as_secs_f64();
        self.last_update = now;

        if !self.armed || dt <= 0.0 {
            return;
        }

        match self.mode {
            FlightMode::Land => {
                self.altitude = (self.altitude - self.config.land_rate_mps * dt).max(0.0);
                if self.altitude <= 0.0 {
                    self.armed = false;
                    self.target = None;
                }
            }
            FlightMode::Guided => {
                if let Some(target) = self.target {
                    let (north, east) = step_toward(
                        (self.north, self.east),
                        (target.north, target.east),
                        self.speed_mps * dt,
                    );
                    self.north = north;
                    self.east = east;
                    self.altitude =
                        step_scalar(self.altitude, target.altitude, self.config.climb_rate_mps * dt);
                }
            }
            FlightMode::Other(_) => {}
        }
    }

    fn reject(command: &'static str, reason: &str) -> LinkError {
        LinkError::Rejected {
            command,
            reason: reason.to_string(),
        }
    }
}

impl VehicleLink for SimulatedVehicle {
    async fn is_armable(&mut self) -> Result<bool, LinkError> {
        self.ensure_open()?;
        Ok(self.warmed_up())
    }

    async fn set_mode(&mut self, mode: FlightMode) -> Result<(), LinkError> {
        self.ensure_open()?;
        self.record(LinkCommand::SetMode { mode: mode.clone() });
        self.advance();
        if mode == FlightMode::Guided {
            self.target = None;
        }
        self.mode = mode;
        Ok(())
    }

    async fn arm(&mut self) -> Result<(), LinkError> {
        self.ensure_open()?;
        self.record(LinkCommand::Arm);
        if !self.warmed_up() {
            return Err(Self::reject("arm", "vehicle not armable"));
        }
        if self.mode != FlightMode::Guided {
            return Err(Self::reject("arm", "arming requires GUIDED"));
        }
        self.advance();
        self.armed = true;
        Ok(())
    }

    async fn is_armed(&mut self) -> Result<bool, LinkError> {
        self.ensure_open()?;
        self.advance();
        Ok(self.armed)
    }

    async fn local_position(&mut self) -> Result<LocalPosition, LinkError> {
        self.ensure_open()?;
        self.advance();
        if self.config.delayed_local_origin && !self.warmed_up() {
            return Ok(LocalPosition::default());
        }
        Ok(LocalPosition::new(self.north, self.east))
    }

    async fn relative_altitude(&mut self) -> Result<f64, LinkError> {
        self.ensure_open()?;
        self.advance();
        Ok(self.altitude)
    }

    async fn send_heading(&mut self, degrees: f64, relative: bool) -> Result<(), LinkError> {
        self.ensure_open()?;
        self.record(LinkCommand::Heading { degrees, relative });
        let heading = if relative { self.heading_deg + degrees } else { degrees };
        self.heading_deg = heading.rem_euclid(360.0);
        Ok(())
    }

    async fn send_speed(&mut self, meters_per_second: f64) -> Result<(), LinkError> {
        self.ensure_open()?;
        self.record(LinkCommand::Speed { meters_per_second });
        if !(meters_per_second > 0.0) {
            return Err(Self::reject("speed", "speed must be positive"));
        }
        self.advance();
        self.speed_mps = meters_per_second;
        Ok(())
    }

    async fn send_position_target(&mut self, north: f64, east: f64, down: f64) -> Result<(), LinkError> {
        self.ensure_open()?;
        self.record(LinkCommand::PositionTarget { north, east, down });
        if self.mode != FlightMode::Guided {
            return Err(Self::reject("position target", "vehicle not in GUIDED"));
        }
        self.advance();
        self.target = Some(Target {
            north,
            east,
            altitude: -down,
        });
        Ok(())
    }

    async fn send_takeoff(&mut self, altitude_m: f64) -> Result<(), LinkError> {
        self.ensure_open()?;
        self.record(LinkCommand::Takeoff { altitude_m });
        if !self.armed {
            return Err(Self::reject("takeoff", "vehicle not armed"));
        }
        if self.mode != FlightMode::Guided {
            return Err(Self::reject("takeoff", "vehicle not in GUIDED"));
        }
        self.advance();
        self.target = Some(Target {
            north: self.north,
            east: self.east,
            altitude: altitude_m,
        });
        Ok(())
    }

    fn close(&mut self) {
        if !self.closed {
            self.record(LinkCommand::Close);
            self.closed = true;
        }
    }
}

/// Connects `sim` addresses to a fresh [`SimulatedVehicle`].
///
/// Network schemes need a protocol driver, which this connector does not
/// provide; they fail with [`LinkError::Connection`].
#[derive(Debug, Clone, Default)]
pub struct SimConnector {
    pub config: SimConfig,
    pub log: CommandLog,
}

impl SimConnector {
    pub fn new(config: SimConfig) -> Self {
        Self {
            config,
            log: CommandLog::new(),
        }
    }
}

impl Connector for SimConnector {
    type Link = SimulatedVehicle;

    async fn connect(&self, address: &LinkAddress) -> Result<SimulatedVehicle, LinkError> {
        match address {
            LinkAddress::Sim => {
                tracing::info!("Connected to simulated vehicle");
                Ok(SimulatedVehicle::with_log(self.config.clone(), self.log.clone()))
            }
            other => Err(LinkError::Connection {
                address: other.to_string(),
                reason: format!("no protocol driver for {} links; use `sim`", other.scheme()),
            }),
        }
    }
}

fn step_toward(from: (f64, f64), to: (f64, f64), max_step: f64) -> (f64, f64) {
    let dn = to.0 - from.0;
    let de = to.1 - from.1;
    let distance = dn.hypot(de);
    if distance <= max_step || distance == 0.0 {
        return to;
    }
    let scale = max_step / distance;
    (from.0 + dn * scale, from.1 + de * scale)
}

fn step_scalar(from: f64, to: f64, max_step: f64) -> f64 {
    let delta = to - from;
    if delta.abs() <= max_step {
        to
    } else {
        from + max_step * delta.signum()
    }
}
