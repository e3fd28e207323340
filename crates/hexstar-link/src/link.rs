//! The vehicle link trait and the types it exchanges.

use std::fmt;
use std::ops::{Deref, DerefMut};
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::address::LinkAddress;
use crate::error::LinkError;

/// Autopilot flight modes the mission uses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlightMode {
    /// Accepts position, heading and speed commands from the link
    Guided,
    /// Descend and land in place
    Land,
    /// Any other mode reported by the autopilot
    Other(String),
}

impl fmt::Display for FlightMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlightMode::Guided => write!(f, "GUIDED"),
            FlightMode::Land => write!(f, "LAND"),
            FlightMode::Other(name) => write!(f, "{}", name),
        }
    }
}

impl FromStr for FlightMode {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_uppercase().as_str() {
            "GUIDED" => FlightMode::Guided,
            "LAND" => FlightMode::Land,
            other => FlightMode::Other(other.to_string()),
        })
    }
}

/// Local-frame position as reported by the vehicle.
///
/// Either axis may be unknown, e.g. before the autopilot has set its local
/// origin.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LocalPosition {
    pub north: Option<f64>,
    pub east: Option<f64>,
}

impl LocalPosition {
    pub fn new(north: f64, east: f64) -> Self {
        Self { north: Some(north), east: Some(east) }
    }

    /// North axis, or 0 when unknown.
    ///
    /// Unknown axes are deliberately read as the local origin rather than
    /// treated as a fault.
    pub fn north_or_zero(&self) -> f64 {
        self.north.unwrap_or(0.0)
    }

    /// East axis, or 0 when unknown. See [`LocalPosition::north_or_zero`].
    pub fn east_or_zero(&self) -> f64 {
        self.east.unwrap_or(0.0)
    }
}

/// Commands and queries a vehicle link must support.
///
/// Commands take `&mut self`: a link has a single owner and a single writer.
#[allow(async_fn_in_trait)]
pub trait VehicleLink {
    async fn is_armable(&mut self) -> Result<bool, LinkError>;

    async fn set_mode(&mut self, mode: FlightMode) -> Result<(), LinkError>;

    /// Request arming. Completion is observed through [`VehicleLink::is_armed`].
    async fn arm(&mut self) -> Result<(), LinkError>;

    async fn is_armed(&mut self) -> Result<bool, LinkError>;

    async fn local_position(&mut self) -> Result<LocalPosition, LinkError>;

    /// Altitude above home in meters, positive up.
    async fn relative_altitude(&mut self) -> Result<f64, LinkError>;

    /// Yaw to `degrees`, absolute from north unless `relative`.
    async fn send_heading(&mut self, degrees: f64, relative: bool) -> Result<(), LinkError>;

    async fn send_speed(&mut self, meters_per_second: f64) -> Result<(), LinkError>;

    /// Position target in the local NED frame. `down` is negative above home.
    async fn send_position_target(&mut self, north: f64, east: f64, down: f64) -> Result<(), LinkError>;

    async fn send_takeoff(&mut self, altitude_m: f64) -> Result<(), LinkError>;

    /// Release the link. Must be idempotent.
    fn close(&mut self);
}

/// Opens vehicle links for a parsed address.
#[allow(async_fn_in_trait)]
pub trait Connector {
    type Link: VehicleLink;

    async fn connect(&self, address: &LinkAddress) -> Result<Self::Link, LinkError>;
}

/// Owns a link and closes it exactly once, on [`LinkGuard::release`] or on drop.
pub struct LinkGuard<L: VehicleLink> {
    link: L,
    closed: bool,
}

impl<L: VehicleLink> LinkGuard<L> {
    pub fn new(link: L) -> Self {
        Self { link, closed: false }
    }

    /// Close the link now.
    pub fn release(mut self) {
        self.close_once();
    }

    fn close_once(&mut self) {
        if !self.closed {
            self.closed = true;
            self.link.close();
        }
    }
}

impl<L: VehicleLink> Deref for LinkGuard<L> {
    type Target = L;

    fn deref(&self) -> &L {
        &self.link
    }
}

impl<L: VehicleLink> DerefMut for LinkGuard<L> {
    fn deref_mut(&mut self) -> &mut L {
        &mut self.link
    }
}

impl<L: VehicleLink> Drop for LinkGuard<L> {
    fn drop(&mut self) {
        self.close_once();
    }
}

/// A command issued over a link, as recorded by [`CommandLog`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LinkCommand {
    SetMode { mode: FlightMode },
    Arm,
    Heading { degrees: f64, relative: bool },
    Speed { meters_per_second: f64 },
    PositionTarget { north: f64, east: f64, down: f64 },
    Takeoff { altitude_m: f64 },
    Close,
}

/// Shared, append-only record of link commands.
#[derive(Debug, Clone, Default)]
pub struct CommandLog {
    entries: Arc<Mutex<Vec<LinkCommand>>>,
}

impl CommandLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, command: LinkCommand) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push(command);
        }
    }

    /// Copy of every command recorded so far.
    pub fn snapshot(&self) -> Vec<LinkCommand> {
        self.entries.lock().map(|entries| entries.clone()).unwrap_or_default()
    }

    pub fn count(&self, predicate: impl Fn(&LinkCommand) -> bool) -> usize {
        self.entries
            .lock()
            .map(|entries| entries.iter().filter(|c| predicate(c)).count())
            .unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.count(|_| true)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct CountingLink {
        closes: Arc<AtomicU32>,
    }

    impl VehicleLink for CountingLink {
        async fn is_armable(&mut self) -> Result<bool, LinkError> {
            Ok(true)
        }
        async fn set_mode(&mut self, _mode: FlightMode) -> Result<(), LinkError> {
            Ok(())
        }
        async fn arm(&mut self) -> Result<(), LinkError> {
            Ok(())
        }
        async fn is_armed(&mut self) -> Result<bool, LinkError> {
            Ok(true)
        }
        async fn local_position(&mut self) -> Result<LocalPosition, LinkError> {
            Ok(LocalPosition::default())
        }
        async fn relative_altitude(&mut self) -> Result<f64, LinkError> {
            Ok(0.0)
        }
        async fn send_heading(&mut self, _degrees: f64, _relative: bool) -> Result<(), LinkError> {
            Ok(())
        }
        async fn send_speed(&mut self, _mps: f64) -> Result<(), LinkError> {
            Ok(())
        }
        async fn send_position_target(&mut self, _n: f64, _e: f64, _d: f64) -> Result<(), LinkError> {
            Ok(())
        }
        async fn send_takeoff(&mut self, _altitude_m: f64) -> Result<(), LinkError> {
            Ok(())
        }
        fn close(&mut self) {
            self.closes.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_unknown_axes_read_as_zero() {
        let position = LocalPosition { north: None, east: Some(4.0) };
        assert_eq!(position.north_or_zero(), 0.0);
        assert_eq!(position.east_or_zero(), 4.0);
    }

    #[test]
    fn test_flight_mode_names() {
        assert_eq!(FlightMode::Guided.to_string(), "GUIDED");
        assert_eq!("land".parse::<FlightMode>().unwrap(), FlightMode::Land);
        assert_eq!(
            "RTL".parse::<FlightMode>().unwrap(),
            FlightMode::Other("RTL".to_string())
        );
    }

    #[test]
    fn test_guard_release_closes_once() {
        let closes = Arc::new(AtomicU32::new(0));
        let guard = LinkGuard::new(CountingLink { closes: closes.clone() });

        guard.release();
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_guard_closes_on_drop() {
        let closes = Arc::new(AtomicU32::new(0));
        {
            let _guard = LinkGuard::new(CountingLink { closes: closes.clone() });
        }
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_command_log_counts() {
        let log = CommandLog::new();
        log.push(LinkCommand::Arm);
        log.push(LinkCommand::Speed { meters_per_second: 8.0 });
        log.clone().push(LinkCommand::Speed { meters_per_second: 15.0 });

        assert_eq!(log.len(), 3);
        assert_eq!(log.count(|c| matches!(c, LinkCommand::Speed { .. })), 2);
    }
}
