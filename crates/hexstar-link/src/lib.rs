//! Vehicle link contract.
//!
//! The mission core talks to the autopilot only through [`VehicleLink`].
//! Wire protocols live behind [`Connector`] implementations; this crate ships
//! a kinematic [`SimulatedVehicle`] so missions can be flown without one.

pub mod address;
pub mod error;
pub mod link;
pub mod sim;

pub use address::LinkAddress;
pub use error::LinkError;
pub use link::{CommandLog, Connector, FlightMode, LinkCommand, LinkGuard, LocalPosition, VehicleLink};
pub use sim::{SimConfig, SimConnector, SimulatedVehicle};
