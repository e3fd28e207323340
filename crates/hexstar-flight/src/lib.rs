//! Mission execution: waypoint navigation and the flight phase state machine.

pub mod controller;
pub mod error;
pub mod navigator;
pub mod report;
pub mod wait;

pub use controller::MissionController;
pub use error::MissionError;
pub use navigator::{heading_to, horizontal_distance, within_tolerance, Arrival, Navigator};
pub use report::{MissionOutcome, MissionReport};
