//! Star trajectory core: geometry, layered flight plans and mission configuration.

pub mod config;
pub mod error;
pub mod geometry;
pub mod models;
pub mod plan;

pub use config::{seconds, MissionConfig, MissionTiming, StallPolicy, StallTimeouts, MAX_LAYERS};
pub use error::ConfigError;
pub use geometry::{star_points, STAR_POINT_COUNT};
pub use models::{FlightPhase, PlanarOffset, Stage, StarLayer, Waypoint};
pub use plan::FlightPlan;
