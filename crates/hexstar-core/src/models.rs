//! Core data models for star trajectory missions.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::geometry::{star_points, STAR_POINT_COUNT};

/// Planar offset in the local frame, relative to the flight origin.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanarOffset {
    pub north: f64,
    pub east: f64,
}

impl PlanarOffset {
    pub fn new(north: f64, east: f64) -> Self {
        Self { north, east }
    }
}

/// A single navigation target in the local frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub north: f64,
    pub east: f64,
    /// Altitude above home, positive up
    pub altitude_m: f64,
    /// Commanded ground speed for the leg, if any
    pub speed_mps: Option<f64>,
}

/// One full star traversal at a fixed altitude and radius pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StarLayer {
    pub index: u32,
    pub altitude_m: f64,
    pub outer_radius_m: f64,
    pub inner_radius_m: f64,
    pub points: [PlanarOffset; STAR_POINT_COUNT],
}

impl StarLayer {
    /// Generate the layer's star outline.
    pub fn new(index: u32, altitude_m: f64, outer_radius_m: f64, inner_radius_m: f64) -> Self {
        Self {
            index,
            altitude_m,
            outer_radius_m,
            inner_radius_m,
            points: star_points(outer_radius_m, inner_radius_m),
        }
    }

    /// Waypoints for this layer, in flight order.
    ///
    /// The first point is the approach leg and carries `approach_speed_mps`;
    /// every later point carries `cruise_speed_mps`.
    pub fn waypoints(&self, approach_speed_mps: f64, cruise_speed_mps: f64) -> Vec<Waypoint> {
        self.points
            .iter()
            .enumerate()
            .map(|(i, point)| Waypoint {
                north: point.north,
                east: point.east,
                altitude_m: self.altitude_m,
                speed_mps: Some(if i == 0 { approach_speed_mps } else { cruise_speed_mps }),
            })
            .collect()
    }
}

/// Poll loops that wait on the vehicle. Each one may be bounded by a stall timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// Waiting for the vehicle to report armable
    Preflight,
    /// Waiting for the armed flag
    Arming,
    /// Climbing to the initial altitude
    Takeoff,
    /// Flying to a waypoint
    Arrival,
    /// Descending in LAND mode
    Landing,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Preflight => write!(f, "preflight"),
            Stage::Arming => write!(f, "arming"),
            Stage::Takeoff => write!(f, "takeoff"),
            Stage::Arrival => write!(f, "arrival"),
            Stage::Landing => write!(f, "landing"),
        }
    }
}

/// Mission lifecycle phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "phase")]
pub enum FlightPhase {
    Initializing,
    Arming,
    TakingOff,
    Navigating { layer: u32, waypoint: usize },
    Landing,
    Complete,
    Aborted,
}

impl FlightPhase {
    fn rank(&self) -> u8 {
        match self {
            FlightPhase::Initializing => 0,
            FlightPhase::Arming => 1,
            FlightPhase::TakingOff => 2,
            FlightPhase::Navigating { .. } => 3,
            FlightPhase::Landing => 4,
            FlightPhase::Complete | FlightPhase::Aborted => 5,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, FlightPhase::Complete | FlightPhase::Aborted)
    }

    /// Whether `next` is a legal successor of `self`.
    ///
    /// Phases only move forward. Within `Navigating` the (layer, waypoint)
    /// cursor must not go backwards. Any non-terminal phase may abort.
    pub fn can_advance_to(&self, next: &FlightPhase) -> bool {
        if self.is_terminal() {
            return false;
        }
        match (self, next) {
            (_, FlightPhase::Aborted) => true,
            (FlightPhase::Landing, FlightPhase::Complete) => true,
            (_, FlightPhase::Complete) => false,
            (
                FlightPhase::Navigating { layer: l1, waypoint: w1 },
                FlightPhase::Navigating { layer: l2, waypoint: w2 },
            ) => (l2, w2) > (l1, w1),
            _ => next.rank() == self.rank() + 1,
        }
    }
}

impl fmt::Display for FlightPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlightPhase::Initializing => write!(f, "INITIALIZING"),
            FlightPhase::Arming => write!(f, "ARMING"),
            FlightPhase::TakingOff => write!(f, "TAKING_OFF"),
            FlightPhase::Navigating { layer, waypoint } => {
                write!(f, "NAVIGATING(layer {}, point {})", layer + 1, waypoint + 1)
            }
            FlightPhase::Landing => write!(f, "LANDING"),
            FlightPhase::Complete => write!(f, "COMPLETE"),
            FlightPhase::Aborted => write!(f, "ABORTED"),
        }
    }
}
