//! Single-waypoint navigation: speed, heading, position target, arrival.

use std::time::Duration;

use hexstar_core::{MissionTiming, Stage, Waypoint};
use hexstar_link::VehicleLink;
use tokio_util::sync::CancellationToken;

use crate::error::MissionError;
use crate::wait::{ensure_active, until_cancelled, Poller};

const TRAVEL_SLACK: f64 = 2.0;

/// Residual error when a waypoint was reached.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Arrival {
    pub horizontal_error_m: f64,
    pub vertical_error_m: f64,
    /// Poll intervals waited before arrival
    pub polls: u32,
}

/// Compass heading from one local position to another.
///
/// Degrees clockwise from north, normalized to `[0, 360)`.
pub fn heading_to(from_north: f64, from_east: f64, to_north: f64, to_east: f64) -> f64 {
    let mut heading = (to_east - from_east).atan2(to_north - from_north).to_degrees();

    // Normalize to 0-360
    if heading < 0.0 {
        heading += 360.0;
    }
    if heading >= 360.0 {
        heading -= 360.0;
    }
    // fold -0.0
    heading + 0.0
}

pub fn horizontal_distance(from_north: f64, from_east: f64, to_north: f64, to_east: f64) -> f64 {
    (to_north - from_north).hypot(to_east - from_east)
}

/// Both errors must be strictly inside their tolerance.
pub fn within_tolerance(horizontal_m: f64, vertical_m: f64, timing: &MissionTiming) -> bool {
    horizontal_m < timing.horizontal_tolerance_m && vertical_m < timing.vertical_tolerance_m
}

/// Drives the vehicle to one waypoint at a time over a borrowed link.
pub struct Navigator<'a, L: VehicleLink> {
    link: &'a mut L,
    timing: &'a MissionTiming,
    cancel: &'a CancellationToken,
}

impl<'a, L: VehicleLink> Navigator<'a, L> {
    pub fn new(link: &'a mut L, timing: &'a MissionTiming, cancel: &'a CancellationToken) -> Self {
        Self { link, timing, cancel }
    }

    /// Fly to `waypoint` and wait until it is reached.
    ///
    /// Issues, in order: a speed change (only if the waypoint has a speed),
    /// an absolute heading towards the target, and a local NED position
    /// target with the altitude negated. Then polls position and altitude
    /// until both tolerances hold. Every link call is raced against
    /// cancellation.
    pub async fn navigate_to(&mut self, waypoint: &Waypoint) -> Result<Arrival, MissionError> {
        ensure_active(self.cancel)?;

        if let Some(speed) = waypoint.speed_mps {
            until_cancelled(self.link.send_speed(speed), self.cancel).await?;
        }

        let position = until_cancelled(self.link.local_position(), self.cancel).await?;
        let (from_north, from_east) = (position.north_or_zero(), position.east_or_zero());
        let heading = heading_to(from_north, from_east, waypoint.north, waypoint.east);
        until_cancelled(self.link.send_heading(heading, false), self.cancel).await?;

        // NED: down is positive, so altitude above home goes out negated
        until_cancelled(
            self.link
                .send_position_target(waypoint.north, waypoint.east, -waypoint.altitude_m),
            self.cancel,
        )
        .await?;

        tracing::debug!(
            north = waypoint.north,
            east = waypoint.east,
            altitude_m = waypoint.altitude_m,
            heading,
            "Position target sent"
        );

        let leg_m = horizontal_distance(from_north, from_east, waypoint.north, waypoint.east);
        let mut poller = Poller::new(
            Stage::Arrival,
            self.timing.arrival_poll,
            &self.timing.stall,
            self.cancel,
        )
        .extend_limit(travel_allowance(leg_m, waypoint.speed_mps));

        loop {
            let position = until_cancelled(self.link.local_position(), self.cancel).await?;
            let altitude = until_cancelled(self.link.relative_altitude(), self.cancel).await?;

            let horizontal = horizontal_distance(
                position.north_or_zero(),
                position.east_or_zero(),
                waypoint.north,
                waypoint.east,
            );
            let vertical = (waypoint.altitude_m - altitude).abs();

            if within_tolerance(horizontal, vertical, self.timing) {
                return Ok(Arrival {
                    horizontal_error_m: horizontal,
                    vertical_error_m: vertical,
                    polls: poller.polls(),
                });
            }

            tracing::trace!(horizontal, vertical, "En route");
            poller.wait().await?;
        }
    }
}

/// Extra arrival time for a leg: twice its travel time at `speed_mps`.
///
/// Legs without a commanded speed get no allowance beyond the stage limit.
pub fn travel_allowance(leg_m: f64, speed_mps: Option<f64>) -> Duration {
    match speed_mps {
        Some(speed) if speed > 0.0 => {
            Duration::try_from_secs_f64(TRAVEL_SLACK * leg_m / speed).unwrap_or(Duration::MAX)
        }
        _ => Duration::ZERO,
    }
}
