//! Flight phase state machine.
//!
//! Drives a mission from preflight through every star layer to touchdown:
//!
//! 1. INITIALIZING: wait for the vehicle to report armable
//! 2. ARMING: switch to GUIDED, arm, wait for the armed flag
//! 3. TAKING_OFF: climb to the initial altitude
//! 4. NAVIGATING: fly each layer's waypoints in order
//! 5. LANDING: switch to LAND, wait for touchdown
//! 6. COMPLETE
//!
//! Cancellation from any phase commands LAND once and ends the mission as
//! ABORTED. The link is closed exactly once on every exit path.

use chrono::Utc;
use hexstar_core::{ConfigError, FlightPhase, FlightPlan, MissionConfig, Stage, Waypoint};
use hexstar_link::{FlightMode, LinkGuard, VehicleLink};
use tokio::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

use crate::error::MissionError;
use crate::navigator::Navigator;
use crate::report::{MissionOutcome, MissionReport};
use crate::wait::{ensure_active, sleep_or_cancel, until_cancelled, Poller};

const COUNTDOWN_STEP: Duration = Duration::from_secs(1);

/// Sole owner of the vehicle link for the duration of a mission.
pub struct MissionController<L: VehicleLink> {
    link: LinkGuard<L>,
    plan: FlightPlan,
    config: MissionConfig,
    phase: FlightPhase,
    takeoff_commanded: bool,
    land_commanded: bool,
    layers_completed: u32,
    waypoints_reached: usize,
}

impl<L: VehicleLink> MissionController<L> {
    /// Validate `config` and build the plan that will be flown from it.
    ///
    /// On error no command is sent and the link is closed.
    pub fn new(link: L, config: MissionConfig) -> Result<Self, ConfigError> {
        let link = LinkGuard::new(link);
        config.validate()?;
        let plan = FlightPlan::build(&config)?;

        Ok(Self {
            link,
            plan,
            config,
            phase: FlightPhase::Initializing,
            takeoff_commanded: false,
            land_commanded: false,
            layers_completed: 0,
            waypoints_reached: 0,
        })
    }

    pub fn plan(&self) -> &FlightPlan {
        &self.plan
    }

    pub fn phase(&self) -> FlightPhase {
        self.phase
    }

    /// Fly the whole mission.
    ///
    /// Returns `Ok` for completed and operator-aborted missions. Errors are
    /// link failures and stall timeouts; if one happens after takeoff was
    /// commanded, LAND is requested before the error is returned.
    pub async fn run(mut self, cancel: CancellationToken) -> Result<MissionReport, MissionError> {
        let started_at = Utc::now();
        let started = Instant::now();

        let result = self.execute(&cancel).await;

        let outcome = match result {
            Ok(()) => Ok(MissionOutcome::Completed),
            Err(MissionError::Cancelled) => {
                let during = self.phase;
                tracing::warn!("Operator abort during {}, switching to LAND", during);
                self.abort().await;
                Ok(MissionOutcome::Aborted { during })
            }
            Err(err) => {
                tracing::error!("Mission failed during {}: {}", self.phase, err);
                if self.takeoff_commanded {
                    tracing::warn!("Failsafe: switching to LAND");
                    self.abort().await;
                } else {
                    self.enter(FlightPhase::Aborted).ok();
                }
                Err(err)
            }
        };

        let layers_completed = self.layers_completed;
        let waypoints_reached = self.waypoints_reached;

        self.link.release();
        tracing::info!("Vehicle link closed");

        outcome.map(|outcome| MissionReport {
            outcome,
            layers_completed,
            waypoints_reached,
            started_at,
            elapsed: started.elapsed(),
        })
    }

    async fn execute(&mut self, cancel: &CancellationToken) -> Result<(), MissionError> {
        self.preflight(cancel).await?;
        self.arm(cancel).await?;
        self.take_off(cancel).await?;
        self.fly_layers(cancel).await?;
        self.land(cancel).await?;

        self.enter(FlightPhase::Complete)?;
        tracing::info!(
            layers = self.layers_completed,
            waypoints = self.waypoints_reached,
            "Mission complete"
        );
        Ok(())
    }

    fn enter(&mut self, next: FlightPhase) -> Result<(), MissionError> {
        if !self.phase.can_advance_to(&next) {
            return Err(MissionError::IllegalTransition {
                from: self.phase,
                to: next,
            });
        }
        tracing::debug!("Phase {} -> {}", self.phase, next);
        self.phase = next;
        Ok(())
    }

    fn poller<'c>(&self, stage: Stage, cancel: &'c CancellationToken) -> Poller<'c> {
        let timing = &self.config.timing;
        let interval = match stage {
            Stage::Arrival => timing.arrival_poll,
            _ => timing.status_poll,
        };
        Poller::new(stage, interval, &timing.stall, cancel)
    }

    async fn preflight(&mut self, cancel: &CancellationToken) -> Result<(), MissionError> {
        ensure_active(cancel)?;
        tracing::info!("Waiting for vehicle to initialise (GPS/compass)...");

        let mut poller = self.poller(Stage::Preflight, cancel);
        while !until_cancelled(self.link.is_armable(), cancel).await? {
            tracing::debug!(waited = ?poller.elapsed(), "Vehicle not armable yet");
            poller.wait().await?;
        }
        Ok(())
    }

    async fn arm(&mut self, cancel: &CancellationToken) -> Result<(), MissionError> {
        self.enter(FlightPhase::Arming)?;
        ensure_active(cancel)?;

        until_cancelled(self.link.set_mode(FlightMode::Guided), cancel).await?;
        until_cancelled(self.link.arm(), cancel).await?;

        let mut poller = self.poller(Stage::Arming, cancel);
        while !until_cancelled(self.link.is_armed(), cancel).await? {
            tracing::debug!("Waiting for arming...");
            poller.wait().await?;
        }
        tracing::info!("Vehicle armed");
        Ok(())
    }

    async fn take_off(&mut self, cancel: &CancellationToken) -> Result<(), MissionError> {
        self.enter(FlightPhase::TakingOff)?;
        ensure_active(cancel)?;

        let target = self.config.initial_altitude_m;
        let threshold = target * self.config.timing.takeoff_ratio;
        tracing::info!("Taking off to {:.1}m", target);

        self.takeoff_commanded = true;
        until_cancelled(self.link.send_takeoff(target), cancel).await?;

        let mut poller = self.poller(Stage::Takeoff, cancel);
        loop {
            let altitude = until_cancelled(self.link.relative_altitude(), cancel).await?;
            if altitude >= threshold {
                tracing::info!("Reached takeoff altitude ({:.1}m)", altitude);
                return Ok(());
            }
            tracing::debug!("Climbing: {:.1}m", altitude);
            poller.wait().await?;
        }
    }

    async fn fly_layers(&mut self, cancel: &CancellationToken) -> Result<(), MissionError> {
        for layer_index in 0..self.plan.len() {
            let layer = self.plan.layers[layer_index].clone();
            let waypoints = self.plan.layer_waypoints(&layer);

            tracing::info!(
                "Starting layer {}/{} (altitude {:.1}m, outer radius {:.1}m)",
                layer.index + 1,
                self.plan.len(),
                layer.altitude_m,
                layer.outer_radius_m
            );

            for (waypoint_index, waypoint) in waypoints.iter().enumerate() {
                self.enter(FlightPhase::Navigating {
                    layer: layer.index,
                    waypoint: waypoint_index,
                })?;
                self.fly_to(waypoint, waypoint_index, waypoints.len(), cancel).await?;

                // The trajectory display is cleared once, after reaching the
                // very first start point and before anything is drawn.
                if layer_index == 0 && waypoint_index == 0 {
                    self.draw_countdown(cancel).await?;
                }
            }

            self.layers_completed += 1;
        }
        Ok(())
    }

    async fn fly_to(
        &mut self,
        waypoint: &Waypoint,
        index: usize,
        count: usize,
        cancel: &CancellationToken,
    ) -> Result<(), MissionError> {
        if index == 0 {
            tracing::info!("-> Start point (N:{:.1}, E:{:.1})", waypoint.north, waypoint.east);
        } else {
            tracing::info!(
                "-> Vertex {}/{} (N:{:.1}, E:{:.1})",
                index + 1,
                count,
                waypoint.north,
                waypoint.east
            );
        }

        let arrival = Navigator::new(&mut *self.link, &self.config.timing, cancel)
            .navigate_to(waypoint)
            .await?;
        self.waypoints_reached += 1;

        tracing::debug!(
            horizontal_error_m = arrival.horizontal_error_m,
            vertical_error_m = arrival.vertical_error_m,
            polls = arrival.polls,
            "Waypoint reached"
        );
        Ok(())
    }

    async fn draw_countdown(&mut self, cancel: &CancellationToken) -> Result<(), MissionError> {
        let mut remaining = self.config.timing.draw_delay;
        if remaining.is_zero() {
            return Ok(());
        }

        tracing::warn!("Clear the ground station track display now");
        while !remaining.is_zero() {
            tracing::info!("Drawing starts in {}s", remaining.as_secs_f64().ceil());
            let step = remaining.min(COUNTDOWN_STEP);
            sleep_or_cancel(step, cancel).await?;
            remaining -= step;
        }
        Ok(())
    }

    async fn land(&mut self, cancel: &CancellationToken) -> Result<(), MissionError> {
        self.enter(FlightPhase::Landing)?;
        ensure_active(cancel)?;
        tracing::info!("All layers drawn, landing in place");

        // Only counts once acknowledged; an interrupted request is resent on abort
        until_cancelled(self.link.set_mode(FlightMode::Land), cancel).await?;
        self.land_commanded = true;

        let landed = self.config.timing.landed_altitude_m;
        let mut poller = self.poller(Stage::Landing, cancel);
        loop {
            let altitude = until_cancelled(self.link.relative_altitude(), cancel).await?;
            if altitude < landed {
                tracing::info!("Landed");
                return Ok(());
            }
            tracing::info!("Descending: {:.1}m", altitude);
            poller.wait().await?;
        }
    }

    /// Command LAND unless it already was, and mark the mission aborted.
    async fn abort(&mut self) {
        self.enter(FlightPhase::Aborted).ok();

        if self.land_commanded {
            return;
        }
        self.land_commanded = true;
        if let Err(err) = self.link.set_mode(FlightMode::Land).await {
            tracing::error!("Failed to command LAND: {}", err);
        }
    }
}
