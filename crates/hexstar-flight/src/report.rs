//! Mission summary returned by the controller.

use std::time::Duration;

use chrono::{DateTime, Utc};
use hexstar_core::FlightPhase;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MissionOutcome {
    /// Every layer flown and the vehicle landed
    Completed,
    /// Operator cancelled; LAND was commanded
    Aborted { during: FlightPhase },
}

#[derive(Debug, Clone, Serialize)]
pub struct MissionReport {
    pub outcome: MissionOutcome,
    pub layers_completed: u32,
    pub waypoints_reached: usize,
    pub started_at: DateTime<Utc>,
    pub elapsed: Duration,
}

impl MissionReport {
    pub fn is_complete(&self) -> bool {
        self.outcome == MissionOutcome::Completed
    }
}
