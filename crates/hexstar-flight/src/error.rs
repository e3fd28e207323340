//! Mission errors.

use std::time::Duration;

use hexstar_core::{ConfigError, FlightPhase, Stage};
use hexstar_link::LinkError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MissionError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("vehicle link error: {0}")]
    Link(#[from] LinkError),

    #[error("{stage} stalled: condition not met after {waited:?}")]
    Timeout { stage: Stage, waited: Duration },

    /// Operator cancellation observed at a suspension point
    #[error("mission cancelled")]
    Cancelled,

    #[error("illegal phase transition {from} -> {to}")]
    IllegalTransition { from: FlightPhase, to: FlightPhase },
}
