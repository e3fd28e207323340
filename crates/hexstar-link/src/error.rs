//! Vehicle link errors.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LinkError {
    #[error("invalid link address {address:?}: {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("failed to connect to {address}: {reason}")]
    Connection { address: String, reason: String },

    #[error("vehicle rejected {command}: {reason}")]
    Rejected { command: &'static str, reason: String },

    #[error("link is closed")]
    Closed,
}
