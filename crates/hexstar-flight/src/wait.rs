//! Cancellable, optionally bounded polling.
//!
//! Every wait in a mission is a suspension point raced against the mission's
//! cancellation token.

use std::future::Future;
use std::time::Duration;

use hexstar_core::{Stage, StallPolicy};
use hexstar_link::LinkError;
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;

use crate::error::MissionError;

/// Fail fast if the mission has been cancelled.
pub fn ensure_active(cancel: &CancellationToken) -> Result<(), MissionError> {
    if cancel.is_cancelled() {
        Err(MissionError::Cancelled)
    } else {
        Ok(())
    }
}

/// Sleep for `duration` unless cancelled first.
pub async fn sleep_or_cancel(duration: Duration, cancel: &CancellationToken) -> Result<(), MissionError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(MissionError::Cancelled),
        _ = sleep(duration) => Ok(()),
    }
}

/// Await a link call unless cancelled first.
///
/// A call that never completes still yields to an operator interrupt.
pub async fn until_cancelled<T>(
    call: impl Future<Output = Result<T, LinkError>>,
    cancel: &CancellationToken,
) -> Result<T, MissionError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(MissionError::Cancelled),
        result = call => Ok(result?),
    }
}

/// Paces one poll loop.
///
/// Callers check their condition, then call [`Poller::wait`] before checking
/// again. `wait` fails once the stage's stall limit has passed.
pub struct Poller<'a> {
    stage: Stage,
    interval: Duration,
    limit: Option<Duration>,
    started: Instant,
    cancel: &'a CancellationToken,
    polls: u32,
}

impl<'a> Poller<'a> {
    pub fn new(
        stage: Stage,
        interval: Duration,
        policy: &StallPolicy,
        cancel: &'a CancellationToken,
    ) -> Self {
        Self {
            stage,
            interval,
            limit: policy.limit(stage),
            started: Instant::now(),
            cancel,
            polls: 0,
        }
    }

    /// Grant `extra` time on top of the stage limit. No effect when unbounded.
    pub fn extend_limit(mut self, extra: Duration) -> Self {
        self.limit = self.limit.map(|limit| limit.saturating_add(extra));
        self
    }

    /// Number of completed waits.
    pub fn polls(&self) -> u32 {
        self.polls
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub async fn wait(&mut self) -> Result<(), MissionError> {
        ensure_active(self.cancel)?;

        if let Some(limit) = self.limit {
            if self.started.elapsed() >= limit {
                return Err(MissionError::Timeout {
                    stage: self.stage,
                    waited: limit,
                });
            }
        }

        sleep_or_cancel(self.interval, self.cancel).await?;
        self.polls += 1;
        Ok(())
    }
}
