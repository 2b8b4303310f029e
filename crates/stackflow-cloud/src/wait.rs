//! Readiness waiter
//!
//! Bounded-retry polling used by both orchestrators to block until an
//! asynchronous backend operation reaches a terminal state. Polls are
//! separated by a full sleep of the poll interval; cancellation is
//! observed at poll boundaries, never mid-call.

use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Bounds for one wait
#[derive(Debug, Clone)]
pub struct WaitConfig {
    /// Total time allowed before the wait expires
    pub timeout: Duration,

    /// Sleep between consecutive probes
    pub poll_interval: Duration,
}

impl WaitConfig {
    pub fn new(timeout: Duration, poll_interval: Duration) -> Self {
        Self {
            timeout,
            poll_interval,
        }
    }
}

/// Why a wait ended without reaching a terminal state
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WaitError {
    /// The bound elapsed. Not a hard failure; the caller decides how to
    /// treat it.
    #[error("wait timed out after {0:?}")]
    Timeout(Duration),

    /// The run's cancellation token fired
    #[error("wait cancelled")]
    Cancelled,
}

/// Poll `probe` until `is_terminal` accepts its result or the timeout
/// elapses.
///
/// The probe always runs at least once, so a zero timeout observes the
/// current state and returns `Timeout` immediately if it is not terminal,
/// without sleeping.
pub async fn wait_for_state<S, F, Fut, T>(
    mut probe: F,
    is_terminal: T,
    config: &WaitConfig,
    cancel: &CancellationToken,
) -> Result<S, WaitError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = S>,
    T: Fn(&S) -> bool,
{
    let deadline = Instant::now() + config.timeout;

    loop {
        if cancel.is_cancelled() {
            return Err(WaitError::Cancelled);
        }

        let state = probe().await;
        if is_terminal(&state) {
            return Ok(state);
        }

        if Instant::now() >= deadline {
            return Err(WaitError::Timeout(config.timeout));
        }

        tokio::select! {
            _ = tokio::time::sleep(config.poll_interval) => {}
            _ = cancel.cancelled() => return Err(WaitError::Cancelled),
        }
    }
}
