//! Readiness polling for newly created remote objects.
//!
//! After a create call the control plane reports the new object in a
//! provisioning status for minutes. [`StateChange`] blocks the calling
//! operation until the object reaches the target status, suspending on the
//! runtime's timers between fetches. It never busy-waits and never overlaps
//! two fetches.
//!
//! Timing semantics:
//!
//! - An initial delay passes before the first fetch, so the remote system
//!   has registered the object before we ask about it.
//! - Subsequent fetches are a fixed interval apart.
//! - One deadline bounds the whole wait, started when the wait starts; the
//!   initial delay counts against it. If the deadline lands inside any
//!   sleep, the wait ends with [`ProviderError::Timeout`] and no further
//!   fetch is made. A timeout at or below the initial delay therefore
//!   yields zero fetches.
//! - Statuses in the `failed` set end the wait immediately with
//!   [`ProviderError::UnexpectedState`]. Statuses outside all three sets
//!   keep polling until the deadline; the platform grows statuses faster
//!   than providers ship.
//! - Cancelling the supplied token ends the wait with
//!   [`ProviderError::Cancelled`] before the next scheduled fetch.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::ProviderError;

/// Default delay before the first fetch.
pub const DEFAULT_DELAY: Duration = Duration::from_secs(10);

/// Default interval between fetches.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Configuration for one readiness wait.
#[derive(Debug, Clone)]
pub struct StateChange {
    /// Statuses that mean the object is still provisioning.
    pub pending: Vec<String>,
    /// The status that ends the wait successfully.
    pub target: String,
    /// Statuses that end the wait with an error.
    pub failed: Vec<String>,
    /// Delay before the first fetch.
    pub delay: Duration,
    /// Interval between consecutive fetches.
    pub poll_interval: Duration,
    /// Upper bound for the whole wait, initial delay included.
    pub timeout: Duration,
}

impl StateChange {
    /// A wait for `target` with the default delay, interval, and a
    /// 45-minute timeout; callers override the timeout from resource
    /// configuration.
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            pending: Vec::new(),
            target: target.into(),
            failed: Vec::new(),
            delay: DEFAULT_DELAY,
            poll_interval: DEFAULT_POLL_INTERVAL,
            timeout: crate::config::DEFAULT_CREATE_TIMEOUT,
        }
    }

    /// Set the statuses treated as still-provisioning.
    pub fn with_pending<S: Into<String>>(mut self, pending: impl IntoIterator<Item = S>) -> Self {
        self.pending = pending.into_iter().map(Into::into).collect();
        self
    }

    /// Set the statuses treated as terminal failures.
    pub fn with_failed<S: Into<String>>(mut self, failed: impl IntoIterator<Item = S>) -> Self {
        self.failed = failed.into_iter().map(Into::into).collect();
        self
    }

    /// Override the delay before the first fetch.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Override the interval between fetches.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Override the overall timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Drive `fetch` until the target status is observed, the deadline
    /// passes, a failure status or fetch error occurs, or `cancel` fires.
    ///
    /// `fetch` returns the current representation of the awaited object
    /// together with its status. Fetch errors propagate immediately; the
    /// scheduled re-fetch loop is not an error-retry mechanism.
    pub async fn wait_for<T, F, Fut>(
        &self,
        mut fetch: F,
        cancel: &CancellationToken,
    ) -> Result<T, ProviderError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<(T, String), ProviderError>>,
    {
        let start = Instant::now();
        let deadline = start + self.timeout;

        self.pause(self.delay, start, deadline, cancel).await?;

        loop {
            let (object, status) = fetch().await?;

            if status == self.target {
                debug!(%status, "remote object is ready");
                return Ok(object);
            }
            if self.failed.iter().any(|s| *s == status) {
                return Err(ProviderError::UnexpectedState { status });
            }
            if !self.pending.iter().any(|s| *s == status) {
                debug!(%status, "unrecognized status, treating as still provisioning");
            }

            self.pause(self.poll_interval, start, deadline, cancel).await?;
        }
    }

    /// Sleep for `wait`, honoring cancellation and the overall deadline.
    /// Returns `Timeout` when the deadline lands before the next wake-up,
    /// so no fetch ever happens after the window has elapsed.
    async fn pause(
        &self,
        wait: Duration,
        start: Instant,
        deadline: Instant,
        cancel: &CancellationToken,
    ) -> Result<(), ProviderError> {
        let wake = Instant::now() + wait;
        if wake >= deadline {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(ProviderError::Cancelled),
                _ = tokio::time::sleep_until(deadline) => Err(ProviderError::Timeout {
                    waited: start.elapsed(),
                }),
            }
        } else {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(ProviderError::Cancelled),
                _ = tokio::time::sleep_until(wake) => Ok(()),
            }
        }
    }
}
