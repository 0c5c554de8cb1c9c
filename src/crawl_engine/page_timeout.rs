//! Timeout utilities for page operations
//!
//! Provides async timeout wrappers to prevent indefinite hangs during
//! page navigation, and a poll-with-deadline primitive used to wait for
//! dynamic content. Both run on tokio's clock, so tests can drive them with
//! a paused runtime instead of real elapsed time.

use anyhow::Result;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

/// Helper function to wrap async page operations with explicit timeout
///
/// Prevents indefinite hangs on page operations by applying `tokio::time::timeout`.
/// Returns proper error messages distinguishing between timeout and operation failures.
///
/// # Arguments
/// * `operation` - The async Future to execute with a timeout
/// * `timeout_secs` - Timeout duration in seconds
/// * `operation_name` - Human-readable name for error messages
///
/// # Returns
/// * `Ok(T)` - Operation completed successfully
/// * `Err` - Either the operation failed or the timeout was reached
pub async fn with_page_timeout<F, T>(
    operation: F,
    timeout_secs: u64,
    operation_name: &str,
) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(Duration::from_secs(timeout_secs), operation).await {
        Ok(result) => result,
        Err(_) => Err(anyhow::anyhow!(
            "{operation_name} timeout after {timeout_secs} seconds"
        )),
    }
}

/// Result of [`poll_until`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollResult<S> {
    /// The readiness predicate accepted this observation
    Ready(S),
    /// The deadline passed; carries the last successful observation, if any
    TimedOut(Option<S>),
}

impl<S> PollResult<S> {
    #[must_use]
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    /// The accepted or last-seen observation
    pub fn into_inner(self) -> Option<S> {
        match self {
            Self::Ready(s) => Some(s),
            Self::TimedOut(last) => last,
        }
    }
}

/// Repeatedly observe something until a readiness predicate holds or time runs out
///
/// `probe` produces an observation (`None` when the observation itself failed,
/// e.g. a script evaluation error, which simply counts as "not ready").
/// `ready` decides whether an observation is final; it may keep state between
/// calls, which is how stability checks ("unchanged since the last poll") are
/// expressed. The probe is always run at least once, and is never started
/// after the deadline has passed.
pub async fn poll_until<S, P, Fut, R>(
    timeout: Duration,
    interval: Duration,
    mut probe: P,
    mut ready: R,
) -> PollResult<S>
where
    P: FnMut() -> Fut,
    Fut: Future<Output = Option<S>>,
    R: FnMut(&S) -> bool,
{
    let deadline = Instant::now() + timeout;
    let mut last = None;

    loop {
        if let Some(observation) = probe().await {
            if ready(&observation) {
                return PollResult::Ready(observation);
            }
            last = Some(observation);
        }

        let now = Instant::now();
        if now >= deadline {
            return PollResult::TimedOut(last);
        }

        let remaining = deadline - now;
        tokio::time::sleep(interval.min(remaining)).await;
    }
}
