//! Bounded per-preprint retry with exponential backoff

use std::time::Duration;

use crate::error::ApiError;

/// Exponential backoff: 2^attempt seconds (2s, 4s, 8s, ...)
pub const fn backoff_duration(attempt: u32) -> Duration {
    Duration::from_secs(2u64.pow(attempt))
}

/// Final state of a retried operation.
#[derive(Debug)]
pub enum RetryOutcome<T> {
    /// Clean build within the attempt budget
    Succeeded(T),
    /// Transient failures on every attempt, budget exhausted
    Exhausted(anyhow::Error),
    /// Upstream contract violation — retrying cannot help
    Fatal(anyhow::Error),
}

impl<T> RetryOutcome<T> {
    pub fn into_result(self) -> anyhow::Result<T> {
        match self {
            Self::Succeeded(v) => Ok(v),
            Self::Exhausted(e) | Self::Fatal(e) => Err(e),
        }
    }
}

/// State machine: Attempting(n) → Attempting(n-1) on a transient failure,
/// → Succeeded on a clean run, → Exhausted when n reaches 0.
enum RetryState<T> {
    Attempting(u32),
    Done(RetryOutcome<T>),
}

/// Run `op` up to `max_attempts` times, sleeping with exponential backoff
/// between attempts.
///
/// Only errors classified retryable by [`ApiError::is_retryable`] consume
/// the budget; any other error (unmapped review state, missing required
/// field, undecodable body) is a contract violation and fails immediately.
pub fn run_with_retry<T>(
    label: &str,
    max_attempts: u32,
    mut op: impl FnMut() -> anyhow::Result<T>,
) -> RetryOutcome<T> {
    let mut state = RetryState::Attempting(max_attempts.max(1));
    loop {
        state = match state {
            RetryState::Attempting(remaining) => match op() {
                Ok(v) => RetryState::Done(RetryOutcome::Succeeded(v)),
                Err(e) => {
                    let transient = e
                        .downcast_ref::<ApiError>()
                        .is_some_and(ApiError::is_retryable);
                    if !transient {
                        log::error!("{label}: failed permanently: {e:#}");
                        RetryState::Done(RetryOutcome::Fatal(e))
                    } else if remaining <= 1 {
                        log::error!("{label}: retry budget exhausted: {e:#}");
                        RetryState::Done(RetryOutcome::Exhausted(e))
                    } else {
                        let attempt = max_attempts.max(1) - remaining + 1;
                        log::warn!(
                            "{label}: attempt {attempt}/{} failed: {e:#}, retrying...",
                            max_attempts.max(1)
                        );
                        std::thread::sleep(backoff_duration(attempt.min(5)));
                        RetryState::Attempting(remaining - 1)
                    }
                }
            },
            RetryState::Done(outcome) => return outcome,
        };
    }
}
