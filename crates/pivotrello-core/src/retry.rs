//! Bounded exponential backoff for remote calls.
//!
//! Trello rate-limits aggressively and both APIs drop the odd connection
//! during a long import. Transient failures ([`RemoteError::is_transient`])
//! are retried after `base_delay * 2^(attempt - 1)`; anything else, and
//! the last failure once `max_retries` is spent, ends the run.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tracing::warn;

use crate::error::{RemoteError, SyncError};

/// Retry limits. Defaults: 7 retries starting at 30 seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt (0 = no retries).
    pub max_retries: u32,
    /// Delay before the first retry; doubles on each further retry.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 7,
            base_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    #[must_use]
    pub const fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    /// Delay before retry number `attempt` (1-based).
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1);
        let factor = 2_u32.checked_pow(exponent).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }
}

/// Where the executor waits between attempts.
pub trait Sleeper {
    fn sleep(&self, delay: Duration);
}

/// Blocks the calling thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, delay: Duration) {
        std::thread::sleep(delay);
    }
}

/// Records requested delays instead of waiting. Used by tests and dry runs.
#[derive(Debug, Clone, Default)]
pub struct RecordingSleeper {
    delays: Arc<Mutex<Vec<Duration>>>,
}

impl RecordingSleeper {
    #[must_use]
    pub fn delays(&self) -> Vec<Duration> {
        self.delays
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, delay: Duration) {
        self.delays
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(delay);
    }
}

/// Runs remote calls under a [`RetryPolicy`].
pub struct RetryExecutor {
    policy: RetryPolicy,
    sleeper: Box<dyn Sleeper>,
}

impl std::fmt::Debug for RetryExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryExecutor")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl RetryExecutor {
    /// Executor that really sleeps between attempts.
    #[must_use]
    pub fn new(policy: RetryPolicy) -> Self {
        Self::with_sleeper(policy, ThreadSleeper)
    }

    #[must_use]
    pub fn with_sleeper(policy: RetryPolicy, sleeper: impl Sleeper + 'static) -> Self {
        Self {
            policy,
            sleeper: Box::new(sleeper),
        }
    }

    #[must_use]
    pub const fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Call `f` until it succeeds, fails permanently, or retries run out.
    ///
    /// `operation` names the call in logs and in the returned error.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Remote`] carrying the last failure and the
    /// number of attempts made.
    pub fn execute<T, F>(&self, operation: &str, mut f: F) -> Result<T, SyncError>
    where
        F: FnMut() -> Result<T, RemoteError>,
    {
        let mut retries: u32 = 0;
        loop {
            match f() {
                Ok(value) => return Ok(value),
                Err(error) if error.is_transient() && retries < self.policy.max_retries => {
                    retries += 1;
                    let delay = self.policy.delay_for(retries);
                    warn!(
                        operation,
                        attempt = retries,
                        max_retries = self.policy.max_retries,
                        delay_secs = delay.as_secs_f64(),
                        error_kind = %error.kind,
                        error = %error.message,
                        "retrying after transient failure"
                    );
                    self.sleeper.sleep(delay);
                }
                Err(error) => {
                    if error.is_transient() {
                        warn!(
                            operation,
                            attempts = retries + 1,
                            error = %error,
                            "maximum number of retries reached"
                        );
                    }
                    return Err(SyncError::Remote {
                        operation: operation.to_string(),
                        attempts: retries + 1,
                        source: error,
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RemoteErrorKind;
    use std::cell::Cell;

    fn executor(max_retries: u32) -> (RetryExecutor, RecordingSleeper) {
        let sleeper = RecordingSleeper::default();
        let executor = RetryExecutor::with_sleeper(
            RetryPolicy::new(max_retries, Duration::from_secs(30)),
            sleeper.clone(),
        );
        (executor, sleeper)
    }

    fn flaky(fail_times: u32, kind: RemoteErrorKind) -> impl FnMut() -> Result<&'static str, RemoteError> {
        let mut calls = 0;
        move || {
            calls += 1;
            if calls <= fail_times {
                Err(RemoteError::new(kind, format!("failure #{calls}")))
            } else {
                Ok("done")
            }
        }
    }

    #[test]
    fn default_policy_matches_reference_values() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_retries, 7);
        assert_eq!(policy.base_delay, Duration::from_secs(30));
    }

    #[test]
    fn delay_doubles_per_attempt() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(1), Duration::from_secs(30));
        assert_eq!(policy.delay_for(2), Duration::from_secs(60));
        assert_eq!(policy.delay_for(3), Duration::from_secs(120));
        assert_eq!(policy.delay_for(7), Duration::from_secs(30 * 64));
    }

    #[test]
    fn delay_saturates_instead_of_overflowing() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(200), Duration::from_secs(30).saturating_mul(u32::MAX));
    }

    #[test]
    fn success_after_three_failures_takes_four_calls() {
        let (executor, sleeper) = executor(7);
        let calls = Cell::new(0);
        let mut op = flaky(3, RemoteErrorKind::Network);

        let result = executor.execute("fetch", || {
            calls.set(calls.get() + 1);
            op()
        });

        assert_eq!(result.expect("succeeds"), "done");
        assert_eq!(calls.get(), 4);
        assert_eq!(
            sleeper.delays(),
            vec![
                Duration::from_secs(30),
                Duration::from_secs(60),
                Duration::from_secs(120)
            ]
        );
    }

    #[test]
    fn gives_up_after_max_retries() {
        let (executor, sleeper) = executor(7);
        let calls = Cell::new(0);
        let mut op = flaky(8, RemoteErrorKind::Timeout);

        let err = executor
            .execute("create card", || {
                calls.set(calls.get() + 1);
                op()
            })
            .expect_err("retries exhausted");

        assert_eq!(calls.get(), 8, "one attempt plus seven retries");
        assert_eq!(sleeper.delays().len(), 7);
        match err {
            SyncError::Remote {
                operation,
                attempts,
                source,
            } => {
                assert_eq!(operation, "create card");
                assert_eq!(attempts, 8);
                assert_eq!(source.kind, RemoteErrorKind::Timeout);
                assert_eq!(source.message, "failure #8");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn permanent_failure_is_not_retried() {
        let (executor, sleeper) = executor(7);
        let calls = Cell::new(0);
        let mut op = flaky(1, RemoteErrorKind::Unauthorized);

        let err = executor
            .execute("list boards", || {
                calls.set(calls.get() + 1);
                op()
            })
            .expect_err("unauthorized is fatal");

        assert_eq!(calls.get(), 1);
        assert!(sleeper.delays().is_empty());
        assert!(matches!(err, SyncError::Remote { attempts: 1, .. }));
    }

    #[test]
    fn zero_retries_means_single_attempt() {
        let (executor, sleeper) = executor(0);
        let mut op = flaky(1, RemoteErrorKind::Server);
        assert!(executor.execute("x", &mut op).is_err());
        assert!(sleeper.delays().is_empty());
    }
}
