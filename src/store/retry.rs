//! Bounded retries with capped exponential backoff for store writes.

use crate::models::TournamentError;
use std::time::Duration;

/// Retry configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Wait after the first failure.
    pub initial_backoff: Duration,
    /// Upper bound for any single wait.
    pub max_backoff: Duration,
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(2),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// One attempt, no waiting.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Wait before attempt `failed + 1`, where `failed` attempts have failed so far (>= 1).
    pub fn backoff_after(&self, failed: u32) -> Duration {
        let exp = failed.saturating_sub(1).min(32) as i32;
        let secs = self.initial_backoff.as_secs_f64() * self.multiplier.powi(exp);
        Duration::from_secs_f64(secs.min(self.max_backoff.as_secs_f64()))
    }

    /// Run `op` until it succeeds, fails with a non-transient error, or attempts run out.
    pub fn run<T, F>(&self, what: &str, op: F) -> Result<T, TournamentError>
    where
        F: FnMut() -> Result<T, TournamentError>,
    {
        self.run_if(what, TournamentError::is_transient, op)
    }

    /// Like `run`, but only errors accepted by `retryable` are retried.
    pub fn run_if<T, F, P>(&self, what: &str, retryable: P, mut op: F) -> Result<T, TournamentError>
    where
        F: FnMut() -> Result<T, TournamentError>,
        P: Fn(&TournamentError) -> bool,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut failed = 0;
        loop {
            match op() {
                Ok(value) => return Ok(value),
                Err(e) if retryable(&e) && failed + 1 < max_attempts => {
                    failed += 1;
                    let wait = self.backoff_after(failed);
                    log::warn!(
                        "{} failed (attempt {}/{}): {}; retrying in {:?}",
                        what,
                        failed,
                        max_attempts,
                        e,
                        wait
                    );
                    std::thread::sleep(wait);
                }
                Err(e) => {
                    if e.is_transient() {
                        log::warn!("{} failed after {} attempt(s): {}", what, failed + 1, e);
                    }
                    return Err(e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn fast(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(4),
            multiplier: 2.0,
        }
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let policy = RetryPolicy {
            max_attempts: 10,
            initial_backoff: Duration::from_millis(10),
            max_backoff: Duration::from_millis(100),
            multiplier: 2.0,
        };
        assert_eq!(policy.backoff_after(1), Duration::from_millis(10));
        assert_eq!(policy.backoff_after(2), Duration::from_millis(20));
        assert_eq!(policy.backoff_after(3), Duration::from_millis(40));
        assert_eq!(policy.backoff_after(4), Duration::from_millis(80));
        assert_eq!(policy.backoff_after(5), Duration::from_millis(100));
        assert_eq!(policy.backoff_after(30), Duration::from_millis(100));
    }

    #[test]
    fn retries_transient_errors_until_success() {
        let calls = Cell::new(0);
        let result = fast(3).run("op", || {
            calls.set(calls.get() + 1);
            if calls.get() < 3 {
                Err(TournamentError::Persistence("flaky".into()))
            } else {
                Ok(calls.get())
            }
        });
        assert_eq!(result, Ok(3));
    }

    #[test]
    fn gives_up_after_max_attempts() {
        let calls = Cell::new(0);
        let result: Result<(), _> = fast(3).run("op", || {
            calls.set(calls.get() + 1);
            Err(TournamentError::Persistence("down".into()))
        });
        assert!(matches!(result, Err(TournamentError::Persistence(_))));
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn unknown_commits_are_retried_only_when_asked() {
        let calls = Cell::new(0);
        let result: Result<(), _> =
            fast(3).run_if("op", TournamentError::is_retry_safe, || {
                calls.set(calls.get() + 1);
                Err(TournamentError::CommitUnknown("ack lost".into()))
            });
        assert!(matches!(result, Err(TournamentError::CommitUnknown(_))));
        assert_eq!(calls.get(), 1);

        calls.set(0);
        let result = fast(3).run("op", || {
            calls.set(calls.get() + 1);
            if calls.get() == 1 {
                Err(TournamentError::CommitUnknown("ack lost".into()))
            } else {
                Ok(())
            }
        });
        assert_eq!(result, Ok(()));
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn state_errors_are_not_retried() {
        let calls = Cell::new(0);
        let result: Result<(), _> = fast(5).run("op", || {
            calls.set(calls.get() + 1);
            Err(TournamentError::InvalidState)
        });
        assert_eq!(result, Err(TournamentError::InvalidState));
        assert_eq!(calls.get(), 1);
    }
}
