//! Generic bounded retry with exponential backoff and jitter.

use std::thread::sleep;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
        }
    }
}

/// Run `operation` until it succeeds, the error is not retryable, or the
/// attempt budget is exhausted.
///
/// The delay doubles from `base_delay` up to `max_delay` with ±25 % jitter.
/// When `delay_override` returns a duration for an error (a server-supplied
/// rate-limit reset hint), that exact duration is used instead, without
/// jitter.
pub fn retry_with_backoff<T, E>(
    policy: &RetryPolicy,
    mut should_retry: impl FnMut(&E) -> bool,
    mut delay_override: impl FnMut(&E) -> Option<Duration>,
    mut operation: impl FnMut() -> Result<T, E>,
) -> Result<T, E> {
    let mut delay = policy.base_delay;
    let mut attempt = 1u32;
    loop {
        match operation() {
            Ok(value) => return Ok(value),
            Err(err) => {
                if attempt >= policy.max_attempts || !should_retry(&err) {
                    return Err(err);
                }
                let wait = match delay_override(&err) {
                    Some(hint) => hint,
                    None => jitter(delay),
                };
                log::debug!("attempt {attempt} failed, retrying in {wait:?}");
                sleep(wait);
                delay = (delay * 2).min(policy.max_delay);
                attempt += 1;
            }
        }
    }
}

fn jitter(delay: Duration) -> Duration {
    delay.mul_f64(0.75 + fastrand::f64() * 0.5)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(4),
        }
    }

    #[test]
    fn returns_first_success_without_retrying() {
        let calls = Cell::new(0u32);
        let result: Result<u32, &str> =
            retry_with_backoff(&fast_policy(5), |_| true, |_| None, || {
                calls.set(calls.get() + 1);
                Ok(7)
            });
        assert_eq!(result, Ok(7));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn retries_until_success() {
        let calls = Cell::new(0u32);
        let result: Result<u32, &str> =
            retry_with_backoff(&fast_policy(5), |_| true, |_| None, || {
                calls.set(calls.get() + 1);
                if calls.get() < 3 { Err("transient") } else { Ok(9) }
            });
        assert_eq!(result, Ok(9));
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn gives_up_after_attempt_budget() {
        let calls = Cell::new(0u32);
        let result: Result<u32, &str> =
            retry_with_backoff(&fast_policy(3), |_| true, |_| None, || {
                calls.set(calls.get() + 1);
                Err("always")
            });
        assert_eq!(result, Err("always"));
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn non_retryable_error_fails_immediately() {
        let calls = Cell::new(0u32);
        let result: Result<u32, &str> =
            retry_with_backoff(&fast_policy(5), |err| *err != "fatal", |_| None, || {
                calls.set(calls.get() + 1);
                Err("fatal")
            });
        assert_eq!(result, Err("fatal"));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn delay_override_is_consulted_per_error() {
        let calls = Cell::new(0u32);
        let overrides = Cell::new(0u32);
        let result: Result<u32, &str> = retry_with_backoff(
            &fast_policy(3),
            |_| true,
            |_| {
                overrides.set(overrides.get() + 1);
                Some(Duration::from_millis(1))
            },
            || {
                calls.set(calls.get() + 1);
                if calls.get() < 3 { Err("rate limited") } else { Ok(1) }
            },
        );
        assert_eq!(result, Ok(1));
        assert_eq!(overrides.get(), 2);
    }
}
