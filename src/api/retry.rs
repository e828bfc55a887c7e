use std::thread;
use std::time::Duration;

use tracing::warn;

use crate::error::Result;

/// Retry with exponential backoff.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub tries: u32,
    pub delay: Duration,
    pub backoff: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            tries: 10,
            delay: Duration::from_secs(1),
            backoff: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Single attempt, no waiting.
    pub fn once() -> Self {
        Self {
            tries: 1,
            delay: Duration::ZERO,
            backoff: 1.0,
        }
    }

    /// Delay after `delay`, scaled by `backoff`. A factor that does not yield
    /// a representable duration (negative, non-finite, overflowing) keeps
    /// the previous delay.
    pub fn next_delay(&self, delay: Duration) -> Duration {
        Duration::try_from_secs_f64(delay.as_secs_f64() * self.backoff).unwrap_or(delay)
    }

    /// Run `op` until it succeeds or the attempts are used up; `op` receives
    /// the 1-based attempt number. The last error is returned.
    pub fn run<T, F>(&self, mut op: F) -> Result<T>
    where
        F: FnMut(u32) -> Result<T>,
    {
        let tries = self.tries.max(1);
        let mut delay = self.delay;
        let mut attempt = 1;
        loop {
            match op(attempt) {
                Ok(v) => return Ok(v),
                Err(e) if attempt >= tries => return Err(e),
                Err(e) => {
                    warn!(
                        "Attempt {}/{} failed: {}; retrying in {:?}",
                        attempt, tries, e, delay
                    );
                    if !delay.is_zero() {
                        thread::sleep(delay);
                    }
                    delay = self.next_delay(delay);
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn quick(tries: u32) -> RetryPolicy {
        RetryPolicy {
            tries,
            delay: Duration::ZERO,
            backoff: 2.0,
        }
    }

    #[test]
    fn default_policy() {
        let p = RetryPolicy::default();
        assert_eq!(p.tries, 10);
        assert_eq!(p.delay, Duration::from_secs(1));
        assert_eq!(p.backoff, 2.0);
    }

    #[test]
    fn backoff_scales_delay_and_survives_bad_factors() {
        let second = Duration::from_secs(1);
        assert_eq!(RetryPolicy::default().next_delay(second), Duration::from_secs(2));

        for backoff in [f64::NAN, f64::INFINITY, -2.0, 1e300] {
            let p = RetryPolicy {
                backoff,
                ..RetryPolicy::default()
            };
            assert_eq!(p.next_delay(second), second, "backoff {backoff}");
        }
        let huge = RetryPolicy {
            backoff: 2.0,
            ..RetryPolicy::default()
        };
        assert_eq!(huge.next_delay(Duration::MAX), Duration::MAX);
    }

    #[test]
    fn succeeds_after_transient_failures() {
        let mut calls = 0;
        let out = quick(5)
            .run(|attempt| {
                calls += 1;
                if attempt < 3 {
                    Err(Error::Processing("flaky".into()))
                } else {
                    Ok(attempt)
                }
            })
            .unwrap();
        assert_eq!(out, 3);
        assert_eq!(calls, 3);
    }

    #[test]
    fn gives_up_after_all_tries() {
        let mut calls = 0;
        let res: Result<()> = quick(4).run(|_| {
            calls += 1;
            Err(Error::Processing("down".into()))
        });
        assert!(res.is_err());
        assert_eq!(calls, 4);

        let mut calls = 0;
        let _ = RetryPolicy::once().run(|_| -> Result<()> {
            calls += 1;
            Err(Error::Processing("down".into()))
        });
        assert_eq!(calls, 1);
    }
}
