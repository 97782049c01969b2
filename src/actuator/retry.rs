use std::thread;
use std::time::Duration;

/// Bounded retry schedule: `attempts` tries, the pause doubling after each
/// failure starting from `base_delay`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            base_delay: Duration::from_millis(10),
        }
    }
}

impl RetryPolicy {
    /// Pause after the `attempt`-th failure (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(1 << shift)
    }

    /// Runs `op` until it succeeds or the attempts are used up, returning
    /// the last error. No pause follows the final attempt.
    pub fn run<T, E>(&self, op: impl FnMut(u32) -> Result<T, E>) -> Result<T, E> {
        self.run_with_sleep(op, thread::sleep)
    }

    pub fn run_with_sleep<T, E>(
        &self,
        mut op: impl FnMut(u32) -> Result<T, E>,
        mut sleep: impl FnMut(Duration),
    ) -> Result<T, E> {
        let attempts = self.attempts.max(1);
        let mut attempt = 1;
        loop {
            match op(attempt) {
                Ok(value) => return Ok(value),
                Err(e) if attempt >= attempts => return Err(e),
                Err(_) => {
                    sleep(self.delay_after(attempt));
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_after(1), Duration::from_millis(10));
        assert_eq!(policy.delay_after(2), Duration::from_millis(20));
        assert_eq!(policy.delay_after(3), Duration::from_millis(40));
    }

    #[test]
    fn succeeds_on_a_later_attempt() {
        let mut pauses = Vec::new();
        let result: Result<u32, &str> = RetryPolicy::default().run_with_sleep(
            |attempt| if attempt < 3 { Err("busy") } else { Ok(attempt) },
            |d| pauses.push(d),
        );
        assert_eq!(result, Ok(3));
        assert_eq!(pauses, vec![Duration::from_millis(10), Duration::from_millis(20)]);
    }

    #[test]
    fn exhaustion_returns_last_error_without_final_pause() {
        let mut calls = 0;
        let mut pauses = 0;
        let result: Result<(), u32> = RetryPolicy::default().run_with_sleep(
            |attempt| {
                calls += 1;
                Err(attempt)
            },
            |_| pauses += 1,
        );
        assert_eq!(result, Err(3));
        assert_eq!(calls, 3);
        assert_eq!(pauses, 2);
    }

    #[test]
    fn zero_attempts_still_tries_once() {
        let policy = RetryPolicy {
            attempts: 0,
            base_delay: Duration::ZERO,
        };
        let result: Result<(), ()> = policy.run(|_| Err(()));
        assert!(result.is_err());
    }
}
