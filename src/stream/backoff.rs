//! Reconnect delay scheduling.

use std::time::Duration;

/// Exponential backoff state for reconnect attempts.
///
/// The delay is purely time-based: the attempt counter exists for
/// observability and drives no policy decision.
#[derive(Debug)]
pub(crate) struct ReconnectPolicy {
    initial: Duration,
    max: Duration,
    multiplier: u32,
    current: Duration,
    attempts: u32,
}

impl ReconnectPolicy {
    pub fn new(initial: Duration, max: Duration, multiplier: u32) -> Self {
        Self {
            initial,
            max,
            multiplier,
            current: initial,
            attempts: 0,
        }
    }

    /// Delay to wait before the next attempt.
    ///
    /// Grows the stored delay for the attempt after, capped at the maximum.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;

        self.current = (self.current * self.multiplier).min(self.max);
        self.attempts += 1;

        delay
    }

    /// Reset after a successful connection.
    pub fn reset(&mut self) {
        self.current = self.initial;
        self.attempts = 0;
    }

    /// Retries scheduled since the last successful connection.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_delay_grows_and_caps() {
        let mut policy =
            ReconnectPolicy::new(Duration::from_secs(1), Duration::from_secs(300), 2);

        let mut last = Duration::ZERO;
        for _ in 0..16 {
            let delay = policy.next_delay();
            assert!(delay >= last, "delay must be non-decreasing");
            assert!(delay <= Duration::from_secs(300));
            last = delay;
        }

        assert_eq!(last, Duration::from_secs(300));
    }

    #[test]
    fn test_first_delays_follow_multiplier() {
        let mut policy =
            ReconnectPolicy::new(Duration::from_secs(1), Duration::from_secs(300), 2);

        assert_eq!(policy.next_delay(), Duration::from_secs(1));
        assert_eq!(policy.next_delay(), Duration::from_secs(2));
        assert_eq!(policy.next_delay(), Duration::from_secs(4));
        assert_eq!(policy.attempts(), 3);
    }

    #[test]
    fn test_reset_restores_initial_delay() {
        let mut policy =
            ReconnectPolicy::new(Duration::from_secs(1), Duration::from_secs(300), 2);

        policy.next_delay();
        policy.next_delay();
        policy.reset();

        assert_eq!(policy.attempts(), 0);
        assert_eq!(policy.next_delay(), Duration::from_secs(1));
    }
}
