use std::time::Duration;
use rand::RngExt;

/// Exponential backoff policy for reconnect scheduling.
///
/// Delays grow as `base * factor^attempt`, clamped to `max`. Attempt
/// numbering starts at 0, so the first retry waits the base delay.
#[derive(Debug, Clone)]
pub struct BackoffPolicy {
    /// Delay before the first retry
    base: Duration,

    /// Growth factor per attempt
    factor: f64,

    /// Upper bound on any single delay
    max: Duration,
}

impl BackoffPolicy {
    /// Create a new policy
    pub fn new(base: Duration, factor: f64, max: Duration) -> Self {
        BackoffPolicy { base, factor, max }
    }

    /// Compute the delay for the given attempt number
    pub fn delay(&self, attempt: u32) -> Duration {
        let grown = self.base.as_millis() as f64 * self.factor.powi(attempt as i32);
        let capped = grown.min(self.max.as_millis() as f64);
        Duration::from_millis(capped as u64)
    }

    /// Compute the delay with additive random jitter (up to 10%).
    ///
    /// Jitter spreads simultaneous reconnects from many viewers so they do
    /// not hit a recovering server in lockstep.
    pub fn jittered_delay(&self, attempt: u32) -> Duration {
        let delay = self.delay(attempt);
        let spread = delay.as_millis() as u64 / 10;
        if spread == 0 {
            return delay;
        }
        let jitter = rand::rng().random_range(0..=spread);
        delay + Duration::from_millis(jitter)
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        BackoffPolicy {
            base: Duration::from_millis(1000),
            factor: 2.0,
            max: Duration::from_millis(15000),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_growth() {
        let policy = BackoffPolicy::new(Duration::from_millis(1000), 2.0, Duration::from_secs(30));

        assert_eq!(policy.delay(0), Duration::from_millis(1000));
        assert_eq!(policy.delay(1), Duration::from_millis(2000));
        assert_eq!(policy.delay(2), Duration::from_millis(4000));
        assert_eq!(policy.delay(3), Duration::from_millis(8000));
    }

    #[test]
    fn test_delay_monotonic_and_capped() {
        let policy = BackoffPolicy::default();

        let mut previous = Duration::ZERO;
        for attempt in 0..20 {
            let delay = policy.delay(attempt);
            assert!(delay >= previous, "delay decreased at attempt {}", attempt);
            assert!(delay <= Duration::from_millis(15000));
            previous = delay;
        }
    }

    #[test]
    fn test_jitter_bounds() {
        let policy = BackoffPolicy::new(Duration::from_millis(1000), 2.0, Duration::from_secs(10));

        for attempt in 0..5 {
            let base = policy.delay(attempt);
            let jittered = policy.jittered_delay(attempt);
            assert!(jittered >= base);
            assert!(jittered <= base + base / 10);
        }
    }
}
