use std::time::Duration;

use rand::Rng;

/// When, and how often, a dropped channel reconnects.
///
/// Delays grow exponentially from `initial_delay`, are capped at
/// `max_delay`, and get equal jitter (a random point in the upper half of
/// the window).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    max_retries: u32,
    initial_delay: Duration,
    max_delay: Duration,
}

impl ReconnectPolicy {
    /// Never reconnect.
    pub const fn disabled() -> Self {
        Self {
            max_retries: 0,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    pub fn exponential(max_retries: u32, initial_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_retries,
            initial_delay,
            max_delay: max_delay.max(initial_delay),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.max_retries > 0
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Upper bound of the wait before retry number `attempt` (0-based).
    pub fn ceiling_for(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.initial_delay
            .saturating_mul(factor)
            .min(self.max_delay)
    }

    /// Jittered wait before retry `attempt`, or `None` once retries are spent.
    pub fn delay_for(&self, attempt: u32) -> Option<Duration> {
        if attempt >= self.max_retries {
            return None;
        }
        let ceiling = u64::try_from(self.ceiling_for(attempt).as_millis()).unwrap_or(u64::MAX);
        let floor = ceiling / 2;
        let millis = rand::thread_rng().gen_range(floor..=ceiling);
        Some(Duration::from_millis(millis))
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::disabled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_never_retries() {
        let policy = ReconnectPolicy::disabled();
        assert!(!policy.is_enabled());
        assert_eq!(policy.delay_for(0), None);
    }

    #[test]
    fn test_ceiling_doubles_and_caps() {
        let policy =
            ReconnectPolicy::exponential(10, Duration::from_millis(100), Duration::from_secs(1));
        assert_eq!(policy.ceiling_for(0), Duration::from_millis(100));
        assert_eq!(policy.ceiling_for(1), Duration::from_millis(200));
        assert_eq!(policy.ceiling_for(3), Duration::from_millis(800));
        assert_eq!(policy.ceiling_for(4), Duration::from_secs(1));
        assert_eq!(policy.ceiling_for(40), Duration::from_secs(1));
    }

    #[test]
    fn test_delay_is_jittered_within_window() {
        let policy =
            ReconnectPolicy::exponential(3, Duration::from_millis(400), Duration::from_secs(5));
        for _ in 0..50 {
            let delay = policy.delay_for(1).unwrap();
            assert!(delay >= Duration::from_millis(400));
            assert!(delay <= Duration::from_millis(800));
        }
        assert_eq!(policy.delay_for(3), None);
    }
}
