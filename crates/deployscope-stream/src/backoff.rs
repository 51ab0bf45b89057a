use std::time::Duration;

/// Initial reconnect delay after the first drop
pub const RECONNECT_FLOOR_MS: u64 = 1_000;

/// Upper bound on the reconnect delay
pub const RECONNECT_CEILING_MS: u64 = 30_000;

/// Next reconnect delay: double the current one, capped at the ceiling
pub fn next_delay(current_ms: u64) -> u64 {
    current_ms.saturating_mul(2).min(RECONNECT_CEILING_MS)
}

/// Reconnect delay schedule for the stream connector.
///
/// The delay grows on every consecutive failure and resets to the floor on
/// a successful connection. Attempts are unbounded; only the interval is
/// capped.
#[derive(Debug)]
pub struct ReconnectPolicy {
    delay_ms: u64,
}

impl ReconnectPolicy {
    pub fn new() -> Self {
        Self {
            delay_ms: RECONNECT_FLOOR_MS,
        }
    }

    /// Reset the schedule after a successful connection
    pub fn on_connected(&mut self) {
        self.delay_ms = RECONNECT_FLOOR_MS;
    }

    /// The delay to wait before the next attempt. Grows the schedule.
    pub fn next_delay(&mut self) -> Duration {
        let current = self.delay_ms;
        self.delay_ms = next_delay(current);
        Duration::from_millis(current)
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_doubles_until_ceiling() {
        let mut policy = ReconnectPolicy::new();
        let mut expected = RECONNECT_FLOOR_MS;
        for _ in 0..10 {
            assert_eq!(policy.next_delay(), Duration::from_millis(expected));
            expected = (expected * 2).min(RECONNECT_CEILING_MS);
        }
        // Well past the doubling range, the delay stays pinned at the cap
        assert_eq!(
            policy.next_delay(),
            Duration::from_millis(RECONNECT_CEILING_MS)
        );
    }

    #[test]
    fn test_nth_delay_matches_schedule() {
        // Nth delay = min(1000 * 2^(N-1), 30000)
        let mut policy = ReconnectPolicy::new();
        for n in 1..=8u32 {
            let expected = (RECONNECT_FLOOR_MS * 2u64.pow(n - 1)).min(RECONNECT_CEILING_MS);
            assert_eq!(policy.next_delay(), Duration::from_millis(expected));
        }
    }

    #[test]
    fn test_reset_on_connect() {
        let mut policy = ReconnectPolicy::new();
        for _ in 0..5 {
            policy.next_delay();
        }
        policy.on_connected();
        assert_eq!(
            policy.next_delay(),
            Duration::from_millis(RECONNECT_FLOOR_MS)
        );
    }

    #[test]
    fn test_next_delay_caps() {
        assert_eq!(next_delay(1_000), 2_000);
        assert_eq!(next_delay(16_000), 30_000);
        assert_eq!(next_delay(30_000), 30_000);
    }
}
