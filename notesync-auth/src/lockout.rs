//! Failed-attempt lockout policy.

use chrono::Duration;

/// Default maximum failed attempts before lockout.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Brute-force lockout policy: after `max_attempts` consecutive failures
/// the account is locked, with the window doubling for each further
/// failure. Setting `max_backoff_doublings` to 0 yields fixed backoff.
#[derive(Debug, Clone)]
pub struct LockoutPolicy {
    /// Failures allowed before the first lockout.
    pub max_attempts: u32,
    /// Base lockout window applied at the threshold.
    pub base_lockout: Duration,
    /// Cap on the exponent so the window cannot overflow.
    pub max_backoff_doublings: u32,
}

impl Default for LockoutPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_lockout: Duration::seconds(60),
            max_backoff_doublings: 10,
        }
    }
}

impl LockoutPolicy {
    /// The lockout window to apply after `failed_attempts` consecutive
    /// failures, or `None` while still under the threshold.
    pub fn lockout_after(&self, failed_attempts: u32) -> Option<Duration> {
        if failed_attempts < self.max_attempts {
            return None;
        }
        let excess = failed_attempts - self.max_attempts;
        let multiplier = 2_i64.pow(excess.min(self.max_backoff_doublings));
        Some(self.base_lockout * multiplier as i32)
    }

    /// Absolute lockout deadline (epoch ms) after `failed_attempts`
    /// failures, measured from `now_ms`.
    pub fn deadline_after(&self, failed_attempts: u32, now_ms: i64) -> Option<i64> {
        self.lockout_after(failed_attempts)
            .map(|window| now_ms + window.num_milliseconds())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_lockout_below_threshold() {
        let policy = LockoutPolicy::default();
        assert!(policy.lockout_after(3).is_none());
        assert!(policy.lockout_after(4).is_none());
    }

    #[test]
    fn lockout_at_threshold_then_doubles() {
        let policy = LockoutPolicy::default();
        assert_eq!(policy.lockout_after(5), Some(Duration::seconds(60)));
        assert_eq!(policy.lockout_after(6), Some(Duration::seconds(120)));
        assert_eq!(policy.lockout_after(7), Some(Duration::seconds(240)));
    }

    #[test]
    fn backoff_is_capped() {
        let policy = LockoutPolicy::default();
        let capped = policy.lockout_after(5 + 10).unwrap();
        assert_eq!(policy.lockout_after(5 + 50).unwrap(), capped);
    }

    #[test]
    fn deadline_is_absolute() {
        let policy = LockoutPolicy::default();
        assert_eq!(policy.deadline_after(5, 1_000), Some(1_000 + 60_000));
        assert_eq!(policy.deadline_after(1, 1_000), None);
    }
}
