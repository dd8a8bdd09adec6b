use std::time::Duration;

use chrono::{DateTime, Utc};

/// The scan stops once the window is this close to resetting.
const MIN_WINDOW: Duration = Duration::from_secs(60);
/// Keep a reserve of calls so the reply side is never starved.
const MIN_BUDGET: f64 = 10.0;

/// Provider-reported rate-limit snapshot. Must be refreshed from response
/// headers after every batch of calls, never cached across a whole pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateLimitWindow {
    /// Calls left in the current window.
    pub remaining: f64,
    /// When the provider resets the window.
    pub reset_at: DateTime<Utc>,
}

impl RateLimitWindow {
    pub fn new(remaining: f64, reset_at: DateTime<Utc>) -> Self {
        Self {
            remaining,
            reset_at,
        }
    }

    /// Circuit breaker, not a scheduler: `Some(cooldown)` means the caller
    /// should end the current pass and let the next invocation resume. The
    /// cooldown is only informational (for logs); nothing sleeps on it.
    pub fn throttle(&self, now: DateTime<Utc>) -> Option<Duration> {
        let until_reset = self.reset_at.signed_duration_since(now);
        let window_short = until_reset.num_seconds() < MIN_WINDOW.as_secs() as i64;
        if !window_short && self.remaining >= MIN_BUDGET {
            return None;
        }
        let secs = until_reset.num_seconds();
        if secs <= 0 {
            Some(MIN_WINDOW)
        } else {
            Some(Duration::from_secs(secs as u64))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::RateLimitWindow;
    use chrono::{Duration as ChronoDuration, Utc};
    use std::time::Duration;

    #[test]
    fn plenty_of_budget_and_window_passes() {
        let now = Utc::now();
        let window = RateLimitWindow::new(500.0, now + ChronoDuration::seconds(300));
        assert_eq!(window.throttle(now), None);
    }

    #[test]
    fn low_budget_throttles() {
        let now = Utc::now();
        let window = RateLimitWindow::new(5.0, now + ChronoDuration::seconds(300));
        assert!(window.throttle(now).is_some());
    }

    #[test]
    fn short_window_throttles() {
        let now = Utc::now();
        let window = RateLimitWindow::new(500.0, now + ChronoDuration::seconds(30));
        assert_eq!(window.throttle(now), Some(Duration::from_secs(30)));
    }

    #[test]
    fn expired_window_clamps_cooldown_to_a_minute() {
        let now = Utc::now();
        let window = RateLimitWindow::new(5.0, now - ChronoDuration::seconds(10));
        assert_eq!(window.throttle(now), Some(Duration::from_secs(60)));
    }
}
