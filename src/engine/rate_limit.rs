use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::clock::Clock;
use crate::error::AppError;

/// Minimum spacing between calls, per (identifier, operation).
pub struct RateLimiter {
    clock: Arc<dyn Clock>,
    min_interval: Duration,
    last_accepted: DashMap<(String, &'static str), DateTime<Utc>>,
}

impl RateLimiter {
    pub fn new(clock: Arc<dyn Clock>, min_interval: Duration) -> Self {
        Self {
            clock,
            min_interval,
            last_accepted: DashMap::new(),
        }
    }

    /// Admit the call and stamp it, or report how long to wait.
    pub fn check(&self, id: &str, operation: &'static str) -> Result<DateTime<Utc>, AppError> {
        let now = self.clock.now();

        match self.last_accepted.entry((id.to_string(), operation)) {
            Entry::Occupied(mut last) => {
                let elapsed = now - *last.get();
                if elapsed < self.min_interval {
                    let wait = self.min_interval - elapsed;
                    let retry_after_secs = (wait.num_milliseconds().max(0) as u64).div_ceil(1000);
                    return Err(AppError::RateLimited {
                        retry_after_secs: retry_after_secs.max(1),
                    });
                }
                last.insert(now);
            }
            Entry::Vacant(slot) => {
                slot.insert(now);
            }
        }

        Ok(now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    #[test]
    fn second_update_inside_interval_is_throttled() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let limiter = RateLimiter::new(clock.clone(), Duration::seconds(5));

        assert!(limiter.check("pro_1", "location").is_ok());

        clock.advance(Duration::seconds(2));
        assert!(matches!(
            limiter.check("pro_1", "location"),
            Err(AppError::RateLimited { retry_after_secs: 3 })
        ));

        clock.advance(Duration::seconds(4));
        assert!(limiter.check("pro_1", "location").is_ok());
    }

    #[test]
    fn throttled_call_does_not_reset_the_window() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let limiter = RateLimiter::new(clock.clone(), Duration::seconds(5));

        limiter.check("pro_1", "location").unwrap();
        clock.advance(Duration::seconds(4));
        assert!(limiter.check("pro_1", "location").is_err());
        clock.advance(Duration::seconds(1));
        assert!(limiter.check("pro_1", "location").is_ok());
    }

    #[test]
    fn keys_are_independent() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let limiter = RateLimiter::new(clock, Duration::seconds(5));

        limiter.check("pro_1", "location").unwrap();
        assert!(limiter.check("pro_2", "location").is_ok());
        assert!(limiter.check("pro_1", "other").is_ok());
    }
}
