use std::collections::HashMap;
use std::sync::Mutex;
use time::{OffsetDateTime, Duration};
use tracing::{warn, error};

#[derive(Debug, Clone, thiserror::Error)]
#[error("Too many attempts. Please try again in {minutes_to_wait} minutes.")]
pub struct RateLimitExceeded {
    pub minutes_to_wait: i64,
}

#[derive(Debug)]
struct Window {
    attempts: u32,
    started: OffsetDateTime,
}

/// Fixed-window attempt counter keyed by an arbitrary string. Advisory
/// only: nothing about vote correctness depends on it.
#[derive(Debug)]
pub struct RateLimiter {
    windows: Mutex<HashMap<String, Window>>,
    max_attempts: u32,
    window: Duration,
}

impl RateLimiter {
    pub fn new(max_attempts: u32, window_minutes: i64) -> Self {
        Self {
            windows: Mutex::new(HashMap::new()),
            max_attempts,
            window: Duration::minutes(window_minutes),
        }
    }

    pub fn check_rate_limit(&self, key: &str) -> Result<(), RateLimitExceeded> {
        self.check_at(key, OffsetDateTime::now_utc())
    }

    fn check_at(&self, key: &str, now: OffsetDateTime) -> Result<(), RateLimitExceeded> {
        let mut windows = match self.windows.lock() {
            Ok(guard) => guard,
            Err(e) => {
                // Fail open.
                error!("Failed to acquire rate limit lock: {}", e);
                return Ok(());
            }
        };

        windows.retain(|_, w| now - w.started <= self.window * 2);

        match windows.get_mut(key) {
            Some(w) if now - w.started <= self.window => {
                if w.attempts >= self.max_attempts {
                    let minutes_to_wait = (w.started + self.window - now).whole_minutes().max(1);
                    warn!("Rate limit triggered for key {}", key);
                    return Err(RateLimitExceeded { minutes_to_wait });
                }
                w.attempts += 1;
            }
            _ => {
                windows.insert(key.to_string(), Window { attempts: 1, started: now });
            }
        }
        Ok(())
    }
}
