//! Sliding-window request limiter keyed by caller.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use crate::models::config::RateLimitSettings;

#[derive(Debug)]
pub struct RateLimiter {
    max_requests: usize,
    window: Duration,
    hits: Mutex<HashMap<String, VecDeque<Instant>>>,
}

impl RateLimiter {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            hits: Mutex::new(HashMap::new()),
        }
    }

    // A poisoned map only holds timestamps, so keep using it.
    fn hits(&self) -> MutexGuard<'_, HashMap<String, VecDeque<Instant>>> {
        self.hits.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn evict(queue: &mut VecDeque<Instant>, now: Instant, window: Duration) {
        while let Some(&oldest) = queue.front() {
            if now.saturating_duration_since(oldest) >= window {
                queue.pop_front();
            } else {
                break;
            }
        }
    }

    /// Records a request for `key` at `now` and reports whether it is
    /// admitted. Rejected requests are not recorded.
    ///
    /// Keys whose every hit has left the window are dropped on the way.
    pub fn check(&self, key: &str, now: Instant) -> bool {
        let window = self.window;
        let mut hits = self.hits();
        hits.retain(|_, queue| {
            Self::evict(queue, now, window);
            !queue.is_empty()
        });

        let queue = hits.entry(key.to_string()).or_default();
        if queue.len() >= self.max_requests {
            if queue.is_empty() {
                hits.remove(key);
            }
            log::warn!("Rate limit reached for {key}");
            return false;
        }
        queue.push_back(now);
        true
    }

    pub fn remaining(&self, key: &str, now: Instant) -> usize {
        let mut hits = self.hits();
        let Some(queue) = hits.get_mut(key) else {
            return self.max_requests;
        };
        Self::evict(queue, now, self.window);
        let used = queue.len();
        if used == 0 {
            hits.remove(key);
        }
        self.max_requests.saturating_sub(used)
    }

    /// Number of keys with at least one hit still held.
    pub fn tracked_keys(&self) -> usize {
        self.hits().len()
    }

    pub fn reset(&self, key: &str) {
        self.hits().remove(key);
    }
}

impl From<&RateLimitSettings> for RateLimiter {
    fn from(settings: &RateLimitSettings) -> Self {
        RateLimiter::new(
            settings.max_requests,
            Duration::from_secs(settings.window_secs),
        )
    }
}
