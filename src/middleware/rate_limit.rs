//! Rate limiting middleware
//!
//! Sliding-window limits keyed by phone number: one for login code requests,
//! one for wrong code submissions.

use dashmap::DashMap;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::Instant;

/// Per-key sliding window rate limiter
#[derive(Debug)]
pub struct RateLimiter {
    requests: DashMap<String, VecDeque<Instant>>,
    max_requests: usize,
    window: Duration,
}

impl RateLimiter {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            requests: DashMap::new(),
            max_requests,
            window,
        }
    }

    /// Records a request for `client_id` if it is under the limit.
    pub fn is_allowed(&self, client_id: &str) -> bool {
        let now = Instant::now();
        let mut entry = self.requests.entry(client_id.to_string()).or_default();
        self.slide(&mut entry, now);

        if entry.len() < self.max_requests {
            entry.push_back(now);
            true
        } else {
            false
        }
    }

    /// Records an event for `client_id` regardless of the limit.
    pub fn record(&self, client_id: &str) {
        let now = Instant::now();
        let mut entry = self.requests.entry(client_id.to_string()).or_default();
        self.slide(&mut entry, now);
        entry.push_back(now);
    }

    /// True once `client_id` has used up its window, without recording anything.
    pub fn is_exhausted(&self, client_id: &str) -> bool {
        let now = Instant::now();
        match self.requests.get_mut(client_id) {
            Some(mut entry) => {
                self.slide(&mut entry, now);
                entry.len() >= self.max_requests
            }
            None => false,
        }
    }

    pub fn reset(&self, client_id: &str) {
        self.requests.remove(client_id);
    }

    // Remove old requests
    fn slide(&self, times: &mut VecDeque<Instant>, now: Instant) {
        while times
            .front()
            .is_some_and(|&time| now.duration_since(time) > self.window)
        {
            times.pop_front();
        }
    }

    /// Drops keys whose whole window has passed.
    pub fn prune(&self) {
        let now = Instant::now();
        self.requests.retain(|_, times| {
            times
                .back()
                .is_some_and(|&time| now.duration_since(time) <= self.window)
        });
    }

    pub fn tracked_keys(&self) -> usize {
        self.requests.len()
    }
}
