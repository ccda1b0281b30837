use crate::config::MAX_CONCURRENT_PER_DOMAIN;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::Instant;

/// Tracks the throttle state of a single host during crawling
///
/// This structure maintains the per-host information needed for admission:
/// the bounded slot pool, the last request time, and the rate-limit
/// cool-down triggered by HTTP 429 responses. It is created lazily on the
/// first reference to a host and lives for the whole run.
#[derive(Debug, Clone)]
pub struct HostThrottle {
    /// Slot pool limiting concurrent fetches against this host
    pub slots: Arc<Semaphore>,

    /// Timestamp of the last request to this host
    pub last_request_time: Option<Instant>,

    /// Number of 429 responses received in a row
    pub consecutive_429s: u32,

    /// Dispatch to this host is suspended until this instant
    pub cooldown_until: Option<Instant>,
}

impl HostThrottle {
    /// Creates a new HostThrottle with all slots free
    pub fn new() -> Self {
        Self {
            slots: Arc::new(Semaphore::new(MAX_CONCURRENT_PER_DOMAIN)),
            last_request_time: None,
            consecutive_429s: 0,
            cooldown_until: None,
        }
    }

    /// Checks if a request can be made to this host now
    ///
    /// Only the rate-limit cool-down blocks a request here; slot availability
    /// is enforced by the semaphore.
    pub fn can_request(&self, now: Instant) -> bool {
        self.time_until_next_request(now).is_none()
    }

    /// Calculates the time until the cool-down ends
    ///
    /// Returns None if a request can be made now, or the duration to wait otherwise.
    pub fn time_until_next_request(&self, now: Instant) -> Option<Duration> {
        match self.cooldown_until {
            Some(until) if until > now => Some(until - now),
            _ => None,
        }
    }

    /// Records that a request was made to this host
    pub fn record_request(&mut self, now: Instant) {
        self.last_request_time = Some(now);
    }

    /// Marks this host as rate limited for `wait`
    ///
    /// A later cool-down never shortens an earlier one. A `wait` past the
    /// representable range leaves the current cool-down in place.
    pub fn mark_rate_limited(&mut self, now: Instant, wait: Duration) {
        self.consecutive_429s = self.consecutive_429s.saturating_add(1);
        let Some(until) = now.checked_add(wait) else {
            return;
        };
        self.cooldown_until = Some(match self.cooldown_until {
            Some(existing) if existing > until => existing,
            _ => until,
        });
    }

    /// Resets the consecutive 429 counter after a non-429 response
    pub fn clear_rate_limit(&mut self) {
        self.consecutive_429s = 0;
    }

}

impl Default for HostThrottle {
    fn default() -> Self {
        Self::new()
    }
}
