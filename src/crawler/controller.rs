//! Concurrency controller for admission and throttling
//!
//! This module handles:
//! - Global concurrency limiting via a semaphore
//! - Per-host concurrency limiting (at most two fetches per host)
//! - Rate-limit cool-downs driven by HTTP 429 and `Retry-After`
//! - The generic retry/backoff policy for transient failures
//! - The base-domain cross-check applied before a host is first fetched

use crate::state::HostThrottle;
use crate::url::base_domain;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::{AcquireError, OwnedSemaphorePermit, Semaphore};
use tokio::time::Instant;

/// Cool-down applied after a 429 without a usable `Retry-After`
pub const DEFAULT_RATE_LIMIT_WAIT: Duration = Duration::from_secs(30);

/// Longest cool-down a single `Retry-After` hint can impose
pub const MAX_RATE_LIMIT_WAIT: Duration = Duration::from_secs(300);

/// Statuses retried under the generic policy
const RETRYABLE_STATUSES: [u16; 4] = [500, 502, 503, 504];

/// Exponential backoff policy for transient failures
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries allowed after the first attempt
    pub max_retries: u32,

    /// Delay before the first retry
    pub initial_backoff: Duration,

    /// Upper bound on any single delay
    pub max_backoff: Duration,
}

impl RetryPolicy {
    /// 1s initial backoff, doubling, capped at 10s
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(10),
        }
    }

    /// Whether a response status is retried (5xx gateway/server family)
    pub fn is_retryable_status(status: u16) -> bool {
        RETRYABLE_STATUSES.contains(&status)
    }

    /// Delay before retry number `retry` (0-based)
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry);
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }

    /// Whether another attempt is allowed after `retries_done` retries
    pub fn should_retry(&self, retries_done: u32) -> bool {
        retries_done < self.max_retries
    }
}

/// Converts a `Retry-After` header into a cool-down duration
///
/// Accepts delta-seconds (`"120"`) or an HTTP date. A missing or unparsable
/// header yields [`DEFAULT_RATE_LIMIT_WAIT`]; a date in the past yields zero.
/// The result never exceeds [`MAX_RATE_LIMIT_WAIT`].
pub fn retry_after_delay(header: Option<&str>, now: DateTime<Utc>) -> Duration {
    let Some(value) = header.map(str::trim) else {
        return DEFAULT_RATE_LIMIT_WAIT;
    };

    if let Ok(seconds) = value.parse::<u64>() {
        return Duration::from_secs(seconds).min(MAX_RATE_LIMIT_WAIT);
    }

    match DateTime::parse_from_rfc2822(value) {
        Ok(date) => (date.with_timezone(&Utc) - now)
            .to_std()
            .unwrap_or(Duration::ZERO)
            .min(MAX_RATE_LIMIT_WAIT),
        Err(_) => DEFAULT_RATE_LIMIT_WAIT,
    }
}

/// Capacity held by one in-flight attempt
///
/// Dropping it releases the host slot first, then the global slot. Each
/// permit is released exactly once, on every exit path including task abort.
#[derive(Debug)]
pub struct FetchPermit {
    // Field order is drop order.
    _host: OwnedSemaphorePermit,
    _global: OwnedSemaphorePermit,
}

/// Owns global admission capacity and host-keyed throttle state
///
/// One controller is shared (behind an `Arc`) by every fetch worker of a run.
#[derive(Debug)]
pub struct ConcurrencyController {
    /// Global semaphore for limiting concurrent fetches
    global: Arc<Semaphore>,

    /// Capacity the global semaphore was created with
    global_limit: usize,

    /// Per-host throttle state, created lazily
    hosts: Mutex<HashMap<String, HostThrottle>>,

    /// Retry policy handed to workers
    retry: RetryPolicy,
}

impl ConcurrencyController {
    /// Creates a controller with `global_limit` slots across all hosts
    pub fn new(global_limit: usize, retry: RetryPolicy) -> Self {
        Self {
            global: Arc::new(Semaphore::new(global_limit)),
            global_limit,
            hosts: Mutex::new(HashMap::new()),
            retry,
        }
    }

    fn hosts(&self) -> MutexGuard<'_, HashMap<String, HostThrottle>> {
        self.hosts.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Starts tracking a host (seed host and allow-listed hosts)
    pub fn track_host(&self, host: &str) {
        self.hosts()
            .entry(host.to_lowercase())
            .or_insert_with(HostThrottle::new);
    }

    /// Whether the host is already tracked
    pub fn is_tracked(&self, host: &str) -> bool {
        self.hosts().contains_key(host)
    }

    /// Cross-checks a host against the hosts already tracked
    ///
    /// A tracked host is admitted. An unknown host is admitted (and tracked
    /// from then on) only if some tracked host has the same base domain.
    pub fn admit_host(&self, host: &str) -> bool {
        let mut hosts = self.hosts();
        if hosts.contains_key(host) {
            return true;
        }

        let base = base_domain(host);
        if hosts.keys().any(|known| base_domain(known) == base) {
            hosts.insert(host.to_string(), HostThrottle::new());
            true
        } else {
            false
        }
    }

    /// Acquires a global slot, then a slot on `host`
    ///
    /// Waits out any rate-limit cool-down on the host without holding
    /// capacity. If a cool-down starts while the slots are being acquired,
    /// both are given back and the wait starts over.
    pub async fn acquire(&self, host: &str) -> Result<FetchPermit, AcquireError> {
        loop {
            if let Some(wait) = self.cooldown_remaining(host) {
                tracing::debug!("Host {} cooling down for {:?}", host, wait);
                tokio::time::sleep(wait).await;
                continue;
            }

            let global = self.global.clone().acquire_owned().await?;
            let slots = self.host_slots(host);
            let host_permit = slots.acquire_owned().await?;

            let ready = {
                let now = Instant::now();
                let mut hosts = self.hosts();
                let state = hosts
                    .entry(host.to_string())
                    .or_insert_with(HostThrottle::new);
                let ready = state.can_request(now);
                tracing::trace!("Checking host {}: can_request={}", host, ready);
                if ready {
                    state.record_request(now);
                }
                ready
            };

            if ready {
                return Ok(FetchPermit {
                    _host: host_permit,
                    _global: global,
                });
            }
        }
    }

    fn host_slots(&self, host: &str) -> Arc<Semaphore> {
        self.hosts()
            .entry(host.to_string())
            .or_insert_with(HostThrottle::new)
            .slots
            .clone()
    }

    /// Time left on the host's cool-down, if any
    pub fn cooldown_remaining(&self, host: &str) -> Option<Duration> {
        self.hosts()
            .get(host)
            .and_then(|state| state.time_until_next_request(Instant::now()))
    }

    /// Suspends dispatch to `host` for `wait` after a 429
    ///
    /// `wait` is capped at [`MAX_RATE_LIMIT_WAIT`].
    pub fn note_rate_limited(&self, host: &str, wait: Duration) {
        let wait = wait.min(MAX_RATE_LIMIT_WAIT);
        let mut hosts = self.hosts();
        let state = hosts
            .entry(host.to_string())
            .or_insert_with(HostThrottle::new);
        state.mark_rate_limited(Instant::now(), wait);
        tracing::warn!(
            "Rate limited on {} ({} in a row), pausing for {:?}",
            host,
            state.consecutive_429s,
            wait
        );
    }

    /// Records a non-429 response from `host`
    pub fn note_response(&self, host: &str) {
        if let Some(state) = self.hosts().get_mut(host) {
            state.clear_rate_limit();
        }
    }

    /// Consecutive 429s seen from `host`
    pub fn consecutive_429s(&self, host: &str) -> u32 {
        self.hosts().get(host).map_or(0, |s| s.consecutive_429s)
    }

    /// Free global slots
    pub fn available_permits(&self) -> usize {
        self.global.available_permits()
    }

    /// Capacity the controller was created with
    pub fn global_limit(&self) -> usize {
        self.global_limit
    }

    /// Free slots on `host`, if the host is tracked
    pub fn host_available_permits(&self, host: &str) -> Option<usize> {
        self.hosts()
            .get(host)
            .map(|state| state.slots.available_permits())
    }

    /// The retry policy of this run
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }
}
