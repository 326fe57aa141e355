// ============================
// crates/backend-lib/src/auth/rate_limit.rs
// ============================
//! Throttling of failed login attempts per client address.

use dashmap::DashMap;
use metrics::counter;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::warn;

use crate::config::RateLimitSettings;
use crate::metrics::LOGIN_THROTTLED;

/// Failures are forgotten after this long without a new one
const FAILURE_MEMORY: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone)]
struct FailureEntry {
    failed_attempts: u32,
    last_failure: Instant,
    /// Set once `max_attempts` is reached
    locked_until: Option<Instant>,
}

/// Rate limiter for login attempts
#[derive(Debug, Clone)]
pub struct AuthRateLimiter {
    attempts: Arc<DashMap<IpAddr, FailureEntry>>,
    max_attempts: u32,
    lockout_duration: Duration,
}

impl Default for AuthRateLimiter {
    fn default() -> Self {
        Self::from_settings(&RateLimitSettings::default())
    }
}

impl AuthRateLimiter {
    pub fn new(max_attempts: u32, lockout_duration: Duration) -> Self {
        Self {
            attempts: Arc::new(DashMap::new()),
            max_attempts,
            lockout_duration,
        }
    }

    pub fn from_settings(settings: &RateLimitSettings) -> Self {
        Self::new(settings.max_attempts, Duration::from_secs(settings.lockout_secs))
    }

    /// Record a failed login from `ip`
    pub fn record_failure(&self, ip: IpAddr) {
        let now = Instant::now();

        let mut entry = self.attempts.entry(ip).or_insert_with(|| FailureEntry {
            failed_attempts: 0,
            last_failure: now,
            locked_until: None,
        });

        // a lapsed lockout starts a fresh count
        if entry.locked_until.is_some_and(|until| now >= until) {
            entry.failed_attempts = 0;
            entry.locked_until = None;
        }

        entry.failed_attempts += 1;
        entry.last_failure = now;

        if entry.failed_attempts >= self.max_attempts && entry.locked_until.is_none() {
            entry.locked_until = Some(now + self.lockout_duration);
            counter!(LOGIN_THROTTLED).increment(1);
            warn!(%ip, attempts = entry.failed_attempts, "locking out login attempts");
        }
    }

    /// Forget the failures of `ip` after a successful login
    pub fn record_success(&self, ip: IpAddr) {
        self.attempts.remove(&ip);
    }

    /// Whether `ip` may attempt to log in now
    pub fn allows(&self, ip: IpAddr) -> bool {
        match self.attempts.get(&ip) {
            Some(entry) => !entry.locked_until.is_some_and(|until| Instant::now() < until),
            None => true,
        }
    }

    /// Drop lapsed lockouts and stale failure counts
    pub fn cleanup(&self) {
        let now = Instant::now();
        self.attempts.retain(|_, entry| match entry.locked_until {
            Some(until) => now < until,
            None => now.duration_since(entry.last_failure) < FAILURE_MEMORY,
        });
    }

    pub fn tracked(&self) -> usize {
        self.attempts.len()
    }
}
