use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tracing::warn;

/// Login attempts allowed per client address per window.
const DEFAULT_MAX_ATTEMPTS: u32 = 5;
const DEFAULT_WINDOW: Duration = Duration::from_secs(60);

#[derive(Debug)]
struct WindowEntry {
    count: u32,
    window_start: Instant,
}

/// Fixed-window limiter for the login route, keyed by client address.
/// Every attempt counts, successful or not, so credential stuffing burns
/// the window either way.
#[derive(Debug, Clone)]
pub struct LoginRateLimiter {
    attempts: Arc<DashMap<IpAddr, WindowEntry>>,
    max_attempts: u32,
    window: Duration,
}

impl Default for LoginRateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, DEFAULT_WINDOW)
    }
}

impl LoginRateLimiter {
    pub fn new(max_attempts: u32, window: Duration) -> Self {
        Self {
            attempts: Arc::new(DashMap::new()),
            max_attempts,
            window,
        }
    }

    /// Count one attempt from `ip`. Returns false once the allowance for
    /// the current window is spent.
    pub fn allow(&self, ip: IpAddr) -> bool {
        let now = Instant::now();
        let mut entry = self.attempts.entry(ip).or_insert_with(|| WindowEntry {
            count: 0,
            window_start: now,
        });

        if now.duration_since(entry.window_start) > self.window {
            entry.count = 0;
            entry.window_start = now;
        }

        if entry.count >= self.max_attempts {
            warn!(client = %ip, "login attempts over the limit");
            return false;
        }
        entry.count += 1;
        true
    }

    /// Drop entries whose window has lapsed. Run periodically so idle
    /// addresses do not accumulate.
    pub fn cleanup(&self) {
        let window = self.window;
        let now = Instant::now();
        self.attempts
            .retain(|_, entry| now.duration_since(entry.window_start) <= window);
    }
}
