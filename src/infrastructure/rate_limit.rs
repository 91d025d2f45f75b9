//! Per-key request budget backed by a governor keyed limiter.

use std::num::NonZeroU32;
use std::time::Duration;

use governor::clock::Clock;
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};

use crate::domain::models::RateLimitConfig;

/// Allows `requests_per_window` requests per key within `window`.
///
/// Keys are caller addresses or target hosts. A denied check reports how
/// many whole seconds to wait before the next request would pass.
pub struct IpRateLimiter {
    limiter: DefaultKeyedRateLimiter<String>,
}

impl IpRateLimiter {
    pub fn new(requests_per_window: u32, window: Duration) -> Self {
        let burst = NonZeroU32::new(requests_per_window.max(1)).unwrap_or(NonZeroU32::MIN);
        let period = window / burst.get();
        let quota = Quota::with_period(period)
            .unwrap_or_else(|| Quota::per_second(burst))
            .allow_burst(burst);
        Self {
            limiter: RateLimiter::keyed(quota),
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(config.requests_per_window, Duration::from_secs(config.window_secs))
    }

    /// Record one request for `key`, or return the retry-after in seconds.
    pub fn check(&self, key: &str) -> Result<(), u64> {
        self.limiter.check_key(&key.to_string()).map_err(|not_until| {
            let wait = not_until.wait_time_from(self.limiter.clock().now());
            wait.as_secs() + u64::from(wait.subsec_nanos() > 0)
        })
    }

    /// Drop state for keys whose budget has fully refilled.
    pub fn prune(&self) {
        self.limiter.retain_recent();
    }

    pub fn tracked_keys(&self) -> usize {
        self.limiter.len()
    }
}

impl Default for IpRateLimiter {
    fn default() -> Self {
        Self::from_config(&RateLimitConfig::default())
    }
}
