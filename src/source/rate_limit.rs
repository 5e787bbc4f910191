//! Download throttling
//!
//! One token bucket is shared by every worker of a source, so the configured
//! rate bounds the source as a whole rather than each worker.

use crate::error::{Error, Result};
use governor::clock::DefaultClock;
use governor::middleware::NoOpMiddleware;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter as Governor};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::{Duration, Instant};

type DirectLimiter = Governor<NotKeyed, InMemoryState, DefaultClock, NoOpMiddleware>;

/// Token bucket limiting downloads per second
#[derive(Clone)]
pub struct RateLimiter {
    limiter: Arc<DirectLimiter>,
    per_second: NonZeroU32,
    burst: NonZeroU32,
}

impl RateLimiter {
    /// Allow `per_second` downloads per second, with bursts of up to `burst`
    ///
    /// A zero burst falls back to the sustained rate.
    pub fn new(per_second: u32, burst: u32) -> Result<Self> {
        let per_second = NonZeroU32::new(per_second).ok_or_else(|| {
            Error::invalid_value("rate_limit.requests_per_second", "must be greater than zero")
        })?;
        let burst = NonZeroU32::new(burst).unwrap_or(per_second);

        let quota = Quota::per_second(per_second).allow_burst(burst);
        Ok(Self {
            limiter: Arc::new(Governor::direct(quota)),
            per_second,
            burst,
        })
    }

    /// Sustained downloads per second
    pub fn per_second(&self) -> u32 {
        self.per_second.get()
    }

    /// Largest burst allowed
    pub fn burst(&self) -> u32 {
        self.burst.get()
    }

    /// Wait for a permit, returning how long the caller was held back
    pub async fn wait(&self) -> Duration {
        let start = Instant::now();
        self.limiter.until_ready().await;
        start.elapsed()
    }

    /// Take a permit if one is available right now
    pub fn try_acquire(&self) -> bool {
        self.limiter.check().is_ok()
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("per_second", &self.per_second)
            .field("burst", &self.burst)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_rate_rejected() {
        let err = RateLimiter::new(0, 5).unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_zero_burst_uses_rate() {
        let limiter = RateLimiter::new(4, 0).unwrap();
        assert_eq!(limiter.burst(), 4);
        assert_eq!(limiter.per_second(), 4);
    }

    #[tokio::test]
    async fn test_burst_then_blocks() {
        let limiter = RateLimiter::new(1, 3).unwrap();

        for _ in 0..3 {
            assert!(limiter.try_acquire());
        }
        assert!(!limiter.try_acquire());
    }

    #[tokio::test]
    async fn test_clones_share_bucket() {
        let limiter = RateLimiter::new(1, 1).unwrap();
        let worker = limiter.clone();

        assert!(limiter.try_acquire());
        assert!(!worker.try_acquire());
    }

    #[tokio::test]
    async fn test_wait_within_burst_is_immediate() {
        let limiter = RateLimiter::new(100, 10).unwrap();

        let waited = tokio::time::timeout(Duration::from_millis(100), limiter.wait()).await;
        assert!(waited.is_ok());
    }
}
