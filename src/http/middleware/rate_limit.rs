//! Per-client token bucket rate limiting.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::http::StatusCode;
use dashmap::DashMap;

use crate::config::RateLimitConfig;
use crate::http::Handler;
use crate::observability::metrics;

/// Buckets idle for this long are dropped during a sweep.
const IDLE_EVICTION: Duration = Duration::from_secs(300);

/// Sweep once the table grows past this many clients.
const SWEEP_THRESHOLD: usize = 10_000;

/// A simple token bucket.
#[derive(Debug)]
struct TokenBucket {
    tokens: f64,
    last_update: Instant,
}

impl TokenBucket {
    fn new(capacity: f64) -> Self {
        Self {
            tokens: capacity,
            last_update: Instant::now(),
        }
    }

    fn try_acquire(&mut self, capacity: f64, refill_rate: f64) -> bool {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_update).as_secs_f64();

        self.tokens = (self.tokens + elapsed * refill_rate).min(capacity);
        self.last_update = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

/// Token buckets keyed by client address.
#[derive(Debug)]
pub struct RateLimiter {
    buckets: DashMap<String, TokenBucket>,
    rps: f64,
    burst: f64,
}

impl RateLimiter {
    pub fn new(requests_per_second: u32, burst_size: u32) -> Self {
        Self {
            buckets: DashMap::new(),
            rps: f64::from(requests_per_second.max(1)),
            burst: f64::from(burst_size.max(1)),
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(config.requests_per_second, config.burst_size)
    }

    /// Take one token for `key`; false when its bucket is empty.
    pub fn check(&self, key: &str) -> bool {
        if self.buckets.len() > SWEEP_THRESHOLD {
            self.evict_idle(IDLE_EVICTION);
        }
        let mut bucket = self
            .buckets
            .entry(key.to_string())
            .or_insert_with(|| TokenBucket::new(self.burst));
        bucket.try_acquire(self.burst, self.rps)
    }

    /// Drop buckets untouched for `max_idle`. A bucket idle that long has
    /// refilled anyway, so eviction never changes a verdict.
    pub fn evict_idle(&self, max_idle: Duration) {
        self.buckets.retain(|_, bucket| bucket.last_update.elapsed() < max_idle);
    }

    /// Number of clients currently tracked.
    pub fn tracked(&self) -> usize {
        self.buckets.len()
    }

    /// Chain element enforcing this limiter. Exhausted clients get 429.
    pub fn handler(self: Arc<Self>) -> Handler {
        Handler::named("rate_limit", move |ctx| {
            let client = ctx.client_ip().unwrap_or_else(|| "unknown".to_string());
            if self.check(&client) {
                ctx.next();
            } else {
                tracing::warn!(request_id = %ctx.request_id(), client = %client, "Rate limit exceeded");
                metrics::record_rate_limited("token_bucket");
                ctx.error(StatusCode::TOO_MANY_REQUESTS);
            }
        })
    }
}

/// Rate limiting middleware built from config.
pub fn rate_limit(config: &RateLimitConfig) -> Handler {
    Arc::new(RateLimiter::from_config(config)).handler()
}
