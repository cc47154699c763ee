//! Rate Limiting Infrastructure
//!
//! Fixed-window admission control keyed by client identifier.
//!
//! Each client owns one counter holding `count` and `reset_at_ms`
//! (first request of the window + window length). The window is fixed, not
//! sliding: a client may send up to `2 * max_requests` requests across a
//! window boundary. Counters are updated through the map's entry API so the
//! read-increment-write for one client is a single step under its shard lock.

use chrono::Utc;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;

/// Rate limit configuration
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Maximum requests allowed in the window
    pub max_requests: u32,
    /// Time window duration
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 50,
            window: Duration::from_millis(60_000),
        }
    }
}

impl RateLimitConfig {
    pub fn new(max_requests: u32, window_ms: u64) -> Self {
        Self {
            max_requests,
            window: Duration::from_millis(window_ms),
        }
    }

    pub fn window_ms(&self) -> i64 {
        self.window.as_millis() as i64
    }
}

/// Rate limit check result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitResult {
    pub allowed: bool,
    /// Counter value after this request
    pub count: u32,
    pub remaining: u32,
    pub reset_at_ms: i64,
}

impl RateLimitResult {
    /// Whole seconds until the window resets, at least 1
    pub fn retry_after_secs(&self, now_ms: i64) -> u64 {
        let ms = (self.reset_at_ms - now_ms).max(0) as u64;
        ms.div_ceil(1000).max(1)
    }
}

/// Per-client window state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientWindowCounter {
    pub count: u32,
    pub reset_at_ms: i64,
}

/// In-memory fixed-window limiter
#[derive(Debug)]
pub struct FixedWindowLimiter {
    config: RateLimitConfig,
    counters: DashMap<String, ClientWindowCounter>,
}

impl FixedWindowLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            counters: DashMap::new(),
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Admit or reject one request from `client` at the current time
    pub fn check(&self, client: &str) -> RateLimitResult {
        self.check_at(client, Utc::now().timestamp_millis())
    }

    /// Admit or reject one request from `client` at `now_ms`
    pub fn check_at(&self, client: &str, now_ms: i64) -> RateLimitResult {
        let max = self.config.max_requests;
        let window_ms = self.config.window_ms();

        let counter = match self.counters.entry(client.to_string()) {
            Entry::Vacant(vacant) => *vacant.insert(ClientWindowCounter {
                count: 1,
                reset_at_ms: now_ms + window_ms,
            }),
            Entry::Occupied(mut occupied) => {
                let counter = occupied.get_mut();
                if now_ms > counter.reset_at_ms {
                    counter.count = 1;
                    counter.reset_at_ms = now_ms + window_ms;
                } else {
                    counter.count = counter.count.saturating_add(1);
                }
                *counter
            }
        };

        RateLimitResult {
            // A fresh window always admits its first request
            allowed: counter.count == 1 || counter.count <= max,
            count: counter.count,
            remaining: max.saturating_sub(counter.count),
            reset_at_ms: counter.reset_at_ms,
        }
    }

    /// Remove every counter whose window has passed; returns how many went
    pub fn sweep_at(&self, now_ms: i64) -> usize {
        let before = self.counters.len();
        self.counters.retain(|_, counter| counter.reset_at_ms >= now_ms);
        before.saturating_sub(self.counters.len())
    }

    pub fn sweep(&self) -> usize {
        self.sweep_at(Utc::now().timestamp_millis())
    }

    /// Current counter for a client, if tracked
    pub fn counter(&self, client: &str) -> Option<ClientWindowCounter> {
        self.counters.get(client).map(|entry| *entry)
    }

    /// Number of tracked clients
    pub fn len(&self) -> usize {
        self.counters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counters.is_empty()
    }
}

/// Start the idle-client sweep, once per window
///
/// The task holds only a weak reference and exits once the limiter is dropped.
pub fn spawn_sweeper(limiter: &Arc<FixedWindowLimiter>) -> JoinHandle<()> {
    let weak: Weak<FixedWindowLimiter> = Arc::downgrade(limiter);
    let period = limiter.config.window.max(Duration::from_millis(1));

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        // First tick completes immediately
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let Some(limiter) = weak.upgrade() else {
                tracing::debug!("Rate limiter dropped, sweeper stopping");
                break;
            };
            let removed = limiter.sweep();
            if removed > 0 {
                tracing::debug!(
                    removed,
                    tracked = limiter.len(),
                    "Swept idle rate limit windows"
                );
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const T0: i64 = 1_700_000_000_000;

    fn limiter(max: u32, window_ms: u64) -> FixedWindowLimiter {
        FixedWindowLimiter::new(RateLimitConfig::new(max, window_ms))
    }

    #[test]
    fn test_default_config() {
        let config = RateLimitConfig::default();
        assert_eq!(config.max_requests, 50);
        assert_eq!(config.window_ms(), 60_000);
    }

    #[test]
    fn test_admits_up_to_max_then_rejects() {
        let limiter = limiter(5, 60_000);
        for i in 1..=5 {
            let result = limiter.check_at("10.0.0.1", T0 + i);
            assert!(result.allowed, "request {i} should be admitted");
            assert_eq!(result.count, i as u32);
        }
        let sixth = limiter.check_at("10.0.0.1", T0 + 10);
        assert!(!sixth.allowed);
        assert_eq!(sixth.remaining, 0);
        assert_eq!(sixth.reset_at_ms, T0 + 1 + 60_000);
    }

    #[test]
    fn test_clients_are_independent() {
        let limiter = limiter(1, 60_000);
        assert!(limiter.check_at("a", T0).allowed);
        assert!(!limiter.check_at("a", T0).allowed);
        assert!(limiter.check_at("b", T0).allowed);
    }

    #[test]
    fn test_window_reset_after_boundary() {
        let limiter = limiter(2, 1_000);
        assert!(limiter.check_at("c", T0).allowed);
        assert!(limiter.check_at("c", T0 + 1).allowed);
        assert!(!limiter.check_at("c", T0 + 2).allowed);

        // reset_at itself is still inside the window
        assert!(!limiter.check_at("c", T0 + 1_000).allowed);

        let after = limiter.check_at("c", T0 + 1_001);
        assert!(after.allowed);
        assert_eq!(after.count, 1);
        assert_eq!(after.reset_at_ms, T0 + 2_001);
        assert_eq!(limiter.counter("c").unwrap().count, 1);
    }

    #[test]
    fn test_boundary_burst_allows_twice_max() {
        let limiter = limiter(3, 1_000);
        let mut admitted = 0;
        for offset in [990, 995, 999] {
            admitted += limiter.check_at("burst", T0 + offset).allowed as u32;
        }
        // window started at T0 + 990, so it resets after T0 + 1_990
        for offset in [1_991, 1_992, 1_993] {
            admitted += limiter.check_at("burst", T0 + offset).allowed as u32;
        }
        assert_eq!(admitted, 6);
    }

    #[test]
    fn test_sweep_removes_only_expired_clients() {
        let limiter = limiter(10, 1_000);
        limiter.check_at("idle", T0);
        limiter.check_at("active", T0 + 900);

        assert_eq!(limiter.sweep_at(T0 + 1_001), 1);
        assert!(limiter.counter("idle").is_none());
        assert!(limiter.counter("active").is_some());
        assert_eq!(limiter.len(), 1);
    }

    #[test]
    fn test_retry_after_secs() {
        let result = RateLimitResult {
            allowed: false,
            count: 6,
            remaining: 0,
            reset_at_ms: T0 + 1_500,
        };
        assert_eq!(result.retry_after_secs(T0), 2);
        assert_eq!(result.retry_after_secs(T0 + 5_000), 1);
    }

    #[test]
    fn test_concurrent_checks_do_not_lose_updates() {
        let limiter = Arc::new(limiter(1_000, 60_000));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let limiter = limiter.clone();
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        limiter.check_at("shared", T0);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(limiter.counter("shared").unwrap().count, 800);
    }

    #[tokio::test]
    async fn test_sweeper_removes_expired_then_stops_when_dropped() {
        let limiter = Arc::new(limiter(1, 10));
        limiter.check("short-lived");
        let handle = spawn_sweeper(&limiter);

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(limiter.is_empty());

        drop(limiter);
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("sweeper should exit after the limiter is dropped")
            .unwrap();
    }
}
