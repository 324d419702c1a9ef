//! Fixed-window rate limiting with cooldown.
//!
//! # Data Flow
//! ```text
//! check_limit(key)
//!     → per-key lock (serializes read-modify-write)
//!     → ExpiringStore get/set (record TTL = window or block remainder)
//!     → RateLimitDecision
//! ```
//!
//! # Design Decisions
//! - Fixed window: the first request in a window pins the reset deadline
//! - Exceeding the limit starts a cooldown that outlives the window, so a
//!   burst costs strictly more than waiting out a normal window
//! - Keys are opaque; callers compose them as `scope:client`
//! - Store failures answer according to an explicit fail policy and are
//!   marked degraded, never silently ignored

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use crate::config::validation::{validate_rate_limit, ValidationError};
use crate::config::{FailPolicy, RateLimitConfig};
use crate::observability::metrics;
use crate::store::SharedStore;
use crate::types::now_millis;

/// Stored per-key counter state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitRecord {
    pub count: u32,
    /// Epoch milliseconds at which the current window ends.
    pub window_reset_at: u64,
    /// Set once the key exceeded its limit; cleared by record expiry.
    pub blocked_until: Option<u64>,
}

/// Outcome of a single limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub remaining: u32,
    /// Epoch milliseconds at which the caller may try again.
    pub reset_at_ms: u64,
    /// Set when the backing store failed and the configured fail policy
    /// produced this decision instead of a real counter read.
    pub degraded: bool,
}

/// Compose a rate-limit key from a scope and a client identifier.
pub fn scoped_key(scope: &str, client: &str) -> String {
    format!("{scope}:{client}")
}

/// Fixed-window rate limiter over an expiring store.
pub struct RateLimiter {
    store: SharedStore<RateLimitRecord>,
    config: RateLimitConfig,
    /// Per-key guards making the check-and-increment atomic per key.
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("config", &self.config)
            .field("locks", &self.locks.len())
            .finish_non_exhaustive()
    }
}

impl RateLimiter {
    /// Build a limiter, rejecting invalid thresholds up front.
    pub fn new(
        store: SharedStore<RateLimitRecord>,
        config: RateLimitConfig,
    ) -> Result<Self, Vec<ValidationError>> {
        validate_rate_limit(&config)?;
        Ok(Self {
            store,
            config,
            locks: DashMap::new(),
        })
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Check and count one request for `key`.
    ///
    /// Calls for the same key are strictly serialized: under N concurrent
    /// calls on a fresh key exactly `max_requests` of them are allowed.
    pub async fn check_limit(&self, key: &str) -> RateLimitDecision {
        let guard = self.lock_for(key);
        let _held = guard.lock().await;

        let record = match self.store.get(key).await {
            Ok(record) => record,
            Err(error) => return self.degraded_decision(key, &error),
        };
        let now = now_millis();

        if let Some(record) = &record {
            // A live block wins over everything, including window resets.
            if let Some(until) = record.blocked_until {
                if now < until {
                    return RateLimitDecision {
                        allowed: false,
                        remaining: 0,
                        reset_at_ms: until,
                        degraded: false,
                    };
                }
            }
        }

        match record {
            Some(record)
                if record.blocked_until.is_none() && now <= record.window_reset_at =>
            {
                if record.count >= self.config.max_requests {
                    // Limit spent: this request starts the cooldown.
                    let until = now + self.config.block_duration_ms;
                    let blocked = RateLimitRecord {
                        blocked_until: Some(until),
                        ..record
                    };
                    let ttl = Duration::from_millis(self.config.block_duration_ms);
                    if let Err(error) = self.store.set(key, blocked, ttl).await {
                        return self.degraded_decision(key, &error);
                    }
                    tracing::warn!(key, until, "Rate limit exceeded, key blocked");
                    metrics::record_rate_limited(&self.config.scope);
                    RateLimitDecision {
                        allowed: false,
                        remaining: 0,
                        reset_at_ms: until,
                        degraded: false,
                    }
                } else {
                    let updated = RateLimitRecord {
                        count: record.count + 1,
                        ..record
                    };
                    let remaining = self.config.max_requests - updated.count;
                    let reset_at_ms = updated.window_reset_at;
                    let ttl = Duration::from_millis(reset_at_ms.saturating_sub(now).max(1));
                    if let Err(error) = self.store.set(key, updated, ttl).await {
                        return self.degraded_decision(key, &error);
                    }
                    RateLimitDecision {
                        allowed: true,
                        remaining,
                        reset_at_ms,
                        degraded: false,
                    }
                }
            }
            // Fresh key, expired window, or expired block: start over.
            _ => {
                let reset_at_ms = now + self.config.window_ms;
                let fresh = RateLimitRecord {
                    count: 1,
                    window_reset_at: reset_at_ms,
                    blocked_until: None,
                };
                let ttl = Duration::from_millis(self.config.window_ms);
                if let Err(error) = self.store.set(key, fresh, ttl).await {
                    return self.degraded_decision(key, &error);
                }
                RateLimitDecision {
                    allowed: true,
                    remaining: self.config.max_requests - 1,
                    reset_at_ms,
                    degraded: false,
                }
            }
        }
    }

    /// Drop state for a key, ending any window or block early.
    pub async fn reset(&self, key: &str) {
        if let Err(error) = self.store.delete(key).await {
            tracing::warn!(key, %error, "Failed to reset rate limit key");
        }
        self.locks.remove(key);
    }

    fn lock_for(&self, key: &str) -> Arc<Mutex<()>> {
        // Opportunistically shed guards nobody holds so the lock map does
        // not grow with every key ever seen.
        if self.locks.len() > 4096 {
            self.locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        }
        self.locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    fn degraded_decision(
        &self,
        key: &str,
        error: &crate::store::StoreError,
    ) -> RateLimitDecision {
        tracing::warn!(
            key,
            %error,
            policy = ?self.config.on_store_error,
            "Rate limit store unavailable"
        );
        metrics::record_store_failure("rate_limiter");
        let now = now_millis();
        match self.config.on_store_error {
            FailPolicy::FailOpen => RateLimitDecision {
                allowed: true,
                remaining: 0,
                reset_at_ms: now + self.config.window_ms,
                degraded: true,
            },
            FailPolicy::FailClosed => RateLimitDecision {
                allowed: false,
                remaining: 0,
                reset_at_ms: now + self.config.window_ms,
                degraded: true,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{ExpiringStore, MemoryStore, StoreError};
    use async_trait::async_trait;

    fn limiter(config: RateLimitConfig) -> RateLimiter {
        let store: SharedStore<RateLimitRecord> = Arc::new(MemoryStore::new());
        RateLimiter::new(store, config).unwrap()
    }

    fn config(max_requests: u32, window_ms: u64, block_duration_ms: u64) -> RateLimitConfig {
        RateLimitConfig {
            max_requests,
            window_ms,
            block_duration_ms,
            ..RateLimitConfig::default()
        }
    }

    #[tokio::test]
    async fn counts_down_remaining_within_window() {
        let limiter = limiter(config(3, 60_000, 60_000));
        for expected_remaining in [2, 1, 0] {
            let decision = limiter.check_limit("search:198.51.100.7").await;
            assert!(decision.allowed);
            assert_eq!(decision.remaining, expected_remaining);
        }
        let denied = limiter.check_limit("search:198.51.100.7").await;
        assert!(!denied.allowed);
        assert_eq!(denied.remaining, 0);
    }

    #[tokio::test]
    async fn keys_have_independent_budgets() {
        let limiter = limiter(config(1, 60_000, 60_000));
        assert!(limiter.check_limit("search:a").await.allowed);
        assert!(limiter.check_limit("comments:a").await.allowed);
        assert!(!limiter.check_limit("search:a").await.allowed);
    }

    #[tokio::test]
    async fn exactly_max_requests_succeed_concurrently() {
        let max = 5;
        let limiter = Arc::new(limiter(config(max, 60_000, 60_000)));

        let mut handles = Vec::new();
        for _ in 0..20 {
            let limiter = Arc::clone(&limiter);
            handles.push(tokio::spawn(async move {
                limiter.check_limit("burst:key").await.allowed
            }));
        }

        let mut allowed = 0;
        for handle in handles {
            if handle.await.unwrap() {
                allowed += 1;
            }
        }
        assert_eq!(allowed, max);
    }

    #[tokio::test]
    async fn window_expiry_grants_a_fresh_budget() {
        let limiter = limiter(config(2, 80, 60_000));
        assert!(limiter.check_limit("k").await.allowed);
        assert!(limiter.check_limit("k").await.allowed);
        // At the limit but never over it, so no block was entered.
        tokio::time::sleep(Duration::from_millis(120)).await;
        let decision = limiter.check_limit("k").await;
        assert!(decision.allowed);
        assert_eq!(decision.remaining, 1);
    }

    #[tokio::test]
    async fn block_outlives_the_window() {
        let limiter = limiter(config(1, 50, 300));
        assert!(limiter.check_limit("k").await.allowed);
        let blocked = limiter.check_limit("k").await;
        assert!(!blocked.allowed);

        // The window alone would have reset by now.
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!limiter.check_limit("k").await.allowed);

        // Past the cooldown the key starts a fresh window.
        tokio::time::sleep(Duration::from_millis(300)).await;
        let decision = limiter.check_limit("k").await;
        assert!(decision.allowed);
        assert_eq!(decision.remaining, 0);
    }

    #[tokio::test]
    async fn reset_clears_a_block() {
        let limiter = limiter(config(1, 60_000, 60_000));
        assert!(limiter.check_limit("k").await.allowed);
        assert!(!limiter.check_limit("k").await.allowed);
        limiter.reset("k").await;
        assert!(limiter.check_limit("k").await.allowed);
    }

    #[tokio::test]
    async fn zero_max_requests_is_rejected_at_construction() {
        let store: SharedStore<RateLimitRecord> = Arc::new(MemoryStore::new());
        let errors = RateLimiter::new(store, config(0, 1000, 1000)).unwrap_err();
        assert!(errors.contains(&ValidationError::ZeroMaxRequests));
    }

    struct FailingStore;

    #[async_trait]
    impl ExpiringStore<RateLimitRecord> for FailingStore {
        async fn get(&self, _key: &str) -> Result<Option<RateLimitRecord>, StoreError> {
            Err(StoreError::Unavailable("injected".to_string()))
        }
        async fn set(
            &self,
            _key: &str,
            _value: RateLimitRecord,
            _ttl: Duration,
        ) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("injected".to_string()))
        }
        async fn delete(&self, _key: &str) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("injected".to_string()))
        }
    }

    #[tokio::test]
    async fn store_failure_fails_closed_by_default() {
        let limiter = RateLimiter::new(Arc::new(FailingStore), config(5, 1000, 1000)).unwrap();
        let decision = limiter.check_limit("k").await;
        assert!(!decision.allowed);
        assert!(decision.degraded);
    }

    #[tokio::test]
    async fn store_failure_can_fail_open() {
        let mut cfg = config(5, 1000, 1000);
        cfg.on_store_error = FailPolicy::FailOpen;
        let limiter = RateLimiter::new(Arc::new(FailingStore), cfg).unwrap();
        let decision = limiter.check_limit("k").await;
        assert!(decision.allowed);
        assert!(decision.degraded);
    }
}
