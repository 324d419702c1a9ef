//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the
//! security engine. All types derive Serde traits for deserialization from
//! config files, and every section has defaults so a minimal config works.

use serde::{Deserialize, Serialize};

/// Root configuration for the request-security engine.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ShieldConfig {
    /// Demo gateway listener settings.
    pub listener: ListenerConfig,

    /// Expiring store settings.
    pub store: StoreConfig,

    /// Bounded cache settings.
    pub cache: CacheConfig,

    /// Rate limiting settings.
    pub rate_limit: RateLimitConfig,

    /// Threat detector settings.
    pub detector: DetectorConfig,

    /// Zero-trust verification settings (runtime swappable).
    pub zero_trust: ZeroTrustConfig,

    /// Security monitor settings.
    pub monitor: MonitorConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration for the demo gateway.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Maximum request body size in bytes; larger bodies are rejected
    /// before scanning.
    pub max_body_size: usize,

    /// Request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            max_body_size: 2 * 1024 * 1024, // 2MB
            request_timeout_secs: 30,
        }
    }
}

/// Expiring store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Interval between background sweeps of expired records, in seconds.
    pub sweep_interval_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            sweep_interval_secs: 30,
        }
    }
}

/// Bounded cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum number of resident entries.
    pub max_size: usize,

    /// Victim selection strategy when full.
    pub policy: EvictionPolicyKind,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_size: 1024,
            policy: EvictionPolicyKind::Lru,
        }
    }
}

/// Named eviction strategies selectable from config.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EvictionPolicyKind {
    Lru,
    Lfu,
    Fifo,
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting.
    pub enabled: bool,

    /// Scope prefix composed into keys as `scope:client`.
    pub scope: String,

    /// Maximum requests per key within one window.
    pub max_requests: u32,

    /// Window length in milliseconds.
    pub window_ms: u64,

    /// Cooldown applied once a key exceeds its limit, in milliseconds.
    /// Outlives the window reset.
    pub block_duration_ms: u64,

    /// What a limit check answers when the backing store is unreachable.
    pub on_store_error: FailPolicy,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            scope: "gateway".to_string(),
            max_requests: 100,
            window_ms: 60_000,
            block_duration_ms: 300_000,
            on_store_error: FailPolicy::FailClosed,
        }
    }
}

/// Behavior when a storage backend call fails.
///
/// Fail-closed treats the client as rate-limited or untrusted and is the
/// default; fail-open must be chosen deliberately in config.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailPolicy {
    FailClosed,
    FailOpen,
}

/// Threat detector configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Optional TOML file with extra signatures appended to the built-in
    /// catalog.
    pub catalog_path: Option<String>,

    /// Sliding window used for per-source request counting, in
    /// milliseconds.
    pub activity_window_ms: u64,

    /// Requests from one source within the window before the rate anomaly
    /// fires.
    pub rate_anomaly_threshold: u32,

    /// Mean spacing below which request timing reads as scripted, in
    /// milliseconds.
    pub robotic_interval_ms: u64,

    /// Minimum samples before timing is judged at all.
    pub min_timing_samples: u32,

    /// Timestamps retained per source.
    pub max_samples_per_source: usize,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            catalog_path: None,
            activity_window_ms: 10_000,
            rate_anomaly_threshold: 30,
            robotic_interval_ms: 100,
            min_timing_samples: 5,
            max_samples_per_source: 64,
        }
    }
}

/// Zero-trust verification settings.
///
/// Mutated at runtime by replacing the whole struct; defaults favor
/// maximum verification.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ZeroTrustConfig {
    /// Strict mode: unknown sessions accrue behavioral penalties and the
    /// threat subscore participates uncapped.
    pub strict_mode: bool,

    /// Re-verify every request instead of trusting an established session.
    pub continuous_verification: bool,

    /// Whether the threat detector subscore participates in fusion.
    pub include_threat_score: bool,

    /// Session lifetime in seconds.
    pub session_ttl_secs: u64,

    /// Network prefixes denied outright (e.g., "203.0.113.").
    pub denied_networks: Vec<String>,

    /// Entries kept in the per-IP reputation cache.
    pub reputation_cache_size: usize,

    /// Session requests within the activity window before navigation
    /// speed reads as abusive.
    pub max_navigation_rate: u32,
}

impl Default for ZeroTrustConfig {
    fn default() -> Self {
        Self {
            strict_mode: true,
            continuous_verification: true,
            include_threat_score: true,
            session_ttl_secs: 1800,
            denied_networks: Vec::new(),
            reputation_cache_size: 512,
            max_navigation_rate: 40,
        }
    }
}

/// Security monitor configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Rolling event log capacity; oldest events are evicted first.
    pub max_events: usize,

    /// Events returned by the dashboard.
    pub recent_events: usize,

    /// Events from one source inside the rate window before a rate alert
    /// fires.
    pub rate_threshold: usize,

    /// Rate window in milliseconds.
    pub rate_window_ms: u64,

    /// Prior alerts for one source before the next alert escalates to
    /// critical.
    pub offender_threshold: usize,

    /// Alert log capacity.
    pub max_alerts: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            max_events: 1000,
            recent_events: 25,
            rate_threshold: 50,
            rate_window_ms: 60_000,
            offender_threshold: 5,
            max_alerts: 500,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
