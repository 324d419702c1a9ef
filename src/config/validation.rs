//! Configuration validation.
//!
//! Serde covers the syntactic side; this pass covers value ranges and
//! cross-field rules, and reports every violation rather than stopping at
//! the first one. Components also call the per-section checks from their
//! constructors so an invalid threshold is rejected before any request is
//! scored.

use std::net::SocketAddr;
use thiserror::Error;

use super::schema::{MonitorConfig, RateLimitConfig, ShieldConfig, ZeroTrustConfig};

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener.bind_address {0:?} is not a valid socket address")]
    BadBindAddress(String),

    #[error("observability.metrics_address {0:?} is not a valid socket address")]
    BadMetricsAddress(String),

    #[error("rate_limit.max_requests must be greater than zero")]
    ZeroMaxRequests,

    #[error("rate_limit.window_ms must be greater than zero")]
    ZeroWindow,

    #[error("rate_limit.block_duration_ms must be greater than zero")]
    ZeroBlockDuration,

    #[error("zero_trust.session_ttl_secs must be greater than zero")]
    ZeroSessionTtl,

    #[error("monitor.max_events must be greater than zero")]
    ZeroMaxEvents,

    #[error("monitor.max_alerts must be greater than zero")]
    ZeroMaxAlerts,

    #[error("store.sweep_interval_secs must be greater than zero")]
    ZeroSweepInterval,
}

/// Validate the whole configuration, collecting every problem found.
pub fn validate(config: &ShieldConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BadBindAddress(
            config.listener.bind_address.clone(),
        ));
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::BadMetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }
    if config.store.sweep_interval_secs == 0 {
        errors.push(ValidationError::ZeroSweepInterval);
    }

    errors.extend(validate_rate_limit(&config.rate_limit).err().unwrap_or_default());
    errors.extend(validate_zero_trust(&config.zero_trust).err().unwrap_or_default());
    errors.extend(validate_monitor(&config.monitor).err().unwrap_or_default());

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Per-section check used by [`crate::limiter::RateLimiter::new`].
pub fn validate_rate_limit(config: &RateLimitConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    if config.max_requests == 0 {
        errors.push(ValidationError::ZeroMaxRequests);
    }
    if config.window_ms == 0 {
        errors.push(ValidationError::ZeroWindow);
    }
    if config.block_duration_ms == 0 {
        errors.push(ValidationError::ZeroBlockDuration);
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

pub fn validate_zero_trust(config: &ZeroTrustConfig) -> Result<(), Vec<ValidationError>> {
    if config.session_ttl_secs == 0 {
        Err(vec![ValidationError::ZeroSessionTtl])
    } else {
        Ok(())
    }
}

pub fn validate_monitor(config: &MonitorConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    if config.max_events == 0 {
        errors.push(ValidationError::ZeroMaxEvents);
    }
    if config.max_alerts == 0 {
        errors.push(ValidationError::ZeroMaxAlerts);
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
