//! HTTP adapter layer.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → middleware.rs rate limit (cheap keyed check, 429 on denial)
//!     → middleware.rs verify (scan + zero-trust, 403/401 on denial)
//!     → handler
//!
//! Decisions and triggering events:
//!     → SecurityMonitor
//! ```
//!
//! # Design Decisions
//! - Handlers and middleware translate engine decisions into status codes
//!   and headers; the engine itself never touches HTTP types
//! - Fail closed: a degraded engine answer rejects, and is surfaced as an
//!   anomaly event

pub mod handlers;
pub mod middleware;

use axum::middleware::from_fn_with_state;
use axum::routing::{any, get};
use axum::Router;
use std::sync::Arc;
use std::time::Duration;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::activity::ActivityTracker;
use crate::config::{ConfigError, ShieldConfig};
use crate::detector::{PatternCatalog, ThreatDetector};
use crate::limiter::{RateLimitRecord, RateLimiter};
use crate::monitor::SecurityMonitor;
use crate::store::{MemoryStore, SharedStore};
use crate::verifier::{SessionRecord, SessionRegistry, ZeroTrustVerifier};

/// Assembled engine shared with middleware and handlers.
#[derive(Clone)]
pub struct GatewayState {
    pub limiter: Arc<RateLimiter>,
    pub detector: Arc<ThreatDetector>,
    pub verifier: Arc<ZeroTrustVerifier>,
    pub monitor: Arc<SecurityMonitor>,
    /// Per-source request history feeding the detector's anomaly pass.
    pub source_activity: Arc<ActivityTracker>,
    pub config: Arc<ShieldConfig>,
}

impl GatewayState {
    /// Assemble every component from validated configuration.
    ///
    /// Must run inside a tokio runtime; the expiring stores spawn their
    /// sweep tasks here.
    pub fn from_config(config: ShieldConfig) -> Result<Self, ConfigError> {
        crate::config::validate(&config).map_err(ConfigError::Invalid)?;

        let sweep = Duration::from_secs(config.store.sweep_interval_secs);

        let rate_store = MemoryStore::<RateLimitRecord>::new();
        rate_store.spawn_sweeper(sweep);
        let rate_store: SharedStore<RateLimitRecord> = Arc::new(rate_store);
        let limiter = RateLimiter::new(rate_store, config.rate_limit.clone())
            .map_err(ConfigError::Invalid)?;

        let catalog = PatternCatalog::load(config.detector.catalog_path.as_deref())?;
        let detector = ThreatDetector::new(Arc::new(catalog), config.detector.clone());

        let session_store = MemoryStore::<SessionRecord>::new();
        session_store.spawn_sweeper(sweep);
        let sessions = SessionRegistry::new(
            Arc::new(session_store),
            Duration::from_secs(config.zero_trust.session_ttl_secs),
        );
        let verifier = ZeroTrustVerifier::new(sessions, config.zero_trust.clone())
            .map_err(ConfigError::Invalid)?;

        let monitor =
            SecurityMonitor::new(config.monitor.clone()).map_err(ConfigError::Invalid)?;

        let source_activity = ActivityTracker::new(
            config.detector.activity_window_ms,
            config.detector.max_samples_per_source,
        );

        tracing::info!(
            signatures = detector.catalog().len(),
            max_requests = config.rate_limit.max_requests,
            strict = config.zero_trust.strict_mode,
            "Security engine assembled"
        );

        Ok(Self {
            limiter: Arc::new(limiter),
            detector: Arc::new(detector),
            verifier: Arc::new(verifier),
            monitor: Arc::new(monitor),
            source_activity: Arc::new(source_activity),
            config: Arc::new(config),
        })
    }
}

/// Build the demo gateway router with the full middleware stack.
pub fn router(state: GatewayState) -> Router {
    let protected = Router::new()
        .route("/", any(handlers::content))
        .route("/{*path}", any(handlers::content))
        .layer(from_fn_with_state(
            state.clone(),
            middleware::verify_middleware,
        ))
        .layer(from_fn_with_state(
            state.clone(),
            middleware::rate_limit_middleware,
        ));

    Router::new()
        .route("/healthz", get(handlers::health))
        .route("/dashboard", get(handlers::dashboard))
        .merge(protected)
        .layer(TimeoutLayer::new(Duration::from_secs(
            state.config.listener.request_timeout_secs,
        )))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
