//! Adaptive request-security core.
//!
//! A composable engine that bounds request rate per client, caches
//! computed artifacts with bounded memory, scores requests against known
//! attack signatures, and fuses multiple trust signals into an
//! allow/challenge/block decision with alerting.

pub mod activity;
pub mod cache;
pub mod config;
pub mod detector;
pub mod http;
pub mod limiter;
pub mod monitor;
pub mod observability;
pub mod store;
pub mod types;
pub mod verifier;

pub use cache::BoundedCache;
pub use config::ShieldConfig;
pub use detector::ThreatDetector;
pub use http::GatewayState;
pub use limiter::RateLimiter;
pub use monitor::SecurityMonitor;
pub use store::{ExpiringStore, MemoryStore};
pub use types::RequestDescriptor;
pub use verifier::ZeroTrustVerifier;
