//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks, all errors reported)
//!     → ShieldConfig (validated)
//!     → shared via Arc to all subsystems
//!
//! Runtime changes:
//!     zero-trust settings are replaced wholesale through an ArcSwap,
//!     never field by field
//! ```
//!
//! # Design Decisions
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - Invalid thresholds are rejected at construction, not at call time

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_from_file, ConfigError};
pub use schema::{
    CacheConfig, DetectorConfig, EvictionPolicyKind, FailPolicy, ListenerConfig, MonitorConfig,
    ObservabilityConfig, RateLimitConfig, ShieldConfig, StoreConfig, ZeroTrustConfig,
};
pub use validation::{validate, ValidationError};
