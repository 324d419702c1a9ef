//! Expiring key-value storage.
//!
//! # Data Flow
//! ```text
//! Rate limiter / session registry
//!     → ExpiringStore trait (get/set/delete with TTL)
//!         → MemoryStore (in-process, shipped)
//!         → shared or distributed backend (external, same contract)
//! ```
//!
//! # Design Decisions
//! - Records carry an absolute expiry deadline; a record never outlives
//!   the TTL passed to the `set` that wrote it
//! - Expired keys read as missing; callers cannot observe stale records
//! - Backends are swapped behind `Arc<dyn ExpiringStore<_>>`, so the rest
//!   of the engine is unaware which one is in play

mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by a storage backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend could not be reached or answered with a transient fault.
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),
}

/// Contract for expiring key-value storage of small records.
///
/// The in-process [`MemoryStore`] is the shipped implementation. A shared
/// store for multi-process deployments plugs in behind the same trait.
#[async_trait]
pub trait ExpiringStore<V: Clone + Send + Sync + 'static>: Send + Sync {
    /// Fetch a live record. Missing and expired keys both read as `None`.
    async fn get(&self, key: &str) -> Result<Option<V>, StoreError>;

    /// Insert or replace a record, re-arming its expiry to `ttl` from now.
    async fn set(&self, key: &str, value: V, ttl: Duration) -> Result<(), StoreError>;

    /// Remove a record. Removing an absent key is not an error.
    async fn delete(&self, key: &str) -> Result<(), StoreError>;
}

/// Handle type the engine passes around.
pub type SharedStore<V> = Arc<dyn ExpiringStore<V>>;
