//! Issued-session registry.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

use crate::store::{SharedStore, StoreError};
use crate::types::now_millis;

/// State bound to an issued session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Opaque token handed back to the client.
    pub token: String,
    /// Device fingerprint the session was bound to at issue time.
    pub fingerprint: String,
    /// Epoch milliseconds at issue time.
    pub issued_at_ms: u64,
}

/// Session storage over the expiring store; sessions vanish at TTL.
pub struct SessionRegistry {
    store: SharedStore<SessionRecord>,
    ttl: Duration,
}

impl SessionRegistry {
    pub fn new(store: SharedStore<SessionRecord>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    /// Mint and persist a session bound to `fingerprint`.
    ///
    /// The token doubles as the session identifier; its randomness comes
    /// from a v4 UUID.
    pub async fn issue(&self, fingerprint: &str) -> Result<SessionRecord, StoreError> {
        let record = SessionRecord {
            token: Uuid::new_v4().to_string(),
            fingerprint: fingerprint.to_string(),
            issued_at_ms: now_millis(),
        };
        self.store
            .set(&session_key(&record.token), record.clone(), self.ttl)
            .await?;
        tracing::debug!(fingerprint, "Session issued");
        Ok(record)
    }

    pub async fn lookup(&self, session_id: &str) -> Result<Option<SessionRecord>, StoreError> {
        self.store.get(&session_key(session_id)).await
    }

    pub async fn revoke(&self, session_id: &str) -> Result<(), StoreError> {
        self.store.delete(&session_key(session_id)).await
    }
}

fn session_key(session_id: &str) -> String {
    format!("session:{session_id}")
}
