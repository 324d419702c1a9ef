//! In-process expiring store.

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::{ExpiringStore, StoreError};

struct Entry<V> {
    value: V,
    expires_at: Instant,
}

/// DashMap-backed store with lazy expiry on read plus a periodic sweep.
///
/// Reads drop expired entries as they encounter them; the sweep task keeps
/// the map from accumulating records for keys that are never read again.
pub struct MemoryStore<V> {
    entries: Arc<DashMap<String, Entry<V>>>,
}

impl<V: Clone + Send + Sync + 'static> MemoryStore<V> {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
        }
    }

    /// Spawn the periodic sweep removing expired entries.
    ///
    /// The returned handle can be aborted on shutdown.
    pub fn spawn_sweeper(&self, interval: Duration) -> tokio::task::JoinHandle<()> {
        let entries = Arc::clone(&self.entries);
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                let now = Instant::now();
                let before = entries.len();
                entries.retain(|_, entry| entry.expires_at > now);
                let removed = before - entries.len();
                if removed > 0 {
                    tracing::debug!(removed, remaining = entries.len(), "Store sweep");
                }
            }
        })
    }

    /// Number of resident entries, expired rows included until swept.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<V: Clone + Send + Sync + 'static> Default for MemoryStore<V> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<V: Clone + Send + Sync + 'static> ExpiringStore<V> for MemoryStore<V> {
    async fn get(&self, key: &str) -> Result<Option<V>, StoreError> {
        if let Some(entry) = self.entries.get(key) {
            if entry.expires_at > Instant::now() {
                return Ok(Some(entry.value.clone()));
            }
        }
        // Expired or missing. Drop the dead row if it is still there.
        self.entries
            .remove_if(key, |_, entry| entry.expires_at <= Instant::now());
        Ok(None)
    }

    async fn set(&self, key: &str, value: V, ttl: Duration) -> Result<(), StoreError> {
        self.entries.insert(
            key.to_string(),
            Entry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_then_get_returns_value() {
        let store: MemoryStore<u32> = MemoryStore::new();
        store.set("k", 7, Duration::from_secs(60)).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some(7));
    }

    #[tokio::test]
    async fn expired_key_reads_as_missing() {
        let store: MemoryStore<u32> = MemoryStore::new();
        store.set("k", 1, Duration::from_millis(40)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(store.get("k").await.unwrap(), None);
        // The lazy read also dropped the dead row.
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn set_rearms_expiry() {
        let store: MemoryStore<u32> = MemoryStore::new();
        store.set("k", 1, Duration::from_millis(40)).await.unwrap();
        store.set("k", 2, Duration::from_secs(60)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(store.get("k").await.unwrap(), Some(2));
    }

    #[tokio::test]
    async fn delete_removes_record() {
        let store: MemoryStore<u32> = MemoryStore::new();
        store.set("k", 1, Duration::from_secs(60)).await.unwrap();
        store.delete("k").await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), None);
        // Deleting an absent key is fine.
        store.delete("k").await.unwrap();
    }

    #[tokio::test]
    async fn sweeper_reclaims_unread_keys() {
        let store: MemoryStore<u32> = MemoryStore::new();
        let sweeper = store.spawn_sweeper(Duration::from_millis(30));
        store.set("k", 1, Duration::from_millis(20)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(120)).await;
        assert!(store.is_empty());
        sweeper.abort();
    }
}
