//! Eviction victim selection strategies.

use std::collections::HashMap;

use super::CacheEntry;

/// Strategy deciding which entry leaves a full cache.
///
/// Implementations only pick the victim; the cache performs the removal.
pub trait EvictionPolicy<K, V>: Send + Sync {
    fn select_victim(&self, entries: &HashMap<K, CacheEntry<V>>) -> Option<K>;
}

/// Evict the entry with the oldest last access. Ties are arbitrary.
pub struct LeastRecentlyUsed;

impl<K: Clone, V> EvictionPolicy<K, V> for LeastRecentlyUsed {
    fn select_victim(&self, entries: &HashMap<K, CacheEntry<V>>) -> Option<K> {
        entries
            .iter()
            .min_by_key(|(_, entry)| entry.last_access)
            .map(|(key, _)| key.clone())
    }
}

/// Evict the least-touched entry, falling back to recency on equal counts.
pub struct LeastFrequentlyUsed;

impl<K: Clone, V> EvictionPolicy<K, V> for LeastFrequentlyUsed {
    fn select_victim(&self, entries: &HashMap<K, CacheEntry<V>>) -> Option<K> {
        entries
            .iter()
            .min_by_key(|(_, entry)| (entry.access_count, entry.last_access))
            .map(|(key, _)| key.clone())
    }
}

/// Evict the oldest inserted entry regardless of use.
pub struct FirstInFirstOut;

impl<K: Clone, V> EvictionPolicy<K, V> for FirstInFirstOut {
    fn select_victim(&self, entries: &HashMap<K, CacheEntry<V>>) -> Option<K> {
        entries
            .iter()
            .min_by_key(|(_, entry)| entry.inserted_at)
            .map(|(key, _)| key.clone())
    }
}
