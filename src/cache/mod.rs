//! Memory-bounded memoization cache.
//!
//! # Design Decisions
//! - Fixed capacity; a full cache evicts before inserting a new key
//! - Victim selection is a strategy ([`EvictionPolicy`]), not hard-wired;
//!   recency-based eviction is the default
//! - `get` never panics and signals absence with `None`

mod policy;

pub use policy::{EvictionPolicy, FirstInFirstOut, LeastFrequentlyUsed, LeastRecentlyUsed};

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Mutex;
use std::time::Instant;

/// Book-keeping carried with every cached value.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub value: V,
    pub last_access: Instant,
    pub access_count: u64,
    pub inserted_at: Instant,
}

/// Point-in-time cache statistics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CacheStats {
    pub size: usize,
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
}

struct Inner<K, V> {
    entries: HashMap<K, CacheEntry<V>>,
    hits: u64,
    misses: u64,
}

/// Fixed-capacity cache with a pluggable eviction policy.
///
/// A capacity of zero is a legal no-op cache; a capacity of one evicts the
/// resident entry whenever a different key is inserted.
pub struct BoundedCache<K, V> {
    inner: Mutex<Inner<K, V>>,
    policy: Box<dyn EvictionPolicy<K, V>>,
    max_size: usize,
}

impl<K, V> BoundedCache<K, V>
where
    K: Eq + Hash + Clone + Send,
    V: Clone + Send,
{
    /// Cache with the default recency-based policy.
    pub fn new(max_size: usize) -> Self {
        Self::with_policy(max_size, LeastRecentlyUsed)
    }

    pub fn with_policy(max_size: usize, policy: impl EvictionPolicy<K, V> + 'static) -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                hits: 0,
                misses: 0,
            }),
            policy: Box::new(policy),
            max_size,
        }
    }

    /// Insert or replace a value, evicting first when at capacity.
    pub fn set(&self, key: K, value: V) {
        if self.max_size == 0 {
            return;
        }
        let mut guard = self.inner.lock().expect("cache mutex poisoned");
        let inner = &mut *guard;
        if !inner.entries.contains_key(&key) && inner.entries.len() >= self.max_size {
            if let Some(victim) = self.policy.select_victim(&inner.entries) {
                inner.entries.remove(&victim);
            }
        }
        let now = Instant::now();
        inner.entries.insert(
            key,
            CacheEntry {
                value,
                last_access: now,
                access_count: 0,
                inserted_at: now,
            },
        );
    }

    /// Fetch a value, refreshing its recency and touch count on hit.
    pub fn get(&self, key: &K) -> Option<V> {
        let mut guard = self.inner.lock().expect("cache mutex poisoned");
        let inner = &mut *guard;
        match inner.entries.get_mut(key) {
            Some(entry) => {
                entry.last_access = Instant::now();
                entry.access_count += 1;
                inner.hits += 1;
                Some(entry.value.clone())
            }
            None => {
                inner.misses += 1;
                None
            }
        }
    }

    pub fn remove(&self, key: &K) -> Option<V> {
        let mut guard = self.inner.lock().expect("cache mutex poisoned");
        guard.entries.remove(key).map(|entry| entry.value)
    }

    /// Drop every entry. Hit/miss counters survive.
    pub fn clear(&self) {
        let mut guard = self.inner.lock().expect("cache mutex poisoned");
        guard.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("cache mutex poisoned").entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        let guard = self.inner.lock().expect("cache mutex poisoned");
        let lookups = guard.hits + guard.misses;
        CacheStats {
            size: guard.entries.len(),
            hits: guard.hits,
            misses: guard.misses,
            hit_rate: if lookups == 0 {
                0.0
            } else {
                guard.hits as f64 / lookups as f64
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn get_after_set_returns_value() {
        let cache: BoundedCache<&str, u32> = BoundedCache::new(4);
        cache.set("a", 1);
        assert_eq!(cache.get(&"a"), Some(1));
    }

    #[test]
    fn lru_evicts_oldest_untouched_key() {
        let cache: BoundedCache<String, u32> = BoundedCache::new(3);
        for (i, key) in ["a", "b", "c"].iter().enumerate() {
            cache.set(key.to_string(), i as u32);
            // Distinct access timestamps keep victim selection deterministic.
            std::thread::sleep(Duration::from_millis(2));
        }
        // Touch everything except "a".
        cache.get(&"b".to_string());
        cache.get(&"c".to_string());

        cache.set("d".to_string(), 3);

        assert_eq!(cache.get(&"a".to_string()), None);
        assert_eq!(cache.get(&"b".to_string()), Some(1));
        assert_eq!(cache.get(&"c".to_string()), Some(2));
        assert_eq!(cache.get(&"d".to_string()), Some(3));
    }

    #[test]
    fn capacity_plus_one_inserts_drop_first_key() {
        let k = 4;
        let cache: BoundedCache<usize, usize> = BoundedCache::new(k);
        for i in 0..=k {
            cache.set(i, i);
            std::thread::sleep(Duration::from_millis(2));
        }
        assert_eq!(cache.get(&0), None);
        for i in 1..=k {
            assert_eq!(cache.get(&i), Some(i));
        }
    }

    #[test]
    fn capacity_one_still_functions() {
        let cache: BoundedCache<&str, u32> = BoundedCache::new(1);
        cache.set("a", 1);
        assert_eq!(cache.get(&"a"), Some(1));
        cache.set("b", 2);
        assert_eq!(cache.get(&"a"), None);
        assert_eq!(cache.get(&"b"), Some(2));
    }

    #[test]
    fn capacity_zero_stores_nothing() {
        let cache: BoundedCache<&str, u32> = BoundedCache::new(0);
        cache.set("a", 1);
        assert_eq!(cache.get(&"a"), None);
        assert_eq!(cache.stats().size, 0);
    }

    #[test]
    fn replacing_existing_key_does_not_evict() {
        let cache: BoundedCache<&str, u32> = BoundedCache::new(2);
        cache.set("a", 1);
        cache.set("b", 2);
        cache.set("a", 10);
        assert_eq!(cache.get(&"a"), Some(10));
        assert_eq!(cache.get(&"b"), Some(2));
    }

    #[test]
    fn stats_track_hit_rate() {
        let cache: BoundedCache<&str, u32> = BoundedCache::new(2);
        cache.set("a", 1);
        cache.get(&"a");
        cache.get(&"a");
        cache.get(&"missing");

        let stats = cache.stats();
        assert_eq!(stats.size, 1);
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);
        assert!((stats.hit_rate - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn lfu_evicts_least_touched_key() {
        let cache: BoundedCache<&str, u32> = BoundedCache::with_policy(2, LeastFrequentlyUsed);
        cache.set("a", 1);
        cache.set("b", 2);
        cache.get(&"a");
        cache.get(&"a");
        cache.get(&"b");

        cache.set("c", 3);

        assert_eq!(cache.get(&"b"), None);
        assert_eq!(cache.get(&"a"), Some(1));
        assert_eq!(cache.get(&"c"), Some(3));
    }

    #[test]
    fn fifo_evicts_oldest_insert_even_if_hot() {
        let cache: BoundedCache<&str, u32> = BoundedCache::with_policy(2, FirstInFirstOut);
        cache.set("a", 1);
        std::thread::sleep(Duration::from_millis(2));
        cache.set("b", 2);
        cache.get(&"a");
        cache.get(&"a");

        cache.set("c", 3);

        assert_eq!(cache.get(&"a"), None);
        assert_eq!(cache.get(&"b"), Some(2));
    }

    #[test]
    fn clear_empties_the_cache() {
        let cache: BoundedCache<&str, u32> = BoundedCache::new(4);
        cache.set("a", 1);
        cache.set("b", 2);
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.get(&"a"), None);
    }
}
