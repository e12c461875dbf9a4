//! Read-view caches held in the HTTP state.
//!
//! Entries expire after the configured TTL and the cache is bounded by
//! `max_capacity`. Writers that change the underlying data invalidate the
//! affected key directly.

use std::hash::Hash;
use std::time::Duration;

use mini_moka::sync::Cache;

#[derive(Clone)]
pub struct ViewCache<K, V> {
    /// `None` when caching is switched off with a zero TTL.
    inner: Option<Cache<K, V>>,
}

impl<K, V> ViewCache<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub fn new(ttl: Duration, max_capacity: u64) -> Self {
        let inner = (!ttl.is_zero()).then(|| {
            Cache::builder()
                .max_capacity(max_capacity)
                .time_to_live(ttl)
                .build()
        });
        Self { inner }
    }

    pub fn get(&self, key: &K) -> Option<V> {
        self.inner.as_ref()?.get(key)
    }

    pub fn insert(&self, key: K, value: V) {
        if let Some(cache) = &self.inner {
            cache.insert(key, value);
        }
    }

    pub fn invalidate(&self, key: &K) {
        if let Some(cache) = &self.inner {
            cache.invalidate(key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn returns_fresh_entries() {
        let cache = ViewCache::new(Duration::from_secs(60), 10);
        cache.insert("alice".to_string(), 3);
        assert_eq!(cache.get(&"alice".to_string()), Some(3));
        assert_eq!(cache.get(&"bob".to_string()), None);
    }

    #[test]
    fn expired_entries_are_gone_for_every_key() {
        let cache = ViewCache::new(Duration::from_millis(5), 100_000);
        for i in 0..10_000 {
            cache.insert(format!("user-{i}"), i);
        }
        std::thread::sleep(Duration::from_millis(30));
        cache.insert("fresh".to_string(), -1);

        let inner = cache.inner.as_ref().unwrap();
        assert!((0..10_000).all(|i| !inner.contains_key(&format!("user-{i}"))));
        assert!(inner.contains_key(&"fresh".to_string()));
    }

    #[test]
    fn invalidate_drops_one_key() {
        let cache = ViewCache::new(Duration::from_secs(60), 10);
        cache.insert("alice".to_string(), 1);
        cache.insert("bob".to_string(), 2);
        cache.invalidate(&"alice".to_string());
        assert_eq!(cache.get(&"alice".to_string()), None);
        assert_eq!(cache.get(&"bob".to_string()), Some(2));
    }

    #[test]
    fn zero_ttl_disables_caching() {
        let cache = ViewCache::new(Duration::ZERO, 10);
        cache.insert("alice".to_string(), 1);
        assert_eq!(cache.get(&"alice".to_string()), None);
    }
}
