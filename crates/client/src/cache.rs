//! Client-side query cache.
//!
//! Results are keyed by [`QueryKey`]. Mutations never edit cached values;
//! they mark entries stale so the next read refetches while the old value
//! keeps serving as a placeholder.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::query::QueryKey;

#[derive(Debug)]
pub struct CacheEntry<V> {
    value: Arc<V>,
    fetched_at: Instant,
    stale: bool,
}

impl<V> CacheEntry<V> {
    pub fn value(&self) -> &Arc<V> {
        &self.value
    }

    pub fn fetched_at(&self) -> Instant {
        self.fetched_at
    }

    pub fn is_stale(&self) -> bool {
        self.stale
    }
}

/// In-memory cache of fetch results.
#[derive(Debug)]
pub struct QueryCache<V> {
    entries: HashMap<QueryKey, CacheEntry<V>>,
    max_age: Option<Duration>,
}

impl<V> Default for QueryCache<V> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
            max_age: None,
        }
    }
}

impl<V> QueryCache<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entries older than `max_age` count as stale on read.
    pub fn with_max_age(max_age: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            max_age: Some(max_age),
        }
    }

    pub fn shared(self) -> SharedCache<V> {
        Arc::new(Mutex::new(self))
    }

    /// Any cached value, fresh or stale.
    pub fn get(&self, key: &QueryKey) -> Option<Arc<V>> {
        self.entries.get(key).map(|e| Arc::clone(&e.value))
    }

    /// A value that can be served without refetching.
    pub fn get_fresh(&self, key: &QueryKey, now: Instant) -> Option<Arc<V>> {
        self.entries
            .get(key)
            .filter(|e| self.is_entry_fresh(e, now))
            .map(|e| Arc::clone(&e.value))
    }

    pub fn is_fresh(&self, key: &QueryKey, now: Instant) -> bool {
        self.entries
            .get(key)
            .is_some_and(|e| self.is_entry_fresh(e, now))
    }

    pub fn insert(&mut self, key: QueryKey, value: Arc<V>, now: Instant) {
        self.entries.insert(
            key,
            CacheEntry {
                value,
                fetched_at: now,
                stale: false,
            },
        );
    }

    pub fn invalidate(&mut self, key: &QueryKey) -> bool {
        match self.entries.get_mut(key) {
            Some(entry) => {
                entry.stale = true;
                true
            }
            None => false,
        }
    }

    /// Mark every cached page of `entity` stale. Returns how many.
    pub fn invalidate_entity(&mut self, entity: &str) -> usize {
        let mut count = 0;
        for (key, entry) in self.entries.iter_mut() {
            if key.entity() == entity {
                entry.stale = true;
                count += 1;
            }
        }
        tracing::debug!(entity, count, "invalidated cached queries");
        count
    }

    pub fn remove(&mut self, key: &QueryKey) -> Option<Arc<V>> {
        self.entries.remove(key).map(|e| e.value)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn is_entry_fresh(&self, entry: &CacheEntry<V>, now: Instant) -> bool {
        if entry.stale {
            return false;
        }
        match self.max_age {
            Some(max) => now.saturating_duration_since(entry.fetched_at) <= max,
            None => true,
        }
    }
}

/// Cache handle shared between screens, drawers and mutations.
pub type SharedCache<V> = Arc<Mutex<QueryCache<V>>>;

/// Lock a shared cache, recovering from a poisoned lock.
///
/// Cache contents are always structurally valid (single inserts/flag
/// flips), so a panic elsewhere cannot leave them half-written.
pub fn lock<V>(cache: &SharedCache<V>) -> MutexGuard<'_, QueryCache<V>> {
    cache.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::QueryState;

    fn key(entity: &str, page: u32) -> QueryKey {
        let mut state = QueryState::default();
        state.pagination_mut().set_total(1_000);
        state.set_page(page);
        QueryKey::compose(entity, &state)
    }

    #[test]
    fn invalidation_keeps_value_as_placeholder() {
        let now = Instant::now();
        let mut cache = QueryCache::new();
        cache.insert(key("accounts", 0), Arc::new(1), now);

        assert!(cache.invalidate(&key("accounts", 0)));
        assert!(!cache.is_fresh(&key("accounts", 0), now));
        assert_eq!(cache.get(&key("accounts", 0)).as_deref(), Some(&1));
        assert!(cache.get_fresh(&key("accounts", 0), now).is_none());
    }

    #[test]
    fn invalidate_entity_touches_only_that_entity() {
        let now = Instant::now();
        let mut cache = QueryCache::new();
        cache.insert(key("accounts", 0), Arc::new(1), now);
        cache.insert(key("accounts", 1), Arc::new(2), now);
        cache.insert(key("guides", 0), Arc::new(3), now);

        assert_eq!(cache.invalidate_entity("accounts"), 2);
        assert!(cache.is_fresh(&key("guides", 0), now));
        assert!(!cache.is_fresh(&key("accounts", 1), now));
    }

    #[test]
    fn max_age_expires_entries() {
        let now = Instant::now();
        let mut cache = QueryCache::with_max_age(Duration::from_secs(30));
        cache.insert(key("accounts", 0), Arc::new(1), now);

        assert!(cache.is_fresh(&key("accounts", 0), now + Duration::from_secs(30)));
        assert!(!cache.is_fresh(&key("accounts", 0), now + Duration::from_secs(31)));
    }
}
