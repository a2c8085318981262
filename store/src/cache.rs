//! Invalidate-on-write read cache.
//!
//! Sits in front of a store for hot read paths (finalized items served to
//! readers). Writers must call [`ReadCache::invalidate`] for every key they
//! touch; a stale entry that survives a write is a bug in the writer, not
//! the cache.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Mutex;

/// A bounded, thread-safe read cache keyed by `K`.
///
/// When the capacity is reached new inserts evict an arbitrary entry; the
/// cache is an accelerator, not a source of truth.
pub struct ReadCache<K, V> {
    entries: Mutex<HashMap<K, V>>,
    capacity: usize,
}

impl<K: Eq + Hash + Clone, V: Clone> ReadCache<K, V> {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            capacity,
        }
    }

    pub fn get(&self, key: &K) -> Option<V> {
        self.entries.lock().unwrap().get(key).cloned()
    }

    pub fn insert(&self, key: K, value: V) {
        let mut entries = self.entries.lock().unwrap();
        if entries.len() >= self.capacity && !entries.contains_key(&key) {
            if let Some(evict) = entries.keys().next().cloned() {
                entries.remove(&evict);
            }
        }
        entries.insert(key, value);
    }

    /// Drop the cached value for a key. Must be called on every write to
    /// the underlying store.
    pub fn invalidate(&self, key: &K) {
        self.entries.lock().unwrap().remove(key);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().unwrap().is_empty()
    }
}
