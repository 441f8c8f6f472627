use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::clock::{expiration_after, Clock, SystemClock};
use crate::entry::CacheEntry;

/// Default time-to-live for entries written without an explicit one: 12 hours
pub const DEFAULT_TTL: Duration = Duration::from_secs(12 * 60 * 60);

/// Thread-safe in-memory map with per-entry expiration.
///
/// Keys are compared case-insensitively. Expired entries are never returned
/// and are dropped lazily, either on lookup or by [`MemoryCache::purge_expired`].
pub struct MemoryCache<V> {
    entries: RwLock<HashMap<String, CacheEntry<V>>>,
    default_ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl<V: Clone> MemoryCache<V> {
    pub fn new(default_ttl: Duration) -> Self {
        Self::with_clock(default_ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(default_ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            default_ttl,
            clock,
        }
    }

    /// Look up a live entry.
    pub fn get(&self, key: &str) -> Option<V> {
        self.lookup(key).0
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Insert or replace an entry. `ttl` overrides the default time-to-live.
    pub fn set(&self, key: &str, value: V, ttl: Option<Duration>) {
        let expiration = expiration_after(self.clock.now(), ttl.unwrap_or(self.default_ttl));
        self.entries
            .write()
            .insert(normalize_key(key), CacheEntry::new(value, expiration));
    }

    /// Insert unless a live entry already holds `key`, returning whether it
    /// was inserted. Check and insert happen under one write lock.
    pub fn set_if_absent(&self, key: &str, value: V, ttl: Option<Duration>) -> bool {
        let now = self.clock.now();
        let mut entries = self.entries.write();
        let key = normalize_key(key);
        if entries.get(&key).is_some_and(|entry| !entry.is_expired(now)) {
            return false;
        }
        let expiration = expiration_after(now, ttl.unwrap_or(self.default_ttl));
        entries.insert(key, CacheEntry::new(value, expiration));
        true
    }

    /// Remove an entry, returning whether one was present.
    pub fn remove(&self, key: &str) -> bool {
        self.entries.write().remove(&normalize_key(key)).is_some()
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }

    /// Number of entries held in memory, including expired ones not yet purged.
    pub fn count(&self) -> usize {
        self.entries.read().len()
    }

    /// Drop every expired entry, returning how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        before - entries.len()
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Lookup that also reports whether an expired entry was purged on the way.
    pub(crate) fn lookup(&self, key: &str) -> (Option<V>, bool) {
        let key = normalize_key(key);
        let now = self.clock.now();

        {
            let entries = self.entries.read();
            match entries.get(&key) {
                None => return (None, false),
                Some(entry) if !entry.is_expired(now) => return (Some(entry.value.clone()), false),
                Some(_) => {}
            }
        }

        // Re-check under the write lock, a concurrent set may have refreshed it
        let mut entries = self.entries.write();
        match entries.get(&key) {
            Some(entry) if entry.is_expired(now) => {
                entries.remove(&key);
                (None, true)
            }
            Some(entry) => (Some(entry.value.clone()), false),
            None => (None, false),
        }
    }

    pub(crate) fn snapshot(&self) -> HashMap<String, CacheEntry<V>> {
        self.entries.read().clone()
    }

    /// Merge entries read from disk, skipping the ones already expired.
    pub(crate) fn load(&self, loaded: HashMap<String, CacheEntry<V>>) -> usize {
        let now = self.clock.now();
        let mut entries = self.entries.write();
        let mut count = 0;
        for (key, entry) in loaded {
            if entry.is_expired(now) {
                continue;
            }
            entries.entry(normalize_key(&key)).or_insert(entry);
            count += 1;
        }
        count
    }
}

fn normalize_key(key: &str) -> String {
    key.to_lowercase()
}
