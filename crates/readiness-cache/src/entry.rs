// ABOUTME: TTL entry and the shared read-or-expire store behind all three caches
// ABOUTME: Expiry is lazy: entries are only removed by a read or an explicit purge

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::hash::Hash;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    pub value: T,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl<T> CacheEntry<T> {
    pub fn new(value: T, now: DateTime<Utc>, ttl: Duration) -> Self {
        let ttl = chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX);
        Self {
            value,
            created_at: now,
            expires_at: now.checked_add_signed(ttl).unwrap_or(DateTime::<Utc>::MAX_UTC),
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

/// Result of a single keyed read.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<V> {
    Hit(V),
    Miss,
    /// The entry had expired and this read removed it
    Expired,
}

/// Concurrent keyed store with one entry per key.
pub(crate) struct TtlStore<K, V> {
    entries: DashMap<K, CacheEntry<V>>,
}

impl<K, V> TtlStore<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub(crate) fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Read `key`, removing it if expired.
    ///
    /// `Expired` is returned by exactly one reader per expired entry, so
    /// callers can decrement their counters on it without double counting.
    pub(crate) fn get(&self, key: &K, now: DateTime<Utc>) -> Lookup<V> {
        if let Some(entry) = self.entries.get(key) {
            if !entry.is_expired(now) {
                return Lookup::Hit(entry.value.clone());
            }
        } else {
            return Lookup::Miss;
        }

        // guard dropped above; re-check under the shard write lock
        match self.entries.remove_if(key, |_, e| e.is_expired(now)) {
            Some(_) => Lookup::Expired,
            None => match self.entries.get(key) {
                Some(entry) => Lookup::Hit(entry.value.clone()),
                None => Lookup::Miss,
            },
        }
    }

    /// Overwrite `key`; returns true when the key was not present before.
    pub(crate) fn insert(&self, key: K, entry: CacheEntry<V>) -> bool {
        self.entries.insert(key, entry).is_none()
    }

    /// Remove every entry expired at `now`, returning the removed keys.
    pub(crate) fn purge_expired(&self, now: DateTime<Utc>) -> Vec<K> {
        let candidates: Vec<K> = self
            .entries
            .iter()
            .filter(|e| e.value().is_expired(now))
            .map(|e| e.key().clone())
            .collect();

        candidates
            .into_iter()
            .filter(|key| {
                self.entries
                    .remove_if(key, |_, e| e.is_expired(now))
                    .is_some()
            })
            .collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}
