//! In-memory query cache using DashMap

use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use tokio::time::Instant;

use super::CacheEntry;
use super::CacheKey;
use super::CachedData;

/// The in-memory store behind the query client.
///
/// Holds at most one entry per [`CacheKey`]. Every write bumps a per-key
/// version so a response that was requested before the write can be
/// recognised and dropped (see [`QueryCache::set_if_version`]).
///
/// Lock order is `versions` before `entries` on every path that touches both.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use catalog_lib::cache::QueryCache;
///
/// let cache = QueryCache::new(Duration::from_secs(600));
/// assert!(cache.is_empty());
/// ```
#[derive(Debug)]
pub struct QueryCache {
    entries: DashMap<CacheKey, CacheEntry>,
    versions: DashMap<CacheKey, u64>,
    gc_time: Duration,
}

impl QueryCache {
    /// Creates an empty cache whose entries are evicted `gc_time` after
    /// their last access.
    pub fn new(gc_time: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            versions: DashMap::new(),
            gc_time,
        }
    }

    /// Returns the number of entries in the cache (including expired ones).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns all keys currently held.
    pub fn keys(&self) -> Vec<CacheKey> {
        self.entries.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Looks up an entry and extends its eviction deadline.
    ///
    /// Expired entries are removed and reported as absent.
    pub fn get(&self, key: &CacheKey) -> Option<CacheEntry> {
        let now = Instant::now();
        {
            let mut entry = self.entries.get_mut(key)?;
            if !entry.is_expired(now) {
                entry.evict_at = now + self.gc_time;
                return Some(entry.clone());
            }
        }
        self.remove_expired(key, now);
        None
    }

    /// Looks up an entry without touching its eviction deadline.
    pub fn peek(&self, key: &CacheKey) -> Option<CacheEntry> {
        let now = Instant::now();
        self.entries
            .get(key)
            .filter(|entry| !entry.is_expired(now))
            .map(|entry| entry.clone())
    }

    /// Returns the current write version of a key.
    pub fn version(&self, key: &CacheKey) -> u64 {
        self.versions.get(key).map(|v| *v).unwrap_or(0)
    }

    /// Stores a value unconditionally.
    pub fn set(&self, key: &CacheKey, data: CachedData) {
        let mut version = self.versions.entry(key.clone()).or_insert(0);
        self.entries
            .insert(key.clone(), CacheEntry::new(data, Instant::now(), self.gc_time));
        *version += 1;
    }

    /// Stores a value only if no write happened since `version` was read.
    ///
    /// Returns `false` (and leaves the cache untouched) when the key was
    /// written, patched or removed in the meantime.
    pub fn set_if_version(&self, key: &CacheKey, data: CachedData, version: u64) -> bool {
        let mut current = self.versions.entry(key.clone()).or_insert(0);
        if *current != version {
            return false;
        }
        self.entries
            .insert(key.clone(), CacheEntry::new(data, Instant::now(), self.gc_time));
        *current += 1;
        true
    }

    /// Mutates the data of an existing entry in place.
    ///
    /// Returns `false` if there is no entry for the key.
    pub fn update<F>(&self, key: &CacheKey, f: F) -> bool
    where
        F: FnOnce(&mut CachedData),
    {
        let mut version = self.versions.entry(key.clone()).or_insert(0);
        let Some(mut entry) = self.entries.get_mut(key) else {
            return false;
        };
        let now = Instant::now();
        f(&mut entry.data);
        entry.cached_at = Utc::now();
        entry.updated_at = now;
        entry.evict_at = now + self.gc_time;
        *version += 1;
        true
    }

    /// Marks an entry stale so the next read revalidates it.
    ///
    /// Returns `false` if there is no entry for the key.
    pub fn invalidate(&self, key: &CacheKey) -> bool {
        match self.entries.get_mut(key) {
            Some(mut entry) => {
                entry.invalidated = true;
                true
            }
            None => false,
        }
    }

    /// Removes an entry.
    pub fn remove(&self, key: &CacheKey) -> Option<CacheEntry> {
        let mut version = self.versions.entry(key.clone()).or_insert(0);
        let removed = self.entries.remove(key).map(|(_, entry)| entry);
        *version += 1;
        removed
    }

    /// Removes every entry.
    pub fn clear(&self) {
        for key in self.keys() {
            self.remove(&key);
        }
    }

    /// Removes all entries past their eviction deadline.
    ///
    /// Returns the number of entries removed.
    pub fn gc(&self) -> usize {
        let now = Instant::now();
        let expired: Vec<CacheKey> = self
            .entries
            .iter()
            .filter(|entry| entry.is_expired(now))
            .map(|entry| entry.key().clone())
            .collect();

        expired
            .iter()
            .filter(|key| self.remove_expired(key, now))
            .count()
    }

    // Eviction is not a write, so the version stays put.
    fn remove_expired(&self, key: &CacheKey, now: Instant) -> bool {
        self.entries
            .remove_if(key, |_, entry| entry.is_expired(now))
            .is_some()
    }
}
