//! Entry Store Module
//!
//! Key to entry mapping with lazy, time-based expiry.

use std::collections::HashMap;

use axum::body::Body;
use axum::http::Response;
use tracing::debug;

use crate::cache::{CacheStats, CachedEntry, SharedResponse};
use crate::error::Result;

// == Entry Store ==
/// In-memory response storage.
///
/// Holds at most one entry per key. Expired entries are not swept; they are
/// removed by the lookup that finds them expired.
#[derive(Debug, Default)]
pub struct EntryStore {
    /// Key-entry storage
    entries: HashMap<String, CachedEntry>,
    /// Performance statistics
    stats: CacheStats,
}

impl EntryStore {
    // == Constructor ==
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    // == Invalidate ==
    /// Removes the entry for `key`, if any.
    ///
    /// Returns true if an entry was removed.
    pub fn invalidate(&mut self, key: &str) -> bool {
        if self.entries.remove(key).is_some() {
            self.stats.record_invalidation();
            self.stats.set_total_entries(self.entries.len());
            debug!(key, "invalidated cache entry");
            true
        } else {
            false
        }
    }

    // == Lookup ==
    /// Returns the entry for `key` if it is fresh at `now`.
    ///
    /// An entry found expired is removed and counted as a miss.
    pub fn lookup(&mut self, key: &str, now: u64) -> Option<&CachedEntry> {
        self.find(key, now, None)
    }

    /// Like [`lookup`](Self::lookup), but the entry must also be no older
    /// than `max_age_seconds`. An entry failing either check is removed.
    pub fn lookup_within(
        &mut self,
        key: &str,
        now: u64,
        max_age_seconds: u64,
    ) -> Option<&CachedEntry> {
        self.find(key, now, Some(max_age_seconds))
    }

    fn find(&mut self, key: &str, now: u64, max_age_seconds: Option<u64>) -> Option<&CachedEntry> {
        let usable = match self.entries.get(key) {
            Some(entry) => {
                entry.is_fresh(now)
                    && max_age_seconds.map_or(true, |max_age| entry.is_within_age(now, max_age))
            }
            None => {
                self.stats.record_miss();
                return None;
            }
        };

        if !usable {
            self.entries.remove(key);
            self.stats.record_expiration();
            self.stats.record_miss();
            self.stats.set_total_entries(self.entries.len());
            debug!(key, now, "removed expired cache entry");
            return None;
        }

        self.stats.record_hit();
        self.entries.get(key)
    }

    // == Put ==
    /// Stores `payload` under `key`, replacing any existing entry.
    ///
    /// # Arguments
    /// * `key` - The key to store under
    /// * `payload` - The materialized response
    /// * `now` - Store timestamp (Unix milliseconds)
    /// * `max_age_seconds` - Lifetime of the new entry
    pub fn put(&mut self, key: String, payload: SharedResponse, now: u64, max_age_seconds: u64) {
        let entry = CachedEntry::new(key.clone(), payload, now, max_age_seconds);
        debug!(key = %key, expires_at = entry.expires_at, "stored cache entry");
        self.entries.insert(key, entry);
        self.stats.record_store();
        self.stats.set_total_entries(self.entries.len());
    }

    // == Reset ==
    /// Removes every entry and zeroes the statistics.
    pub fn reset(&mut self) {
        self.entries.clear();
        self.stats = CacheStats::new();
    }

    // == Materialize ==
    /// Turns a one-shot response into a shareable, multi-read handle.
    ///
    /// The body is drained here, once; see [`SharedResponse::materialize`].
    pub async fn materialize(response: Response<Body>) -> Result<SharedResponse> {
        SharedResponse::materialize(response).await
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.set_total_entries(self.entries.len());
        stats
    }

    // == Length ==
    /// Returns the current number of entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    // == Is Empty ==
    /// Returns true if no entries are stored.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CacheError;

    async fn payload(text: &'static str) -> SharedResponse {
        EntryStore::materialize(Response::new(Body::from(text)))
            .await
            .unwrap()
    }

    #[test]
    fn test_store_new() {
        let store = EntryStore::new();
        assert_eq!(store.len(), 0);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_store_put_and_lookup() {
        let mut store = EntryStore::new();

        store.put("GET/r".to_string(), payload("value1").await, 0, 120);
        let entry = store.lookup("GET/r", 1).unwrap();

        assert_eq!(entry.payload.text(), "value1");
        assert_eq!(entry.key, "GET/r");
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_store_lookup_nonexistent() {
        let mut store = EntryStore::new();

        assert!(store.lookup("nonexistent", 0).is_none());
        assert_eq!(store.stats().misses, 1);
    }

    #[tokio::test]
    async fn test_store_overwrite() {
        let mut store = EntryStore::new();

        store.put("GET/r".to_string(), payload("value1").await, 0, 10);
        store.put("GET/r".to_string(), payload("value2").await, 5_000, 10);

        let entry = store.lookup("GET/r", 14_000).unwrap();
        assert_eq!(entry.payload.text(), "value2");
        assert_eq!(entry.stored_at, 5_000);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_store_invalidate() {
        let mut store = EntryStore::new();

        store.put("GET/r".to_string(), payload("value").await, 0, 120);
        assert!(store.invalidate("GET/r"));

        assert!(store.is_empty());
        assert!(store.lookup("GET/r", 0).is_none());
        assert_eq!(store.stats().invalidations, 1);
    }

    #[test]
    fn test_store_invalidate_nonexistent() {
        let mut store = EntryStore::new();

        assert!(!store.invalidate("nonexistent"));
        assert_eq!(store.stats().invalidations, 0);
    }

    #[tokio::test]
    async fn test_store_expiry_boundary() {
        let mut store = EntryStore::new();

        store.put("GET/r".to_string(), payload("value").await, 0, 120);
        assert!(store.lookup("GET/r", 119_999).is_some());
        assert!(store.lookup("GET/r", 120_000).is_some());
        assert!(store.lookup("GET/r", 120_001).is_none());
    }

    #[tokio::test]
    async fn test_store_lazy_eviction() {
        let mut store = EntryStore::new();

        store.put("GET/r".to_string(), payload("value").await, 0, 1);
        assert_eq!(store.len(), 1, "Expired entries stay until accessed");

        assert!(store.lookup("GET/r", 1_001).is_none());
        assert_eq!(store.len(), 0, "Lookup removes the expired entry");

        let stats = store.stats();
        assert_eq!(stats.expirations, 1);
        assert_eq!(stats.misses, 1);
    }

    #[tokio::test]
    async fn test_store_lookup_within_age_ceiling() {
        let mut store = EntryStore::new();

        store.put("GET/r".to_string(), payload("value").await, 0, 120);
        assert!(store.lookup_within("GET/r", 30_000, 30).is_some());
        assert!(store.lookup_within("GET/r", 30_001, 30).is_none());
        assert!(store.is_empty(), "An entry too old for the caller is removed");
    }

    #[tokio::test]
    async fn test_store_lookup_within_never_extends_expiry() {
        let mut store = EntryStore::new();

        store.put("GET/r".to_string(), payload("value").await, 0, 60);
        assert!(store.lookup_within("GET/r", 60_001, 300).is_none());
    }

    #[tokio::test]
    async fn test_store_reset() {
        let mut store = EntryStore::new();

        store.put("GET/a".to_string(), payload("a").await, 0, 120);
        store.put("GET/b".to_string(), payload("b").await, 0, 120);
        store.lookup("GET/a", 0);
        store.reset();

        assert!(store.is_empty());
        assert_eq!(store.stats(), CacheStats::default());
    }

    #[tokio::test]
    async fn test_store_stats() {
        let mut store = EntryStore::new();

        store.put("GET/r".to_string(), payload("value").await, 0, 120);
        store.lookup("GET/r", 0); // hit
        store.lookup("GET/other", 0); // miss

        let stats = store.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.stores, 1);
        assert_eq!(stats.total_entries, 1);
    }

    #[tokio::test]
    async fn test_materialized_payload_is_shared_by_lookups() {
        let mut store = EntryStore::new();

        store.put("GET/r".to_string(), payload("{\"a\":1}").await, 0, 120);
        let first = store.lookup("GET/r", 0).unwrap().payload.clone();
        let second = store.lookup("GET/r", 0).unwrap().payload.clone();

        assert!(first.shares_snapshot_with(&second));
        assert_eq!(first.text(), second.text());
        assert!(matches!(first.bytes(), Err(CacheError::UnsupportedBodyAccess(_))));
    }
}
