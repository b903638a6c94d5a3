//! In-memory query cache: latest known value per fingerprint, staleness
//! metadata and in-flight status.
//!
//! Supersession is handled with a per-key fetch generation. `begin_fetch`
//! stamps a ticket with the current generation; `complete_fetch` applies the
//! result only if that generation is still current. `cancel_in_flight` bumps
//! the generation, so a response that settles later is discarded instead of
//! overwriting a newer entry.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use tracing::debug;

use super::key::CacheKey;
use crate::api::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStatus {
    Idle,
    Fetching,
    Error,
}

#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// Latest known value; `None` until the first write. A read that mapped
    /// 404 to "absent" stores `Value::Null` here.
    pub value: Option<Value>,
    pub fetch_status: FetchStatus,
    /// `None` means stale: never fetched, or explicitly invalidated.
    pub last_updated: Option<Instant>,
    generation: u64,
}

impl CacheEntry {
    fn empty() -> Self {
        Self { value: None, fetch_status: FetchStatus::Idle, last_updated: None, generation: 0 }
    }

    pub fn is_fresh(&self, ttl: Duration) -> bool {
        self.last_updated.map(|t| t.elapsed() < ttl).unwrap_or(false)
    }
}

/// Ticket tying a fetch completion to the generation it started under.
#[derive(Debug)]
pub struct FetchTicket {
    key: CacheKey,
    generation: u64,
}

impl FetchTicket {
    pub fn key(&self) -> &CacheKey {
        &self.key
    }
}

struct CacheInner {
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
    /// Per-key async locks serializing optimistic apply/rollback.
    write_locks: Mutex<HashMap<CacheKey, Arc<tokio::sync::Mutex<()>>>>,
}

/// Cloneable shared handle; all clones observe the same cache.
#[derive(Clone)]
pub struct QueryCache(Arc<CacheInner>);

impl QueryCache {
    pub fn new() -> Self {
        Self(Arc::new(CacheInner {
            entries: RwLock::new(HashMap::new()),
            write_locks: Mutex::new(HashMap::new()),
        }))
    }

    pub fn read(&self, key: &CacheKey) -> Option<CacheEntry> {
        self.0.entries.read().get(key).cloned()
    }

    /// Convenience: just the value, if any.
    pub fn value(&self, key: &CacheKey) -> Option<Value> {
        self.0.entries.read().get(key).and_then(|e| e.value.clone())
    }

    /// Store a value and stamp it fresh. Used by fetch completion and by the
    /// mutation coordinator's write-through.
    pub fn write(&self, key: &CacheKey, value: Value) {
        let mut entries = self.0.entries.write();
        let entry = entries.entry(key.clone()).or_insert_with(CacheEntry::empty);
        entry.value = Some(value);
        entry.fetch_status = FetchStatus::Idle;
        entry.last_updated = Some(Instant::now());
    }

    /// Mark stale without dropping the value, so observers keep rendering the
    /// stale data until the next read refetches.
    pub fn invalidate(&self, key: &CacheKey) {
        let mut entries = self.0.entries.write();
        if let Some(entry) = entries.get_mut(key) {
            entry.last_updated = None;
            debug!("cache invalidate {}", key);
        }
    }

    pub fn remove(&self, key: &CacheKey) -> bool {
        self.0.entries.write().remove(key).is_some()
    }

    pub fn is_fresh(&self, key: &CacheKey, ttl: Duration) -> bool {
        self.0
            .entries
            .read()
            .get(key)
            .map(|e| e.is_fresh(ttl))
            .unwrap_or(false)
    }

    /// Whether an actively observed read should trigger a (re)fetch: absent
    /// or stale, and not already fetching.
    pub fn needs_fetch(&self, key: &CacheKey, ttl: Duration) -> bool {
        let entries = self.0.entries.read();
        match entries.get(key) {
            None => true,
            Some(e) => e.fetch_status != FetchStatus::Fetching && !e.is_fresh(ttl),
        }
    }

    /// Open a fetch: bumps the key's generation (superseding any in-flight
    /// fetch) and marks the entry as fetching.
    pub fn begin_fetch(&self, key: &CacheKey) -> FetchTicket {
        let mut entries = self.0.entries.write();
        let entry = entries.entry(key.clone()).or_insert_with(CacheEntry::empty);
        entry.generation += 1;
        entry.fetch_status = FetchStatus::Fetching;
        FetchTicket { key: key.clone(), generation: entry.generation }
    }

    /// Apply a fetch result. Returns false (and leaves the entry untouched)
    /// when the ticket was superseded by `cancel_in_flight` or a newer
    /// `begin_fetch`. An error keeps any stale value readable and marks the
    /// entry `Error`.
    pub fn complete_fetch(&self, ticket: FetchTicket, result: Result<Value, ApiError>) -> bool {
        let mut entries = self.0.entries.write();
        let Some(entry) = entries.get_mut(&ticket.key) else {
            return false;
        };
        if entry.generation != ticket.generation {
            debug!("discarding superseded fetch for {}", ticket.key);
            return false;
        }
        match result {
            Ok(value) => {
                entry.value = Some(value);
                entry.fetch_status = FetchStatus::Idle;
                entry.last_updated = Some(Instant::now());
            }
            Err(err) => {
                debug!("fetch failed for {}: {}", ticket.key, err);
                entry.fetch_status = FetchStatus::Error;
            }
        }
        true
    }

    /// Supersede any in-flight fetch for this key. Its eventual completion
    /// will no longer match the generation and gets discarded.
    pub fn cancel_in_flight(&self, key: &CacheKey) {
        let mut entries = self.0.entries.write();
        if let Some(entry) = entries.get_mut(key) {
            entry.generation += 1;
            if entry.fetch_status == FetchStatus::Fetching {
                entry.fetch_status = FetchStatus::Idle;
            }
        }
    }

    /// Per-key lock serializing optimistic apply/rollback. Tokio mutexes hand
    /// the lock out in acquisition order, which gives mutations on one key
    /// their invocation-order guarantee.
    pub fn mutation_lock(&self, key: &CacheKey) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.0.write_locks.lock();
        locks.entry(key.clone()).or_insert_with(|| Arc::new(tokio::sync::Mutex::new(()))).clone()
    }

    pub fn keys(&self) -> Vec<CacheKey> {
        self.0.entries.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.0.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.entries.read().is_empty()
    }

    pub fn clear(&self) {
        self.0.entries.write().clear();
    }
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn key() -> CacheKey {
        CacheKey::new("messages").scoped(7)
    }

    #[test]
    fn write_then_read_is_fresh() {
        let cache = QueryCache::new();
        cache.write(&key(), json!([1, 2]));
        let entry = cache.read(&key()).unwrap();
        assert_eq!(entry.value, Some(json!([1, 2])));
        assert_eq!(entry.fetch_status, FetchStatus::Idle);
        assert!(cache.is_fresh(&key(), Duration::from_secs(60)));
    }

    #[test]
    fn invalidate_keeps_the_stale_value() {
        let cache = QueryCache::new();
        cache.write(&key(), json!([1]));
        cache.invalidate(&key());
        assert!(!cache.is_fresh(&key(), Duration::from_secs(60)));
        assert_eq!(cache.value(&key()), Some(json!([1])));
        assert!(cache.needs_fetch(&key(), Duration::from_secs(60)));
    }

    #[test]
    fn superseded_completion_is_discarded() {
        let cache = QueryCache::new();
        cache.write(&key(), json!(["current"]));
        let ticket = cache.begin_fetch(&key());
        cache.cancel_in_flight(&key());
        assert!(!cache.complete_fetch(ticket, Ok(json!(["late"]))));
        assert_eq!(cache.value(&key()), Some(json!(["current"])));
    }

    #[test]
    fn newer_fetch_supersedes_older_ticket() {
        let cache = QueryCache::new();
        let old = cache.begin_fetch(&key());
        let new = cache.begin_fetch(&key());
        assert!(!cache.complete_fetch(old, Ok(json!("old"))));
        assert!(cache.complete_fetch(new, Ok(json!("new"))));
        assert_eq!(cache.value(&key()), Some(json!("new")));
    }

    #[test]
    fn failed_fetch_marks_error_but_keeps_stale_value() {
        let cache = QueryCache::new();
        cache.write(&key(), json!(["stale"]));
        let ticket = cache.begin_fetch(&key());
        assert!(cache.complete_fetch(ticket, Err(ApiError::new(500))));
        let entry = cache.read(&key()).unwrap();
        assert_eq!(entry.fetch_status, FetchStatus::Error);
        assert_eq!(entry.value, Some(json!(["stale"])));
    }

    #[test]
    fn ttl_expiry_triggers_refetch() {
        let cache = QueryCache::new();
        cache.write(&key(), json!([]));
        assert!(!cache.needs_fetch(&key(), Duration::from_secs(60)));
        assert!(cache.needs_fetch(&key(), Duration::from_nanos(0)));
    }
}
