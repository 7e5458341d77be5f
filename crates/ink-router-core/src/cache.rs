//! Capacity-bounded response cache with per-entry TTL.
//!
//! Entries live in a `HashMap` behind a single `std::sync::Mutex`; every
//! operation (including the periodic [`cleanup`](ResponseCache::cleanup)
//! sweep) takes that lock, so concurrent `get`/`put` calls never observe a
//! half-applied change.
//!
//! # Semantics
//!
//! - Expiry: an entry is stale when `now - created_at > ttl` (strictly
//!   greater; an entry exactly `ttl` old is still served). Stale entries
//!   are deleted the moment `get` or `has` touches them.
//! - Eviction: when full, the single oldest-*inserted* entry is dropped
//!   before the new one goes in. Access recency is ignored.
//! - Ownership: the cache owns stored values. Callers get clones.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;

use crate::clock::Clock;

struct CacheEntry<V> {
    value: V,
    created_at: u64,
    ttl_ms: u64,
    hits: u64,
    /// Insertion sequence; matches the `order` queue slot that owns this entry.
    seq: u64,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, now: u64) -> bool {
        now.saturating_sub(self.created_at) > self.ttl_ms
    }
}

struct CacheInner<V> {
    entries: HashMap<String, CacheEntry<V>>,
    /// Insertion order, oldest first. Slots whose `seq` no longer matches
    /// the live entry are stale and skipped.
    order: VecDeque<(String, u64)>,
    next_seq: u64,
}

impl<V> CacheInner<V> {
    fn evict_oldest(&mut self) -> Option<String> {
        while let Some((key, seq)) = self.order.pop_front() {
            let live = self.entries.get(&key).is_some_and(|e| e.seq == seq);
            if live {
                self.entries.remove(&key);
                return Some(key);
            }
        }
        None
    }

    fn compact_order(&mut self) {
        let entries = &self.entries;
        self.order
            .retain(|(key, seq)| entries.get(key).is_some_and(|e| e.seq == *seq));
    }
}

/// Snapshot returned by [`ResponseCache::stats`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStats {
    pub size: usize,
    pub max_size: usize,
    /// Mean hit count per live entry (`0.0` when empty).
    pub average_hit_rate: f64,
}

/// Bounded TTL cache keyed by string.
pub struct ResponseCache<V> {
    inner: Mutex<CacheInner<V>>,
    max_size: usize,
    clock: Arc<dyn Clock>,
}

impl<V: Clone> ResponseCache<V> {
    /// Create a cache holding at most `max_size` entries (minimum 1).
    pub fn new(max_size: usize, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Mutex::new(CacheInner {
                entries: HashMap::new(),
                order: VecDeque::new(),
                next_seq: 0,
            }),
            max_size: max_size.max(1),
            clock,
        }
    }

    fn lock(&self) -> MutexGuard<'_, CacheInner<V>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Return a copy of the value for `key` if present and fresh.
    ///
    /// Increments the entry's hit counter. A stale entry is removed.
    pub fn get(&self, key: &str) -> Option<V> {
        debug_assert!(!key.is_empty(), "cache key must not be empty");
        let now = self.clock.now_ms();
        let mut inner = self.lock();
        let entry = inner.entries.get_mut(key)?;
        if entry.is_expired(now) {
            inner.entries.remove(key);
            return None;
        }
        entry.hits += 1;
        Some(entry.value.clone())
    }

    /// Whether a fresh entry exists for `key`. Does not count as a hit.
    pub fn has(&self, key: &str) -> bool {
        debug_assert!(!key.is_empty(), "cache key must not be empty");
        let now = self.clock.now_ms();
        let mut inner = self.lock();
        let expired = match inner.entries.get(key) {
            None => return false,
            Some(entry) => entry.is_expired(now),
        };
        if expired {
            inner.entries.remove(key);
        }
        !expired
    }

    /// Insert `value` under `key` with the given TTL.
    ///
    /// Re-inserting an existing key replaces it and moves it to the back of
    /// the eviction order. Otherwise, if the cache is full, the oldest
    /// inserted entry is evicted first.
    pub fn put(&self, key: impl Into<String>, value: V, ttl: Duration) {
        let key = key.into();
        debug_assert!(!key.is_empty(), "cache key must not be empty");
        let now = self.clock.now_ms();
        let mut inner = self.lock();

        if inner.entries.remove(&key).is_none() && inner.entries.len() >= self.max_size {
            if let Some(evicted) = inner.evict_oldest() {
                tracing::debug!(key = %evicted, "cache evicted oldest entry");
            }
        }

        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.order.push_back((key.clone(), seq));
        inner.entries.insert(
            key,
            CacheEntry {
                value,
                created_at: now,
                ttl_ms: ttl.as_millis().min(u64::MAX as u128) as u64,
                hits: 0,
                seq,
            },
        );

        // Stale slots from replaced or expired keys accumulate in `order`;
        // compact once they outnumber live entries.
        if inner.order.len() > inner.entries.len() * 2 + 16 {
            inner.compact_order();
        }
    }

    /// Remove every expired entry. Returns how many were removed.
    pub fn cleanup(&self) -> usize {
        let now = self.clock.now_ms();
        let mut inner = self.lock();
        let before = inner.entries.len();
        inner.entries.retain(|_, entry| !entry.is_expired(now));
        let removed = before - inner.entries.len();
        inner.compact_order();
        removed
    }

    /// Drop every entry.
    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.entries.clear();
        inner.order.clear();
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Keys currently stored, oldest inserted first. May include entries
    /// that have expired but not yet been swept.
    pub fn keys(&self) -> Vec<String> {
        let inner = self.lock();
        inner
            .order
            .iter()
            .filter(|(key, seq)| inner.entries.get(key).is_some_and(|e| e.seq == *seq))
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Hit count recorded for `key`, if stored.
    pub fn hits(&self, key: &str) -> Option<u64> {
        self.lock().entries.get(key).map(|e| e.hits)
    }

    pub fn stats(&self) -> CacheStats {
        let inner = self.lock();
        let size = inner.entries.len();
        let total_hits: u64 = inner.entries.values().map(|e| e.hits).sum();
        CacheStats {
            size,
            max_size: self.max_size,
            average_hit_rate: if size == 0 {
                0.0
            } else {
                total_hits as f64 / size as f64
            },
        }
    }
}
