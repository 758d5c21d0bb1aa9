//! TTL'd LRU cache for resolved terms
//!
//! Shared across concurrent resolution calls; the lock is only held for the
//! map operation itself, never across a store query. A poisoned lock is
//! treated as an unavailable cache backend: callers bypass the cache and
//! resolve directly against the store.

use crate::term::ResolvedTerm;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Full dual key plus target locale; one cache entry per distinct lookup.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub code_system_oid: String,
    pub code: String,
    pub language: String,
    pub country: Option<String>,
}

#[derive(Debug)]
struct CachedTerm {
    term: ResolvedTerm,
    expires_at: Instant,
}

/// Hit/miss counters, cheap enough to keep always-on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

pub struct TermCache {
    entries: Mutex<LruCache<CacheKey, CachedTerm>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl TermCache {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Fetch a live entry. Expired entries are evicted on the way out and
    /// reported as misses.
    pub fn get(&self, key: &CacheKey) -> Option<ResolvedTerm> {
        let mut entries = match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                tracing::warn!("term cache lock poisoned, bypassing cache");
                drop(poisoned);
                return None;
            }
        };

        match entries.get(key) {
            Some(cached) if cached.expires_at > Instant::now() => {
                let term = cached.term.clone();
                drop(entries);
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(term)
            }
            Some(_) => {
                entries.pop(key);
                drop(entries);
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
            None => {
                drop(entries);
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    pub fn insert(&self, key: CacheKey, term: ResolvedTerm, ttl: Duration) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.put(
                key,
                CachedTerm {
                    term,
                    expires_at: Instant::now() + ttl,
                },
            );
        }
    }

    /// Drop every entry. Intended for test isolation and for forcing a
    /// catalogue refresh.
    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.clear();
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}
