//! In-memory TTL + LRU cache with per-key single-flight fills.
//!
//! Three independent instances back the system: the engine's schema cache, the
//! engine's rendered-fragment cache, and each registry's listing/response cache.
//! They are always constructed explicitly and injected, never global, so tests can
//! hand each component an isolated cache.
//!
//! # Semantics
//!
//! - An entry past its `expires_at` is treated as absent and removed on access.
//! - When an insert pushes the entry count over `max_entries`, the least recently
//!   used entries are evicted first.
//! - [`Cache::get_or_compute`] never calls `compute` on a hit. Concurrent misses for
//!   the same key queue behind one per-key async mutex (kept in a [`DashMap`]), so
//!   only the first caller computes and the rest read its result.
//!
//! # Example
//!
//! ```rust
//! use diversity::cache::Cache;
//! use std::time::Duration;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let cache: Cache<String> = Cache::new("schema", 128);
//! let value = cache
//!     .get_or_compute("schema:toponent", Duration::from_secs(60), || async {
//!         Ok("{}".to_string())
//!     })
//!     .await?;
//! assert_eq!(value, "{}");
//! # Ok(())
//! # }
//! ```

use anyhow::Result;
use dashmap::DashMap;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tokio::sync::Mutex as AsyncMutex;
use tracing::debug;

use crate::constants::cache_fill_timeout;
use crate::core::DiversityError;

struct Entry<V> {
    value: V,
    expires_at: Instant,
    last_used: u64,
}

struct CacheState<V> {
    entries: HashMap<String, Entry<V>>,
    clock: u64,
}

/// A namespaced, bounded, expiring key/value store.
pub struct Cache<V> {
    namespace: String,
    max_entries: usize,
    state: Mutex<CacheState<V>>,
    fetch_locks: DashMap<String, Arc<AsyncMutex<()>>>,
}

impl<V: Clone> Cache<V> {
    /// Create an empty cache holding at most `max_entries` entries.
    pub fn new(namespace: impl Into<String>, max_entries: usize) -> Self {
        Self {
            namespace: namespace.into(),
            max_entries: max_entries.max(1),
            state: Mutex::new(CacheState {
                entries: HashMap::new(),
                clock: 0,
            }),
            fetch_locks: DashMap::new(),
        }
    }

    /// The purpose this cache serves, used in logs and errors.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Return a live entry and mark it recently used.
    pub fn get(&self, key: &str) -> Option<V> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.clock += 1;
        let now_tick = state.clock;

        let expired = match state.entries.get_mut(key) {
            None => return None,
            Some(entry) if entry.expires_at <= Instant::now() => true,
            Some(entry) => {
                entry.last_used = now_tick;
                return Some(entry.value.clone());
            }
        };

        if expired {
            state.entries.remove(key);
            debug!("Cache '{}' entry expired: {}", self.namespace, key);
        }
        None
    }

    /// Whether a live entry exists, without touching its recency.
    pub fn contains(&self, key: &str) -> bool {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.entries.get(key).is_some_and(|e| e.expires_at > Instant::now())
    }

    /// Store `value` for `ttl`, evicting least recently used entries over the bound.
    pub fn insert(&self, key: impl Into<String>, value: V, ttl: Duration) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.clock += 1;
        let tick = state.clock;
        let expires_at = Instant::now() + ttl;

        state.entries.insert(
            key.into(),
            Entry {
                value,
                expires_at,
                last_used: tick,
            },
        );

        while state.entries.len() > self.max_entries {
            let now = Instant::now();
            let victim = state
                .entries
                .iter()
                .min_by_key(|(_, e)| (e.expires_at > now, e.last_used))
                .map(|(k, _)| k.clone());
            match victim {
                Some(k) => {
                    debug!("Cache '{}' evicting: {}", self.namespace, k);
                    state.entries.remove(&k);
                }
                None => break,
            }
        }
    }

    /// Drop one entry. Returns whether it was present.
    pub fn invalidate(&self, key: &str) -> bool {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.entries.remove(key).is_some()
    }

    /// Drop every entry.
    pub fn invalidate_all(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.entries.clear();
        debug!("Cache '{}' cleared", self.namespace);
    }

    /// Number of stored entries, expired ones included until they are touched.
    pub fn len(&self) -> usize {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).entries.len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Return the cached value for `key`, or run `compute`, store its result for
    /// `ttl`, and return it.
    ///
    /// Errors from `compute` are returned as-is and nothing is stored.
    ///
    /// # Errors
    ///
    /// [`DiversityError::CacheBackendFailure`] when another task holds the key's fill
    /// lock for longer than the fill timeout.
    pub async fn get_or_compute<F, Fut>(&self, key: &str, ttl: Duration, compute: F) -> Result<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V>>,
    {
        if let Some(value) = self.get(key) {
            return Ok(value);
        }

        let lock = self
            .fetch_locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone();
        // Dropped on every exit, including cancellation of this future.
        let _release = FillRelease {
            locks: &self.fetch_locks,
            key,
        };

        let _guard = tokio::time::timeout(cache_fill_timeout(), lock.lock()).await.map_err(|_| {
            DiversityError::CacheBackendFailure {
                namespace: self.namespace.clone(),
                reason: format!("timed out waiting for another fill of '{key}'"),
            }
        })?;

        // Another task may have filled the entry while we waited.
        if let Some(value) = self.get(key) {
            return Ok(value);
        }

        debug!("Cache '{}' miss: {}", self.namespace, key);
        let result = compute().await;
        if let Ok(value) = &result {
            self.insert(key, value.clone(), ttl);
        }
        result
    }
}

/// Removes a key's fill lock when the fill ends or is abandoned.
struct FillRelease<'a> {
    locks: &'a DashMap<String, Arc<AsyncMutex<()>>>,
    key: &'a str,
}

impl Drop for FillRelease<'_> {
    fn drop(&mut self) {
        self.locks.remove(self.key);
    }
}

impl<V> std::fmt::Debug for Cache<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cache")
            .field("namespace", &self.namespace)
            .field("max_entries", &self.max_entries)
            .finish_non_exhaustive()
    }
}
