//! Generic cache utility for what we're reading back out of the database.

use std::{hash::Hash, num::NonZeroUsize};

use lru::LruCache;
use parking_lot::Mutex;

use crate::exec::{DbError, DbRecv, DbResult};

/// Wrapper around an LRU cache keyed by database lookup key. Entries are
/// purged by writers before the underlying write so readers never observe a
/// value the database no longer holds.
pub(crate) struct CacheTable<K, V> {
    cache: Mutex<LruCache<K, V>>,
}

impl<K: Hash + Eq + Clone, V: Clone> CacheTable<K, V> {
    pub(crate) fn new(size: NonZeroUsize) -> Self {
        Self {
            cache: Mutex::new(LruCache::new(size)),
        }
    }

    pub(crate) fn purge_blocking(&self, k: &K) {
        self.cache.lock().pop(k);
    }

    pub(crate) async fn purge_async(&self, k: &K) {
        self.purge_blocking(k);
    }

    pub(crate) fn get_or_fetch_blocking(
        &self,
        k: &K,
        fetch: impl FnOnce() -> DbResult<V>,
    ) -> DbResult<V> {
        if let Some(v) = self.cache.lock().get(k) {
            return Ok(v.clone());
        }

        let v = fetch()?;
        self.cache.lock().put(k.clone(), v.clone());
        Ok(v)
    }

    pub(crate) async fn get_or_fetch(
        &self,
        k: &K,
        fetch: impl FnOnce() -> DbRecv<V>,
    ) -> DbResult<V> {
        if let Some(v) = self.cache.lock().get(k) {
            return Ok(v.clone());
        }

        let v = match fetch().await {
            Ok(res) => res?,
            Err(_e) => return Err(DbError::WorkerFailedStrangely),
        };
        self.cache.lock().put(k.clone(), v.clone());
        Ok(v)
    }
}
