//! Bounded in-process cache with per-entry expiry.

use std::num::NonZeroUsize;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use lru::LruCache;
use metrics::counter;

use crate::application::cache::{CacheError, CacheKey, CacheLookup, CacheStore};

use super::lock::{rw_read, rw_write};

const SOURCE: &str = "infra::cache::lru_store";

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Instant,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

pub struct LruTtlCache {
    entries: RwLock<LruCache<String, Entry>>,
}

impl LruTtlCache {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            entries: RwLock::new(LruCache::new(capacity)),
        }
    }

    pub fn len(&self) -> usize {
        rw_read(&self.entries, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lookup(&self, key: &str) -> Option<String> {
        let mut entries = rw_write(&self.entries, SOURCE, "get");
        let now = Instant::now();
        let expired = match entries.get(key) {
            Some(entry) if !entry.is_expired(now) => return Some(entry.value.clone()),
            Some(_) => true,
            None => false,
        };
        if expired {
            entries.pop(key);
        }
        None
    }

    fn insert(&self, key: String, value: String, ttl: Duration) -> Result<(), CacheError> {
        let expires_at = Instant::now()
            .checked_add(ttl)
            .ok_or_else(|| CacheError::operation("set", format!("ttl {ttl:?} overflows")))?;

        let mut entries = rw_write(&self.entries, SOURCE, "set");
        if let Some((evicted, _)) = entries.push(key.clone(), Entry { value, expires_at })
            && evicted != key
        {
            counter!("roster_cache_evict_total").increment(1);
        }
        Ok(())
    }
}

#[async_trait]
impl CacheStore for LruTtlCache {
    async fn get(&self, key: &CacheKey) -> CacheLookup {
        match self.lookup(&key.render()) {
            Some(value) => CacheLookup::Found(value),
            None => CacheLookup::Absent,
        }
    }

    async fn set(&self, key: &CacheKey, value: String, ttl: Duration) -> Result<(), CacheError> {
        self.insert(key.render(), value, ttl)
    }

    async fn delete(&self, key: &CacheKey) -> Result<(), CacheError> {
        rw_write(&self.entries, SOURCE, "delete").pop(key.render().as_str());
        Ok(())
    }
}

/// Cache that never holds anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledCache;

#[async_trait]
impl CacheStore for DisabledCache {
    async fn get(&self, _key: &CacheKey) -> CacheLookup {
        CacheLookup::Absent
    }

    async fn set(&self, _key: &CacheKey, _value: String, _ttl: Duration) -> Result<(), CacheError> {
        Ok(())
    }

    async fn delete(&self, _key: &CacheKey) -> Result<(), CacheError> {
        Ok(())
    }
}
