//! In-memory memoization of fetched resources, keyed by source URL or path.
//!
//! Entries live for the configured TTL, or for the lifetime of the cache
//! when no TTL is set. Failed fetches are never stored.

use bytes::Bytes;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::error::FetchError;
use crate::fetch::{HttpClient, fetch_source};

struct CacheEntry {
    body: Bytes,
    fetched_at: Instant,
}

pub struct FetchCache {
    ttl: Option<Duration>,
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl FetchCache {
    /// Creates an empty cache. `None` keeps entries until invalidated.
    pub fn new(ttl: Option<Duration>) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the cached body for `source` if present and fresh.
    pub fn get(&self, source: &str) -> Option<Bytes> {
        let mut entries = self.lock();
        let expired = match entries.get(source) {
            None => return None,
            Some(entry) => self.is_expired(entry),
        };
        if expired {
            debug!(source, "Cache entry expired");
            entries.remove(source);
            return None;
        }
        entries.get(source).map(|e| e.body.clone())
    }

    pub fn insert(&self, source: &str, body: Bytes) {
        self.lock().insert(
            source.to_string(),
            CacheEntry {
                body,
                fetched_at: Instant::now(),
            },
        );
    }

    /// Returns the cached body or fetches `source` and stores the result.
    ///
    /// The lock is released while the fetch is in flight, so two concurrent
    /// misses for the same source may both fetch; the later write wins.
    pub async fn get_or_fetch<C: HttpClient>(
        &self,
        client: &C,
        source: &str,
    ) -> Result<Bytes, FetchError> {
        if let Some(body) = self.get(source) {
            debug!(source, bytes = body.len(), "Cache hit");
            return Ok(body);
        }

        info!(source, "Cache miss, fetching");
        let body = fetch_source(client, source).await?;
        self.insert(source, body.clone());
        Ok(body)
    }

    pub fn invalidate(&self, source: &str) -> bool {
        self.lock().remove(source).is_some()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn is_expired(&self, entry: &CacheEntry) -> bool {
        self.ttl.is_some_and(|ttl| entry.fetched_at.elapsed() >= ttl)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, CacheEntry>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for FetchCache {
    fn default() -> Self {
        Self::new(None)
    }
}
