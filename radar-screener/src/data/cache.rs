//! Snapshot cache.
//!
//! Provides in-memory caching with TTL for fetched batches so that repeated
//! pipeline runs do not hit the upstream source more often than needed.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::RwLock;
use tracing::debug;

use super::{RawRecord, SnapshotSource};

/// Cache entry with TTL
#[derive(Debug, Clone)]
struct CacheEntry<T> {
    data: T,
    expires_at: DateTime<Utc>,
}

impl<T> CacheEntry<T> {
    fn new(data: T, ttl_secs: i64) -> Self {
        Self {
            data,
            expires_at: Utc::now() + Duration::seconds(ttl_secs),
        }
    }

    fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }
}

/// Batch cache keyed by source name
pub struct SnapshotCache {
    batches: RwLock<HashMap<String, CacheEntry<Vec<RawRecord>>>>,
    /// Default TTL in seconds
    ttl: i64,
}

impl SnapshotCache {
    /// Create a new cache
    pub fn new() -> Self {
        Self::with_ttl(120)
    }

    /// Create with custom TTL
    pub fn with_ttl(ttl_secs: i64) -> Self {
        Self {
            batches: RwLock::new(HashMap::new()),
            ttl: ttl_secs,
        }
    }

    pub fn ttl_secs(&self) -> i64 {
        self.ttl
    }

    /// Get a cached batch if not expired
    pub fn get(&self, key: &str) -> Option<Vec<RawRecord>> {
        let cache = self.batches.read().ok()?;

        cache.get(key).and_then(|entry| {
            if entry.is_expired() {
                None
            } else {
                Some(entry.data.clone())
            }
        })
    }

    /// Cache a batch with the default TTL
    pub fn set(&self, key: &str, records: Vec<RawRecord>) {
        self.set_with_ttl(key, records, self.ttl);
    }

    /// Cache a batch with custom TTL
    pub fn set_with_ttl(&self, key: &str, records: Vec<RawRecord>, ttl_secs: i64) {
        let entry = CacheEntry::new(records, ttl_secs);

        if let Ok(mut cache) = self.batches.write() {
            cache.insert(key.to_string(), entry);
        }
    }

    /// Invalidate a cached batch
    pub fn invalidate(&self, key: &str) {
        if let Ok(mut cache) = self.batches.write() {
            cache.remove(key);
        }
    }

    /// Clear all expired entries
    pub fn clear_expired(&self) {
        if let Ok(mut cache) = self.batches.write() {
            cache.retain(|_, entry| !entry.is_expired());
        }
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        let batches = self.batches.read().ok();
        let (total, expired) = batches
            .map(|c| {
                let total = c.len();
                let expired = c.values().filter(|e| e.is_expired()).count();
                (total, expired)
            })
            .unwrap_or((0, 0));

        CacheStats {
            total_entries: total,
            expired_entries: expired,
            active_entries: total - expired,
        }
    }
}

impl Default for SnapshotCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Cache statistics
#[derive(Debug, Clone)]
pub struct CacheStats {
    pub total_entries: usize,
    pub expired_entries: usize,
    pub active_entries: usize,
}

// ============================================================================
// Cached Source
// ============================================================================

/// A source whose batches are memoized for the cache TTL.
///
/// Fetch errors are passed through and never cached.
pub struct CachedSource<S: SnapshotSource> {
    inner: S,
    cache: SnapshotCache,
}

impl<S: SnapshotSource> CachedSource<S> {
    pub fn new(inner: S, ttl_secs: i64) -> Self {
        Self {
            inner,
            cache: SnapshotCache::with_ttl(ttl_secs),
        }
    }

    /// Drop the cached batch so the next fetch goes upstream.
    pub fn invalidate(&self) {
        self.cache.invalidate(self.inner.name());
    }
}

#[async_trait]
impl<S: SnapshotSource> SnapshotSource for CachedSource<S> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn fetch(&self) -> Result<Vec<RawRecord>> {
        let key = self.inner.name();

        if let Some(records) = self.cache.get(key) {
            debug!(source = key, count = records.len(), "Snapshot cache hit");
            return Ok(records);
        }

        // Expired batches are dropped before going upstream.
        self.cache.clear_expired();

        let records = self.inner.fetch().await?;
        self.cache.set(key, records.clone());

        let stats = self.cache.stats();
        debug!(
            source = key,
            count = records.len(),
            ttl_secs = self.cache.ttl_secs(),
            cached_batches = stats.active_entries,
            "Snapshot cache refreshed"
        );
        Ok(records)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Serves one batch, then fails every later fetch.
    struct OneShotSource {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl SnapshotSource for OneShotSource {
        fn name(&self) -> &str {
            "crypto"
        }

        async fn fetch(&self) -> Result<Vec<RawRecord>> {
            match self.calls.fetch_add(1, Ordering::SeqCst) {
                0 => Ok(vec![make_record("BTC")]),
                _ => Err(anyhow::anyhow!("feed closed")),
            }
        }
    }

    fn make_record(symbol: &str) -> RawRecord {
        RawRecord {
            symbol: Some(symbol.to_string()),
            price: Some(10.0),
            change_pct: Some(1.0),
            volume: Some(1000.0),
            ..Default::default()
        }
    }

    #[test]
    fn test_cache_set_get() {
        let cache = SnapshotCache::new();
        cache.set("crypto", vec![make_record("BTC")]);

        let cached = cache.get("crypto");
        assert!(cached.is_some());
        assert_eq!(cached.unwrap().len(), 1);
    }

    #[test]
    fn test_cache_miss() {
        let cache = SnapshotCache::new();
        assert!(cache.get("crypto").is_none());
    }

    #[test]
    fn test_cache_expired_entry() {
        let cache = SnapshotCache::new();
        cache.set_with_ttl("crypto", vec![make_record("BTC")], 0);
        assert!(cache.get("crypto").is_none());

        let stats = cache.stats();
        assert_eq!(stats.total_entries, 1);
        assert_eq!(stats.expired_entries, 1);

        cache.clear_expired();
        assert_eq!(cache.stats().total_entries, 0);
    }

    #[test]
    fn test_cache_invalidate() {
        let cache = SnapshotCache::new();
        cache.set("crypto", vec![make_record("BTC")]);
        cache.invalidate("crypto");
        assert!(cache.get("crypto").is_none());
    }

    #[tokio::test]
    async fn test_cached_source_drops_expired_batch_on_refresh() {
        let source = CachedSource::new(
            OneShotSource {
                calls: AtomicUsize::new(0),
            },
            0,
        );

        assert_eq!(source.fetch().await.unwrap().len(), 1);
        assert_eq!(source.cache.stats().expired_entries, 1);

        assert!(source.fetch().await.is_err());
        assert_eq!(source.cache.stats().total_entries, 0);
    }

    #[tokio::test]
    async fn test_cached_source_hit_skips_upstream() {
        let source = CachedSource::new(
            OneShotSource {
                calls: AtomicUsize::new(0),
            },
            120,
        );

        source.fetch().await.unwrap();
        let again = source.fetch().await.unwrap();
        assert_eq!(again, vec![make_record("BTC")]);
        assert_eq!(source.inner.calls.load(Ordering::SeqCst), 1);
        assert_eq!(source.cache.stats().active_entries, 1);
    }

    #[test]
    fn test_cache_stats() {
        let cache = SnapshotCache::new();
        cache.set("crypto", vec![make_record("BTC")]);
        cache.set("us_stocks", vec![make_record("AAPL")]);

        let stats = cache.stats();
        assert_eq!(stats.total_entries, 2);
        assert_eq!(stats.active_entries, 2);
    }
}
