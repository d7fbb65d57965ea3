//! In-memory LRU of probed media sizes.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};

use lru::LruCache;
use tokio::sync::RwLock;
use tracing::trace;

use crate::domain::entities::Size;

/// Default maximum number of sizes kept in memory.
pub const DEFAULT_CACHE_SIZE: usize = 256;

/// LRU of probed sizes keyed by local locator, so re-renders skip the probe.
pub struct MemorySizeCache {
    cache: RwLock<LruCache<String, Size>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl MemorySizeCache {
    /// Creates a new cache with the specified capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: RwLock::new(LruCache::new(cap)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Looks up a size, promoting it in the LRU.
    pub async fn get(&self, local_uri: &str) -> Option<Size> {
        let mut cache = self.cache.write().await;
        if let Some(size) = cache.get(local_uri) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            trace!(uri = %local_uri, "Size cache hit");
            Some(*size)
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            None
        }
    }

    /// Looks up a size without promoting it.
    pub async fn peek(&self, local_uri: &str) -> Option<Size> {
        self.cache.read().await.peek(local_uri).copied()
    }

    /// Stores a size.
    pub async fn put(&self, local_uri: String, size: Size) {
        self.cache.write().await.put(local_uri, size);
    }

    /// Removes a size.
    pub async fn evict(&self, local_uri: &str) {
        self.cache.write().await.pop(local_uri);
    }

    /// Number of cached sizes.
    pub async fn len(&self) -> usize {
        self.cache.read().await.len()
    }

    /// Returns true if nothing is cached.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Returns cache statistics.
    #[allow(clippy::cast_precision_loss)]
    pub async fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        let hit_rate = if total > 0 {
            (hits as f64 / total as f64) * 100.0
        } else {
            0.0
        };
        CacheStats {
            hits,
            misses,
            hit_rate,
            size: self.len().await,
        }
    }
}

impl Default for MemorySizeCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_SIZE)
    }
}

/// Statistics about cache performance.
#[derive(Debug, Clone)]
pub struct CacheStats {
    /// Number of cache hits.
    pub hits: u64,
    /// Number of cache misses.
    pub misses: u64,
    /// Hit rate as a percentage.
    pub hit_rate: f64,
    /// Current number of entries.
    pub size: usize,
}

impl std::fmt::Display for CacheStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Sizes: {} entries, {:.1}% hit rate ({} hits, {} misses)",
            self.size, self.hit_rate, self.hits, self.misses
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_and_get() {
        let cache = MemorySizeCache::new(10);
        cache.put("/tmp/a".to_string(), Size::new(4, 3)).await;
        assert_eq!(cache.get("/tmp/a").await, Some(Size::new(4, 3)));
        assert_eq!(cache.get("/tmp/b").await, None);
    }

    #[tokio::test]
    async fn test_eviction() {
        let cache = MemorySizeCache::new(2);
        cache.put("a".to_string(), Size::new(1, 1)).await;
        cache.put("b".to_string(), Size::new(2, 2)).await;
        cache.put("c".to_string(), Size::new(3, 3)).await;

        assert!(cache.peek("a").await.is_none());
        assert_eq!(cache.len().await, 2);
    }

    #[tokio::test]
    async fn test_peek_does_not_promote() {
        let cache = MemorySizeCache::new(2);
        cache.put("a".to_string(), Size::new(1, 1)).await;
        cache.put("b".to_string(), Size::new(2, 2)).await;

        let _ = cache.peek("a").await;
        cache.put("c".to_string(), Size::new(3, 3)).await;

        assert!(cache.peek("a").await.is_none());
        assert!(cache.peek("b").await.is_some());
    }

    #[tokio::test]
    async fn test_stats() {
        let cache = MemorySizeCache::new(10);
        cache.put("a".to_string(), Size::new(1, 1)).await;
        let _ = cache.get("a").await;
        let _ = cache.get("missing").await;

        let stats = cache.stats().await;
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.size, 1);
    }
}
