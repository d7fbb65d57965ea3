//! Process-wide media cache: disk first, network otherwise.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::Semaphore;
use tracing::{debug, trace, warn};

use super::disk_cache::{DEFAULT_MAX_CACHE_SIZE, DiskMediaCache};
use crate::domain::entities::CacheKey;
use crate::domain::ports::{CacheError, CacheResult, MediaCachePort};

/// Configuration for the media cache gateway.
#[derive(Debug, Clone)]
pub struct MediaCacheConfig {
    /// Maximum probed sizes kept in memory.
    pub memory_entries: usize,
    /// Maximum disk cache size in bytes.
    pub max_disk_bytes: u64,
    /// Maximum concurrent downloads.
    pub max_concurrent_downloads: usize,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for MediaCacheConfig {
    fn default() -> Self {
        Self {
            memory_entries: 256,
            max_disk_bytes: DEFAULT_MAX_CACHE_SIZE,
            max_concurrent_downloads: 4,
            timeout_secs: 30,
        }
    }
}

struct GatewayInner {
    disk: Arc<DiskMediaCache>,
    http_client: reqwest::Client,
    semaphore: Semaphore,
    key_locks: parking_lot::Mutex<HashMap<CacheKey, Arc<tokio::sync::Mutex<()>>>>,
}

/// Downloads media into a [`DiskMediaCache`].
///
/// Concurrent requests for one key share a single download; downloads are
/// bounded by a semaphore.
#[derive(Clone)]
pub struct MediaCacheGateway {
    inner: Arc<GatewayInner>,
}

impl MediaCacheGateway {
    /// Creates a gateway storing into `disk`.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created.
    pub fn new(config: &MediaCacheConfig, disk: Arc<DiskMediaCache>) -> CacheResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| CacheError::NetworkError(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            inner: Arc::new(GatewayInner {
                disk,
                http_client,
                semaphore: Semaphore::new(config.max_concurrent_downloads.max(1)),
                key_locks: parking_lot::Mutex::new(HashMap::new()),
            }),
        })
    }

    /// Number of keys with a download in progress.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.inner.key_locks.lock().len()
    }
}

impl GatewayInner {
    async fn fetch(&self, key: &CacheKey, source_url: &str) -> CacheResult<String> {
        let lock = self
            .key_locks
            .lock()
            .entry(key.clone())
            .or_default()
            .clone();

        let result = {
            let _guard = lock.lock().await;
            self.fetch_locked(key, source_url).await
        };

        let mut locks = self.key_locks.lock();
        if Arc::strong_count(&lock) <= 2 {
            locks.remove(key);
        }
        result
    }

    async fn fetch_locked(&self, key: &CacheKey, source_url: &str) -> CacheResult<String> {
        if let Some(path) = self.disk.get_path(key).await {
            return Ok(path.display().to_string());
        }

        let bytes = {
            let _permit = self
                .semaphore
                .acquire()
                .await
                .map_err(|e| CacheError::NetworkError(format!("Download queue closed: {e}")))?;
            debug!(key = %key, url = %source_url, "Downloading media");
            self.download(source_url).await?
        };

        let path = self.disk.put_bytes(key, &bytes).await?;
        Ok(path.display().to_string())
    }

    async fn download(&self, url: &str) -> CacheResult<Bytes> {
        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| CacheError::NetworkError(format!("Request failed: {e}")))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(CacheError::NotFound(url.to_string()));
        }
        if !response.status().is_success() {
            return Err(CacheError::NetworkError(format!(
                "HTTP {}: {}",
                response.status(),
                response.status().canonical_reason().unwrap_or("Unknown")
            )));
        }

        response
            .bytes()
            .await
            .map_err(|e| CacheError::NetworkError(format!("Failed to read body: {e}")))
    }
}

#[async_trait]
impl MediaCachePort for MediaCacheGateway {
    async fn cache(&self, key: &CacheKey, source_url: &str) -> CacheResult<String> {
        self.inner.fetch(key, source_url).await
    }

    fn prefetch(&self, source_url: String) {
        let inner = self.inner.clone();
        tokio::spawn(async move {
            let key = CacheKey::from_url(&source_url);
            match inner.fetch(&key, &source_url).await {
                Ok(_) => trace!(url = %source_url, "Prefetched media"),
                Err(e) => warn!(url = %source_url, error = %e, "Prefetch failed"),
            }
        });
    }
}

impl std::fmt::Debug for MediaCacheGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaCacheGateway")
            .field("disk", &self.inner.disk)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn gateway() -> (MediaCacheGateway, Arc<DiskMediaCache>, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let disk = Arc::new(
            DiskMediaCache::new(temp_dir.path().to_path_buf(), 1024 * 1024)
                .await
                .unwrap(),
        );
        let gateway = MediaCacheGateway::new(&MediaCacheConfig::default(), disk.clone()).unwrap();
        (gateway, disk, temp_dir)
    }

    #[tokio::test]
    async fn test_disk_hit_skips_network() {
        let (gateway, disk, _temp) = gateway().await;
        let key = CacheKey::from_url("https://unreachable.invalid/cat.png");
        let stored = disk.put_bytes(&key, b"png").await.unwrap();

        let local = gateway
            .cache(&key, "https://unreachable.invalid/cat.png")
            .await
            .unwrap();

        assert_eq!(local, stored.display().to_string());
        assert_eq!(gateway.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_invalid_url_is_network_error() {
        let (gateway, _disk, _temp) = gateway().await;
        let key = CacheKey::from_url("not a url");

        let err = tokio_test::assert_err!(gateway.cache(&key, "not a url").await);

        assert!(matches!(err, CacheError::NetworkError(_)));
        assert_eq!(gateway.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_hits_share_lock() {
        let (gateway, disk, _temp) = gateway().await;
        let key = CacheKey::from_url("https://unreachable.invalid/dog.png");
        disk.put_bytes(&key, b"png").await.unwrap();

        let (a, b) = tokio::join!(
            gateway.cache(&key, "https://unreachable.invalid/dog.png"),
            gateway.cache(&key, "https://unreachable.invalid/dog.png"),
        );

        assert_eq!(a.unwrap(), b.unwrap());
        assert_eq!(gateway.pending_count(), 0);
    }
}
