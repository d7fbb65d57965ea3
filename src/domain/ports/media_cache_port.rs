//! Port definitions for the shared media cache.

use async_trait::async_trait;

use crate::domain::entities::{CacheKey, Size};

/// Result type for cache operations.
pub type CacheResult<T> = std::result::Result<T, CacheError>;

/// Errors that can occur during cache operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CacheError {
    /// Resource not found in cache.
    #[error("Resource not found: {0}")]
    NotFound(String),
    /// Failed to decode an image.
    #[error("Decode error: {0}")]
    DecodeError(String),
    /// I/O error during cache operation.
    #[error("IO error: {0}")]
    IoError(String),
    /// Network error during download.
    #[error("Network error: {0}")]
    NetworkError(String),
}

/// Process-wide media cache.
///
/// Implementations must be thread-safe and de-duplicate concurrent requests
/// for the same key themselves.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaCachePort: Send + Sync {
    /// Returns a local locator for `source_url`, downloading it if needed.
    async fn cache(&self, key: &CacheKey, source_url: &str) -> CacheResult<String>;

    /// Warms the cache for `source_url` without reporting back.
    fn prefetch(&self, source_url: String);
}

/// Reads the pixel dimensions of a cached resource.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SizeProbePort: Send + Sync {
    /// Probes the size of the resource at `local_uri`.
    /// Fails if the resource is unreadable.
    async fn probe_size(&self, local_uri: &str) -> CacheResult<Size>;
}
