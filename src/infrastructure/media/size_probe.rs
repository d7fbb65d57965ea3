//! Reads image dimensions from cached files.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error};

use super::memory_cache::MemorySizeCache;
use crate::domain::entities::Size;
use crate::domain::ports::{CacheError, CacheResult, SizeProbePort};

/// Probes image headers with the `image` crate, remembering results.
pub struct ImageSizeProbe {
    sizes: Arc<MemorySizeCache>,
}

impl ImageSizeProbe {
    /// Creates a probe backed by `sizes`.
    #[must_use]
    pub fn new(sizes: Arc<MemorySizeCache>) -> Self {
        Self { sizes }
    }
}

#[async_trait]
impl SizeProbePort for ImageSizeProbe {
    async fn probe_size(&self, local_uri: &str) -> CacheResult<Size> {
        if let Some(size) = self.sizes.get(local_uri).await {
            return Ok(size);
        }

        let path = local_path(local_uri);
        let result = tokio::task::spawn_blocking(move || read_dimensions(path)).await;

        let size = match result {
            Ok(size) => size?,
            Err(e) => {
                error!(uri = %local_uri, error = %e, "Size probe task panicked");
                return Err(CacheError::DecodeError(format!("Probe task panicked: {e}")));
            }
        };

        debug!(uri = %local_uri, size = %size, "Probed media size");
        self.sizes.put(local_uri.to_string(), size).await;
        Ok(size)
    }
}

/// Accepts plain paths and `file://` locators.
fn local_path(local_uri: &str) -> PathBuf {
    PathBuf::from(local_uri.strip_prefix("file://").unwrap_or(local_uri))
}

fn read_dimensions(path: PathBuf) -> CacheResult<Size> {
    let reader = image::ImageReader::open(&path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            CacheError::NotFound(path.display().to_string())
        } else {
            CacheError::IoError(format!("Failed to open {}: {e}", path.display()))
        }
    })?;

    let (width, height) = reader
        .with_guessed_format()
        .map_err(|e| CacheError::IoError(format!("Failed to read {}: {e}", path.display())))?
        .into_dimensions()
        .map_err(|e| CacheError::DecodeError(format!("Failed to read dimensions: {e}")))?;

    Ok(Size::new(width, height))
}
