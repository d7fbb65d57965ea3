//! Source size lookup for cached media.

use std::sync::Arc;

use tracing::debug;

use crate::domain::entities::Size;
use crate::domain::errors::EmbedError;
use crate::domain::ports::SizeProbePort;

/// Where a media size comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DimensionSource {
    /// Size declared by metadata (known image dimensions, OpenGraph tags).
    Declared(Size),
    /// Size read from the cached resource.
    Probe,
}

impl DimensionSource {
    /// Uses declared metadata when it is usable, the probe otherwise.
    #[must_use]
    pub fn select(declared: Option<Size>) -> Self {
        match declared {
            Some(size) if !size.is_empty() => Self::Declared(size),
            _ => Self::Probe,
        }
    }
}

/// Resolves the source size of a cached resource.
#[derive(Clone)]
pub struct DimensionResolver {
    probe: Arc<dyn SizeProbePort>,
}

impl DimensionResolver {
    /// Creates a resolver backed by `probe`.
    #[must_use]
    pub fn new(probe: Arc<dyn SizeProbePort>) -> Self {
        Self { probe }
    }

    /// Returns the source size of `local_uri`.
    ///
    /// # Errors
    /// [`EmbedError::SizeProbeFailed`] if probing fails and
    /// [`EmbedError::InvalidDimensions`] if the size has a zero axis.
    pub async fn resolve_dimensions(
        &self,
        local_uri: &str,
        source: DimensionSource,
    ) -> Result<Size, EmbedError> {
        let size = match source {
            DimensionSource::Declared(size) => {
                debug!(uri = %local_uri, size = %size, "Using declared dimensions");
                size
            }
            DimensionSource::Probe => self
                .probe
                .probe_size(local_uri)
                .await
                .map_err(|e| EmbedError::size_probe_failed(local_uri, e.to_string()))?,
        };

        if size.is_empty() {
            return Err(EmbedError::invalid_dimensions(size.width, size.height));
        }
        Ok(size)
    }
}

impl std::fmt::Debug for DimensionResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DimensionResolver").finish_non_exhaustive()
    }
}
