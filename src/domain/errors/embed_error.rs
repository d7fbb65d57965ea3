//! Embed resolution error types.

use thiserror::Error;

/// Errors raised while resolving an embed.
///
/// None of these escape the resolver; they end up as a `load_error` flag or a
/// fallback classification.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[allow(missing_docs)]
pub enum EmbedError {
    #[error("link could not be classified: {link}")]
    ClassificationAmbiguous { link: String },

    #[error("failed to expand link {link}: {message}")]
    ExpansionFailed { link: String, message: String },

    #[error("failed to fetch {url}: {message}")]
    FetchFailed { url: String, message: String },

    #[error("failed to determine size of {uri}: {message}")]
    SizeProbeFailed { uri: String, message: String },

    #[error("invalid dimensions {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("video playback failed: {message}")]
    PlaybackFailed { message: String },
}

impl EmbedError {
    /// Creates expansion failed error.
    #[must_use]
    pub fn expansion_failed(link: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ExpansionFailed {
            link: link.into(),
            message: message.into(),
        }
    }

    /// Creates fetch failed error.
    #[must_use]
    pub fn fetch_failed(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::FetchFailed {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Creates size probe failed error.
    #[must_use]
    pub fn size_probe_failed(uri: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SizeProbeFailed {
            uri: uri.into(),
            message: message.into(),
        }
    }

    /// Creates invalid dimensions error.
    #[must_use]
    pub const fn invalid_dimensions(width: u32, height: u32) -> Self {
        Self::InvalidDimensions { width, height }
    }

    /// Creates playback failed error.
    #[must_use]
    pub fn playback_failed(message: impl Into<String>) -> Self {
        Self::PlaybackFailed {
            message: message.into(),
        }
    }

    /// Returns whether the error marks the embed's media as unusable.
    #[must_use]
    pub const fn is_load_error(&self) -> bool {
        matches!(
            self,
            Self::FetchFailed { .. } | Self::SizeProbeFailed { .. } | Self::InvalidDimensions { .. }
        )
    }
}
