//! Resolved embed types observed by the presentation layer.

use serde::{Deserialize, Serialize};

use super::{ImageDimensions, Size};

/// What a link turned out to be.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Classification {
    /// No link, or not classified yet.
    #[default]
    None,
    /// Direct image link.
    Image,
    /// YouTube video.
    #[serde(rename = "youtube")]
    YouTube {
        /// Canonical video id.
        video_id: String,
        /// Playback start offset.
        start_seconds: u32,
    },
    /// Anything else; may get a link preview card.
    Generic,
}

impl Classification {
    /// Returns true for image and video links, which render as media embeds.
    #[must_use]
    pub const fn is_media(&self) -> bool {
        matches!(self, Self::Image | Self::YouTube { .. })
    }

    /// Returns true for YouTube links.
    #[must_use]
    pub const fn is_youtube(&self) -> bool {
        matches!(self, Self::YouTube { .. })
    }

    /// Short label for logs.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Image => "image",
            Self::YouTube { .. } => "youtube",
            Self::Generic => "generic",
        }
    }
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Render-ready result for one message link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedDescriptor {
    /// Classification of the (possibly expanded) link.
    pub kind: Classification,
    /// Raw link as supplied by the message.
    pub link: Option<String>,
    /// Expanded form of a shortened link.
    pub expanded_link: Option<String>,
    /// Remote uri of the media to show (image, thumbnail or preview image).
    pub remote_uri: Option<String>,
    /// Local locator once the media is cached.
    pub media_uri: Option<String>,
    /// Render dimensions.
    pub dimensions: Option<ImageDimensions>,
    /// Set when fetching, probing or rendering the media failed.
    pub load_error: bool,
}

impl EmbedDescriptor {
    /// Empty descriptor for a newly observed link.
    #[must_use]
    pub fn empty(link: Option<String>) -> Self {
        Self {
            kind: Classification::None,
            link,
            expanded_link: None,
            remote_uri: None,
            media_uri: None,
            dimensions: None,
            load_error: false,
        }
    }

    /// The link classification applies to: expanded if available, raw otherwise.
    #[must_use]
    pub fn effective_link(&self) -> Option<&str> {
        self.expanded_link.as_deref().or(self.link.as_deref())
    }

    /// Returns true if the descriptor has an image region.
    #[must_use]
    pub const fn has_media(&self) -> bool {
        self.remote_uri.is_some()
    }
}

/// Observable phase of a resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbedPhase {
    /// Nothing to resolve.
    Idle,
    /// Running the classifier.
    Classifying,
    /// Waiting for a short link to be expanded.
    AwaitingShortener,
    /// Fetching media into the cache.
    Resolving,
    /// Waiting for link preview metadata.
    AwaitingOpenGraph,
    /// Determining the media size.
    Sizing,
    /// Resolved.
    Ready,
    /// Resolution failed for the current link.
    Error,
}

impl EmbedPhase {
    /// Returns true for phases that only change when new input arrives.
    #[must_use]
    pub const fn is_settled(self) -> bool {
        matches!(self, Self::Idle | Self::Ready | Self::Error)
    }
}

/// Point-in-time view of a resolver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedSnapshot {
    /// Current phase.
    pub phase: EmbedPhase,
    /// Current descriptor.
    pub descriptor: EmbedDescriptor,
}

/// File handed to a full-screen image viewer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewFile {
    /// File name shown as caption.
    pub caption: String,
    /// Local locator of the cached image.
    pub local_uri: String,
    /// Source dimensions when known.
    pub dimensions: Option<Size>,
}

/// Request to play a video in an external player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackRequest {
    /// Link that was tapped.
    pub link: String,
    /// Video id.
    pub video_id: String,
    /// Start offset.
    pub start_seconds: u32,
}
