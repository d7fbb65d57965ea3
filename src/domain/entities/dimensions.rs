//! Viewport and image size types.

use serde::{Deserialize, Serialize};

/// Horizontal space reserved around inline image embeds.
pub const EMBED_IMAGE_OFFSET: u32 = 66;
/// Horizontal space reserved around link preview card images.
pub const OPEN_GRAPH_IMAGE_OFFSET: u32 = 88;
/// Horizontal space reserved around video thumbnails.
pub const VIDEO_THUMBNAIL_OFFSET: u32 = 78;
/// Extra margin threaded replies take from the left.
pub const REPLY_OFFSET: u32 = 13;
/// Maximum rendered height of a video thumbnail or preview image.
pub const MAX_THUMBNAIL_HEIGHT: u32 = 150;
/// Width used while a video thumbnail's real size is unknown.
pub const PLACEHOLDER_WIDTH: u32 = 297;

/// A width/height pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Size {
    /// Width in layout units.
    pub width: u32,
    /// Height in layout units.
    pub height: u32,
}

impl Size {
    /// Creates a new size.
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Returns true if either axis is zero.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl std::fmt::Display for Size {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Which margins a budget reserves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OffsetPolicy {
    /// Inline image embed.
    Embed,
    /// Image inside a link preview card.
    OpenGraph,
    /// Video thumbnail, height capped.
    VideoThumbnail,
}

impl OffsetPolicy {
    /// Horizontal offset for this policy.
    #[must_use]
    pub const fn horizontal_offset(self, is_reply: bool) -> u32 {
        let reply = if is_reply { REPLY_OFFSET } else { 0 };
        match self {
            Self::Embed => EMBED_IMAGE_OFFSET + reply,
            Self::OpenGraph => OPEN_GRAPH_IMAGE_OFFSET + reply,
            Self::VideoThumbnail => VIDEO_THUMBNAIL_OFFSET,
        }
    }
}

/// Device metrics supplied by the host view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceViewport {
    /// Device width.
    pub width: u32,
    /// Device height.
    pub height: u32,
    /// Whether the message is rendered as a threaded reply.
    pub is_reply: bool,
}

impl DeviceViewport {
    /// Creates new device metrics.
    #[must_use]
    pub const fn new(width: u32, height: u32, is_reply: bool) -> Self {
        Self {
            width,
            height,
            is_reply,
        }
    }

    /// The shorter device side. Layout uses it so rotation does not change sizes.
    #[must_use]
    pub const fn device_size(self) -> u32 {
        if self.width > self.height {
            self.height
        } else {
            self.width
        }
    }

    /// Computes the budget for the given policy.
    #[must_use]
    pub fn budget(self, policy: OffsetPolicy) -> ViewportBudget {
        let max_width = self
            .device_size()
            .saturating_sub(policy.horizontal_offset(self.is_reply));
        let max_height = match policy {
            OffsetPolicy::VideoThumbnail => MAX_THUMBNAIL_HEIGHT,
            OffsetPolicy::Embed | OffsetPolicy::OpenGraph => self.height,
        };
        ViewportBudget::new(max_width, max_height, policy)
    }
}

/// Space an embed may occupy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewportBudget {
    /// Maximum width, always at least 1.
    pub max_width: u32,
    /// Maximum height, always at least 1.
    pub max_height: u32,
    /// Policy the budget was derived with.
    pub policy: OffsetPolicy,
}

impl ViewportBudget {
    /// Creates a budget, clamping both axes to at least 1.
    #[must_use]
    pub fn new(max_width: u32, max_height: u32, policy: OffsetPolicy) -> Self {
        Self {
            max_width: max_width.max(1),
            max_height: max_height.max(1),
            policy,
        }
    }
}

/// Original and fitted dimensions of an embed image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageDimensions {
    /// Size of the source image when known.
    pub original: Option<Size>,
    /// Size to render at.
    pub fitted: Size,
}

impl ImageDimensions {
    /// Dimensions of an image whose source size was measured or declared.
    #[must_use]
    pub const fn known(original: Size, fitted: Size) -> Self {
        Self {
            original: Some(original),
            fitted,
        }
    }

    /// Placeholder box used while the source size is unknown.
    #[must_use]
    pub fn placeholder(budget: ViewportBudget) -> Self {
        Self {
            original: None,
            fitted: Size::new(
                PLACEHOLDER_WIDTH.min(budget.max_width),
                MAX_THUMBNAIL_HEIGHT.min(budget.max_height),
            ),
        }
    }

    /// Returns true if the source size is known.
    #[must_use]
    pub const fn is_known(&self) -> bool {
        self.original.is_some()
    }
}
