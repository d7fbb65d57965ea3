//! Domain entity definitions.

mod cache_key;
mod dimensions;
mod embed;
mod message;
mod open_graph;

pub use cache_key::{CacheKey, CachePurpose, remote_file_name};
pub use dimensions::{
    DeviceViewport, EMBED_IMAGE_OFFSET, ImageDimensions, MAX_THUMBNAIL_HEIGHT,
    OPEN_GRAPH_IMAGE_OFFSET, OffsetPolicy, PLACEHOLDER_WIDTH, REPLY_OFFSET, Size,
    VIDEO_THUMBNAIL_OFFSET, ViewportBudget,
};
pub use embed::{
    Classification, EmbedDescriptor, EmbedPhase, EmbedSnapshot, PlaybackRequest, PreviewFile,
};
pub use message::{KnownImage, MessageAttachment, MessageId};
pub use open_graph::{OpenGraphData, OpenGraphImage};
