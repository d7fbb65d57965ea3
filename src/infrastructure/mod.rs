//! Infrastructure layer with external service adapters.

/// Application configuration.
pub mod config;
/// Link expansion.
pub mod link;
/// Media caching, downloads and size probing.
pub mod media;
/// System notifications.
pub mod notifications;
/// OpenGraph metadata provider.
pub mod open_graph;
/// External video player.
pub mod player;

pub use config::{AppConfig, CliArgs, LogLevel, StorageManager};
pub use link::HttpLinkShortener;
pub use media::{
    CacheStats, DiskMediaCache, ImageSizeProbe, MediaCacheConfig, MediaCacheGateway,
    MemorySizeCache,
};
pub use notifications::DesktopNotificationService;
pub use open_graph::{HttpOpenGraphProvider, OpenGraphEvent};
pub use player::ExternalVideoPlayer;
