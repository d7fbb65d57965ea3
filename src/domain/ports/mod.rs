mod link_shortener_port;
mod media_cache_port;
mod notification_port;
mod open_graph_port;
mod video_player_port;

pub use link_shortener_port::LinkShortenerPort;
pub use media_cache_port::{CacheError, CacheResult, MediaCachePort, SizeProbePort};
pub use notification_port::NotificationPort;
pub use open_graph_port::OpenGraphPort;
pub use video_player_port::VideoPlayerPort;
