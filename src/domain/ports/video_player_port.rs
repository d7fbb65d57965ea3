use async_trait::async_trait;

use crate::domain::entities::PlaybackRequest;
use crate::domain::errors::EmbedError;

/// Plays videos in an external player.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VideoPlayerPort: Send + Sync {
    /// Starts playback.
    async fn play(&self, request: &PlaybackRequest) -> Result<(), EmbedError>;
}
