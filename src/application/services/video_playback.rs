//! Opens YouTube embeds in an external player.

use std::sync::Arc;

use tracing::{info, warn};

use super::link_classifier::LinkClassifier;
use crate::domain::entities::PlaybackRequest;
use crate::domain::errors::EmbedError;
use crate::domain::ports::{NotificationPort, VideoPlayerPort};

/// Notification title for failed playback.
pub const PLAYBACK_ERROR_TITLE: &str = "YouTube playback error";

/// Starts video playback and reports failures to the user.
pub struct VideoPlaybackService {
    player: Arc<dyn VideoPlayerPort>,
    notifier: Arc<dyn NotificationPort>,
}

impl VideoPlaybackService {
    /// Creates a new playback service.
    #[must_use]
    pub fn new(player: Arc<dyn VideoPlayerPort>, notifier: Arc<dyn NotificationPort>) -> Self {
        Self { player, notifier }
    }

    /// Builds the playback request for a YouTube link.
    #[must_use]
    pub fn request_for(link: &str) -> Option<PlaybackRequest> {
        let video_id = LinkClassifier::youtube_video_id(link)?;
        Some(PlaybackRequest {
            link: link.to_string(),
            video_id,
            start_seconds: LinkClassifier::start_time_seconds(link),
        })
    }

    /// Plays `link`. Every failure raises one notification.
    ///
    /// # Errors
    /// Returns [`EmbedError::PlaybackFailed`] if `link` is not a video or the
    /// player fails.
    pub async fn play(&self, link: &str) -> Result<(), EmbedError> {
        let result = match Self::request_for(link) {
            Some(request) => {
                info!(
                    video_id = %request.video_id,
                    start_seconds = request.start_seconds,
                    "Starting video playback"
                );
                self.player.play(&request).await
            }
            None => Err(EmbedError::playback_failed(format!(
                "not a video link: {link}"
            ))),
        };

        if let Err(e) = &result {
            warn!(link = %link, error = %e, "Video playback failed");
            self.notifier.send(PLAYBACK_ERROR_TITLE, &e.to_string());
        }
        result
    }
}
