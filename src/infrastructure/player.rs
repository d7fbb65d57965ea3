//! External video player.

use async_trait::async_trait;
use tracing::debug;

use crate::domain::entities::PlaybackRequest;
use crate::domain::errors::EmbedError;
use crate::domain::ports::VideoPlayerPort;

/// Player used when none is configured.
pub const DEFAULT_PLAYER: &str = "mpv";

/// Launches a player command with the link and start offset.
#[derive(Debug, Clone)]
pub struct ExternalVideoPlayer {
    command: String,
}

impl ExternalVideoPlayer {
    /// Creates a player that runs `command`.
    #[must_use]
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }

    /// Arguments passed to the player for `request`.
    #[must_use]
    pub fn args_for(request: &PlaybackRequest) -> Vec<String> {
        let mut args = Vec::with_capacity(2);
        if request.start_seconds > 0 {
            args.push(format!("--start={}", request.start_seconds));
        }
        args.push(request.link.clone());
        args
    }
}

impl Default for ExternalVideoPlayer {
    fn default() -> Self {
        Self::new(DEFAULT_PLAYER)
    }
}

#[async_trait]
impl VideoPlayerPort for ExternalVideoPlayer {
    async fn play(&self, request: &PlaybackRequest) -> Result<(), EmbedError> {
        let command = self.command.clone();
        let args = Self::args_for(request);
        debug!(player = %command, video_id = %request.video_id, "Starting video player");

        let status = tokio::task::spawn_blocking(move || {
            std::process::Command::new(&command).args(&args).status()
        })
        .await
        .map_err(|e| EmbedError::playback_failed(format!("Player task panicked: {e}")))?
        .map_err(|e| EmbedError::playback_failed(format!("{}: {e}", self.command)))?;

        if status.success() {
            Ok(())
        } else {
            Err(EmbedError::playback_failed(format!(
                "{} exited with {status}",
                self.command
            )))
        }
    }
}
