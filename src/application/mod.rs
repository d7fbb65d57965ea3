//! Application layer: embed resolution services.

/// Embed resolution services.
pub mod services;

pub use services::{
    EmbedDependencies, EmbedPresentation, EmbedResolver, EmojiImageResolver, LinkClassifier,
    VideoPlaybackService,
};
