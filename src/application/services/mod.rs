pub mod dimension_fitter;
pub mod dimension_resolver;
pub mod embed_presentation;
pub mod embed_resolver;
pub mod emoji_image;
pub mod link_classifier;
pub mod open_graph_selector;
pub mod video_playback;

#[cfg(test)]
mod embed_resolver_test;

pub use dimension_resolver::{DimensionResolver, DimensionSource};
pub use embed_presentation::{CardImage, EmbedPresentation, OpenGraphCard};
pub use embed_resolver::{EmbedDependencies, EmbedResolver};
pub use emoji_image::EmojiImageResolver;
pub use link_classifier::LinkClassifier;
pub use open_graph_selector::SelectedImage;
pub use video_playback::{PLAYBACK_ERROR_TITLE, VideoPlaybackService};
