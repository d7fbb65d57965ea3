//! Domain error types.

mod embed_error;

pub use embed_error::EmbedError;
