//! Port for expanding shortened links.

use async_trait::async_trait;

use crate::domain::errors::EmbedError;

/// Expands shortened links to their target.
#[async_trait]
pub trait LinkShortenerPort: Send + Sync {
    /// Returns the expanded link, or `None` if `url` is not shortened.
    async fn expand(&self, url: &str) -> Result<Option<String>, EmbedError>;
}
