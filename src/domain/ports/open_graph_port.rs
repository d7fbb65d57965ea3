//! Port for requesting link preview metadata.

/// Fetches OpenGraph metadata out of band.
///
/// Results are delivered later through
/// [`EmbedResolver::set_open_graph`](crate::application::services::EmbedResolver::set_open_graph).
pub trait OpenGraphPort: Send + Sync {
    /// Requests metadata for `url`. Fire and forget.
    fn request_metadata(&self, url: &str);
}
