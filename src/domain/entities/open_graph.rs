//! OpenGraph preview metadata.

use serde::{Deserialize, Serialize};

use super::Size;

/// Candidate preview image declared by a page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenGraphImage {
    /// Image url.
    #[serde(default)]
    pub url: Option<String>,
    /// HTTPS variant of the image url.
    #[serde(default)]
    pub secure_url: Option<String>,
    /// Declared width.
    #[serde(default)]
    pub width: Option<u32>,
    /// Declared height.
    #[serde(default)]
    pub height: Option<u32>,
}

impl OpenGraphImage {
    /// Creates a candidate with only a url.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Self::default()
        }
    }

    /// Sets the secure url.
    #[must_use]
    pub fn with_secure_url(mut self, secure_url: impl Into<String>) -> Self {
        self.secure_url = Some(secure_url.into());
        self
    }

    /// Sets the declared dimensions.
    #[must_use]
    pub const fn with_dimensions(mut self, width: u32, height: u32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    /// Uri to load, preferring the secure variant.
    #[must_use]
    pub fn uri(&self) -> Option<&str> {
        self.secure_url
            .as_deref()
            .filter(|u| !u.is_empty())
            .or_else(|| self.url.as_deref().filter(|u| !u.is_empty()))
    }

    /// Declared size when both axes are present and non-zero.
    #[must_use]
    pub fn declared_size(&self) -> Option<Size> {
        match (self.width, self.height) {
            (Some(w), Some(h)) if w > 0 && h > 0 => Some(Size::new(w, h)),
            _ => None,
        }
    }

    /// Returns true if either of the candidate's urls equals `uri`.
    #[must_use]
    pub fn matches(&self, uri: &str) -> bool {
        self.url.as_deref() == Some(uri) || self.secure_url.as_deref() == Some(uri)
    }
}

/// Preview metadata for a link.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenGraphData {
    /// Site name.
    #[serde(default)]
    pub site_name: Option<String>,
    /// Page title.
    #[serde(default)]
    pub title: Option<String>,
    /// Page description.
    #[serde(default)]
    pub description: Option<String>,
    /// Canonical page url.
    #[serde(default)]
    pub url: Option<String>,
    /// Candidate images in page order.
    #[serde(default)]
    pub images: Vec<OpenGraphImage>,
}

impl OpenGraphData {
    /// Returns the candidate that declares `uri`.
    #[must_use]
    pub fn find_image(&self, uri: &str) -> Option<&OpenGraphImage> {
        self.images.iter().find(|image| image.matches(uri))
    }

    /// Returns true if the page carries a non-empty description.
    #[must_use]
    pub fn has_description(&self) -> bool {
        self.description
            .as_deref()
            .is_some_and(|d| !d.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uri_prefers_secure_url() {
        let image = OpenGraphImage::new("http://a/img.png").with_secure_url("https://a/img.png");
        assert_eq!(image.uri(), Some("https://a/img.png"));
    }

    #[test]
    fn test_uri_ignores_empty_secure_url() {
        let image = OpenGraphImage::new("http://a/img.png").with_secure_url("");
        assert_eq!(image.uri(), Some("http://a/img.png"));
    }

    #[test]
    fn test_declared_size_requires_both_axes() {
        let mut image = OpenGraphImage::new("u");
        image.width = Some(10);
        assert_eq!(image.declared_size(), None);
        assert_eq!(
            image.with_dimensions(10, 5).declared_size(),
            Some(Size::new(10, 5))
        );
    }

    #[test]
    fn test_deserialize_server_payload() {
        let json = r#"{
            "site_name": "Example",
            "title": "A page",
            "description": "Things",
            "url": "https://example.com",
            "images": [{"url": "http://example.com/i.png", "secure_url": "https://example.com/i.png", "width": 600, "height": 315}]
        }"#;
        let data: OpenGraphData = serde_json::from_str(json).unwrap();
        assert_eq!(data.site_name.as_deref(), Some("Example"));
        assert!(data.has_description());
        assert_eq!(data.images.len(), 1);
        assert!(data.find_image("https://example.com/i.png").is_some());
        assert!(data.find_image("http://example.com/i.png").is_some());
    }

    #[test]
    fn test_deserialize_without_images() {
        let data: OpenGraphData = serde_json::from_str(r#"{"title":"x"}"#).unwrap();
        assert!(data.images.is_empty());
        assert!(!data.has_description());
    }
}
