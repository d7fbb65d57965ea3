//! Keys for the shared media cache.

use serde::{Deserialize, Serialize};

use super::MessageId;

/// Why a message wants a cached resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CachePurpose {
    /// Inline image or video thumbnail embed.
    Embed,
    /// Image chosen from a link preview.
    OpenGraph,
    /// Custom emoji image, keyed by emoji name.
    Emoji(String),
    /// Image attached to the message, by position.
    Attachment(usize),
    /// Video thumbnail.
    Thumbnail,
}

impl CachePurpose {
    fn prefix(&self) -> String {
        match self {
            Self::Embed => "embed".to_string(),
            Self::OpenGraph => "og".to_string(),
            Self::Emoji(name) => format!("emoji-{}", sanitize(name)),
            Self::Attachment(index) => format!("attachment{index}"),
            Self::Thumbnail => "thumb".to_string(),
        }
    }
}

/// Stable cache key derived from message id, purpose and source url.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey(String);

impl CacheKey {
    /// Builds the key for a message resource.
    #[must_use]
    pub fn new(message_id: &MessageId, purpose: &CachePurpose, source_url: &str) -> Self {
        Self(format!(
            "{}-{}-{}",
            purpose.prefix(),
            sanitize(message_id.as_str()),
            url_digest(source_url)
        ))
    }

    /// Builds a key that only depends on the source url (prefetches).
    #[must_use]
    pub fn from_url(source_url: &str) -> Self {
        Self(format!("url-{}", url_digest(source_url)))
    }

    /// Returns the inner string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File name used for link preview images: `og-<name>` with a `.png`
    /// extension when the remote name has none, and `:` replaced by `-`.
    #[must_use]
    pub fn file_name(link: &str) -> String {
        let mut file_name = remote_file_name(link).to_string();
        if !file_name.contains('.') {
            file_name.push_str(".png");
        }
        format!("og-{}", file_name.replace(':', "-"))
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Last path segment of a link, without the query string.
#[must_use]
pub fn remote_file_name(link: &str) -> &str {
    let end = link.find('?').unwrap_or(link.len());
    let path = &link[..end];
    path.rfind('/').map_or(path, |idx| &path[idx + 1..])
}

fn url_digest(url: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    let result = hasher.finalize();
    hex::encode(&result[..16])
}

fn sanitize(value: &str) -> String {
    value
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
