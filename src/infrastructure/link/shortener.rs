//! Expands shortened links by reading the redirect target.

use async_trait::async_trait;
use tracing::{debug, trace};

use crate::domain::errors::EmbedError;
use crate::domain::ports::LinkShortenerPort;

/// Expands links with one request that does not follow redirects.
pub struct HttpLinkShortener {
    http_client: reqwest::Client,
}

impl HttpLinkShortener {
    /// Creates a new expander.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created.
    pub fn new(timeout_secs: u64) -> Result<Self, EmbedError> {
        let http_client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| EmbedError::expansion_failed("", format!("HTTP client: {e}")))?;

        Ok(Self { http_client })
    }
}

#[async_trait]
impl LinkShortenerPort for HttpLinkShortener {
    async fn expand(&self, url: &str) -> Result<Option<String>, EmbedError> {
        let response = self
            .http_client
            .head(url)
            .send()
            .await
            .map_err(|e| EmbedError::expansion_failed(url, e.to_string()))?;

        if !response.status().is_redirection() {
            trace!(url = %url, status = %response.status(), "Link is not a redirect");
            return Ok(None);
        }

        let Some(location) = response
            .headers()
            .get(reqwest::header::LOCATION)
            .and_then(|v| v.to_str().ok())
        else {
            return Ok(None);
        };

        let expanded = resolve_location(url, location)?;
        debug!(url = %url, expanded = %expanded, "Link redirects");
        Ok(Some(expanded))
    }
}

/// Resolves a `Location` header against the requested url.
///
/// # Errors
/// Returns [`EmbedError::ExpansionFailed`] if either url is malformed.
pub fn resolve_location(url: &str, location: &str) -> Result<String, EmbedError> {
    let base = url::Url::parse(url).map_err(|e| EmbedError::expansion_failed(url, e.to_string()))?;
    base.join(location)
        .map(String::from)
        .map_err(|e| EmbedError::expansion_failed(url, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("https://bit.ly/x", "https://example.com/cat.png", "https://example.com/cat.png" ; "absolute")]
    #[test_case("https://bit.ly/x", "/landing?id=1", "https://bit.ly/landing?id=1" ; "relative")]
    #[test_case("https://bit.ly/a/b", "c.png", "https://bit.ly/a/c.png" ; "path_relative")]
    fn test_resolve_location(url: &str, location: &str, expected: &str) {
        assert_eq!(resolve_location(url, location).unwrap(), expected);
    }

    #[test]
    fn test_resolve_location_rejects_bad_base() {
        assert!(matches!(
            resolve_location("not a url", "/x"),
            Err(EmbedError::ExpansionFailed { .. })
        ));
    }

    #[tokio::test]
    async fn test_request_failure_is_expansion_error() {
        let shortener = tokio_test::assert_ok!(HttpLinkShortener::new(5));
        let err = tokio_test::assert_err!(shortener.expand("not a url").await);
        assert!(matches!(err, EmbedError::ExpansionFailed { .. }));
    }
}
