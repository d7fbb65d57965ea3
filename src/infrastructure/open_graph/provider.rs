//! Fetches pages and extracts their `og:` metadata.

use std::sync::LazyLock;

use scraper::{Html, Selector};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::domain::entities::{OpenGraphData, OpenGraphImage};
use crate::domain::ports::OpenGraphPort;

/// Upper bound on the HTML read from a page.
const MAX_PAGE_BYTES: usize = 512 * 1024;

const MAX_IMAGES: usize = 100;

static META_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("meta[property], meta[name]").unwrap());

/// Metadata fetched for a link.
#[derive(Debug, Clone)]
pub struct OpenGraphEvent {
    /// Link the metadata was requested for.
    pub url: String,
    /// Parsed metadata or a description of the failure.
    pub result: Result<OpenGraphData, String>,
}

/// Requests pages over HTTP and reports parsed metadata on a channel.
pub struct HttpOpenGraphProvider {
    http_client: reqwest::Client,
    event_tx: mpsc::UnboundedSender<OpenGraphEvent>,
}

impl HttpOpenGraphProvider {
    /// Creates a provider and the receiving end of its events.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created.
    pub fn new(
        timeout_secs: u64,
    ) -> Result<(Self, mpsc::UnboundedReceiver<OpenGraphEvent>), reqwest::Error> {
        let http_client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()?;
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        Ok((
            Self {
                http_client,
                event_tx,
            },
            event_rx,
        ))
    }
}

impl OpenGraphPort for HttpOpenGraphProvider {
    fn request_metadata(&self, url: &str) {
        let client = self.http_client.clone();
        let tx = self.event_tx.clone();
        let url = url.to_string();

        tokio::spawn(async move {
            let result = fetch_page(&client, &url).await.map(|html| parse_open_graph(&html));
            match &result {
                Ok(data) => debug!(url = %url, images = data.images.len(), "Fetched OpenGraph"),
                Err(e) => warn!(url = %url, error = %e, "OpenGraph fetch failed"),
            }
            if tx.send(OpenGraphEvent { url, result }).is_err() {
                debug!("OpenGraph receiver dropped");
            }
        });
    }
}

async fn fetch_page(client: &reqwest::Client, url: &str) -> Result<String, String> {
    let mut response = client
        .get(url)
        .header(reqwest::header::ACCEPT, "text/html")
        .send()
        .await
        .map_err(|e| format!("Request failed: {e}"))?;

    if !response.status().is_success() {
        return Err(format!("HTTP {}", response.status()));
    }

    let mut body = Vec::new();
    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| format!("Failed to read body: {e}"))?
    {
        if append_capped(&mut body, &chunk) {
            debug!(url = %url, "Page truncated");
            break;
        }
    }
    Ok(String::from_utf8_lossy(&body).into_owned())
}

/// Appends as much of `chunk` as fits under [`MAX_PAGE_BYTES`].
///
/// Returns true once the buffer is full.
fn append_capped(body: &mut Vec<u8>, chunk: &[u8]) -> bool {
    let room = MAX_PAGE_BYTES.saturating_sub(body.len());
    body.extend_from_slice(&chunk[..chunk.len().min(room)]);
    body.len() >= MAX_PAGE_BYTES
}

/// Parses `og:` meta tags out of an HTML document.
///
/// `og:image` always starts a new candidate; the structured `og:image:*`
/// properties apply to the most recent one.
#[must_use]
pub fn parse_open_graph(html: &str) -> OpenGraphData {
    let document = Html::parse_document(html);
    let mut data = OpenGraphData::default();

    for meta in document.select(&META_SELECTOR) {
        let element = meta.value();
        let Some(property) = element.attr("property").or_else(|| element.attr("name")) else {
            continue;
        };
        let Some(content) = element.attr("content").map(|c| c.trim().to_string()) else {
            continue;
        };

        match property.to_ascii_lowercase().as_str() {
            "og:site_name" => data.site_name = Some(content),
            "og:title" => data.title = Some(content),
            "og:description" => data.description = Some(content),
            "og:url" => data.url = Some(content),
            "og:image" => push_image(&mut data, content),
            "og:image:url" => {
                if data.images.last().is_some_and(|image| image.url.is_none()) {
                    current_image(&mut data).url = Some(content);
                } else {
                    push_image(&mut data, content);
                }
            }
            "og:image:secure_url" => current_image(&mut data).secure_url = Some(content),
            "og:image:width" => current_image(&mut data).width = content.parse().ok(),
            "og:image:height" => current_image(&mut data).height = content.parse().ok(),
            _ => {}
        }
    }

    data
}

fn push_image(data: &mut OpenGraphData, url: String) {
    if data.images.len() < MAX_IMAGES {
        data.images.push(OpenGraphImage::new(url));
    }
}

fn current_image(data: &mut OpenGraphData) -> &mut OpenGraphImage {
    if data.images.is_empty() {
        data.images.push(OpenGraphImage::default());
    }
    let last = data.images.len() - 1;
    &mut data.images[last]
}
