//! Link classification: image, YouTube video or generic page.

use std::sync::LazyLock;

use regex::Regex;

use crate::domain::entities::{Classification, KnownImage};

/// Extensions treated as direct image links.
pub const IMAGE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "bmp", "webp", "tif", "tiff", "heic",
];

static YOUTUBE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:(?i:https?)://)?(?i:www\.|m\.)?(?:(?i:youtube\.com)/(?:watch\?(?:\S*?&)?v=|embed/|v/|shorts/)|(?i:youtu\.be)/)([A-Za-z0-9_-]{6,11})(?:[^A-Za-z0-9_-]|$)",
    )
    .unwrap()
});

static START_TIME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[?&#](?:t|start|time_continue)=(?:(\d+)h)?(?:(\d+)m)?(?:(\d+)s?)?(?:[&#]|$)")
        .unwrap()
});

/// Classifies message links.
pub struct LinkClassifier;

impl LinkClassifier {
    /// Classifies `url`. `known_images` lists links the server already knows
    /// to be images, which counts even without an image extension.
    #[must_use]
    pub fn classify(url: &str, known_images: &[KnownImage]) -> Classification {
        let url = url.trim();
        if url.is_empty() {
            return Classification::None;
        }

        if Self::is_image_link(url) || Self::is_known_image(url, known_images) {
            return Classification::Image;
        }

        if let Some(video_id) = Self::youtube_video_id(url) {
            return Classification::YouTube {
                video_id,
                start_seconds: Self::start_time_seconds(url),
            };
        }

        Classification::Generic
    }

    /// Returns true if the url path ends in a known image extension.
    #[must_use]
    pub fn is_image_link(url: &str) -> bool {
        let path = match url::Url::parse(url) {
            Ok(parsed) => parsed.path().to_string(),
            Err(_) => strip_query(url).to_string(),
        };

        let file_name = path.rsplit('/').next().unwrap_or_default();
        file_name.rsplit_once('.').is_some_and(|(stem, ext)| {
            !stem.is_empty()
                && IMAGE_EXTENSIONS
                    .iter()
                    .any(|known| known.eq_ignore_ascii_case(ext))
        })
    }

    /// Returns true if `url` has recorded image dimensions.
    #[must_use]
    pub fn is_known_image(url: &str, known_images: &[KnownImage]) -> bool {
        known_images.iter().any(|image| image.url == url)
    }

    /// Returns true for YouTube watch, embed and short links.
    #[must_use]
    pub fn is_youtube_link(url: &str) -> bool {
        Self::youtube_video_id(url).is_some()
    }

    /// Extracts the video id from a YouTube link.
    #[must_use]
    pub fn youtube_video_id(url: &str) -> Option<String> {
        YOUTUBE_RE
            .captures(url.trim())
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_owned())
    }

    /// Parses the `t`, `start` or `time_continue` parameter, accepting
    /// `<H>h<M>m<S>s` with every part optional. Anything unparsable is 0.
    #[must_use]
    pub fn start_time_seconds(url: &str) -> u32 {
        let Some(caps) = START_TIME_RE.captures(url) else {
            return 0;
        };

        let part = |idx: usize, unit: u32| {
            caps.get(idx)
                .and_then(|m| m.as_str().parse::<u32>().ok())
                .map_or(0, |value| value.saturating_mul(unit))
        };

        part(1, 3600)
            .saturating_add(part(2, 60))
            .saturating_add(part(3, 1))
    }

    /// Full size thumbnail rendered for a video.
    #[must_use]
    pub fn youtube_thumbnail_url(video_id: &str) -> String {
        format!("https://i.ytimg.com/vi/{video_id}/hqdefault.jpg")
    }

    /// Small thumbnail prefetched while the full one loads.
    #[must_use]
    pub fn youtube_preview_thumbnail_url(video_id: &str) -> String {
        format!("https://i.ytimg.com/vi/{video_id}/default.jpg")
    }
}

fn strip_query(url: &str) -> &str {
    let end = url.find(['?', '#']).unwrap_or(url.len());
    &url[..end]
}
