//! Custom emoji images.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::domain::entities::{CacheKey, CachePurpose, MessageId};
use crate::domain::ports::MediaCachePort;

#[derive(Debug, Default)]
struct EmojiState {
    name: Option<String>,
    local_uri: Option<String>,
    generation: u64,
}

/// Caches the image of a custom emoji shown in a message.
///
/// Changing the emoji name clears the image; a download finishing for a name
/// that is no longer current is dropped.
pub struct EmojiImageResolver {
    message_id: MessageId,
    media_cache: Arc<dyn MediaCachePort>,
    text_only: bool,
    state: Mutex<EmojiState>,
}

impl EmojiImageResolver {
    /// Creates a resolver. In text-only mode emoji are never fetched.
    #[must_use]
    pub fn new(message_id: MessageId, media_cache: Arc<dyn MediaCachePort>, text_only: bool) -> Self {
        Self {
            message_id,
            media_cache,
            text_only,
            state: Mutex::new(EmojiState::default()),
        }
    }

    /// Sets the emoji and fetches its image when it has one.
    pub async fn set_emoji(&self, name: &str, image_url: Option<&str>) {
        let generation = {
            let mut state = self.state.lock();
            if state.name.as_deref() == Some(name) {
                return;
            }
            state.name = Some(name.to_string());
            state.local_uri = None;
            state.generation += 1;
            state.generation
        };

        let Some(image_url) = image_url.filter(|_| !self.text_only) else {
            return;
        };

        let key = CacheKey::new(
            &self.message_id,
            &CachePurpose::Emoji(name.to_string()),
            image_url,
        );
        let result = self.media_cache.cache(&key, image_url).await;

        let mut state = self.state.lock();
        if state.generation != generation {
            debug!(emoji = %name, "Dropping image for replaced emoji");
            return;
        }
        match result {
            Ok(local_uri) => state.local_uri = Some(local_uri),
            Err(e) => warn!(emoji = %name, error = %e, "Failed to cache emoji image"),
        }
    }

    /// Current emoji name.
    #[must_use]
    pub fn name(&self) -> Option<String> {
        self.state.lock().name.clone()
    }

    /// Local image of the current emoji, if cached.
    #[must_use]
    pub fn image_uri(&self) -> Option<String> {
        self.state.lock().local_uri.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::mocks::{MockMediaCachePort, ScriptedMediaCache};

    const PARROT: &str = "https://chat.example.com/emoji/parrot";

    #[tokio::test]
    async fn test_caches_under_emoji_key() {
        let cache = Arc::new(ScriptedMediaCache::new());
        let resolver = EmojiImageResolver::new(MessageId::new("post1"), cache.clone(), false);

        resolver.set_emoji("parrot", Some(PARROT)).await;

        assert_eq!(
            resolver.image_uri(),
            Some(ScriptedMediaCache::local_uri_for(PARROT))
        );
        let calls = cache.calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].0.as_str().starts_with("emoji-parrot-"));
    }

    #[tokio::test]
    async fn test_text_only_never_fetches() {
        let mut cache = MockMediaCachePort::new();
        cache.expect_cache().never();
        let resolver = EmojiImageResolver::new(MessageId::new("post1"), Arc::new(cache), true);

        resolver.set_emoji("parrot", Some(PARROT)).await;

        assert_eq!(resolver.name().as_deref(), Some("parrot"));
        assert!(resolver.image_uri().is_none());
    }

    #[tokio::test]
    async fn test_name_change_clears_image() {
        let cache = Arc::new(ScriptedMediaCache::new());
        let resolver = EmojiImageResolver::new(MessageId::new("post1"), cache.clone(), false);
        resolver.set_emoji("parrot", Some(PARROT)).await;

        resolver.set_emoji("smile", None).await;

        assert_eq!(resolver.name().as_deref(), Some("smile"));
        assert!(resolver.image_uri().is_none());
    }

    #[tokio::test]
    async fn test_stale_name_result_dropped() {
        let cache = Arc::new(ScriptedMediaCache::new());
        let gate = cache.gate(PARROT);
        let resolver = Arc::new(EmojiImageResolver::new(
            MessageId::new("post1"),
            cache.clone(),
            false,
        ));

        let pending = resolver.clone();
        let task = tokio::spawn(async move { pending.set_emoji("parrot", Some(PARROT)).await });
        while cache.calls().is_empty() {
            tokio::task::yield_now().await;
        }

        resolver.set_emoji("smile", None).await;
        gate.notify_one();
        task.await.unwrap();

        assert!(resolver.image_uri().is_none());
    }

    #[tokio::test]
    async fn test_failed_fetch_leaves_text() {
        let cache = Arc::new(ScriptedMediaCache::new());
        cache.fail(PARROT);
        let resolver = EmojiImageResolver::new(MessageId::new("post1"), cache, false);

        resolver.set_emoji("parrot", Some(PARROT)).await;

        assert!(resolver.image_uri().is_none());
    }
}
