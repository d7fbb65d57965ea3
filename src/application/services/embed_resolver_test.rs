#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use crate::application::services::embed_resolver::{EmbedDependencies, EmbedResolver};
    use crate::domain::entities::{
        Classification, DeviceViewport, EmbedPhase, KnownImage, MessageId, OpenGraphData,
        OpenGraphImage, Size,
    };
    use crate::domain::errors::EmbedError;
    use crate::domain::ports::mocks::{
        RecordingOpenGraphPort, ScriptedMediaCache, ScriptedShortener, ScriptedSizeProbe,
    };
    use crate::domain::ports::{CacheError, LinkShortenerPort};

    const CAT: &str = "https://example.com/cat.png";
    const DOG: &str = "https://example.com/dog.png";
    const ARTICLE: &str = "https://example.com/article";
    const SHORT: &str = "https://bit.ly/cat";
    const VIDEO: &str = "https://youtu.be/abc123XYZ_?t=90";

    struct Harness {
        resolver: EmbedResolver,
        cache: Arc<ScriptedMediaCache>,
        probe: Arc<ScriptedSizeProbe>,
        open_graph: Arc<RecordingOpenGraphPort>,
        shortener: Option<Arc<ScriptedShortener>>,
    }

    fn harness(shortener: Option<ScriptedShortener>) -> Harness {
        let cache = Arc::new(ScriptedMediaCache::new());
        let probe = Arc::new(ScriptedSizeProbe::new(Size::new(800, 600)));
        let open_graph = Arc::new(RecordingOpenGraphPort::new());
        let shortener = shortener.map(Arc::new);

        let deps = EmbedDependencies {
            media_cache: cache.clone(),
            size_probe: probe.clone(),
            shortener: shortener
                .clone()
                .map(|s| s as Arc<dyn LinkShortenerPort>),
            open_graph: open_graph.clone(),
        };
        let resolver = EmbedResolver::new(
            MessageId::new("post1"),
            deps,
            DeviceViewport::new(400, 800, false),
        );

        Harness {
            resolver,
            cache,
            probe,
            open_graph,
            shortener,
        }
    }

    fn article_preview(images: Vec<OpenGraphImage>) -> OpenGraphData {
        OpenGraphData {
            site_name: Some("Example".to_string()),
            title: Some("An article".to_string()),
            description: Some("Something happened".to_string()),
            url: Some(ARTICLE.to_string()),
            images,
        }
    }

    fn fetches_of(h: &Harness, url: &str) -> usize {
        h.cache.calls().iter().filter(|(_, u)| u == url).count()
    }

    async fn wait_until(condition: impl Fn() -> bool) {
        for _ in 0..1000 {
            if condition() {
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!("condition not reached");
    }

    #[tokio::test]
    async fn test_image_link_end_to_end() {
        let h = harness(None);

        h.resolver.set_link(Some(CAT.to_string())).await;

        let snapshot = h.resolver.snapshot();
        assert_eq!(snapshot.phase, EmbedPhase::Ready);
        assert_eq!(snapshot.descriptor.kind, Classification::Image);
        assert!(!snapshot.descriptor.load_error);
        assert_eq!(snapshot.descriptor.remote_uri.as_deref(), Some(CAT));
        assert_eq!(
            snapshot.descriptor.media_uri,
            Some(ScriptedMediaCache::local_uri_for(CAT))
        );

        let dimensions = snapshot.descriptor.dimensions.unwrap();
        assert_eq!(dimensions.original, Some(Size::new(800, 600)));
        assert_eq!(dimensions.fitted, Size::new(334, 251));

        let calls = h.cache.calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].0.as_str().starts_with("embed-post1-"));
        assert_eq!(calls[0].1, CAT);
    }

    #[tokio::test]
    async fn test_youtube_link_end_to_end() {
        let h = harness(None);
        let thumbnail = "https://i.ytimg.com/vi/abc123XYZ_/hqdefault.jpg";
        h.probe.set(
            &ScriptedMediaCache::local_uri_for(thumbnail),
            Ok(Size::new(480, 360)),
        );

        h.resolver.set_link(Some(VIDEO.to_string())).await;

        let snapshot = h.resolver.snapshot();
        assert_eq!(snapshot.phase, EmbedPhase::Ready);
        assert_eq!(
            snapshot.descriptor.kind,
            Classification::YouTube {
                video_id: "abc123XYZ_".to_string(),
                start_seconds: 90,
            }
        );
        assert_eq!(snapshot.descriptor.remote_uri.as_deref(), Some(thumbnail));
        assert_eq!(
            snapshot.descriptor.dimensions.unwrap().fitted,
            Size::new(200, 150)
        );
        assert_eq!(
            h.cache.prefetched(),
            vec!["https://i.ytimg.com/vi/abc123XYZ_/default.jpg".to_string()]
        );
        assert!(h.cache.calls()[0].0.as_str().starts_with("thumb-post1-"));
        assert!(h.resolver.preview_file().is_none());
    }

    #[tokio::test]
    async fn test_youtube_placeholder_while_fetching() {
        let h = harness(None);
        let gate = h.cache.gate("https://i.ytimg.com/vi/abc123XYZ_/hqdefault.jpg");

        let resolver = h.resolver.clone();
        let task = tokio::spawn(async move { resolver.set_link(Some(VIDEO.to_string())).await });
        wait_until(|| h.cache.calls().len() == 1).await;

        let snapshot = h.resolver.snapshot();
        assert_eq!(snapshot.phase, EmbedPhase::Resolving);
        let placeholder = snapshot.descriptor.dimensions.unwrap();
        assert!(!placeholder.is_known());
        assert_eq!(placeholder.fitted, Size::new(297, 150));

        gate.notify_one();
        task.await.unwrap();
        assert_eq!(h.resolver.phase(), EmbedPhase::Ready);
    }

    #[tokio::test]
    async fn test_same_link_is_noop() {
        let h = harness(None);

        h.resolver.set_link(Some(CAT.to_string())).await;
        h.resolver.set_link(Some(CAT.to_string())).await;

        assert_eq!(h.cache.calls().len(), 1);
        assert_eq!(h.probe.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_superseded_fetch_is_discarded() {
        let h = harness(None);
        h.probe.set(
            &ScriptedMediaCache::local_uri_for(DOG),
            Ok(Size::new(200, 100)),
        );
        let gate = h.cache.gate(CAT);

        let resolver = h.resolver.clone();
        let first = tokio::spawn(async move { resolver.set_link(Some(CAT.to_string())).await });
        wait_until(|| h.cache.calls().len() == 1).await;

        h.resolver.set_link(Some(DOG.to_string())).await;
        assert_eq!(h.resolver.phase(), EmbedPhase::Ready);

        gate.notify_one();
        first.await.unwrap();

        let snapshot = h.resolver.snapshot();
        assert_eq!(snapshot.phase, EmbedPhase::Ready);
        assert_eq!(snapshot.descriptor.link.as_deref(), Some(DOG));
        assert_eq!(
            snapshot.descriptor.media_uri,
            Some(ScriptedMediaCache::local_uri_for(DOG))
        );
        assert_eq!(
            snapshot.descriptor.dimensions.unwrap().fitted,
            Size::new(200, 100)
        );
        assert_eq!(
            h.probe.calls(),
            vec![ScriptedMediaCache::local_uri_for(DOG)]
        );
    }

    #[tokio::test]
    async fn test_in_flight_fetch_is_reused() {
        let h = harness(None);
        let gate = h.cache.gate(CAT);

        let resolver = h.resolver.clone();
        let first = tokio::spawn(async move { resolver.set_link(Some(CAT.to_string())).await });
        wait_until(|| h.cache.calls().len() == 1).await;

        h.resolver.set_link(Some(DOG.to_string())).await;
        let resolver = h.resolver.clone();
        let second = tokio::spawn(async move { resolver.set_link(Some(CAT.to_string())).await });
        wait_until(|| h.resolver.phase() == EmbedPhase::Resolving).await;

        gate.notify_one();
        first.await.unwrap();
        second.await.unwrap();

        let snapshot = h.resolver.snapshot();
        assert_eq!(snapshot.phase, EmbedPhase::Ready);
        assert_eq!(snapshot.descriptor.link.as_deref(), Some(CAT));
        assert_eq!(fetches_of(&h, CAT), 1);
    }

    #[tokio::test]
    async fn test_cancelled_fetch_does_not_block_retry() {
        let h = harness(None);
        let gate = h.cache.gate(CAT);

        let timed_out = tokio::time::timeout(
            Duration::from_millis(20),
            h.resolver.set_link(Some(CAT.to_string())),
        )
        .await;
        assert!(timed_out.is_err());

        gate.notify_one();
        h.resolver.set_link(Some(DOG.to_string())).await;
        h.resolver.set_link(Some(CAT.to_string())).await;

        let snapshot = h.resolver.snapshot();
        assert_eq!(snapshot.phase, EmbedPhase::Ready);
        assert_eq!(snapshot.descriptor.link.as_deref(), Some(CAT));
        assert_eq!(fetches_of(&h, CAT), 2);
    }

    #[tokio::test]
    async fn test_waiting_run_takes_over_aborted_fetch() {
        let h = harness(None);
        let gate = h.cache.gate(CAT);

        let resolver = h.resolver.clone();
        let first = tokio::spawn(async move { resolver.set_link(Some(CAT.to_string())).await });
        wait_until(|| h.cache.calls().len() == 1).await;

        h.resolver.set_link(Some(DOG.to_string())).await;
        let resolver = h.resolver.clone();
        let second = tokio::spawn(async move { resolver.set_link(Some(CAT.to_string())).await });
        wait_until(|| h.resolver.phase() == EmbedPhase::Resolving).await;

        first.abort();
        assert!(first.await.unwrap_err().is_cancelled());
        wait_until(|| fetches_of(&h, CAT) == 2).await;
        gate.notify_one();
        second.await.unwrap();

        let snapshot = h.resolver.snapshot();
        assert_eq!(snapshot.phase, EmbedPhase::Ready);
        assert_eq!(snapshot.descriptor.link.as_deref(), Some(CAT));
    }

    #[tokio::test]
    async fn test_teardown_drops_completions() {
        let h = harness(None);
        let gate = h.cache.gate(CAT);

        let resolver = h.resolver.clone();
        let task = tokio::spawn(async move { resolver.set_link(Some(CAT.to_string())).await });
        wait_until(|| h.cache.calls().len() == 1).await;

        h.resolver.teardown();
        gate.notify_one();
        task.await.unwrap();

        let snapshot = h.resolver.snapshot();
        assert!(!h.resolver.is_active());
        assert_eq!(snapshot.phase, EmbedPhase::Resolving);
        assert!(snapshot.descriptor.media_uri.is_none());
        assert!(h.probe.calls().is_empty());

        h.resolver.set_link(Some(DOG.to_string())).await;
        assert_eq!(h.cache.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_clearing_link_goes_idle() {
        let h = harness(None);
        h.resolver.set_link(Some(CAT.to_string())).await;

        h.resolver.set_link(None).await;

        let snapshot = h.resolver.snapshot();
        assert_eq!(snapshot.phase, EmbedPhase::Idle);
        assert!(snapshot.descriptor.link.is_none());
        assert!(snapshot.descriptor.dimensions.is_none());
    }

    #[tokio::test]
    async fn test_short_link_expanded_once() {
        let h = harness(Some(ScriptedShortener::new().expands_to(SHORT, CAT)));

        h.resolver.set_link(Some(SHORT.to_string())).await;

        let snapshot = h.resolver.snapshot();
        assert_eq!(snapshot.phase, EmbedPhase::Ready);
        assert_eq!(snapshot.descriptor.kind, Classification::Image);
        assert_eq!(snapshot.descriptor.expanded_link.as_deref(), Some(CAT));
        assert_eq!(snapshot.descriptor.remote_uri.as_deref(), Some(CAT));

        h.resolver.set_link(Some(DOG.to_string())).await;
        h.resolver.set_link(Some(SHORT.to_string())).await;

        let shortener = h.shortener.unwrap();
        assert_eq!(shortener.calls(), vec![SHORT.to_string()]);
        assert_eq!(
            h.resolver.snapshot().descriptor.expanded_link.as_deref(),
            Some(CAT)
        );
    }

    #[tokio::test]
    async fn test_concurrent_expansion_shares_request() {
        let h = harness(Some(ScriptedShortener::new().expands_to(SHORT, CAT)));
        let shortener = h.shortener.clone().unwrap();
        let gate = shortener.gate(SHORT);

        let resolver = h.resolver.clone();
        let first = tokio::spawn(async move { resolver.set_link(Some(SHORT.to_string())).await });
        wait_until(|| shortener.calls().len() == 1).await;
        assert_eq!(h.resolver.phase(), EmbedPhase::AwaitingShortener);

        h.resolver.set_link(Some(DOG.to_string())).await;
        let resolver = h.resolver.clone();
        let second = tokio::spawn(async move { resolver.set_link(Some(SHORT.to_string())).await });
        wait_until(|| h.resolver.phase() == EmbedPhase::AwaitingShortener).await;

        gate.notify_one();
        first.await.unwrap();
        second.await.unwrap();

        assert_eq!(shortener.calls().len(), 1);
        let snapshot = h.resolver.snapshot();
        assert_eq!(snapshot.phase, EmbedPhase::Ready);
        assert_eq!(snapshot.descriptor.kind, Classification::Image);
    }

    #[tokio::test]
    async fn test_failed_expansion_falls_back_to_generic() {
        let h = harness(Some(ScriptedShortener::new().fails_for(SHORT)));

        h.resolver.set_link(Some(SHORT.to_string())).await;

        let snapshot = h.resolver.snapshot();
        assert_eq!(snapshot.descriptor.kind, Classification::Generic);
        assert_eq!(snapshot.phase, EmbedPhase::AwaitingOpenGraph);
        assert!(snapshot.descriptor.expanded_link.is_none());
        assert_eq!(h.open_graph.requests(), vec![SHORT.to_string()]);
    }

    #[tokio::test]
    async fn test_generic_link_without_shortener() {
        let h = harness(None);

        h.resolver.set_link(Some(ARTICLE.to_string())).await;

        assert_eq!(h.resolver.phase(), EmbedPhase::AwaitingOpenGraph);
        assert_eq!(h.open_graph.requests(), vec![ARTICLE.to_string()]);
        assert!(h.cache.calls().is_empty());
    }

    #[tokio::test]
    async fn test_open_graph_image_resolved() {
        let h = harness(None);
        h.resolver.set_link(Some(ARTICLE.to_string())).await;

        let preview = article_preview(vec![
            OpenGraphImage::new("https://example.com/og.png").with_dimensions(1200, 630),
        ]);
        h.resolver.set_open_graph(ARTICLE, preview.clone()).await;

        let snapshot = h.resolver.snapshot();
        assert_eq!(snapshot.phase, EmbedPhase::Ready);
        assert_eq!(
            snapshot.descriptor.remote_uri.as_deref(),
            Some("https://example.com/og.png")
        );
        assert_eq!(
            snapshot.descriptor.dimensions.unwrap().fitted,
            Size::new(312, 164)
        );
        assert!(h.cache.calls()[0].0.as_str().starts_with("og-post1-"));
        assert!(h.probe.calls().is_empty());
        assert_eq!(h.resolver.open_graph(), Some(preview));

        let preview_file = h.resolver.preview_file().unwrap();
        assert_eq!(preview_file.caption, "og-og.png");
        assert_eq!(preview_file.dimensions, Some(Size::new(1200, 630)));
    }

    #[tokio::test]
    async fn test_open_graph_without_image() {
        let h = harness(None);
        h.resolver.set_link(Some(ARTICLE.to_string())).await;

        h.resolver
            .set_open_graph(ARTICLE, article_preview(Vec::new()))
            .await;

        let snapshot = h.resolver.snapshot();
        assert_eq!(snapshot.phase, EmbedPhase::Ready);
        assert!(snapshot.descriptor.remote_uri.is_none());
        assert!(h.cache.calls().is_empty());
    }

    #[tokio::test]
    async fn test_prefetched_open_graph_skips_request() {
        let h = harness(None);

        h.resolver
            .set_link_with_open_graph(
                Some(ARTICLE.to_string()),
                article_preview(vec![OpenGraphImage::new("https://example.com/og")]),
            )
            .await;

        let snapshot = h.resolver.snapshot();
        assert_eq!(snapshot.phase, EmbedPhase::Ready);
        assert!(h.open_graph.requests().is_empty());
        assert_eq!(
            h.probe.calls(),
            vec![ScriptedMediaCache::local_uri_for("https://example.com/og")]
        );
        assert_eq!(
            snapshot.descriptor.dimensions.unwrap().fitted,
            Size::new(312, 234)
        );
    }

    #[tokio::test]
    async fn test_open_graph_for_other_link_ignored() {
        let h = harness(None);
        h.resolver.set_link(Some(ARTICLE.to_string())).await;

        h.resolver
            .set_open_graph("https://example.com/other", article_preview(Vec::new()))
            .await;

        assert_eq!(h.resolver.phase(), EmbedPhase::AwaitingOpenGraph);
        assert!(h.resolver.open_graph().is_none());
    }

    #[tokio::test]
    async fn test_new_open_graph_data_reenters() {
        let h = harness(None);
        h.resolver.set_link(Some(ARTICLE.to_string())).await;
        h.resolver
            .set_open_graph(
                ARTICLE,
                article_preview(vec![
                    OpenGraphImage::new("https://example.com/a.png").with_dimensions(100, 50),
                ]),
            )
            .await;

        h.resolver
            .set_open_graph(
                ARTICLE,
                article_preview(vec![
                    OpenGraphImage::new("https://example.com/b.png").with_dimensions(300, 150),
                ]),
            )
            .await;

        let snapshot = h.resolver.snapshot();
        assert_eq!(snapshot.phase, EmbedPhase::Ready);
        assert_eq!(
            snapshot.descriptor.remote_uri.as_deref(),
            Some("https://example.com/b.png")
        );
        assert_eq!(
            snapshot.descriptor.dimensions.unwrap().fitted,
            Size::new(300, 150)
        );
        assert_eq!(h.cache.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_fetch_failure_sets_load_error() {
        let h = harness(None);
        h.cache.fail(CAT);

        h.resolver.set_link(Some(CAT.to_string())).await;

        let snapshot = h.resolver.snapshot();
        assert_eq!(snapshot.phase, EmbedPhase::Error);
        assert!(snapshot.descriptor.load_error);
        assert!(h.probe.calls().is_empty());
        assert!(matches!(
            h.resolver.last_error(),
            Some(EmbedError::FetchFailed { .. })
        ));
    }

    #[tokio::test]
    async fn test_probe_failure_sets_load_error() {
        let h = harness(None);
        h.probe.set(
            &ScriptedMediaCache::local_uri_for(CAT),
            Err(CacheError::DecodeError("not an image".to_string())),
        );

        h.resolver.set_link(Some(CAT.to_string())).await;

        let snapshot = h.resolver.snapshot();
        assert_eq!(snapshot.phase, EmbedPhase::Error);
        assert!(snapshot.descriptor.load_error);
        assert!(snapshot.descriptor.dimensions.is_none());
    }

    #[tokio::test]
    async fn test_zero_dimensions_are_an_error() {
        let h = harness(None);
        h.probe.set(
            &ScriptedMediaCache::local_uri_for(CAT),
            Ok(Size::new(0, 0)),
        );

        h.resolver.set_link(Some(CAT.to_string())).await;

        assert_eq!(h.resolver.phase(), EmbedPhase::Error);
        assert!(h.resolver.snapshot().descriptor.load_error);
        assert_eq!(
            h.resolver.last_error(),
            Some(EmbedError::invalid_dimensions(0, 0))
        );
    }

    #[tokio::test]
    async fn test_known_image_skips_probe() {
        let h = harness(None);
        let url = "https://example.com/render?id=42";
        h.resolver
            .set_known_images(vec![KnownImage::new(url, 640, 480)]);

        h.resolver.set_link(Some(url.to_string())).await;

        let snapshot = h.resolver.snapshot();
        assert_eq!(snapshot.descriptor.kind, Classification::Image);
        assert_eq!(snapshot.phase, EmbedPhase::Ready);
        assert!(h.probe.calls().is_empty());
        assert_eq!(
            snapshot.descriptor.dimensions.unwrap().fitted,
            Size::new(334, 251)
        );
    }

    #[tokio::test]
    async fn test_viewport_change_refits() {
        let h = harness(None);
        h.resolver.set_link(Some(CAT.to_string())).await;

        h.resolver.set_viewport(DeviceViewport::new(800, 400, true));

        let dimensions = h.resolver.snapshot().descriptor.dimensions.unwrap();
        assert_eq!(dimensions.original, Some(Size::new(800, 600)));
        assert_eq!(dimensions.fitted, Size::new(321, 241));
        assert_eq!(h.probe.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_viewport_change_after_teardown_ignored() {
        let h = harness(None);
        h.resolver.set_link(Some(CAT.to_string())).await;
        let before = h.resolver.snapshot().descriptor.dimensions;

        h.resolver.teardown();
        h.resolver.set_viewport(DeviceViewport::new(800, 400, true));

        assert_eq!(h.resolver.snapshot().descriptor.dimensions, before);
    }

    #[tokio::test]
    async fn test_known_images_after_teardown_ignored() {
        let h = harness(None);
        let url = "https://example.com/render?id=42";

        h.resolver
            .set_known_images(vec![KnownImage::new(url, 640, 480)]);

        h.resolver.teardown();
        h.resolver.set_known_images(Vec::new());

        assert_eq!(
            h.resolver.known_images(),
            vec![KnownImage::new(url, 640, 480)]
        );
    }

    #[tokio::test]
    async fn test_render_failure_reported() {
        let h = harness(None);
        h.resolver.set_link(Some(CAT.to_string())).await;

        h.resolver.report_load_error();

        let snapshot = h.resolver.snapshot();
        assert_eq!(snapshot.phase, EmbedPhase::Error);
        assert!(snapshot.descriptor.load_error);
    }

    #[tokio::test]
    async fn test_preview_file_for_image() {
        let h = harness(None);
        h.resolver
            .set_link(Some(format!("{CAT}?width=800")))
            .await;

        let preview = h.resolver.preview_file().unwrap();
        assert_eq!(preview.caption, "cat.png");
        assert_eq!(preview.dimensions, Some(Size::new(800, 600)));
        assert_eq!(
            preview.local_uri,
            ScriptedMediaCache::local_uri_for(&format!("{CAT}?width=800"))
        );
    }
}
