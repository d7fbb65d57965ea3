use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use color_eyre::eyre::Result;
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use oxiembed::application::{
    EmbedDependencies, EmbedPresentation, EmbedResolver, VideoPlaybackService,
};
use oxiembed::domain::entities::{
    DeviceViewport, EmbedPhase, EmbedSnapshot, MessageId, OpenGraphData, PreviewFile,
};
use oxiembed::domain::ports::LinkShortenerPort;
use oxiembed::infrastructure::{
    AppConfig, CliArgs, DesktopNotificationService, DiskMediaCache, ExternalVideoPlayer,
    HttpLinkShortener, HttpOpenGraphProvider, ImageSizeProbe, MediaCacheGateway, MemorySizeCache,
    OpenGraphEvent, StorageManager,
};

#[derive(Serialize)]
struct Report {
    snapshot: EmbedSnapshot,
    presentation: EmbedPresentation,
    preview: Option<PreviewFile>,
    error: Option<String>,
}

fn init_logging(config: &AppConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.to_string()));

    if let Some(log_path) = config.effective_log_path() {
        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)?;

        let file_layer = fmt::layer()
            .with_writer(file)
            .with_ansi(false)
            .with_target(true)
            .with_thread_ids(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(file_layer)
            .init();

        info!(path = %log_path.display(), "Logging initialized");
    } else {
        tracing_subscriber::registry().with(filter).init();
    }

    Ok(())
}

fn load_config(args: &CliArgs) -> Result<AppConfig> {
    let storage = StorageManager::new()?;
    let mut config = storage.load_config(args.config.as_deref())?;
    config.merge_with_args(args);
    Ok(config)
}

async fn await_open_graph(
    resolver: &EmbedResolver,
    events: &mut mpsc::UnboundedReceiver<OpenGraphEvent>,
    timeout: Duration,
) {
    let wait = async {
        while let Some(event) = events.recv().await {
            match event.result {
                Ok(data) => resolver.set_open_graph(&event.url, data).await,
                Err(e) => warn!(url = %event.url, error = %e, "No link preview"),
            }
            if resolver.phase() != EmbedPhase::AwaitingOpenGraph {
                break;
            }
        }
    };

    if tokio::time::timeout(timeout, wait).await.is_err() {
        warn!(timeout_secs = timeout.as_secs(), "Timed out waiting for link preview");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let args = CliArgs::parse();
    let config = load_config(&args)?;
    init_logging(&config)?;

    info!(version = oxiembed::VERSION, link = %args.link, "Starting oxiembed");

    let media_config = config.cache.to_media_config();
    let disk = Arc::new(
        DiskMediaCache::new(config.effective_cache_dir(), media_config.max_disk_bytes).await?,
    );
    let gateway = MediaCacheGateway::new(&media_config, disk)?;
    let sizes = Arc::new(MemorySizeCache::new(media_config.memory_entries));
    let shortener: Option<Arc<dyn LinkShortenerPort>> = if config.embeds.expand_short_links {
        Some(Arc::new(HttpLinkShortener::new(config.cache.timeout_secs)?))
    } else {
        None
    };
    let (open_graph, mut og_events) = HttpOpenGraphProvider::new(config.cache.timeout_secs)?;

    let deps = EmbedDependencies {
        media_cache: Arc::new(gateway),
        size_probe: Arc::new(ImageSizeProbe::new(sizes.clone())),
        shortener,
        open_graph: Arc::new(open_graph),
    };
    let viewport = DeviceViewport::new(args.device_width, args.device_height, args.reply);
    let resolver = EmbedResolver::new(MessageId::new(args.message_id.clone()), deps, viewport);

    let supplied_open_graph = args
        .open_graph
        .as_deref()
        .map(StorageManager::load_json::<OpenGraphData>)
        .transpose()?;

    match supplied_open_graph {
        Some(data) => {
            resolver
                .set_link_with_open_graph(Some(args.link.clone()), data)
                .await;
        }
        None => resolver.set_link(Some(args.link.clone())).await,
    }

    if resolver.phase() == EmbedPhase::AwaitingOpenGraph {
        let timeout = Duration::from_secs(config.embeds.open_graph_timeout_secs);
        await_open_graph(&resolver, &mut og_events, timeout).await;
    }

    let snapshot = resolver.snapshot();
    let presentation = EmbedPresentation::decide(
        &snapshot.descriptor,
        resolver.open_graph().as_ref(),
        &[],
        config.embeds.link_previews,
    );
    let report = Report {
        preview: resolver.preview_file(),
        error: resolver.last_error().map(|e| e.to_string()),
        snapshot,
        presentation,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    info!(stats = %sizes.stats().await, "Resolution finished");

    if args.play {
        let playback = VideoPlaybackService::new(
            Arc::new(ExternalVideoPlayer::new(config.player.command.clone())),
            Arc::new(DesktopNotificationService::new(config.notifications.enabled)),
        );
        let link = report
            .snapshot
            .descriptor
            .effective_link()
            .unwrap_or(&args.link)
            .to_string();
        if let Err(e) = playback.play(&link).await {
            eprintln!("error: {e}");
        }
    }

    resolver.teardown();
    Ok(())
}
