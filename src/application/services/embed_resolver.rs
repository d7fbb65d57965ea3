//! Per-message embed resolution.
//!
//! [`EmbedResolver`] drives one message link from classification to render
//! ready dimensions. Async steps run with the state lock released and re-check
//! their [`Ticket`] before applying a result, so completions for a superseded
//! link or a torn down view are dropped.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{OnceCell, watch};
use tracing::{debug, trace, warn};

use super::dimension_fitter;
use super::dimension_resolver::{DimensionResolver, DimensionSource};
use super::link_classifier::LinkClassifier;
use super::open_graph_selector::{self, SelectedImage};
use crate::domain::entities::{
    CacheKey, CachePurpose, Classification, DeviceViewport, EmbedDescriptor, EmbedPhase,
    EmbedSnapshot, ImageDimensions, KnownImage, MessageId, OffsetPolicy, OpenGraphData,
    PreviewFile, Size, remote_file_name,
};
use crate::domain::errors::EmbedError;
use crate::domain::ports::{
    CacheResult, LinkShortenerPort, MediaCachePort, OpenGraphPort, SizeProbePort,
};

/// Ports an [`EmbedResolver`] talks to.
#[derive(Clone)]
pub struct EmbedDependencies {
    /// Shared media cache.
    pub media_cache: Arc<dyn MediaCachePort>,
    /// Size probe for cached media.
    pub size_probe: Arc<dyn SizeProbePort>,
    /// Link expander. Without one, inconclusive links stay generic.
    pub shortener: Option<Arc<dyn LinkShortenerPort>>,
    /// Link preview metadata source.
    pub open_graph: Arc<dyn OpenGraphPort>,
}

#[derive(Debug, Clone)]
enum Stage {
    Idle,
    Classifying,
    AwaitingShortener,
    Resolving { key: CacheKey },
    AwaitingOpenGraph,
    Sizing { local_uri: String },
    Ready,
    Error(EmbedError),
}

impl Stage {
    const fn phase(&self) -> EmbedPhase {
        match self {
            Self::Idle => EmbedPhase::Idle,
            Self::Classifying => EmbedPhase::Classifying,
            Self::AwaitingShortener => EmbedPhase::AwaitingShortener,
            Self::Resolving { .. } => EmbedPhase::Resolving,
            Self::AwaitingOpenGraph => EmbedPhase::AwaitingOpenGraph,
            Self::Sizing { .. } => EmbedPhase::Sizing,
            Self::Ready => EmbedPhase::Ready,
            Self::Error(_) => EmbedPhase::Error,
        }
    }
}

/// Identity of one resolution attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Ticket {
    epoch: u64,
    link: String,
}

#[derive(Debug, Clone)]
struct ClassifiedLink {
    kind: Classification,
    expanded: Option<String>,
}

#[derive(Debug, Clone)]
struct MediaRequest {
    key: CacheKey,
    remote_uri: String,
    declared: Option<Size>,
    policy: OffsetPolicy,
    prefetch: Option<String>,
}

/// Outcome of a cache call, shared with every run waiting on the same key.
type SharedFetch = watch::Receiver<Option<CacheResult<String>>>;

enum Claim {
    Own(watch::Sender<Option<CacheResult<String>>>),
    Join(SharedFetch),
}

/// Unregisters an in-flight fetch when its owner finishes or is dropped.
struct InFlightGuard<'a> {
    state: &'a Mutex<Resolution>,
    key: &'a CacheKey,
    tx: watch::Sender<Option<CacheResult<String>>>,
}

impl InFlightGuard<'_> {
    fn finish(self, result: CacheResult<String>) {
        self.tx.send_replace(Some(result));
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        let own = self.tx.subscribe();
        let mut state = self.state.lock();
        if state
            .in_flight
            .get(self.key)
            .is_some_and(|pending| pending.same_channel(&own))
        {
            state.in_flight.remove(self.key);
        }
    }
}

enum Step {
    Done,
    RequestOpenGraph(String),
    Fetch(MediaRequest),
}

struct Resolution {
    active: bool,
    epoch: u64,
    stage: Stage,
    descriptor: EmbedDescriptor,
    policy: Option<OffsetPolicy>,
    viewport: DeviceViewport,
    known_images: Vec<KnownImage>,
    open_graph: Option<OpenGraphData>,
    classified: HashMap<String, ClassifiedLink>,
    expansions: HashMap<String, Arc<OnceCell<Option<String>>>>,
    in_flight: HashMap<CacheKey, SharedFetch>,
}

impl Resolution {
    fn new(viewport: DeviceViewport) -> Self {
        Self {
            active: true,
            epoch: 0,
            stage: Stage::Idle,
            descriptor: EmbedDescriptor::empty(None),
            policy: None,
            viewport,
            known_images: Vec::new(),
            open_graph: None,
            classified: HashMap::new(),
            expansions: HashMap::new(),
            in_flight: HashMap::new(),
        }
    }

    fn accepts(&self, ticket: &Ticket) -> bool {
        self.active
            && self.epoch == ticket.epoch
            && self.descriptor.link.as_deref() == Some(ticket.link.as_str())
    }

    fn begin(&mut self, link: Option<String>, open_graph: Option<OpenGraphData>) -> Option<Ticket> {
        self.epoch += 1;
        self.descriptor = EmbedDescriptor::empty(link.clone());
        self.policy = None;
        self.open_graph = open_graph;

        if let Some(link) = link {
            self.stage = Stage::Classifying;
            Some(Ticket {
                epoch: self.epoch,
                link,
            })
        } else {
            self.stage = Stage::Idle;
            None
        }
    }

    /// Starts over from the link preview step, keeping the classification.
    fn reenter_open_graph(&mut self) -> Option<Ticket> {
        let link = self.descriptor.link.clone()?;
        self.epoch += 1;
        self.descriptor.remote_uri = None;
        self.descriptor.media_uri = None;
        self.descriptor.dimensions = None;
        self.descriptor.load_error = false;
        self.policy = None;
        Some(Ticket {
            epoch: self.epoch,
            link,
        })
    }

    fn fail(&mut self, error: EmbedError) {
        if error.is_load_error() {
            self.descriptor.load_error = true;
        }
        self.stage = Stage::Error(error);
    }

    fn declared_size(&self) -> Option<Size> {
        let raw = self.descriptor.link.as_deref();
        let effective = self.descriptor.effective_link();
        self.known_images
            .iter()
            .filter(|image| image.has_size())
            .find(|image| Some(image.url.as_str()) == effective || Some(image.url.as_str()) == raw)
            .map(|image| Size::new(image.width, image.height))
    }

    fn fit(&self, original: Size, policy: OffsetPolicy) -> Result<ImageDimensions, EmbedError> {
        match policy {
            OffsetPolicy::OpenGraph => open_graph_selector::fit_candidate(
                original,
                open_graph_selector::target_box(self.viewport),
            )
            .ok_or(EmbedError::invalid_dimensions(original.width, original.height)),
            OffsetPolicy::Embed | OffsetPolicy::VideoThumbnail => {
                dimension_fitter::fit_to_budget(original, self.viewport.budget(policy))
            }
        }
    }

    fn placeholder(&self, policy: OffsetPolicy) -> ImageDimensions {
        match policy {
            OffsetPolicy::OpenGraph => ImageDimensions {
                original: None,
                fitted: open_graph_selector::target_box(self.viewport),
            },
            OffsetPolicy::Embed | OffsetPolicy::VideoThumbnail => {
                ImageDimensions::placeholder(self.viewport.budget(policy))
            }
        }
    }

    fn plan(&mut self, message_id: &MessageId) -> Step {
        match self.descriptor.kind.clone() {
            Classification::Image => {
                let Some(link) = self.descriptor.effective_link().map(str::to_owned) else {
                    self.stage = Stage::Idle;
                    return Step::Done;
                };
                self.descriptor.remote_uri = Some(link.clone());
                Step::Fetch(MediaRequest {
                    key: CacheKey::new(message_id, &CachePurpose::Embed, &link),
                    declared: self.declared_size(),
                    remote_uri: link,
                    policy: OffsetPolicy::Embed,
                    prefetch: None,
                })
            }
            Classification::YouTube { video_id, .. } => {
                let thumbnail = LinkClassifier::youtube_thumbnail_url(&video_id);
                self.descriptor.remote_uri = Some(thumbnail.clone());
                self.descriptor.dimensions = Some(self.placeholder(OffsetPolicy::VideoThumbnail));
                Step::Fetch(MediaRequest {
                    key: CacheKey::new(message_id, &CachePurpose::Thumbnail, &thumbnail),
                    remote_uri: thumbnail,
                    declared: None,
                    policy: OffsetPolicy::VideoThumbnail,
                    prefetch: Some(LinkClassifier::youtube_preview_thumbnail_url(&video_id)),
                })
            }
            Classification::Generic => match self.open_graph.clone() {
                Some(data) => self.plan_open_graph(message_id, &data),
                None => {
                    self.stage = Stage::AwaitingOpenGraph;
                    self.descriptor
                        .effective_link()
                        .map_or(Step::Done, |link| Step::RequestOpenGraph(link.to_owned()))
                }
            },
            Classification::None => {
                self.stage = Stage::Idle;
                Step::Done
            }
        }
    }

    fn plan_open_graph(&mut self, message_id: &MessageId, data: &OpenGraphData) -> Step {
        let target = open_graph_selector::target_box(self.viewport);
        let Some(SelectedImage {
            uri,
            declared,
            dimensions,
        }) = open_graph_selector::select_best_image(target, &data.images)
        else {
            trace!(link = ?self.descriptor.link, "Link preview has no image");
            self.stage = Stage::Ready;
            return Step::Done;
        };

        self.descriptor.remote_uri = Some(uri.clone());
        self.descriptor.dimensions = Some(dimensions);
        Step::Fetch(MediaRequest {
            key: CacheKey::new(message_id, &CachePurpose::OpenGraph, &uri),
            remote_uri: uri,
            declared,
            policy: OffsetPolicy::OpenGraph,
            prefetch: None,
        })
    }
}

struct Inner {
    message_id: MessageId,
    deps: EmbedDependencies,
    dimensions: DimensionResolver,
    state: Mutex<Resolution>,
}

/// Resolves the embed of one message.
///
/// Cloning is cheap; clones share the same resolution. Errors never escape:
/// they surface as [`EmbedPhase::Error`] and `load_error` in the snapshot.
#[derive(Clone)]
pub struct EmbedResolver {
    inner: Arc<Inner>,
}

impl EmbedResolver {
    /// Creates an idle resolver for `message_id`.
    #[must_use]
    pub fn new(message_id: MessageId, deps: EmbedDependencies, viewport: DeviceViewport) -> Self {
        let dimensions = DimensionResolver::new(deps.size_probe.clone());
        Self {
            inner: Arc::new(Inner {
                message_id,
                deps,
                dimensions,
                state: Mutex::new(Resolution::new(viewport)),
            }),
        }
    }

    /// Message this resolver belongs to.
    #[must_use]
    pub fn message_id(&self) -> &MessageId {
        &self.inner.message_id
    }

    /// Replaces the image sizes the server reported for this message.
    ///
    /// Only affects links classified afterwards.
    pub fn set_known_images(&self, images: Vec<KnownImage>) {
        let mut state = self.inner.state.lock();
        if !state.active {
            return;
        }
        state.known_images = images;
        state.classified.clear();
    }

    /// Sets the message link and resolves it.
    ///
    /// A value-equal link is a no-op; `None` clears the embed.
    pub async fn set_link(&self, link: Option<String>) {
        self.update_link(link, None).await;
    }

    /// Sets the message link together with link preview metadata the caller
    /// already has.
    pub async fn set_link_with_open_graph(&self, link: Option<String>, open_graph: OpenGraphData) {
        self.update_link(link, Some(open_graph)).await;
    }

    async fn update_link(&self, link: Option<String>, mut open_graph: Option<OpenGraphData>) {
        let link = link
            .map(|link| link.trim().to_string())
            .filter(|link| !link.is_empty());

        let update = {
            let mut state = self.inner.state.lock();
            if !state.active {
                return;
            }
            if state.descriptor.link == link {
                None
            } else {
                Some(state.begin(link.clone(), open_graph.take()))
            }
        };

        match update {
            None => {
                if let (Some(link), Some(data)) = (link, open_graph) {
                    self.set_open_graph(&link, data).await;
                }
            }
            Some(None) => {
                debug!(message_id = %self.inner.message_id, "Embed link cleared");
            }
            Some(Some(ticket)) => {
                debug!(
                    message_id = %self.inner.message_id,
                    link = %ticket.link,
                    epoch = ticket.epoch,
                    "Resolving embed"
                );
                self.run(ticket).await;
            }
        }
    }

    /// Delivers link preview metadata for `url`.
    ///
    /// Ignored unless `url` is the current link (raw or expanded). For a
    /// generic link that already finished classifying, the preview image is
    /// selected and resolved again.
    pub async fn set_open_graph(&self, url: &str, data: OpenGraphData) {
        let (ticket, step) = {
            let mut state = self.inner.state.lock();
            if !state.active {
                return;
            }

            let current = state.descriptor.link.as_deref() == Some(url)
                || state.descriptor.expanded_link.as_deref() == Some(url);
            if !current {
                debug!(url = %url, "Ignoring link preview for another link");
                return;
            }

            state.open_graph = Some(data.clone());
            let classified = matches!(state.descriptor.kind, Classification::Generic)
                && !matches!(state.stage, Stage::Classifying | Stage::AwaitingShortener);
            if !classified {
                trace!(url = %url, "Stored link preview for later");
                return;
            }

            let Some(ticket) = state.reenter_open_graph() else {
                return;
            };
            let step = state.plan_open_graph(&self.inner.message_id, &data);
            (ticket, step)
        };

        self.advance(ticket, step).await;
    }

    /// Updates device metrics and re-fits the current media.
    pub fn set_viewport(&self, viewport: DeviceViewport) {
        let mut state = self.inner.state.lock();
        if !state.active || state.viewport == viewport {
            return;
        }
        state.viewport = viewport;

        let (Some(policy), Some(current)) = (state.policy, state.descriptor.dimensions) else {
            return;
        };
        let refitted = match current.original {
            Some(original) => state.fit(original, policy).ok(),
            None => Some(state.placeholder(policy)),
        };
        if let Some(dimensions) = refitted {
            trace!(fitted = %dimensions.fitted, "Re-fitted embed for new viewport");
            state.descriptor.dimensions = Some(dimensions);
        }
    }

    /// Records that the presentation layer failed to render the media.
    pub fn report_load_error(&self) {
        let mut state = self.inner.state.lock();
        if !state.active {
            return;
        }
        let Some(uri) = state
            .descriptor
            .remote_uri
            .clone()
            .or_else(|| state.descriptor.link.clone())
        else {
            return;
        };

        warn!(uri = %uri, "Embed media failed to render");
        state.fail(EmbedError::fetch_failed(uri, "media failed to render"));
    }

    /// Stops the resolver. Pending completions are dropped.
    pub fn teardown(&self) {
        let mut state = self.inner.state.lock();
        state.active = false;
        state.in_flight.clear();
        match &state.stage {
            Stage::Resolving { key } => debug!(key = %key, "Abandoning media fetch"),
            Stage::Sizing { local_uri } => debug!(uri = %local_uri, "Abandoning size probe"),
            _ => {}
        }
        debug!(message_id = %self.inner.message_id, "Embed resolver torn down");
    }

    /// Returns true until [`teardown`](Self::teardown).
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.inner.state.lock().active
    }

    #[cfg(test)]
    pub(crate) fn known_images(&self) -> Vec<KnownImage> {
        self.inner.state.lock().known_images.clone()
    }

    /// Current phase and descriptor.
    #[must_use]
    pub fn snapshot(&self) -> EmbedSnapshot {
        let state = self.inner.state.lock();
        EmbedSnapshot {
            phase: state.stage.phase(),
            descriptor: state.descriptor.clone(),
        }
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> EmbedPhase {
        self.inner.state.lock().stage.phase()
    }

    /// Error that put the resolver into [`EmbedPhase::Error`].
    #[must_use]
    pub fn last_error(&self) -> Option<EmbedError> {
        match &self.inner.state.lock().stage {
            Stage::Error(error) => Some(error.clone()),
            _ => None,
        }
    }

    /// Link preview metadata for the current link, if any arrived.
    #[must_use]
    pub fn open_graph(&self) -> Option<OpenGraphData> {
        self.inner.state.lock().open_graph.clone()
    }

    /// File to open in a full-screen viewer for the cached image.
    ///
    /// Only image links and link preview images have one.
    #[must_use]
    pub fn preview_file(&self) -> Option<PreviewFile> {
        let state = self.inner.state.lock();
        let descriptor = &state.descriptor;
        let local_uri = descriptor.media_uri.clone()?;

        let caption = match &descriptor.kind {
            Classification::Image => remote_file_name(descriptor.effective_link()?).to_string(),
            Classification::Generic => CacheKey::file_name(descriptor.remote_uri.as_deref()?),
            Classification::YouTube { .. } | Classification::None => return None,
        };

        Some(PreviewFile {
            caption,
            local_uri,
            dimensions: descriptor.dimensions.and_then(|d| d.original),
        })
    }

    async fn run(&self, ticket: Ticket) {
        let Some(classified) = self.classify(&ticket).await else {
            return;
        };

        let step = {
            let mut state = self.inner.state.lock();
            if !state.accepts(&ticket) {
                trace!(link = %ticket.link, "Discarding stale classification");
                return;
            }
            debug!(link = %ticket.link, kind = %classified.kind, "Classified embed link");
            state.descriptor.kind = classified.kind;
            state.descriptor.expanded_link = classified.expanded;
            state.plan(&self.inner.message_id)
        };

        self.advance(ticket, step).await;
    }

    async fn classify(&self, ticket: &Ticket) -> Option<ClassifiedLink> {
        let shortener = self.inner.deps.shortener.clone();

        let (known_images, expansion) = {
            let mut state = self.inner.state.lock();
            if !state.accepts(ticket) {
                return None;
            }
            if let Some(cached) = state.classified.get(&ticket.link) {
                trace!(link = %ticket.link, "Using cached classification");
                return Some(cached.clone());
            }

            match first_pass(&ticket.link, &state.known_images, shortener.is_some()) {
                Ok(kind) => {
                    let classified = ClassifiedLink {
                        kind,
                        expanded: None,
                    };
                    state
                        .classified
                        .insert(ticket.link.clone(), classified.clone());
                    return Some(classified);
                }
                Err(reason) => {
                    debug!(reason = %reason, "Expanding link");
                    state.stage = Stage::AwaitingShortener;
                    let expansion = state
                        .expansions
                        .entry(ticket.link.clone())
                        .or_default()
                        .clone();
                    (state.known_images.clone(), expansion)
                }
            }
        };

        let expanded = match shortener {
            Some(shortener) => expansion
                .get_or_init(|| expand_once(shortener, ticket.link.clone()))
                .await
                .clone(),
            None => None,
        };

        let kind = match expanded.as_deref() {
            Some(target) => match LinkClassifier::classify(target, &known_images) {
                Classification::None => Classification::Generic,
                kind => kind,
            },
            None => Classification::Generic,
        };
        let classified = ClassifiedLink { kind, expanded };

        let mut state = self.inner.state.lock();
        if !state.active {
            return None;
        }
        state
            .classified
            .insert(ticket.link.clone(), classified.clone());
        Some(classified)
    }

    async fn advance(&self, ticket: Ticket, step: Step) {
        match step {
            Step::Done => {}
            Step::RequestOpenGraph(url) => {
                debug!(url = %url, "Requesting link preview");
                self.inner.deps.open_graph.request_metadata(&url);
            }
            Step::Fetch(request) => self.fetch(ticket, request).await,
        }
    }

    async fn fetch(&self, ticket: Ticket, request: MediaRequest) {
        if let Some(url) = request.prefetch.clone() {
            trace!(url = %url, "Prefetching");
            self.inner.deps.media_cache.prefetch(url);
        }

        let result = loop {
            let claim = {
                let mut state = self.inner.state.lock();
                if !state.accepts(&ticket) {
                    return;
                }
                state.policy = Some(request.policy);
                state.stage = Stage::Resolving {
                    key: request.key.clone(),
                };
                match state.in_flight.get(&request.key) {
                    Some(pending) if pending.has_changed().is_ok() => {
                        debug!(key = %request.key, "Fetch already in flight");
                        Claim::Join(pending.clone())
                    }
                    _ => {
                        let (tx, rx) = watch::channel(None);
                        state.in_flight.insert(request.key.clone(), rx);
                        Claim::Own(tx)
                    }
                }
            };

            match claim {
                Claim::Own(tx) => {
                    let guard = InFlightGuard {
                        state: &self.inner.state,
                        key: &request.key,
                        tx,
                    };
                    let result = self
                        .inner
                        .deps
                        .media_cache
                        .cache(&request.key, &request.remote_uri)
                        .await;
                    guard.finish(result.clone());
                    break result;
                }
                Claim::Join(mut pending) => {
                    let shared = pending
                        .wait_for(Option::is_some)
                        .await
                        .ok()
                        .and_then(|outcome| (*outcome).clone());
                    match shared {
                        Some(result) => break result,
                        None => trace!(key = %request.key, "In-flight fetch abandoned, retrying"),
                    }
                }
            }
        };

        let local_uri = {
            let mut state = self.inner.state.lock();
            if !state.accepts(&ticket) {
                trace!(key = %request.key, "Discarding stale fetch");
                return;
            }
            match result {
                Ok(local_uri) => {
                    state.descriptor.media_uri = Some(local_uri.clone());
                    state.stage = Stage::Sizing {
                        local_uri: local_uri.clone(),
                    };
                    local_uri
                }
                Err(e) => {
                    warn!(url = %request.remote_uri, error = %e, "Failed to cache embed media");
                    state.fail(EmbedError::fetch_failed(&request.remote_uri, e.to_string()));
                    return;
                }
            }
        };

        let size = self
            .inner
            .dimensions
            .resolve_dimensions(&local_uri, DimensionSource::select(request.declared))
            .await;

        let mut state = self.inner.state.lock();
        if !state.accepts(&ticket) {
            trace!(uri = %local_uri, "Discarding stale size");
            return;
        }
        match size.and_then(|original| state.fit(original, request.policy)) {
            Ok(dimensions) => {
                debug!(
                    link = %ticket.link,
                    fitted = %dimensions.fitted,
                    "Embed ready"
                );
                state.descriptor.dimensions = Some(dimensions);
                state.stage = Stage::Ready;
            }
            Err(e) => {
                warn!(uri = %local_uri, error = %e, "Failed to size embed media");
                state.fail(e);
            }
        }
    }
}

impl std::fmt::Debug for EmbedResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbedResolver")
            .field("message_id", &self.inner.message_id)
            .field("phase", &self.phase())
            .finish_non_exhaustive()
    }
}

/// Classifies without expanding. A generic link is ambiguous while an
/// expander could still turn it into media.
fn first_pass(
    link: &str,
    known_images: &[KnownImage],
    can_expand: bool,
) -> Result<Classification, EmbedError> {
    match LinkClassifier::classify(link, known_images) {
        Classification::Generic if can_expand => Err(EmbedError::ClassificationAmbiguous {
            link: link.to_string(),
        }),
        kind => Ok(kind),
    }
}

async fn expand_once(shortener: Arc<dyn LinkShortenerPort>, link: String) -> Option<String> {
    match shortener.expand(&link).await {
        Ok(Some(expanded)) if expanded != link => {
            debug!(link = %link, expanded = %expanded, "Expanded link");
            Some(expanded)
        }
        Ok(_) => None,
        Err(e) => {
            warn!(link = %link, error = %e, "Link expansion failed");
            None
        }
    }
}
