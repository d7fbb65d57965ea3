//! Picks the preview image of a link card.

use tracing::trace;

use super::dimension_fitter;
use crate::domain::entities::{
    DeviceViewport, ImageDimensions, MAX_THUMBNAIL_HEIGHT, OffsetPolicy, OpenGraphImage, Size,
};

/// Image chosen for a link preview.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedImage {
    /// Uri to load (secure variant preferred).
    pub uri: String,
    /// Size the page declared for the image.
    pub declared: Option<Size>,
    /// Render dimensions: declared size fitted to the target width, or the
    /// target box itself when nothing was declared.
    pub dimensions: ImageDimensions,
}

/// Target box for preview images on this device.
#[must_use]
pub fn target_box(viewport: DeviceViewport) -> Size {
    let budget = viewport.budget(OffsetPolicy::OpenGraph);
    Size::new(budget.max_width, MAX_THUMBNAIL_HEIGHT)
}

/// Fits a preview image of size `original` into the target box's width.
///
/// Returns `None` for degenerate sizes.
#[must_use]
pub fn fit_candidate(original: Size, target: Size) -> Option<ImageDimensions> {
    dimension_fitter::fit(original.height, original.width, target.width)
        .ok()
        .map(|fitted| ImageDimensions::known(original, fitted))
}

/// Chooses the candidate whose declared size is nearest to `target`.
///
/// Candidates without a declared size only serve as a fallback when no
/// candidate declares one. Candidates without any uri are skipped. Ties keep
/// the earlier candidate.
#[must_use]
pub fn select_best_image(target: Size, candidates: &[OpenGraphImage]) -> Option<SelectedImage> {
    let nearest = candidates
        .iter()
        .filter(|c| c.uri().is_some())
        .filter_map(|c| c.declared_size().map(|size| (c, distance(size, target))))
        .fold(None::<(&OpenGraphImage, u64)>, |best, (candidate, dist)| match best {
            Some((_, best_dist)) if best_dist <= dist => best,
            _ => Some((candidate, dist)),
        })
        .map(|(candidate, _)| candidate);

    let chosen = nearest.or_else(|| candidates.iter().find(|c| c.uri().is_some()))?;
    let uri = chosen.uri()?.to_string();
    let declared = chosen.declared_size();

    let dimensions = declared
        .and_then(|size| fit_candidate(size, target))
        .unwrap_or(ImageDimensions {
            original: None,
            fitted: target,
        });

    trace!(uri = %uri, declared = ?declared, "Selected preview image");

    Some(SelectedImage {
        uri,
        declared,
        dimensions,
    })
}

fn distance(a: Size, b: Size) -> u64 {
    let dx = i64::from(a.width) - i64::from(b.width);
    let dy = i64::from(a.height) - i64::from(b.height);
    dx.unsigned_abs().pow(2) + dy.unsigned_abs().pow(2)
}
