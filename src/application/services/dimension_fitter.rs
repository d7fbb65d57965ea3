//! Aspect-preserving image fitting.
//!
//! All scaling rounds with `f64::round`, so fitting an already fitted size is a
//! no-op.

use crate::domain::entities::{
    ImageDimensions, MAX_THUMBNAIL_HEIGHT, OffsetPolicy, Size, ViewportBudget,
};
use crate::domain::errors::EmbedError;

/// Fits `original_width` x `original_height` into `max_width`.
///
/// # Errors
/// Returns [`EmbedError::InvalidDimensions`] if either axis is zero.
pub fn fit(original_height: u32, original_width: u32, max_width: u32) -> Result<Size, EmbedError> {
    ensure_valid(original_height, original_width)?;

    if original_width <= max_width {
        return Ok(Size::new(original_width, original_height));
    }

    Ok(Size::new(
        max_width,
        scale(original_height, max_width, original_width),
    ))
}

/// Fits a video thumbnail: caps height at [`MAX_THUMBNAIL_HEIGHT`] first, then
/// fits the result into `max_width`.
///
/// # Errors
/// Returns [`EmbedError::InvalidDimensions`] if either axis is zero.
pub fn fit_video_thumbnail(
    original_height: u32,
    original_width: u32,
    max_width: u32,
) -> Result<Size, EmbedError> {
    ensure_valid(original_height, original_width)?;

    let mut width = f64::from(original_width);
    let mut height = f64::from(original_height);
    let cap = f64::from(MAX_THUMBNAIL_HEIGHT);
    let max = f64::from(max_width.max(1));

    if height > cap {
        width = width * cap / height;
        height = cap;
    }

    if width > max {
        height = height * max / width;
        width = max;
    }

    Ok(Size::new(round(width), round(height)))
}

/// Fits into both axes of a budget: width first, then height.
///
/// # Errors
/// Returns [`EmbedError::InvalidDimensions`] if either axis is zero.
pub fn fit_within(
    original_height: u32,
    original_width: u32,
    budget: ViewportBudget,
) -> Result<Size, EmbedError> {
    let fitted = fit(original_height, original_width, budget.max_width)?;
    if fitted.height <= budget.max_height {
        return Ok(fitted);
    }

    Ok(Size::new(
        scale(original_width, budget.max_height, original_height),
        budget.max_height,
    ))
}

/// Fits `original` according to the budget's policy.
///
/// # Errors
/// Returns [`EmbedError::InvalidDimensions`] if either axis is zero.
pub fn fit_to_budget(original: Size, budget: ViewportBudget) -> Result<ImageDimensions, EmbedError> {
    let fitted = match budget.policy {
        OffsetPolicy::VideoThumbnail => {
            fit_video_thumbnail(original.height, original.width, budget.max_width)?
        }
        OffsetPolicy::Embed | OffsetPolicy::OpenGraph => {
            fit_within(original.height, original.width, budget)?
        }
    };
    Ok(ImageDimensions::known(original, fitted))
}

const fn ensure_valid(height: u32, width: u32) -> Result<(), EmbedError> {
    if width == 0 || height == 0 {
        return Err(EmbedError::invalid_dimensions(width, height));
    }
    Ok(())
}

/// `value * numerator / denominator`, rounded.
fn scale(value: u32, numerator: u32, denominator: u32) -> u32 {
    round(f64::from(value) * f64::from(numerator) / f64::from(denominator))
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn round(value: f64) -> u32 {
    (value.round() as u32).max(1)
}
