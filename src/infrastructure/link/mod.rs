//! Link expansion.

pub mod shortener;

pub use shortener::{HttpLinkShortener, resolve_location};
