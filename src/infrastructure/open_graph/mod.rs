//! OpenGraph metadata provider.

pub mod provider;

pub use provider::{HttpOpenGraphProvider, OpenGraphEvent, parse_open_graph};
