//! Media caching infrastructure.
//!
//! This module provides:
//! - A size-bounded disk store keyed by cache key
//! - An LRU of probed media sizes
//! - The download gateway behind [`MediaCachePort`](crate::domain::ports::MediaCachePort)

pub mod disk_cache;
pub mod gateway;
pub mod memory_cache;
pub mod size_probe;

pub use disk_cache::DiskMediaCache;
pub use gateway::{MediaCacheConfig, MediaCacheGateway};
pub use memory_cache::{CacheStats, MemorySizeCache};
pub use size_probe::ImageSizeProbe;
