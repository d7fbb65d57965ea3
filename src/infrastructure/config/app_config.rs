//! Application configuration.

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::args::CliArgs;
use crate::infrastructure::media::MediaCacheConfig;
use crate::infrastructure::media::disk_cache::DEFAULT_MAX_CACHE_SIZE;
use crate::infrastructure::media::memory_cache::DEFAULT_CACHE_SIZE;
use crate::infrastructure::player::DEFAULT_PLAYER;

pub(super) const APP_NAME: &str = "oxiembed";
pub(super) const APP_QUALIFIER: &str = "com";
pub(super) const APP_ORGANIZATION: &str = "linuxmobile";

/// Log level configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace level.
    Trace,
    /// Debug level.
    Debug,
    /// Info level.
    #[default]
    Info,
    /// Warning level.
    Warn,
    /// Error level.
    Error,
}

impl LogLevel {
    /// Converts to tracing level.
    #[must_use]
    pub const fn to_tracing_level(self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Trace => write!(f, "trace"),
            Self::Debug => write!(f, "debug"),
            Self::Info => write!(f, "info"),
            Self::Warn => write!(f, "warn"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Application configuration.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Configuration file path.
    #[serde(skip)]
    pub config: Option<PathBuf>,

    /// Log file path.
    #[serde(skip)]
    pub log_path: Option<PathBuf>,

    /// Log verbosity level.
    #[serde(default)]
    pub log_level: LogLevel,

    /// Embed behaviour.
    #[serde(default)]
    pub embeds: EmbedsConfig,

    /// Media cache limits.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Notification configuration.
    #[serde(default)]
    pub notifications: NotificationsConfig,

    /// Video player configuration.
    #[serde(default)]
    pub player: PlayerConfig,
}

/// Embed behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbedsConfig {
    /// Show OpenGraph cards for generic links.
    #[serde(default = "default_true")]
    pub link_previews: bool,

    /// Expand shortened links before classifying them.
    #[serde(default = "default_true")]
    pub expand_short_links: bool,

    /// Seconds to wait for OpenGraph metadata.
    #[serde(default = "default_open_graph_timeout")]
    pub open_graph_timeout_secs: u64,
}

impl Default for EmbedsConfig {
    fn default() -> Self {
        Self {
            link_previews: true,
            expand_short_links: true,
            open_graph_timeout_secs: default_open_graph_timeout(),
        }
    }
}

/// Media cache limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Cache directory. Defaults to the project cache dir.
    #[serde(default)]
    pub dir: Option<PathBuf>,

    /// Maximum disk cache size in bytes.
    #[serde(default = "default_max_disk_bytes")]
    pub max_disk_bytes: u64,

    /// Maximum probed sizes kept in memory.
    #[serde(default = "default_memory_entries")]
    pub memory_entries: usize,

    /// Maximum concurrent downloads.
    #[serde(default = "default_max_concurrent_downloads")]
    pub max_concurrent_downloads: usize,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: None,
            max_disk_bytes: default_max_disk_bytes(),
            memory_entries: default_memory_entries(),
            max_concurrent_downloads: default_max_concurrent_downloads(),
            timeout_secs: default_timeout(),
        }
    }
}

impl CacheConfig {
    /// Settings for the media cache gateway.
    #[must_use]
    pub fn to_media_config(&self) -> MediaCacheConfig {
        MediaCacheConfig {
            memory_entries: self.memory_entries,
            max_disk_bytes: self.max_disk_bytes,
            max_concurrent_downloads: self.max_concurrent_downloads,
            timeout_secs: self.timeout_secs,
        }
    }
}

/// Notification configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationsConfig {
    /// Enable desktop notifications.
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Video player configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerConfig {
    /// Player executable.
    #[serde(default = "default_player")]
    pub command: String,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            command: default_player(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_open_graph_timeout() -> u64 {
    10
}

fn default_max_disk_bytes() -> u64 {
    DEFAULT_MAX_CACHE_SIZE
}

fn default_memory_entries() -> usize {
    DEFAULT_CACHE_SIZE
}

fn default_max_concurrent_downloads() -> usize {
    4
}

fn default_timeout() -> u64 {
    30
}

fn default_player() -> String {
    DEFAULT_PLAYER.to_string()
}

impl AppConfig {
    /// Merges CLI arguments into the configuration.
    pub fn merge_with_args(&mut self, args: &CliArgs) {
        if let Some(config_path) = &args.config {
            self.config = Some(config_path.clone());
        }
        if let Some(log_path) = &args.log_path {
            self.log_path = Some(log_path.clone());
        }
        if let Some(log_level) = args.log_level {
            self.log_level = log_level;
        }
        if let Some(link_previews) = args.link_previews {
            self.embeds.link_previews = link_previews;
        }
        if let Some(expand) = args.expand_short_links {
            self.embeds.expand_short_links = expand;
        }
        if let Some(cache_dir) = &args.cache_dir {
            self.cache.dir = Some(cache_dir.clone());
        }
        if let Some(timeout) = args.timeout {
            self.cache.timeout_secs = timeout;
            self.embeds.open_graph_timeout_secs = timeout;
        }
        if let Some(notifications) = args.notifications {
            self.notifications.enabled = notifications;
        }
        if let Some(player) = &args.player {
            self.player.command.clone_from(player);
        }
    }

    /// Returns default config directory.
    #[must_use]
    pub fn default_config_dir() -> Option<PathBuf> {
        ProjectDirs::from(APP_QUALIFIER, APP_ORGANIZATION, APP_NAME)
            .map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Returns default config file path.
    #[must_use]
    pub fn default_config_path() -> Option<PathBuf> {
        Self::default_config_dir().map(|dir| dir.join("config.toml"))
    }

    /// Returns default log file path.
    #[must_use]
    pub fn default_log_path() -> Option<PathBuf> {
        ProjectDirs::from(APP_QUALIFIER, APP_ORGANIZATION, APP_NAME)
            .map(|dirs| dirs.data_dir().join("oxiembed.log"))
    }

    /// Returns default media cache directory.
    #[must_use]
    pub fn default_cache_dir() -> Option<PathBuf> {
        ProjectDirs::from(APP_QUALIFIER, APP_ORGANIZATION, APP_NAME)
            .map(|dirs| dirs.cache_dir().join("media"))
    }

    /// Returns effective config path.
    #[must_use]
    pub fn effective_config_path(&self) -> Option<PathBuf> {
        self.config.clone().or_else(Self::default_config_path)
    }

    /// Returns effective log path.
    #[must_use]
    pub fn effective_log_path(&self) -> Option<PathBuf> {
        self.log_path.clone().or_else(Self::default_log_path)
    }

    /// Returns effective media cache directory, falling back to the system temp dir.
    #[must_use]
    pub fn effective_cache_dir(&self) -> PathBuf {
        self.cache
            .dir
            .clone()
            .or_else(Self::default_cache_dir)
            .unwrap_or_else(|| std::env::temp_dir().join("oxiembed-media"))
    }
}
