use super::app_config::LogLevel;
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "oxiembed",
    version,
    about = "Resolves chat message links into sized embeds",
    long_about = None
)]
pub struct CliArgs {
    /// Link to resolve.
    pub link: String,

    /// Message the link belongs to.
    #[arg(long, default_value = "cli")]
    pub message_id: String,

    /// Device width in points.
    #[arg(long, default_value_t = 400)]
    pub device_width: u32,

    /// Device height in points.
    #[arg(long, default_value_t = 800)]
    pub device_height: u32,

    /// Render as a reply.
    #[arg(long)]
    pub reply: bool,

    /// Read OpenGraph metadata from a JSON file instead of fetching it.
    #[arg(long, value_name = "PATH")]
    pub open_graph: Option<PathBuf>,

    /// Play the video if the link is a YouTube link.
    #[arg(long)]
    pub play: bool,

    /// Configuration file path.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Log file path.
    #[arg(long, value_name = "PATH")]
    pub log_path: Option<PathBuf>,

    /// Log verbosity level.
    #[arg(long, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Media cache directory.
    #[arg(long, value_name = "PATH")]
    pub cache_dir: Option<PathBuf>,

    /// Show OpenGraph cards for generic links.
    #[arg(long)]
    pub link_previews: Option<bool>,

    /// Expand shortened links.
    #[arg(long)]
    pub expand_short_links: Option<bool>,

    /// Network timeout in seconds.
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Enable desktop notifications.
    #[arg(long)]
    pub notifications: Option<bool>,

    /// Video player executable.
    #[arg(long)]
    pub player: Option<String>,
}
