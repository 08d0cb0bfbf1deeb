//! Command-line interface definitions for cosmo_stars.
//!
//! Every flag is optional. Values given here override the YAML config file,
//! which in turn overrides the built-in defaults (see [`crate::config`]).

use clap::Parser;
use std::path::PathBuf;

/// Command-line arguments for a single crawl run.
///
/// # Examples
///
/// ```sh
/// # Crawl with the defaults, store in ./data
/// cosmo_stars
///
/// # Render the listing through Browserless and scroll 30 times
/// cosmo_stars --browserless-url http://localhost:3000 --scroll-steps 30
///
/// # Use a config file and a different store directory
/// cosmo_stars -c crawl.yaml -s /var/lib/cosmo_stars
/// ```
#[derive(Parser, Debug, Default)]
#[command(author, version, about)]
pub struct Cli {
    /// Optional path to a YAML config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Directory holding recorded.json and excluded.json
    #[arg(short, long)]
    pub store_dir: Option<PathBuf>,

    /// Rubric text an article must be tagged with
    #[arg(long)]
    pub category: Option<String>,

    /// Site origin used to resolve relative links
    #[arg(long)]
    pub base_url: Option<String>,

    /// Number of articles fetched concurrently per block
    #[arg(short, long)]
    pub block_size: Option<usize>,

    /// How many times the listing page is scrolled before it is read
    #[arg(long)]
    pub scroll_steps: Option<u32>,

    /// Pause after each scroll, in milliseconds
    #[arg(long)]
    pub scroll_wait_ms: Option<u64>,

    /// Process at most this many new articles
    #[arg(long)]
    pub max_articles: Option<usize>,

    /// Browserless endpoint used to render the listing page
    #[arg(long, env = "BROWSERLESS_URL")]
    pub browserless_url: Option<String>,

    /// Browserless API token
    #[arg(long, env = "BROWSERLESS_TOKEN", hide_env_values = true)]
    pub browserless_token: Option<String>,
}
