//! Run settings.
//!
//! Settings are resolved in three layers, later layers winning:
//!
//! 1. built-in defaults ([`Settings::default`])
//! 2. an optional YAML file passed with `--config`
//! 3. command-line flags
//!
//! ```yaml
//! category: Звезды
//! base_url: https://www.cosmo.ru
//! listing_path: /news
//! block_size: 20
//! scroll_steps: 10
//! scroll_wait_ms: 1000
//! store_dir: ./data
//! ```

use crate::cli::Cli;
use crate::error::{CrawlError, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, instrument};
use url::Url;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Rubric text an article must carry to be followed.
    pub category: String,
    /// Origin that relative listing links are resolved against.
    pub base_url: String,
    /// Path of the listing page below `base_url`.
    pub listing_path: String,
    pub block_size: usize,
    pub scroll_steps: u32,
    pub scroll_wait_ms: u64,
    pub store_dir: PathBuf,
    pub request_timeout_secs: u64,
    pub user_agent: String,
    pub browserless_url: Option<String>,
    pub browserless_token: Option<String>,
    /// Cap on new articles per run; unlimited when unset.
    pub max_articles: Option<usize>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            category: "Звезды".to_string(),
            base_url: "https://www.cosmo.ru".to_string(),
            listing_path: "/news".to_string(),
            block_size: 20,
            scroll_steps: 10,
            scroll_wait_ms: 1000,
            store_dir: PathBuf::from("./data"),
            request_timeout_secs: 30,
            user_agent: concat!("cosmo_stars/", env!("CARGO_PKG_VERSION")).to_string(),
            browserless_url: None,
            browserless_token: None,
            max_articles: None,
        }
    }
}

impl Settings {
    /// Resolve settings from defaults, the optional config file and the CLI.
    #[instrument(level = "info", skip_all)]
    pub async fn resolve(cli: &Cli) -> Result<Self> {
        let base = match &cli.config {
            Some(path) => Self::from_file(path).await?,
            None => Self::default(),
        };
        let settings = base.with_overrides(cli);
        settings.validate()?;
        let listing = settings.listing_url()?;
        info!(
            category = %settings.category,
            %listing,
            block_size = settings.block_size,
            scroll_steps = settings.scroll_steps,
            store_dir = %settings.store_dir.display(),
            "Resolved settings"
        );
        Ok(settings)
    }

    pub async fn from_file(path: &Path) -> Result<Self> {
        let raw = tokio::fs::read_to_string(path).await?;
        Self::from_yaml(&raw)
            .map_err(|e| CrawlError::Config(format!("{}: {e}", path.display())))
    }

    fn from_yaml(raw: &str) -> std::result::Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(raw)
    }

    fn with_overrides(mut self, cli: &Cli) -> Self {
        if let Some(v) = &cli.store_dir {
            self.store_dir = v.clone();
        }
        if let Some(v) = &cli.category {
            self.category = v.clone();
        }
        if let Some(v) = &cli.base_url {
            self.base_url = v.clone();
        }
        if let Some(v) = cli.block_size {
            self.block_size = v;
        }
        if let Some(v) = cli.scroll_steps {
            self.scroll_steps = v;
        }
        if let Some(v) = cli.scroll_wait_ms {
            self.scroll_wait_ms = v;
        }
        if let Some(v) = cli.max_articles {
            self.max_articles = Some(v);
        }
        if let Some(v) = &cli.browserless_url {
            self.browserless_url = Some(v.clone());
        }
        if let Some(v) = &cli.browserless_token {
            self.browserless_token = Some(v.clone());
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.category.is_empty() {
            return Err(CrawlError::Config("category must not be empty".to_string()));
        }
        if self.block_size == 0 {
            return Err(CrawlError::Config("block_size must be at least 1".to_string()));
        }
        self.base()?;
        Ok(())
    }

    pub fn base(&self) -> Result<Url> {
        Url::parse(&self.base_url)
            .map_err(|e| CrawlError::Config(format!("base_url {:?}: {e}", self.base_url)))
    }

    pub fn listing_url(&self) -> Result<Url> {
        self.base()?
            .join(&self.listing_path)
            .map_err(|e| CrawlError::Config(format!("listing_path {:?}: {e}", self.listing_path)))
    }

    pub fn scroll_wait(&self) -> Duration {
        Duration::from_millis(self.scroll_wait_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Upper bound for one render: every scroll wait plus a request timeout.
    /// Saturates at [`Duration::MAX`] for absurd configurations.
    pub fn render_timeout(&self) -> Duration {
        self.scroll_wait()
            .checked_mul(self.scroll_steps)
            .unwrap_or(Duration::MAX)
            .saturating_add(self.request_timeout())
    }
}
