//! # cosmo_stars
//!
//! An incremental crawler for the cosmo.ru news listing. Each run follows the
//! links of one rubric ("Звезды" by default), extracts the likes counter and
//! the social-media photo credits of every new article, and merges the result
//! into a small JSON store so that later runs only fetch what they have never
//! seen.
//!
//! ## Usage
//!
//! ```sh
//! cosmo_stars --store-dir ./data --browserless-url http://localhost:3000
//! ```
//!
//! ## Architecture
//!
//! 1. **Rendering**: the listing page is scrolled in a headless browser so lazy
//!    entries load
//! 2. **Discovery**: links tagged with the rubric are collected
//! 3. **Fetching**: unseen links are fetched in sequential blocks (20 at a time)
//! 4. **Extraction**: likes and photo credits are read from each article
//! 5. **Storage**: `recorded.json` and `excluded.json` are merged and rewritten

use clap::Parser;
use std::error::Error;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;
mod config;
mod error;
mod fetch;
mod models;
mod notifier;
mod pipeline;
mod render;
mod scrapers;
mod social;
mod store;
mod utils;

use cli::Cli;
use config::Settings;
use fetch::HttpFetcher;
use notifier::Notifier;
use pipeline::{Pipeline, RunSummary};
use render::{BrowserlessRenderer, FetchRenderer};
use utils::ensure_writable_dir;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    info!("cosmo_stars starting up");

    let args = Cli::parse();
    debug!(?args.config, ?args.store_dir, "Parsed CLI arguments");

    let settings = Settings::resolve(&args).await?;

    // Early check: fail before any network work if the store cannot be written
    if let Err(e) = ensure_writable_dir(&settings.store_dir).await {
        error!(
            path = %settings.store_dir.display(),
            error = %e,
            "Store directory is not writable (fix perms or choose a different path)"
        );
        return Err(e.into());
    }

    let notifier = Notifier::start();
    let fetcher = HttpFetcher::new(settings.request_timeout(), &settings.user_agent)?;

    let summary = match settings.browserless_url.clone() {
        Some(endpoint) => {
            let renderer = BrowserlessRenderer::new(
                &endpoint,
                settings.browserless_token.as_deref(),
                settings.render_timeout(),
            )?;
            Pipeline::new(renderer, fetcher, settings).run(&notifier).await
        }
        None => {
            warn!("BROWSERLESS_URL not set; the listing will not be scrolled");
            let renderer = FetchRenderer::new(fetcher.clone());
            Pipeline::new(renderer, fetcher, settings).run(&notifier).await
        }
    };

    match summary {
        Ok(summary) => {
            report(&summary, &notifier);
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Run failed; store left untouched");
            Err(e.into())
        }
    }
}

fn report(summary: &RunSummary, notifier: &Notifier) {
    let elapsed = notifier.elapsed();
    info!(
        discovered = summary.discovered,
        scheduled = summary.scheduled,
        fetched = summary.fetched,
        recorded = summary.recorded,
        excluded = summary.excluded,
        parse_failures = summary.parse_failures,
        total_recorded = summary.total_recorded,
        total_excluded = summary.total_excluded,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );
}
