//! The crawl pipeline.
//!
//! One [`Pipeline::run`] performs a single incremental pass:
//!
//! 1. **Load** the dedup store
//! 2. **Render** the listing page (scrolled to reveal lazy entries)
//! 3. **Discover** links tagged with the configured rubric
//! 4. **Fetch** links the store has never seen, block by block
//! 5. **Extract** each article and keep sources that name a known platform
//! 6. **Merge** recorded and excluded hrefs into the store and persist it
//!
//! Articles whose markup cannot be parsed are logged and skipped without being
//! excluded, so the next run tries them again. Fetch failures behave the same
//! way. Only a store that cannot be read or written aborts the run.

use crate::config::Settings;
use crate::error::Result;
use crate::fetch::{Fetcher, fetch_all};
use crate::models::{ArticleData, FetchedPage};
use crate::notifier::Notifier;
use crate::render::Renderer;
use crate::scrapers::{article, listing};
use crate::store::DedupStore;
use itertools::Itertools;
use scraper::Html;
use tracing::{error, info, instrument};
use url::Url;

/// Counters describing one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Category links found on the listing page.
    pub discovered: usize,
    /// Links scheduled for fetching after dedup and the article cap.
    pub scheduled: usize,
    /// Pages fetched successfully.
    pub fetched: usize,
    /// Articles newly recorded.
    pub recorded: usize,
    /// Articles fetched but crediting no known platform.
    pub excluded: usize,
    /// Articles whose markup could not be parsed.
    pub parse_failures: usize,
    pub total_recorded: usize,
    pub total_excluded: usize,
}

/// Outcome of extracting a batch of fetched pages.
#[derive(Debug, Default)]
struct Extraction {
    usable: Vec<ArticleData>,
    unusable: Vec<String>,
    failed: usize,
}

#[derive(Debug)]
pub struct Pipeline<R, F> {
    renderer: R,
    fetcher: F,
    settings: Settings,
}

impl<R: Renderer, F: Fetcher> Pipeline<R, F> {
    pub fn new(renderer: R, fetcher: F, settings: Settings) -> Self {
        Self {
            renderer,
            fetcher,
            settings,
        }
    }

    /// Run one incremental pass and persist the merged store.
    #[instrument(level = "info", skip_all, fields(category = %self.settings.category))]
    pub async fn run(&self, notifier: &Notifier) -> Result<RunSummary> {
        let store_dir = &self.settings.store_dir;
        let store = DedupStore::load(store_dir).await?;
        notifier.say(&format!(
            "store loaded: {} recorded, {} excluded",
            store.recorded.len(),
            store.excluded.len()
        ));

        let listing_url = self.settings.listing_url()?;
        let markup = self
            .renderer
            .render(
                listing_url.as_str(),
                self.settings.scroll_steps,
                self.settings.scroll_wait(),
            )
            .await?;
        notifier.say("listing page received");

        let links = discover_links(&markup, &self.settings.category, &self.settings.base()?);
        let seen = store.seen();
        let mut pending: Vec<String> = links
            .iter()
            .filter(|link| !seen.contains(link.as_str()))
            .cloned()
            .collect();
        if let Some(max) = self.settings.max_articles {
            pending.truncate(max);
        }
        notifier.say(&format!(
            "{} category links, {} new",
            links.len(),
            pending.len()
        ));

        let pages = fetch_all(
            &self.fetcher,
            &pending,
            &seen,
            self.settings.block_size,
            notifier,
        )
        .await;
        notifier.say(&format!("{} articles received", pages.len()));

        let extraction = extract_articles(&pages, notifier);
        let mut summary = RunSummary {
            discovered: links.len(),
            scheduled: pending.len(),
            fetched: pages.len(),
            recorded: extraction.usable.len(),
            excluded: extraction.unusable.len(),
            parse_failures: extraction.failed,
            ..RunSummary::default()
        };

        let store = store.absorb(extraction.usable, extraction.unusable);
        store.persist(store_dir).await?;
        summary.total_recorded = store.recorded.len();
        summary.total_excluded = store.excluded.len();

        notifier.say(&format!(
            "DONE: {} recorded, {} excluded",
            summary.total_recorded, summary.total_excluded
        ));
        info!(?summary, "Run complete");
        Ok(summary)
    }
}

fn discover_links(markup: &str, category: &str, base: &Url) -> Vec<String> {
    let document = Html::parse_document(markup);
    listing::discover(&document, category, base)
}

/// Comma-separated platforms of an article's sources, in document order.
fn platforms(article: &ArticleData) -> String {
    article
        .sources
        .iter()
        .map(|s| s.social_media)
        .join(", ")
}

/// Extract every page and split the results into usable records, hrefs to
/// exclude, and a count of pages that failed to parse.
fn extract_articles(pages: &[FetchedPage], notifier: &Notifier) -> Extraction {
    let mut extraction = Extraction::default();

    for page in pages {
        let document = Html::parse_document(&page.markup);
        match article::extract(&document, &page.url) {
            Ok(data) => match data.into_usable() {
                Some(usable) => {
                    notifier.say(&format!(
                        "{}: {} likes, sources: {}",
                        page.url,
                        usable.cosmo_likes,
                        platforms(&usable)
                    ));
                    extraction.usable.push(usable);
                }
                None => {
                    notifier.say(&format!("{}: no social sources", page.url));
                    extraction.unusable.push(page.url.clone());
                }
            },
            Err(e) => {
                error!(url = %page.url, error = %e, "Article markup not understood; skipping");
                extraction.failed += 1;
            }
        }
    }

    extraction
}
