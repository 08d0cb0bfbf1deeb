//! Link discovery on the news listing page.

use itertools::Itertools;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use tracing::{debug, info, instrument};
use url::Url;

static LINK_BLOCK: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".news-section-link").expect("valid link block selector"));
static RUBRIC: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".rubric").expect("valid rubric selector"));

/// Collect the article URLs whose rubric mentions `category_label`.
///
/// Link blocks are visited in document order. A block is kept when the text
/// of its rubric element contains `category_label` verbatim (no case folding,
/// no normalization). Its `href` is resolved against `base_url`.
///
/// Blocks without a rubric, without an `href`, or with an href that cannot be
/// resolved are skipped. A link repeated on the page is returned once, at
/// its first position. No match yields an empty list.
#[instrument(level = "info", skip_all, fields(%category_label, base = %base_url))]
pub fn discover(document: &Html, category_label: &str, base_url: &Url) -> Vec<String> {
    let mut links = Vec::new();
    let mut blocks_seen = 0usize;

    for block in document.select(&LINK_BLOCK) {
        blocks_seen += 1;

        let in_category = block
            .select(&RUBRIC)
            .next()
            .map(|rubric| rubric.text().collect::<String>().contains(category_label))
            .unwrap_or(false);
        if !in_category {
            continue;
        }

        let Some(href) = block.value().attr("href") else {
            debug!("Category block has no href; skipping");
            continue;
        };

        match base_url.join(href) {
            Ok(resolved) => links.push(resolved.to_string()),
            Err(e) => debug!(%href, error = %e, "Could not resolve link; skipping"),
        }
    }

    // the same article is often linked from more than one block
    let links: Vec<String> = links.into_iter().unique().collect();

    info!(blocks = blocks_seen, matched = links.len(), "Discovered category links");
    debug!(links = ?links, "Category links");
    links
}
