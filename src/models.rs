//! Data models for crawled articles and the sources they credit.
//!
//! This module defines the records persisted by the dedup store:
//! - [`ArticleData`]: one processed article keyed by its href
//! - [`Source`]: one photo credit found in an article
//! - [`Hrefs`]: the pair of links that make up a credit
//!
//! plus [`FetchedPage`], the raw markup handed from the fetch scheduler to the
//! extractor. Field names are camelCase on the wire to stay compatible with
//! stores written by earlier versions of the crawler.

use crate::social::SocialMedia;
use serde::{Deserialize, Serialize};

/// Raw markup retrieved for one URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    pub url: String,
    pub markup: String,
}

/// Links found in a single image block.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Hrefs {
    /// The credited page, exactly as written in the caption.
    pub page: String,
    /// URL of the image asset.
    pub photo: String,
}

/// One photo credit extracted from an article.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Source {
    pub hrefs: Hrefs,
    /// Derived from `hrefs.page`.
    pub social_media: SocialMedia,
}

/// One processed article.
///
/// `href` is the identity of the record: the store is keyed by it and it is
/// never fetched again once recorded or excluded.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleData {
    pub href: String,
    /// Value of the article's likes counter.
    pub cosmo_likes: u64,
    /// One entry per captioned single-image block, in document order.
    pub sources: Vec<Source>,
}

impl ArticleData {
    /// Drop provisional `Other` sources.
    ///
    /// Returns `None` when nothing identifiable is left, meaning the article
    /// is not worth recording.
    pub fn into_usable(self) -> Option<ArticleData> {
        let sources: Vec<Source> = self
            .sources
            .into_iter()
            .filter(|s| s.social_media != SocialMedia::Other)
            .collect();

        if sources.is_empty() {
            None
        } else {
            Some(ArticleData { sources, ..self })
        }
    }
}
