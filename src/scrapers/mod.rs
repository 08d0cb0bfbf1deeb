//! Markup scrapers for the cosmo.ru listing and article pages.
//!
//! Scraping happens in two phases, mirroring the pipeline:
//!
//! 1. **Discovery**: [`listing::discover`] walks the rendered listing page and
//!    returns the absolute URLs of every link block tagged with the wanted
//!    rubric.
//! 2. **Extraction**: [`article::extract`] turns one fetched article into an
//!    [`ArticleData`](crate::models::ArticleData) record.
//!
//! # Markup conventions
//!
//! | What | Selector |
//! |------|----------|
//! | Listing link block | `.news-section-link` |
//! | Rubric inside a block | `.rubric` |
//! | Article body | `.article-itself` |
//! | Likes counter | `.cosmo-likes__count` |
//! | Single-image block | `.article-image_single` |
//! | Photo credit caption | `.article-image__source` |
//!
//! Both functions are synchronous and pure: they only see markup that was
//! already retrieved, so they can be tested against fixtures.

pub mod article;
pub mod listing;
