//! Structured extraction from a single article page.

use crate::error::{CrawlError, Result};
use crate::models::{ArticleData, Hrefs, Source};
use crate::social::classify;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, instrument};

static ARTICLE_ROOT: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".article-itself").expect("valid article selector"));
static LIKES_COUNTER: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".cosmo-likes__count").expect("valid counter selector"));
static SINGLE_IMAGE_BLOCK: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".article-image_single").expect("valid image block selector"));
static SOURCE_CAPTION: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".article-image__source").expect("valid caption selector"));
static IMAGE: Lazy<Selector> = Lazy::new(|| Selector::parse("img").expect("valid img selector"));

/// Attribute holding the high resolution variant of an image.
const PHOTO_ATTR: &str = "data-src-retina";

/// Extract the likes counter and every credited photo from an article.
///
/// Only single-image blocks carrying a source caption are read, so collages
/// and the header image are never captured. Sources are returned exactly as
/// classified, `Other` included; dropping them is up to the caller.
///
/// # Errors
///
/// [`CrawlError::Parse`] when the likes counter is missing or its text is not
/// a non-negative base-10 integer.
#[instrument(level = "debug", skip_all, fields(%href))]
pub fn extract(document: &Html, href: &str) -> Result<ArticleData> {
    let root = article_root(document);

    let counter = root
        .select(&LIKES_COUNTER)
        .next()
        .ok_or_else(|| CrawlError::parse(href, "likes counter not found"))?;
    let counter_text = counter.text().collect::<String>();
    let cosmo_likes = counter_text.trim().parse::<u64>().map_err(|e| {
        CrawlError::parse(href, format!("likes counter {counter_text:?} is not a number: {e}"))
    })?;

    let sources: Vec<Source> = root
        .select(&SINGLE_IMAGE_BLOCK)
        .filter_map(image_source)
        .collect();

    debug!(cosmo_likes, sources = sources.len(), "Extracted article");
    Ok(ArticleData {
        href: href.to_string(),
        cosmo_likes,
        sources,
    })
}

/// The article body when present, otherwise the whole document.
fn article_root(document: &Html) -> ElementRef<'_> {
    document
        .select(&ARTICLE_ROOT)
        .next()
        .unwrap_or_else(|| document.root_element())
}

fn image_source(block: ElementRef<'_>) -> Option<Source> {
    let caption = block.select(&SOURCE_CAPTION).next()?;
    let page = caption.text().collect::<String>().trim().to_string();

    let photo = block
        .select(&IMAGE)
        .next()
        .and_then(|img| img.value().attr(PHOTO_ATTR).or_else(|| img.value().attr("src")))
        .unwrap_or_default()
        .to_string();

    let social_media = classify(&page);
    Some(Source {
        hrefs: Hrefs { page, photo },
        social_media,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::social::SocialMedia;

    const HREF: &str = "https://www.cosmo.ru/stars/news/42/";

    fn article(likes: &str, body: &str) -> Html {
        Html::parse_document(&format!(
            r#"<html><body>
                <div class="article-itself">
                    <div class="cosmo-likes"><span class="cosmo-likes__count"> {likes} </span></div>
                    {body}
                </div>
            </body></html>"#
        ))
    }

    fn single_image(photo: &str, caption: Option<&str>) -> String {
        let caption = caption
            .map(|c| format!(r#"<div class="article-image__source">{c}</div>"#))
            .unwrap_or_default();
        format!(
            r#"<figure class="article-image article-image_single">
                <img src="{photo}-small.jpg" data-src-retina="{photo}@2x.jpg">
                {caption}
            </figure>"#
        )
    }

    #[test]
    fn test_extracts_counter_and_sources() {
        let body = [
            single_image("https://cdn/a", Some("instagram.com/star_a")),
            single_image("https://cdn/b", Some("Legion-Media")),
            single_image("https://cdn/c", Some("vk.com/star_c")),
        ]
        .join("\n");
        let data = extract(&article("128", &body), HREF).unwrap();

        assert_eq!(data.href, HREF);
        assert_eq!(data.cosmo_likes, 128);
        assert_eq!(data.sources.len(), 3);
        assert_eq!(data.sources[0].hrefs.page, "instagram.com/star_a");
        assert_eq!(data.sources[0].hrefs.photo, "https://cdn/a@2x.jpg");
        assert_eq!(data.sources[0].social_media, SocialMedia::Instagram);
        // Other is kept by the extractor
        assert_eq!(data.sources[1].social_media, SocialMedia::Other);
        assert_eq!(data.sources[2].social_media, SocialMedia::Vkontakte);
    }

    #[test]
    fn test_blocks_without_caption_are_skipped() {
        let body = [
            single_image("https://cdn/a", None),
            single_image("https://cdn/b", Some("facebook.com/b")),
        ]
        .join("\n");
        let data = extract(&article("0", &body), HREF).unwrap();
        assert_eq!(data.sources.len(), 1);
        assert_eq!(data.sources[0].hrefs.photo, "https://cdn/b@2x.jpg");
    }

    #[test]
    fn test_collage_blocks_are_ignored() {
        let body = r#"<div class="article-image article-image_collage">
                <img data-src-retina="https://cdn/x@2x.jpg">
                <img data-src-retina="https://cdn/y@2x.jpg">
                <div class="article-image__source">instagram.com/x</div>
            </div>"#;
        let data = extract(&article("3", body), HREF).unwrap();
        assert!(data.sources.is_empty());
    }

    #[test]
    fn test_photo_falls_back_to_src() {
        let body = r#"<figure class="article-image_single">
                <img src="https://cdn/plain.jpg">
                <div class="article-image__source">vk.com/plain</div>
            </figure>"#;
        let data = extract(&article("1", body), HREF).unwrap();
        assert_eq!(data.sources[0].hrefs.photo, "https://cdn/plain.jpg");
    }

    #[test]
    fn test_missing_counter_is_parse_error() {
        let doc = Html::parse_document(
            r#"<html><body><div class="article-itself"><p>text</p></div></body></html>"#,
        );
        let err = extract(&doc, HREF).unwrap_err();
        assert!(matches!(err, CrawlError::Parse { .. }));
        assert!(err.to_string().contains("likes counter not found"));
    }

    #[test]
    fn test_non_numeric_counter_is_parse_error() {
        let err = extract(&article("12k", ""), HREF).unwrap_err();
        assert!(matches!(err, CrawlError::Parse { ref href, .. } if href == HREF));

        let err = extract(&article("-4", ""), HREF).unwrap_err();
        assert!(matches!(err, CrawlError::Parse { .. }));
    }

    #[test]
    fn test_without_article_root_uses_whole_document() {
        let doc = Html::parse_document(&format!(
            r#"<html><body><span class="cosmo-likes__count">9</span>{}</body></html>"#,
            single_image("https://cdn/z", Some("instagram.com/z"))
        ));
        let data = extract(&doc, HREF).unwrap();
        assert_eq!(data.cosmo_likes, 9);
        assert_eq!(data.sources.len(), 1);
    }
}
