//! CNN source
//!
//! Links are read from the world section page; article pages carry the
//! headline in `h1#maincontent` and the story in `.article__content`.

use axum::async_trait;
use soup::prelude::*;

use super::source::{
    NewsSource, ScrapedArticle, absolute_link, fetch_text, join_text, meta_content, no_article,
    page_linked_data, parse_timestamp,
};
use crate::error::AppError;

const SECTION_URL: &str = "https://edition.cnn.com/world";
const SITE_URL: &str = "https://edition.cnn.com";

#[derive(Debug, Clone)]
pub struct CnnSource {
    section_url: String,
    site_url: String,
}

impl Default for CnnSource {
    fn default() -> Self {
        Self::with_urls(SECTION_URL, SITE_URL)
    }
}

impl CnnSource {
    pub fn with_urls(section_url: &str, site_url: &str) -> Self {
        Self {
            section_url: section_url.to_string(),
            site_url: site_url.trim_end_matches('/').to_string(),
        }
    }
}

/// Links in the section's lead zone, interactive pages excluded
pub fn parse_links(html: &str, site_url: &str) -> Vec<String> {
    let soup = Soup::new(html);

    soup.tag("div")
        .class("zone__items")
        .class("layout--wide-left-balanced-2")
        .find_all()
        .flat_map(|zone| {
            zone.tag("a")
                .find_all()
                .filter_map(|anchor| anchor.get("href"))
                .collect::<Vec<_>>()
        })
        .map(|href| href.trim().to_string())
        .filter(|href| !href.is_empty() && !href.starts_with('#'))
        .map(|href| absolute_link(site_url, &href))
        .filter(|link| !link.contains("cnn.com/interactive"))
        .collect()
}

/// Parse an article page; None without a headline
pub fn parse_article(html: &str, link: &str) -> Option<ScrapedArticle> {
    let soup = Soup::new(html);

    let headline = soup.tag("h1").attr("id", "maincontent").find()?.text();
    if headline.trim().is_empty() {
        return None;
    }

    let story = soup
        .tag("div")
        .class("article__content")
        .find()
        .map(|content| {
            let paragraphs = join_text(content.tag("p").find_all());
            if paragraphs.is_empty() {
                content.text()
            } else {
                paragraphs
            }
        })
        .unwrap_or_default();

    let data = page_linked_data(&soup, link);
    let published_at = meta_content(&soup, "property", "article:published_time")
        .and_then(|date| parse_timestamp(&date))
        .or(data.published_at);

    Some(ScrapedArticle {
        headline,
        story,
        source_link: link.to_string(),
        meta_description: meta_content(&soup, "name", "description").or(data.description),
        image_link: meta_content(&soup, "property", "og:image").or(data.image),
        published_at,
    })
}

#[async_trait]
impl NewsSource for CnnSource {
    fn name(&self) -> &'static str {
        "CNN"
    }

    fn category(&self) -> &'static str {
        "World"
    }

    async fn latest_links(&self, http: &reqwest::Client) -> Result<Vec<String>, AppError> {
        tracing::info!(url = %self.section_url, "Fetching CNN section");
        let html = fetch_text(http, &self.section_url, &[]).await?;
        Ok(parse_links(&html, &self.site_url))
    }

    async fn fetch_article(
        &self,
        http: &reqwest::Client,
        link: &str,
    ) -> Result<ScrapedArticle, AppError> {
        tracing::debug!(link, "Fetching CNN article");
        let html = fetch_text(http, link, &[]).await?;
        parse_article(&html, link).ok_or_else(|| no_article(link))
    }
}
