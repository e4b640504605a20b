//! BBC News source
//!
//! Links come from the public content-collection JSON API; article
//! pages are parsed from their HTML and JSON-LD block.

use axum::async_trait;
use serde::Deserialize;
use soup::prelude::*;

use super::source::{
    NewsSource, ScrapedArticle, absolute_link, fetch_text, invalid_listing, join_text, no_article,
    page_linked_data,
};
use crate::error::AppError;

const COLLECTION_URL: &str = "https://web-cdn.api.bbci.co.uk/xd/content-collection/07cedf01-f642-4b92-821f-d7b324b8ba73?page=0&size=20";
const SITE_URL: &str = "https://www.bbc.com";

#[derive(Debug, Deserialize)]
struct CollectionResponse {
    #[serde(default)]
    data: Vec<CollectionItem>,
}

#[derive(Debug, Deserialize)]
struct CollectionItem {
    path: String,
}

#[derive(Debug, Clone)]
pub struct BbcSource {
    collection_url: String,
    site_url: String,
}

impl Default for BbcSource {
    fn default() -> Self {
        Self::with_urls(COLLECTION_URL, SITE_URL)
    }
}

impl BbcSource {
    pub fn with_urls(collection_url: &str, site_url: &str) -> Self {
        Self {
            collection_url: collection_url.to_string(),
            site_url: site_url.trim_end_matches('/').to_string(),
        }
    }
}

/// Article links from a collection response, video pages excluded
pub fn parse_links(body: &str, site_url: &str) -> Result<Vec<String>, AppError> {
    let response: CollectionResponse =
        serde_json::from_str(body).map_err(|e| invalid_listing("BBC", e))?;

    Ok(response
        .data
        .into_iter()
        .map(|item| item.path)
        .filter(|path| !path.is_empty() && !path.contains("/news/videos/"))
        .map(|path| absolute_link(site_url, &path))
        .collect())
}

/// Parse an article page
///
/// Returns None when the page has no `<article>` headline, which is
/// the case for live pages and removed stories.
pub fn parse_article(html: &str, link: &str) -> Option<ScrapedArticle> {
    let soup = Soup::new(html);
    let article = soup.tag("article").find()?;

    let headline = article.tag("h1").find()?.text();
    if headline.trim().is_empty() {
        return None;
    }

    let story = join_text(
        article
            .tag("div")
            .attr("data-component", "text-block")
            .find_all(),
    );
    let data = page_linked_data(&soup, link);

    Some(ScrapedArticle {
        headline,
        story,
        source_link: link.to_string(),
        meta_description: data.description,
        image_link: data.image,
        published_at: data.published_at,
    })
}

#[async_trait]
impl NewsSource for BbcSource {
    fn name(&self) -> &'static str {
        "BBC News"
    }

    fn category(&self) -> &'static str {
        "World"
    }

    async fn latest_links(&self, http: &reqwest::Client) -> Result<Vec<String>, AppError> {
        tracing::info!(url = %self.collection_url, "Fetching BBC collection");
        let body = fetch_text(http, &self.collection_url, &[]).await?;
        parse_links(&body, &self.site_url)
    }

    async fn fetch_article(
        &self,
        http: &reqwest::Client,
        link: &str,
    ) -> Result<ScrapedArticle, AppError> {
        tracing::debug!(link, "Fetching BBC article");
        let html = fetch_text(http, link, &[]).await?;
        parse_article(&html, link).ok_or_else(|| no_article(link))
    }
}
