//! The Guardian source
//!
//! The most-read JSON lists world stories. Every article page has a
//! `.json` twin on the API host whose `html` field holds the rendered
//! article.

use axum::async_trait;
use serde::Deserialize;
use soup::prelude::*;

use super::source::{
    NewsSource, ScrapedArticle, fetch_text, invalid_listing, no_article, parse_timestamp,
};
use crate::error::AppError;

const MOST_READ_URL: &str =
    "https://api.nextgen.guardianapps.co.uk/most-read/world.json?_edition=INT&dcr=true";
const SITE_URL: &str = "https://www.theguardian.com";
const API_URL: &str = "https://api.nextgen.guardianapps.co.uk";

#[derive(Debug, Deserialize)]
struct MostReadResponse {
    #[serde(default)]
    tabs: Vec<MostReadTab>,
}

#[derive(Debug, Deserialize)]
struct MostReadTab {
    #[serde(default)]
    heading: String,
    #[serde(default)]
    trails: Vec<Trail>,
}

#[derive(Debug, Deserialize)]
struct Trail {
    url: String,
}

#[derive(Debug, Default, Deserialize)]
struct ArticleResponse {
    #[serde(default)]
    config: ArticleConfig,
    #[serde(default)]
    html: String,
}

#[derive(Debug, Default, Deserialize)]
struct ArticleConfig {
    #[serde(default)]
    page: PageConfig,
}

#[derive(Debug, Default, Deserialize)]
struct PageConfig {
    #[serde(default, rename = "isLive")]
    is_live: bool,
}

#[derive(Debug, Clone)]
pub struct GuardianSource {
    most_read_url: String,
    site_url: String,
    api_url: String,
}

impl Default for GuardianSource {
    fn default() -> Self {
        Self::with_urls(MOST_READ_URL, SITE_URL, API_URL)
    }
}

impl GuardianSource {
    pub fn with_urls(most_read_url: &str, site_url: &str, api_url: &str) -> Self {
        Self {
            most_read_url: most_read_url.to_string(),
            site_url: site_url.trim_end_matches('/').to_string(),
            api_url: api_url.trim_end_matches('/').to_string(),
        }
    }

    /// JSON endpoint for an article link
    fn json_url(&self, link: &str) -> String {
        let path = link.strip_prefix(&self.site_url).unwrap_or(link);
        format!("{}{}.json", self.api_url, path)
    }
}

/// Article links from the most-read response
///
/// The "Across the guardian" tab is not world news and is skipped.
pub fn parse_links(body: &str) -> Result<Vec<String>, AppError> {
    let response: MostReadResponse =
        serde_json::from_str(body).map_err(|e| invalid_listing("Guardian", e))?;

    Ok(response
        .tabs
        .into_iter()
        .filter(|tab| !tab.heading.contains("Across"))
        .flat_map(|tab| tab.trails)
        .map(|trail| trail.url)
        .filter(|url| !url.trim().is_empty())
        .collect())
}

/// Parse an article JSON document; None for live blogs and pages
/// without a headline
pub fn parse_article(body: &str, link: &str) -> Result<Option<ScrapedArticle>, AppError> {
    let response: ArticleResponse = serde_json::from_str(body).map_err(|e| {
        AppError::Internal(anyhow::anyhow!("invalid Guardian article response: {e}"))
    })?;

    if response.config.page.is_live {
        tracing::debug!(link, "Skipping live article");
        return Ok(None);
    }

    let soup = Soup::new(&response.html);
    let Some(headline) = soup
        .tag("h1")
        .class("content__headline")
        .find()
        .map(|h1| h1.text())
        .filter(|text| !text.trim().is_empty())
    else {
        return Ok(None);
    };

    let story = soup
        .tag("div")
        .class("content__article-body")
        .find()
        .map(|body| body.text())
        .unwrap_or_default();

    let published_at = soup
        .tag("time")
        .attr("itemprop", "datePublished")
        .find()
        .and_then(|time| time.get("datetime"))
        .and_then(|date| parse_timestamp(&date));

    Ok(Some(ScrapedArticle {
        headline,
        story: story.trim().to_string(),
        source_link: link.to_string(),
        meta_description: soup
            .tag("meta")
            .attr("itemprop", "description")
            .find()
            .and_then(|meta| meta.get("content")),
        image_link: soup
            .tag("img")
            .class("maxed")
            .find()
            .and_then(|img| img.get("src")),
        published_at,
    }))
}

#[async_trait]
impl NewsSource for GuardianSource {
    fn name(&self) -> &'static str {
        "The Guardian"
    }

    fn category(&self) -> &'static str {
        "World"
    }

    async fn latest_links(&self, http: &reqwest::Client) -> Result<Vec<String>, AppError> {
        tracing::info!(url = %self.most_read_url, "Fetching Guardian most read");
        let body = fetch_text(http, &self.most_read_url, &[]).await?;
        parse_links(&body)
    }

    async fn fetch_article(
        &self,
        http: &reqwest::Client,
        link: &str,
    ) -> Result<ScrapedArticle, AppError> {
        let url = self.json_url(link);
        tracing::debug!(link, url = %url, "Fetching Guardian article");
        let body = fetch_text(http, &url, &[]).await?;
        parse_article(&body, link)?.ok_or_else(|| no_article(link))
    }
}
