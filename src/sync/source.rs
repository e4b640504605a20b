//! News source seam

use axum::async_trait;
use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use soup::prelude::*;

use crate::data::NewNewsArticle;
use crate::error::AppError;

const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_4) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64; rv:125.0) Gecko/20100101 Firefox/125.0",
];

/// Browser user agent for scraping requests
pub fn user_agent() -> &'static str {
    USER_AGENTS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(USER_AGENTS[0])
}

/// GET a page with a browser user agent and return its body
pub(super) async fn fetch_text(
    http: &reqwest::Client,
    url: &str,
    headers: &[(&'static str, &str)],
) -> Result<String, AppError> {
    let mut request = http
        .get(url)
        .header(reqwest::header::USER_AGENT, user_agent());
    for (name, value) in headers {
        request = request.header(*name, *value);
    }
    Ok(request.send().await?.error_for_status()?.text().await?)
}

/// Error for a page that parsed but held no article
pub(super) fn no_article(link: &str) -> AppError {
    AppError::Internal(anyhow::anyhow!("no article content found at {link}"))
}

pub(super) fn invalid_listing(source: &str, error: serde_json::Error) -> AppError {
    AppError::Internal(anyhow::anyhow!("invalid {source} listing response: {error}"))
}

/// Absolute link for a path found on `site_url`
pub(super) fn absolute_link(site_url: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        path.to_string()
    } else if path.starts_with('/') {
        format!("{site_url}{path}")
    } else {
        format!("{site_url}/{path}")
    }
}

/// Fields read from a page's JSON-LD block
#[derive(Debug, Default, PartialEq)]
pub(super) struct LinkedData {
    pub description: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub image: Option<String>,
}

/// `image` is a URL, an ImageObject, or a list of either
fn image_url(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(url) => Some(url.clone()),
        serde_json::Value::Array(items) => items.iter().find_map(image_url),
        serde_json::Value::Object(_) => value
            .get("url")
            .and_then(|v| v.as_str())
            .map(ToOwned::to_owned),
        _ => None,
    }
}

pub(super) fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text.trim())
        .or_else(|_| DateTime::parse_from_str(text.trim(), "%Y-%m-%dT%H:%M:%S%z"))
        .ok()
        .map(|date| date.with_timezone(&Utc))
}

pub(super) fn linked_data(value: &serde_json::Value) -> LinkedData {
    let text = |key: &str| {
        value
            .get(key)
            .and_then(|v| v.as_str())
            .map(ToOwned::to_owned)
    };

    LinkedData {
        description: text("description"),
        published_at: text("datePublished").and_then(|date| parse_timestamp(&date)),
        image: value
            .get("image")
            .and_then(image_url)
            .or_else(|| text("thumbnailUrl")),
    }
}

/// Read the page's JSON-LD blocks
///
/// Pages can carry several; the last parsable one wins.
pub(super) fn page_linked_data(soup: &Soup, link: &str) -> LinkedData {
    let mut data = LinkedData::default();
    for script in soup
        .tag("script")
        .attr("type", "application/ld+json")
        .find_all()
    {
        match serde_json::from_str::<serde_json::Value>(&script.text()) {
            Ok(value) => data = linked_data(&value),
            Err(e) => tracing::debug!(link, error = %e, "Skipping unreadable JSON-LD block"),
        }
    }
    data
}

/// Content of `<meta {key}="{value}" content=...>`
pub(super) fn meta_content(soup: &Soup, key: &str, value: &str) -> Option<String> {
    soup.tag("meta")
        .attr(key.to_string(), value.to_string())
        .find()
        .and_then(|meta| meta.get("content"))
        .map(|content| content.trim().to_string())
        .filter(|content| !content.is_empty())
}

/// Non-empty text of each node, one per line
pub(super) fn join_text<I, N>(nodes: I) -> String
where
    I: Iterator<Item = N>,
    N: NodeExt,
{
    nodes
        .map(|node| node.text().trim().to_string())
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Article as read from a source page, before summarising
#[derive(Debug, Clone, PartialEq)]
pub struct ScrapedArticle {
    pub headline: String,
    pub story: String,
    pub source_link: String,
    pub meta_description: Option<String>,
    pub image_link: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
}

impl ScrapedArticle {
    pub fn into_new_article(self, source_name: &str, category: &str) -> NewNewsArticle {
        NewNewsArticle {
            source_name: source_name.to_string(),
            category: category.to_string(),
            headline: self.headline,
            story: self.story,
            summary: None,
            bullet_points: None,
            image_link: self.image_link,
            source_link: self.source_link,
            meta_description: self.meta_description,
            meta_keywords: None,
        }
    }
}

/// A site the crawler reads articles from
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NewsSource: Send + Sync {
    /// Stored as `source_name`
    fn name(&self) -> &'static str;

    /// Stored as `category`
    fn category(&self) -> &'static str;

    /// Absolute links of the most recent articles
    async fn latest_links(&self, http: &reqwest::Client) -> Result<Vec<String>, AppError>;

    async fn fetch_article(
        &self,
        http: &reqwest::Client,
        link: &str,
    ) -> Result<ScrapedArticle, AppError>;
}
