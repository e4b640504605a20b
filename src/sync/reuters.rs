//! Reuters source

use axum::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use soup::prelude::*;

use super::source::{
    NewsSource, ScrapedArticle, absolute_link, fetch_text, invalid_listing, join_text, no_article,
    page_linked_data,
};
use crate::error::AppError;

const SECTION_URL: &str = r#"https://www.reuters.com/pf/api/v3/content/fetch/articles-by-section-alias-or-id-v1?query={"arc-site":"reuters","fetch_type":"collection","offset":0,"section_id":"/world/","size":20,"uri":"/world/","website":"reuters"}&_website=reuters"#;
const SITE_URL: &str = "https://www.reuters.com";
const LANGUAGE_HEADER: (&str, &str) = ("accept-language", "en-US,en;q=0.9");

lazy_static! {
    // Class names carry a build hash suffix
    static ref PARAGRAPH_CLASS: Regex =
        Regex::new(r"^article-body__paragraph").expect("pattern is valid");
}

#[derive(Debug, Deserialize)]
struct SectionResponse {
    result: SectionResult,
}

#[derive(Debug, Deserialize)]
struct SectionResult {
    #[serde(default)]
    articles: Vec<SectionArticle>,
}

#[derive(Debug, Deserialize)]
struct SectionArticle {
    canonical_url: String,
}

#[derive(Debug, Clone)]
pub struct ReutersSource {
    section_url: String,
    site_url: String,
}

impl Default for ReutersSource {
    fn default() -> Self {
        Self::with_urls(SECTION_URL, SITE_URL)
    }
}

impl ReutersSource {
    pub fn with_urls(section_url: &str, site_url: &str) -> Self {
        Self {
            section_url: section_url.to_string(),
            site_url: site_url.trim_end_matches('/').to_string(),
        }
    }
}

pub fn parse_links(body: &str, site_url: &str) -> Result<Vec<String>, AppError> {
    let response: SectionResponse =
        serde_json::from_str(body).map_err(|e| invalid_listing("Reuters", e))?;

    Ok(response
        .result
        .articles
        .into_iter()
        .map(|article| article.canonical_url)
        .filter(|path| !path.trim().is_empty())
        .map(|path| absolute_link(site_url, path.trim()))
        .collect())
}

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
            .class(PARAGRAPH_CLASS.clone())
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
impl NewsSource for ReutersSource {
    fn name(&self) -> &'static str {
        "Reuters"
    }

    fn category(&self) -> &'static str {
        "World"
    }

    async fn latest_links(&self, http: &reqwest::Client) -> Result<Vec<String>, AppError> {
        tracing::info!("Fetching Reuters world section");
        let body = fetch_text(http, &self.section_url, &[LANGUAGE_HEADER]).await?;
        parse_links(&body, &self.site_url)
    }

    async fn fetch_article(
        &self,
        http: &reqwest::Client,
        link: &str,
    ) -> Result<ScrapedArticle, AppError> {
        tracing::debug!(link, "Fetching Reuters article");
        let html = fetch_text(http, link, &[LANGUAGE_HEADER]).await?;
        parse_article(&html, link).ok_or_else(|| no_article(link))
    }
}
