//! Al Jazeera source
//!
//! Links come from the site's section-posts GraphQL query, which wants
//! a `wp-site` header.

use axum::async_trait;
use serde::Deserialize;
use soup::prelude::*;

use super::source::{
    NewsSource, ScrapedArticle, absolute_link, fetch_text, invalid_listing, join_text, no_article,
    page_linked_data,
};
use crate::error::AppError;

const POSTS_URL: &str = "https://www.aljazeera.com/graphql?wp-site=aje&operationName=ArchipelagoAjeSectionPostsQuery&variables=%7B%22category%22%3A%22news%22%2C%22categoryType%22%3A%22categories%22%2C%22postTypes%22%3A%5B%22blog%22%2C%22episode%22%2C%22opinion%22%2C%22post%22%2C%22video%22%2C%22external-article%22%2C%22gallery%22%2C%22podcast%22%2C%22longform%22%2C%22liveblog%22%5D%2C%22quantity%22%3A20%2C%22offset%22%3A0%7D&extensions=%7B%7D";
const SITE_URL: &str = "https://www.aljazeera.com";
const SITE_HEADER: (&str, &str) = ("wp-site", "aje");

#[derive(Debug, Deserialize)]
struct PostsResponse {
    data: PostsData,
}

#[derive(Debug, Deserialize)]
struct PostsData {
    #[serde(default)]
    articles: Vec<Post>,
}

#[derive(Debug, Deserialize)]
struct Post {
    link: String,
}

#[derive(Debug, Clone)]
pub struct AlJazeeraSource {
    posts_url: String,
    site_url: String,
}

impl Default for AlJazeeraSource {
    fn default() -> Self {
        Self::with_urls(POSTS_URL, SITE_URL)
    }
}

impl AlJazeeraSource {
    pub fn with_urls(posts_url: &str, site_url: &str) -> Self {
        Self {
            posts_url: posts_url.to_string(),
            site_url: site_url.trim_end_matches('/').to_string(),
        }
    }
}

pub fn parse_links(body: &str, site_url: &str) -> Result<Vec<String>, AppError> {
    let response: PostsResponse =
        serde_json::from_str(body).map_err(|e| invalid_listing("Al Jazeera", e))?;

    Ok(response
        .data
        .articles
        .into_iter()
        .map(|post| post.link)
        .filter(|link| !link.trim().is_empty())
        .map(|link| absolute_link(site_url, link.trim()))
        .collect())
}

pub fn parse_article(html: &str, link: &str) -> Option<ScrapedArticle> {
    let soup = Soup::new(html);
    let main = soup.tag("main").find()?;

    let headline = main.tag("h1").find()?.text();
    if headline.trim().is_empty() {
        return None;
    }

    let story = main
        .tag("div")
        .class("wysiwyg--all-content")
        .find_all()
        .map(|content| join_text(content.tag("p").find_all()))
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join("\n");
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
impl NewsSource for AlJazeeraSource {
    fn name(&self) -> &'static str {
        "Al Jazeera"
    }

    fn category(&self) -> &'static str {
        "World"
    }

    async fn latest_links(&self, http: &reqwest::Client) -> Result<Vec<String>, AppError> {
        tracing::info!("Fetching Al Jazeera section posts");
        let body = fetch_text(http, &self.posts_url, &[SITE_HEADER]).await?;
        parse_links(&body, &self.site_url)
    }

    async fn fetch_article(
        &self,
        http: &reqwest::Client,
        link: &str,
    ) -> Result<ScrapedArticle, AppError> {
        tracing::debug!(link, "Fetching Al Jazeera article");
        let html = fetch_text(http, link, &[SITE_HEADER]).await?;
        parse_article(&html, link).ok_or_else(|| no_article(link))
    }
}
