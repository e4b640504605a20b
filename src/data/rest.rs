//! Hosted table API client
//!
//! Talks to the PostgREST interface of the backend (`/rest/v1`).
//! Row-level security is enforced upstream, so every call runs as
//! the bearer token it is given.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use axum::async_trait;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;

use super::models::{
    FilterColumn, NewContactSubmission, NewNewsArticle, NewsArticle, NewsArticleChanges,
    NewsFilters, NewsPage, Profile,
};
use super::query::{RestQuery, news_list_query, parse_content_range_total};
use super::store::{ContactRepository, NewsRepository, ProfileRepository};
use crate::config::BackendConfig;
use crate::error::AppError;
use crate::metrics::{BACKEND_REQUEST_DURATION_SECONDS, BACKEND_REQUESTS_TOTAL};

const NEWS_TABLE: &str = "news";
const CONTACT_TABLE: &str = "contact_submissions";
const PROFILE_TABLE: &str = "profiles";

/// PostgREST error body
#[derive(Debug, Deserialize)]
struct RestErrorBody {
    message: Option<String>,
    details: Option<String>,
}

/// Table API client
#[derive(Clone)]
pub struct RestClient {
    http_client: Arc<reqwest::Client>,
    /// `<project>/rest/v1`
    base_url: String,
    anon_key: String,
}

impl RestClient {
    /// Create a client for the configured project
    pub fn new(http_client: Arc<reqwest::Client>, backend: &BackendConfig) -> Self {
        Self {
            http_client,
            base_url: format!("{}/rest/v1", backend.url.trim_end_matches('/')),
            anon_key: backend.anon_key.clone(),
        }
    }

    fn request(&self, method: Method, table: &str, token: &str, query: &RestQuery) -> RequestBuilder {
        self.http_client
            .request(method, format!("{}/{}", self.base_url, table))
            .query(query.params())
            .header("apikey", &self.anon_key)
            .bearer_auth(token)
    }

    /// Send a request and turn non-success statuses into `AppError::Backend`
    async fn send(
        &self,
        operation: &'static str,
        table: &'static str,
        request: RequestBuilder,
    ) -> Result<Response, AppError> {
        self.send_accepting(operation, table, request, None).await
    }

    /// Like `send`, with one extra status treated as success
    async fn send_accepting(
        &self,
        operation: &'static str,
        table: &'static str,
        request: RequestBuilder,
        accepted: Option<StatusCode>,
    ) -> Result<Response, AppError> {
        let timer = BACKEND_REQUEST_DURATION_SECONDS
            .with_label_values(&[operation, table])
            .start_timer();
        let response = request.send().await?;
        timer.observe_duration();

        let status = response.status();
        BACKEND_REQUESTS_TOTAL
            .with_label_values(&[operation, table, status.as_str()])
            .inc();

        if status.is_success() || accepted == Some(status) {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<RestErrorBody>(&text)
            .ok()
            .and_then(|body| body.message.or(body.details))
            .unwrap_or(text);

        tracing::warn!(
            operation,
            table,
            status = status.as_u16(),
            %message,
            "Table API request failed"
        );

        Err(AppError::Backend {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl NewsRepository for RestClient {
    async fn list_news(&self, token: &str, filters: &NewsFilters) -> Result<NewsPage, AppError> {
        let query = news_list_query(filters);
        let request = self
            .request(Method::GET, NEWS_TABLE, token, &query)
            .header("Prefer", "count=exact");
        // An offset past the last row answers 416 with the total still set
        let response = self
            .send_accepting(
                "select",
                NEWS_TABLE,
                request,
                Some(StatusCode::RANGE_NOT_SATISFIABLE),
            )
            .await?;

        let count = response
            .headers()
            .get("content-range")
            .and_then(|value| value.to_str().ok())
            .and_then(parse_content_range_total);
        let data: Vec<NewsArticle> = if response.status() == StatusCode::RANGE_NOT_SATISFIABLE {
            Vec::new()
        } else {
            response.json().await?
        };

        Ok(NewsPage {
            count: count.unwrap_or(data.len() as u64),
            data,
        })
    }

    async fn get_news(&self, token: &str, id: i64) -> Result<Option<NewsArticle>, AppError> {
        let query = RestQuery::new().select("*").eq("id", id).limit(1);
        let request = self.request(Method::GET, NEWS_TABLE, token, &query);
        let rows: Vec<NewsArticle> = self.send("select", NEWS_TABLE, request).await?.json().await?;
        Ok(rows.into_iter().next())
    }

    async fn update_news(
        &self,
        token: &str,
        id: i64,
        changes: &NewsArticleChanges,
    ) -> Result<Option<NewsArticle>, AppError> {
        let query = RestQuery::new().eq("id", id);
        let request = self
            .request(Method::PATCH, NEWS_TABLE, token, &query)
            .header("Prefer", "return=representation")
            .json(changes);
        let rows: Vec<NewsArticle> = self.send("update", NEWS_TABLE, request).await?.json().await?;
        Ok(rows.into_iter().next())
    }

    async fn delete_news(&self, token: &str, id: i64) -> Result<bool, AppError> {
        let query = RestQuery::new().eq("id", id);
        let request = self
            .request(Method::DELETE, NEWS_TABLE, token, &query)
            .header("Prefer", "return=representation");
        let rows: Vec<serde_json::Value> =
            self.send("delete", NEWS_TABLE, request).await?.json().await?;
        Ok(!rows.is_empty())
    }

    async fn distinct_values(
        &self,
        token: &str,
        column: FilterColumn,
    ) -> Result<Vec<String>, AppError> {
        let name = column.column();
        let query = RestQuery::new().select(name).order(name, true);
        let request = self.request(Method::GET, NEWS_TABLE, token, &query);
        let rows: Vec<serde_json::Map<String, serde_json::Value>> =
            self.send("select", NEWS_TABLE, request).await?.json().await?;

        let values: BTreeSet<String> = rows
            .into_iter()
            .filter_map(|mut row| match row.remove(name) {
                Some(serde_json::Value::String(value)) if !value.trim().is_empty() => Some(value),
                _ => None,
            })
            .collect();

        Ok(values.into_iter().collect())
    }

    async fn existing_source_links(
        &self,
        token: &str,
        links: &[String],
    ) -> Result<HashSet<String>, AppError> {
        #[derive(Deserialize)]
        struct LinkRow {
            source_link: String,
        }

        if links.is_empty() {
            return Ok(HashSet::new());
        }

        let query = RestQuery::new()
            .select("source_link")
            .in_list("source_link", links);
        let request = self.request(Method::GET, NEWS_TABLE, token, &query);
        let rows: Vec<LinkRow> = self.send("select", NEWS_TABLE, request).await?.json().await?;

        Ok(rows.into_iter().map(|row| row.source_link).collect())
    }

    async fn insert_news(
        &self,
        token: &str,
        articles: &[NewNewsArticle],
    ) -> Result<usize, AppError> {
        if articles.is_empty() {
            return Ok(0);
        }

        let query = RestQuery::new().select("id").on_conflict("source_link");
        let request = self
            .request(Method::POST, NEWS_TABLE, token, &query)
            .header("Prefer", "resolution=ignore-duplicates,return=representation")
            .json(articles);
        let rows: Vec<serde_json::Value> =
            self.send("insert", NEWS_TABLE, request).await?.json().await?;

        Ok(rows.len())
    }
}

#[async_trait]
impl ContactRepository for RestClient {
    async fn insert_contact(&self, submission: &NewContactSubmission) -> Result<(), AppError> {
        let request = self
            .request(Method::POST, CONTACT_TABLE, &self.anon_key, &RestQuery::new())
            .header("Prefer", "return=minimal")
            .json(&[submission]);
        self.send("insert", CONTACT_TABLE, request).await?;
        Ok(())
    }
}

#[async_trait]
impl ProfileRepository for RestClient {
    async fn upsert_profile(&self, token: &str, profile: &Profile) -> Result<(), AppError> {
        let query = RestQuery::new().on_conflict("id");
        let request = self
            .request(Method::POST, PROFILE_TABLE, token, &query)
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(&[profile]);
        self.send("upsert", PROFILE_TABLE, request).await?;
        Ok(())
    }
}
