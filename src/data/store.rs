//! Repository traits
//!
//! Seams between handlers and the hosted table API. `RestClient`
//! is the production implementation.

use std::collections::HashSet;

use axum::async_trait;

use super::models::{
    FilterColumn, NewContactSubmission, NewNewsArticle, NewsArticle, NewsArticleChanges,
    NewsFilters, NewsPage, Profile,
};
use crate::error::AppError;

/// Access to the `news` table
///
/// `token` is the bearer the request runs as: a user access token,
/// or the service role key for the crawler.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NewsRepository: Send + Sync {
    async fn list_news(&self, token: &str, filters: &NewsFilters) -> Result<NewsPage, AppError>;

    async fn get_news(&self, token: &str, id: i64) -> Result<Option<NewsArticle>, AppError>;

    async fn update_news(
        &self,
        token: &str,
        id: i64,
        changes: &NewsArticleChanges,
    ) -> Result<Option<NewsArticle>, AppError>;

    /// Returns false when no row matched
    async fn delete_news(&self, token: &str, id: i64) -> Result<bool, AppError>;

    /// Sorted, deduplicated values of a column
    async fn distinct_values(
        &self,
        token: &str,
        column: FilterColumn,
    ) -> Result<Vec<String>, AppError>;

    /// Subset of `links` already stored as `source_link`
    async fn existing_source_links(
        &self,
        token: &str,
        links: &[String],
    ) -> Result<HashSet<String>, AppError>;

    /// Insert articles, skipping duplicates by `source_link`
    ///
    /// Returns the number of rows created.
    async fn insert_news(&self, token: &str, articles: &[NewNewsArticle])
    -> Result<usize, AppError>;
}

/// Access to the `contact_submissions` table (anonymous writes)
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContactRepository: Send + Sync {
    async fn insert_contact(&self, submission: &NewContactSubmission) -> Result<(), AppError>;
}

/// Access to the `profiles` table
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProfileRepository: Send + Sync {
    async fn upsert_profile(&self, token: &str, profile: &Profile) -> Result<(), AppError>;
}
