//! News service
//!
//! Dashboard operations over the `news` table. All calls run as the
//! signed-in user's access token.

use std::sync::Arc;

use crate::data::{
    FilterColumn, NewsArticle, NewsArticleChanges, NewsFilters, NewsPage, NewsRepository,
};
use crate::error::AppError;

/// Select values meaning "no filter"
const CATEGORY_SENTINELS: &[&str] = &["All", "Categories"];
const SOURCE_SENTINELS: &[&str] = &["All", "Sources"];

/// Distinct values offered in the dashboard selects
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterOptions {
    pub categories: Vec<String>,
    pub sources: Vec<String>,
}

/// Drop blank and sentinel filter values
pub fn normalize_filter(value: Option<String>, sentinels: &[&str]) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty() && !sentinels.contains(&v.as_str()))
}

/// Normalize all listing filters
pub fn normalize_filters(mut filters: NewsFilters) -> NewsFilters {
    filters.category = normalize_filter(filters.category, CATEGORY_SENTINELS);
    filters.source = normalize_filter(filters.source, SOURCE_SENTINELS);
    filters.query = normalize_filter(filters.query, &[]);
    filters
}

/// News service
#[derive(Clone)]
pub struct NewsService {
    repo: Arc<dyn NewsRepository>,
}

impl NewsService {
    pub fn new(repo: Arc<dyn NewsRepository>) -> Self {
        Self { repo }
    }

    /// One page of articles matching the filters
    pub async fn list(&self, token: &str, filters: NewsFilters) -> Result<NewsPage, AppError> {
        let filters = normalize_filters(filters);
        tracing::debug!(
            limit = filters.limit,
            offset = filters.offset,
            query = ?filters.query,
            category = ?filters.category,
            source = ?filters.source,
            sort = filters.sort.column(),
            order = filters.order.as_str(),
            "Listing news"
        );
        self.repo.list_news(token, &filters).await
    }

    pub async fn get(&self, token: &str, id: i64) -> Result<NewsArticle, AppError> {
        self.repo.get_news(token, id).await?.ok_or(AppError::NotFound)
    }

    pub async fn update(
        &self,
        token: &str,
        id: i64,
        changes: &NewsArticleChanges,
    ) -> Result<NewsArticle, AppError> {
        let article = self
            .repo
            .update_news(token, id, changes)
            .await?
            .ok_or(AppError::NotFound)?;
        tracing::info!(id, "News article updated");
        Ok(article)
    }

    pub async fn delete(&self, token: &str, id: i64) -> Result<(), AppError> {
        if self.repo.delete_news(token, id).await? {
            tracing::info!(id, "News article deleted");
            Ok(())
        } else {
            Err(AppError::NotFound)
        }
    }

    pub async fn filter_options(&self, token: &str) -> Result<FilterOptions, AppError> {
        let (categories, sources) = tokio::try_join!(
            self.repo.distinct_values(token, FilterColumn::Category),
            self.repo.distinct_values(token, FilterColumn::SourceName),
        )?;
        Ok(FilterOptions {
            categories,
            sources,
        })
    }
}
