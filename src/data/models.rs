//! Data models
//!
//! Rust structs mirroring the rows of the hosted tables and the
//! payloads sent to them. Timestamps are chrono UTC values.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// News
// =============================================================================

/// A row of the `news` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsArticle {
    pub id: i64,
    pub source_name: String,
    pub category: String,
    pub headline: String,
    pub story: String,
    pub summary: Option<String>,
    pub bullet_points: Option<Vec<String>>,
    pub image_link: Option<String>,
    /// Unique per article
    pub source_link: String,
    pub meta_description: Option<String>,
    pub meta_keywords: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Editable columns of a news article
///
/// `id`, `created_at` and `updated_at` are owned by the table schema
/// and never part of an update payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewsArticleChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headline: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub story: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bullet_points: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta_keywords: Option<String>,
}

impl NewsArticleChanges {
    /// Apply the changes to an in-memory article
    pub fn apply_to(&self, article: &mut NewsArticle) {
        if let Some(value) = &self.source_name {
            article.source_name = value.clone();
        }
        if let Some(value) = &self.category {
            article.category = value.clone();
        }
        if let Some(value) = &self.headline {
            article.headline = value.clone();
        }
        if let Some(value) = &self.story {
            article.story = value.clone();
        }
        if let Some(value) = &self.summary {
            article.summary = Some(value.clone());
        }
        if let Some(value) = &self.bullet_points {
            article.bullet_points = Some(value.clone());
        }
        if let Some(value) = &self.image_link {
            article.image_link = Some(value.clone());
        }
        if let Some(value) = &self.source_link {
            article.source_link = value.clone();
        }
        if let Some(value) = &self.meta_description {
            article.meta_description = Some(value.clone());
        }
        if let Some(value) = &self.meta_keywords {
            article.meta_keywords = Some(value.clone());
        }
    }
}

/// Insert payload produced by the crawler
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewNewsArticle {
    pub source_name: String,
    pub category: String,
    pub headline: String,
    pub story: String,
    pub summary: Option<String>,
    pub bullet_points: Option<Vec<String>>,
    pub image_link: Option<String>,
    pub source_link: String,
    pub meta_description: Option<String>,
    pub meta_keywords: Option<String>,
}

/// Columns the dashboard can sort by
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    Headline,
    Category,
    SourceName,
    #[default]
    CreatedAt,
    UpdatedAt,
}

impl SortField {
    /// Column name in the `news` table
    pub fn column(self) -> &'static str {
        match self {
            SortField::Headline => "headline",
            SortField::Category => "category",
            SortField::SourceName => "source_name",
            SortField::CreatedAt => "created_at",
            SortField::UpdatedAt => "updated_at",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn as_str(self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            SortOrder::Asc => SortOrder::Desc,
            SortOrder::Desc => SortOrder::Asc,
        }
    }
}

impl std::str::FromStr for SortField {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "headline" => Ok(SortField::Headline),
            "category" => Ok(SortField::Category),
            "source_name" => Ok(SortField::SourceName),
            "created_at" => Ok(SortField::CreatedAt),
            "updated_at" => Ok(SortField::UpdatedAt),
            _ => Err(()),
        }
    }
}

impl std::str::FromStr for SortOrder {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            _ => Err(()),
        }
    }
}

/// Listing filters for the news table
#[derive(Debug, Clone, PartialEq)]
pub struct NewsFilters {
    pub limit: u32,
    pub offset: u32,
    /// Case-insensitive headline substring
    pub query: Option<String>,
    pub sort: SortField,
    pub order: SortOrder,
    pub category: Option<String>,
    pub source: Option<String>,
}

impl Default for NewsFilters {
    fn default() -> Self {
        Self {
            limit: 20,
            offset: 0,
            query: None,
            sort: SortField::default(),
            order: SortOrder::default(),
            category: None,
            source: None,
        }
    }
}

/// One page of news plus the exact number of matching rows
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewsPage {
    pub data: Vec<NewsArticle>,
    pub count: u64,
}

/// Columns with a distinct-value lookup for filter options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterColumn {
    Category,
    SourceName,
}

impl FilterColumn {
    pub fn column(self) -> &'static str {
        match self {
            FilterColumn::Category => "category",
            FilterColumn::SourceName => "source_name",
        }
    }
}

// =============================================================================
// Contact
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContactStatus {
    #[default]
    New,
    Read,
    Responded,
}

/// A row of the `contact_submissions` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactSubmission {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
    pub status: ContactStatus,
}

/// Contact form payload, written once
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewContactSubmission {
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
    pub status: ContactStatus,
    pub created_at: DateTime<Utc>,
}

impl NewContactSubmission {
    pub fn new(name: String, email: String, subject: String, message: String) -> Self {
        Self {
            name,
            email,
            subject,
            message,
            status: ContactStatus::New,
            created_at: Utc::now(),
        }
    }
}

// =============================================================================
// Profile
// =============================================================================

/// A row of the `profiles` table, keyed by identity user id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn changes_skip_unset_fields_when_serialized() {
        let changes = NewsArticleChanges {
            headline: Some("New headline".to_string()),
            ..Default::default()
        };

        let value = serde_json::to_value(&changes).unwrap();
        assert_eq!(value, serde_json::json!({ "headline": "New headline" }));
    }

    #[test]
    fn contact_status_uses_lowercase_names() {
        let value = serde_json::to_value(ContactStatus::Responded).unwrap();
        assert_eq!(value, serde_json::json!("responded"));
        let parsed: ContactStatus = serde_json::from_str("\"read\"").unwrap();
        assert_eq!(parsed, ContactStatus::Read);
    }

    #[test]
    fn news_article_parses_table_row() {
        let row = serde_json::json!({
            "id": 42,
            "source_name": "BBC News",
            "category": "World",
            "headline": "Headline",
            "story": "Story",
            "summary": null,
            "bullet_points": ["one", "two"],
            "image_link": null,
            "source_link": "https://www.bbc.com/news/articles/abc",
            "meta_description": null,
            "meta_keywords": "politics, economy",
            "created_at": "2025-01-02T03:04:05.123456+00:00",
            "updated_at": "2025-01-02T03:04:05+00:00"
        });

        let article: NewsArticle = serde_json::from_value(row).unwrap();
        assert_eq!(article.id, 42);
        assert_eq!(article.bullet_points.as_deref().map(<[String]>::len), Some(2));
        assert!(article.summary.is_none());
    }

    #[test]
    fn sort_params_parse() {
        assert_eq!("source_name".parse(), Ok(SortField::SourceName));
        assert_eq!("DESC".parse(), Ok(SortOrder::Desc));
        assert!("id; drop".parse::<SortField>().is_err());
    }

    #[test]
    fn sort_order_toggles() {
        assert_eq!(SortOrder::Asc.toggled(), SortOrder::Desc);
        assert_eq!(SortOrder::Desc.toggled(), SortOrder::Asc);
    }
}
