//! Dashboard pages
//!
//! Paginated, filterable and sortable table over the `news` table,
//! plus the article sheet and edit form. Every handler requires a
//! signed-in user and runs as that user's access token.

use axum::{
    Form, Router,
    extract::{Path, Query, State},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
};
use chrono::Utc;
use serde::Deserialize;

use super::flash::{Flash, FlashKind, encoded_redirect};
use super::pages::{attr, escape, layout};
use crate::AppState;
use crate::auth::{CurrentUser, Session};
use crate::data::{NewsArticle, NewsArticleChanges, NewsFilters, NewsPage, SortField, SortOrder};
use crate::error::AppError;
use crate::service::{FilterOptions, NewsService, Pagination, relative_time};
use crate::validation;

const FETCH_FAILED: &str = "Failed to fetch news articles";
const UPDATED: &str = "News article updated successfully";
const UPDATE_FAILED: &str = "Failed to update news article";
const DELETED: &str = "News article deleted successfully";
const DELETE_FAILED: &str = "Failed to delete news article";
const SYNC_RUNNING: &str = "A sync is already running";

/// Create dashboard router
///
/// Routes:
/// - GET /dashboard
/// - GET /dashboard/news/:id
/// - POST /dashboard/news/:id
/// - GET /dashboard/news/:id/edit
/// - POST /dashboard/news/:id/delete
/// - POST /dashboard/sync
pub fn dashboard_router() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(list_page))
        .route("/dashboard/news/:id", get(article_page).post(update_article))
        .route("/dashboard/news/:id/edit", get(edit_page))
        .route("/dashboard/news/:id/delete", post(delete_article))
        .route("/dashboard/sync", post(trigger_sync))
}

fn news_service(state: &AppState) -> NewsService {
    NewsService::new(state.news.clone())
}

// =============================================================================
// Listing
// =============================================================================

/// Dashboard query string
///
/// Everything is read as text so a bad value falls back to the
/// default instead of rejecting the request.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DashboardQuery {
    pub q: Option<String>,
    pub category: Option<String>,
    pub source: Option<String>,
    pub sort: Option<String>,
    pub order: Option<String>,
    pub page: Option<String>,
    pub error: Option<String>,
    pub success: Option<String>,
}

impl DashboardQuery {
    fn sort_field(&self) -> SortField {
        self.sort
            .as_deref()
            .and_then(|s| s.parse().ok())
            .unwrap_or_default()
    }

    fn sort_order(&self) -> SortOrder {
        self.order
            .as_deref()
            .and_then(|s| s.parse().ok())
            .unwrap_or_default()
    }

    fn page(&self) -> u64 {
        self.page
            .as_deref()
            .and_then(|p| p.trim().parse::<u64>().ok())
            .unwrap_or(1)
            .max(1)
    }

    fn flash(&self) -> Flash {
        Flash {
            error: self.error.clone(),
            success: self.success.clone(),
        }
    }

    fn filters(&self, page_size: u32, offset: u64) -> NewsFilters {
        NewsFilters {
            limit: page_size,
            offset: u32::try_from(offset).unwrap_or(u32::MAX),
            query: self.q.clone(),
            sort: self.sort_field(),
            order: self.sort_order(),
            category: self.category.clone(),
            source: self.source.clone(),
        }
    }

    /// Link to the listing with some parameters replaced
    fn href(&self, sort: SortField, order: SortOrder, page: u64) -> String {
        let mut pairs = url::form_urlencoded::Serializer::new(String::new());
        for (key, value) in [
            ("q", &self.q),
            ("category", &self.category),
            ("source", &self.source),
        ] {
            if let Some(value) = value.as_deref().filter(|v| !v.trim().is_empty()) {
                pairs.append_pair(key, value);
            }
        }
        pairs
            .append_pair("sort", sort.column())
            .append_pair("order", order.as_str())
            .append_pair("page", &page.to_string());
        format!("/dashboard?{}", pairs.finish())
    }
}

/// Order to use when a column header is clicked
///
/// The active column toggles direction, any other column starts
/// ascending.
pub fn header_order(current: SortField, order: SortOrder, clicked: SortField) -> SortOrder {
    if current == clicked {
        order.toggled()
    } else {
        SortOrder::Asc
    }
}

/// GET /dashboard
async fn list_page(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Query(query): Query<DashboardQuery>,
) -> Html<String> {
    let service = news_service(&state);
    let page_size = state.config.dashboard.page_size;
    let requested_page = query.page();
    let mut flash = query.flash();

    let offset = Pagination::offset_for(requested_page, u64::from(page_size));
    let mut listing = service
        .list(&session.access_token, query.filters(page_size, offset))
        .await;

    // Past the end: show the last page instead
    if let Ok(page) = &listing {
        let clamped = Pagination::new(requested_page, page.count, u64::from(page_size));
        if page.data.is_empty() && clamped.current_page < requested_page && page.count > 0 {
            listing = service
                .list(
                    &session.access_token,
                    query.filters(page_size, clamped.offset()),
                )
                .await;
        }
    }

    let page = match listing {
        Ok(page) => page,
        Err(error) => {
            tracing::error!(error = %error, user_id = %session.user_id, "Failed to fetch news");
            flash.error = Some(FETCH_FAILED.to_string());
            NewsPage::default()
        }
    };

    let options = match service.filter_options(&session.access_token).await {
        Ok(options) => options,
        Err(error) => {
            tracing::warn!(error = %error, "Failed to load filter options");
            FilterOptions::default()
        }
    };

    let pagination = Pagination::new(requested_page, page.count, u64::from(page_size));
    render_list(&session, &query, &page, &options, &pagination, &flash)
}

fn select(name: &str, all_label: &str, options: &[String], selected: Option<&str>) -> String {
    let mut html = format!(
        r#"<select name="{name}"><option value="{all}">{all_text}</option>"#,
        all = attr(all_label),
        all_text = escape(all_label)
    );
    for option in options {
        let marker = if selected == Some(option.as_str()) {
            " selected"
        } else {
            ""
        };
        html.push_str(&format!(
            r#"<option value="{}"{marker}>{}</option>"#,
            attr(option),
            escape(option)
        ));
    }
    html.push_str("</select>");
    html
}

fn render_row(article: &NewsArticle, now: chrono::DateTime<Utc>) -> String {
    let image = article
        .image_link
        .as_deref()
        .filter(|link| !link.trim().is_empty())
        .map(|link| {
            format!(
                r#"<img src="{}" alt="" width="80" height="48" loading="lazy">"#,
                attr(link)
            )
        })
        .unwrap_or_default();

    format!(
        r#"<tr>
<td>{image}</td>
<td><a href="/dashboard/news/{id}">{headline}</a></td>
<td>{category}</td>
<td>{source}</td>
<td><time datetime="{iso}">{date}</time><br><span class="muted">{ago}</span></td>
<td><a href="/dashboard/news/{id}">View</a> <a href="/dashboard/news/{id}/edit">Edit</a>
<form class="inline" method="post" action="/dashboard/news/{id}/delete" onsubmit="return confirm('Delete this article?');"><button type="submit">Delete</button></form></td>
</tr>"#,
        id = article.id,
        headline = escape(&article.headline),
        category = escape(&article.category),
        source = escape(&article.source_name),
        iso = article.created_at.to_rfc3339(),
        date = article.created_at.format("%Y-%m-%d %H:%M"),
        ago = relative_time(article.created_at, now),
    )
}

fn render_list(
    session: &Session,
    query: &DashboardQuery,
    page: &NewsPage,
    options: &FilterOptions,
    pagination: &Pagination,
    flash: &Flash,
) -> Html<String> {
    let sort = query.sort_field();
    let order = query.sort_order();
    let now = Utc::now();

    let header = |label: &str, field: SortField| {
        let arrow = match (sort == field, order) {
            (true, SortOrder::Asc) => " ▲",
            (true, SortOrder::Desc) => " ▼",
            (false, _) => "",
        };
        format!(
            r#"<th><a href="{}">{label}{arrow}</a></th>"#,
            attr(&query.href(field, header_order(sort, order, field), 1))
        )
    };

    let rows: String = if page.data.is_empty() {
        r#"<tr><td colspan="6" class="muted">No articles found</td></tr>"#.to_string()
    } else {
        page.data.iter().map(|a| render_row(a, now)).collect()
    };

    let previous = if pagination.has_previous() {
        format!(
            r#"<a href="{}">Previous</a>"#,
            attr(&query.href(sort, order, pagination.previous_page()))
        )
    } else {
        r#"<span class="muted" aria-disabled="true">Previous</span>"#.to_string()
    };
    let next = if pagination.has_next() {
        format!(
            r#"<a href="{}">Next</a>"#,
            attr(&query.href(sort, order, pagination.next_page()))
        )
    } else {
        r#"<span class="muted" aria-disabled="true">Next</span>"#.to_string()
    };

    let body = format!(
        r#"<h1>News articles</h1>
<form method="get" action="/dashboard">
<input type="search" name="q" value="{q}" placeholder="Search headlines">
{categories}
{sources}
<input type="hidden" name="sort" value="{sort}">
<input type="hidden" name="order" value="{order}">
<button type="submit">Filter</button>
</form>
<form class="inline" method="post" action="/dashboard/sync"><button type="submit">Sync now</button></form>
<table>
<thead><tr><th>Image</th>{h_headline}{h_category}{h_source}{h_created}<th>Actions</th></tr></thead>
<tbody>
{rows}
</tbody>
</table>
<p class="muted">{summary}</p>
<p>{previous} Page {current} of {pages} {next}</p>"#,
        q = attr(query.q.as_deref().unwrap_or_default()),
        categories = select(
            "category",
            "All",
            &options.categories,
            query.category.as_deref()
        ),
        sources = select("source", "All", &options.sources, query.source.as_deref()),
        sort = sort.column(),
        order = order.as_str(),
        h_headline = header("Headline", SortField::Headline),
        h_category = header("Category", SortField::Category),
        h_source = header("Source", SortField::SourceName),
        h_created = header("Created", SortField::CreatedAt),
        summary = escape(&pagination.summary()),
        current = pagination.current_page,
        pages = pagination.display_pages(),
    );

    layout("Dashboard", Some(session), flash, &body)
}

// =============================================================================
// Article sheet
// =============================================================================

/// GET /dashboard/news/:id
async fn article_page(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Path(id): Path<i64>,
    Query(flash): Query<Flash>,
) -> Result<Html<String>, AppError> {
    let article = news_service(&state).get(&session.access_token, id).await?;

    let summary = article
        .summary
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .map(|s| format!("<p>{}</p>", escape(s)))
        .unwrap_or_else(|| r#"<p class="muted">No summary available.</p>"#.to_string());

    let bullets: String = article
        .bullet_points
        .iter()
        .flatten()
        .map(|point| format!("<li>{}</li>", escape(point)))
        .collect();
    let bullets = if bullets.is_empty() {
        String::new()
    } else {
        format!("<h2>Key points</h2><ul>{bullets}</ul>")
    };

    let meta = |label: &str, value: Option<&str>| {
        value
            .filter(|v| !v.trim().is_empty())
            .map(|v| format!("<dt>{label}</dt><dd>{}</dd>", escape(v)))
            .unwrap_or_default()
    };

    let body = format!(
        r#"<p><a href="/dashboard">&larr; Back to dashboard</a></p>
<h1>{headline}</h1>
<p class="muted">{source} &middot; {category} &middot; {date}</p>
<h2>Summary</h2>
{summary}
{bullets}
<dl>{keywords}{description}</dl>
<p><a href="{link}" target="_blank" rel="noopener noreferrer">Read the original article</a></p>
<p><a href="/dashboard/news/{id}/edit">Edit article</a></p>"#,
        headline = escape(&article.headline),
        source = escape(&article.source_name),
        category = escape(&article.category),
        date = article.created_at.format("%Y-%m-%d %H:%M"),
        keywords = meta("Keywords", article.meta_keywords.as_deref()),
        description = meta("Description", article.meta_description.as_deref()),
        link = attr(&article.source_link),
        id = article.id,
    );

    Ok(layout(&article.headline, Some(&session), &flash, &body))
}

// =============================================================================
// Edit
// =============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ArticleForm {
    pub headline: String,
    pub category: String,
    pub source_name: String,
    pub story: String,
    pub summary: String,
    /// One key point per line
    pub bullet_points: String,
    pub image_link: String,
    pub source_link: String,
    pub meta_description: String,
    pub meta_keywords: String,
}

impl ArticleForm {
    /// Update payload for the edited columns
    pub fn into_changes(self) -> NewsArticleChanges {
        let bullet_points = self
            .bullet_points
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(ToOwned::to_owned)
            .collect();

        NewsArticleChanges {
            headline: Some(self.headline.trim().to_string()),
            category: Some(self.category.trim().to_string()),
            source_name: Some(self.source_name.trim().to_string()),
            story: Some(self.story.trim().to_string()),
            summary: Some(self.summary.trim().to_string()),
            bullet_points: Some(bullet_points),
            image_link: Some(self.image_link.trim().to_string()),
            source_link: Some(self.source_link.trim().to_string()),
            meta_description: Some(self.meta_description.trim().to_string()),
            meta_keywords: Some(self.meta_keywords.trim().to_string()),
        }
    }
}

/// GET /dashboard/news/:id/edit
async fn edit_page(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Path(id): Path<i64>,
    Query(flash): Query<Flash>,
) -> Result<Html<String>, AppError> {
    let article = news_service(&state).get(&session.access_token, id).await?;

    let input = |label: &str, name: &str, value: &str| {
        format!(
            r#"<label>{label} <input type="text" name="{name}" value="{}"></label>"#,
            attr(value)
        )
    };
    let textarea = |label: &str, name: &str, value: &str, rows: u8| {
        format!(
            r#"<label>{label}<br><textarea name="{name}" rows="{rows}" cols="80">{}</textarea></label>"#,
            escape(value)
        )
    };

    let body = format!(
        r#"<p><a href="/dashboard/news/{id}">&larr; Back to article</a></p>
<h1>Edit article</h1>
<form method="post" action="/dashboard/news/{id}">
{headline}
{category}
{source_name}
{source_link}
{image_link}
{story}
{summary}
{bullet_points}
{meta_description}
{meta_keywords}
<p><button type="submit">Save changes</button></p>
</form>"#,
        id = article.id,
        headline = input("Headline", "headline", &article.headline),
        category = input("Category", "category", &article.category),
        source_name = input("Source", "source_name", &article.source_name),
        source_link = input("Source link", "source_link", &article.source_link),
        image_link = input(
            "Image link",
            "image_link",
            article.image_link.as_deref().unwrap_or_default()
        ),
        story = textarea("Story", "story", &article.story, 12),
        summary = textarea(
            "Summary",
            "summary",
            article.summary.as_deref().unwrap_or_default(),
            4
        ),
        bullet_points = textarea(
            "Key points (one per line)",
            "bullet_points",
            &article.bullet_points.clone().unwrap_or_default().join("\n"),
            5
        ),
        meta_description = input(
            "Meta description",
            "meta_description",
            article.meta_description.as_deref().unwrap_or_default()
        ),
        meta_keywords = input(
            "Meta keywords",
            "meta_keywords",
            article.meta_keywords.as_deref().unwrap_or_default()
        ),
    );

    Ok(layout("Edit article", Some(&session), &flash, &body))
}

/// POST /dashboard/news/:id
async fn update_article(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Path(id): Path<i64>,
    Form(form): Form<ArticleForm>,
) -> Response {
    let edit_path = format!("/dashboard/news/{id}/edit");

    if let Err(errors) = validation::validate_article(&form.headline, &form.source_link) {
        return encoded_redirect(FlashKind::Error, &edit_path, &errors.to_string()).into_response();
    }

    match news_service(&state)
        .update(&session.access_token, id, &form.into_changes())
        .await
    {
        Ok(_) => encoded_redirect(FlashKind::Success, "/dashboard", UPDATED).into_response(),
        Err(error) => {
            tracing::error!(error = %error, id, "Failed to update news article");
            encoded_redirect(FlashKind::Error, &edit_path, UPDATE_FAILED).into_response()
        }
    }
}

/// POST /dashboard/news/:id/delete
async fn delete_article(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Path(id): Path<i64>,
) -> Response {
    match news_service(&state).delete(&session.access_token, id).await {
        Ok(()) => encoded_redirect(FlashKind::Success, "/dashboard", DELETED).into_response(),
        Err(error) => {
            tracing::error!(error = %error, id, "Failed to delete news article");
            encoded_redirect(FlashKind::Error, "/dashboard", DELETE_FAILED).into_response()
        }
    }
}

// =============================================================================
// Sync
// =============================================================================

/// POST /dashboard/sync
///
/// Starts a crawler run in the background and returns immediately.
async fn trigger_sync(State(state): State<AppState>, CurrentUser(session): CurrentUser) -> Redirect {
    let Some(crawler) = state.crawler.clone() else {
        return encoded_redirect(FlashKind::Error, "/dashboard", "Sync is not configured");
    };

    if crawler.is_running() {
        return encoded_redirect(FlashKind::Error, "/dashboard", SYNC_RUNNING);
    }

    tracing::info!(user_id = %session.user_id, "Manual sync requested");
    tokio::spawn(async move {
        if let Some(reports) = crawler.sync().await {
            let inserted: usize = reports.iter().map(|r| r.inserted).sum();
            tracing::info!(sources = reports.len(), inserted, "Manual sync finished");
        }
    });

    encoded_redirect(
        FlashKind::Success,
        "/dashboard",
        "Sync started. New articles will appear shortly.",
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_toggles_active_column() {
        assert_eq!(
            header_order(SortField::Headline, SortOrder::Asc, SortField::Headline),
            SortOrder::Desc
        );
        assert_eq!(
            header_order(SortField::Headline, SortOrder::Desc, SortField::Headline),
            SortOrder::Asc
        );
        assert_eq!(
            header_order(SortField::CreatedAt, SortOrder::Desc, SortField::Category),
            SortOrder::Asc
        );
    }

    #[test]
    fn bad_query_values_fall_back_to_defaults() {
        let query = DashboardQuery {
            sort: Some("password".to_string()),
            order: Some("sideways".to_string()),
            page: Some("-3".to_string()),
            ..Default::default()
        };
        assert_eq!(query.sort_field(), SortField::CreatedAt);
        assert_eq!(query.sort_order(), SortOrder::Desc);
        assert_eq!(query.page(), 1);
    }

    #[test]
    fn href_keeps_filters_and_resets_page() {
        let query = DashboardQuery {
            q: Some("rail strike".to_string()),
            category: Some("World".to_string()),
            source: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(
            query.href(SortField::Headline, SortOrder::Asc, 1),
            "/dashboard?q=rail+strike&category=World&sort=headline&order=asc&page=1"
        );
    }

    #[test]
    fn form_lines_become_bullet_points() {
        let form = ArticleForm {
            headline: " Headline ".to_string(),
            bullet_points: "first\n\n  second  \n".to_string(),
            source_link: "https://example.com/a".to_string(),
            ..Default::default()
        };
        let changes = form.into_changes();
        assert_eq!(changes.headline.as_deref(), Some("Headline"));
        assert_eq!(
            changes.bullet_points,
            Some(vec!["first".to_string(), "second".to_string()])
        );
    }
}
