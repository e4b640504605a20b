//! News crawler
//!
//! Pulls the latest articles from each source, skips links already
//! stored, summarises what is new and inserts it into the `news`
//! table with the service role key.

mod aljazeera;
mod bbc;
mod cnn;
mod guardian;
mod reuters;
mod sanitize;
mod source;
mod summarizer;

use std::collections::HashSet;
use std::sync::Arc;

use futures::stream::{self, StreamExt};

pub use aljazeera::AlJazeeraSource;
pub use bbc::BbcSource;
pub use cnn::CnnSource;
pub use guardian::GuardianSource;
pub use reuters::ReutersSource;
pub use sanitize::{sanitize_article, sanitize_text};
pub use source::{NewsSource, ScrapedArticle};
pub use summarizer::{ArticleSummarizer, ArticleSummary, ChatSummarizer, SummaryMetadata};

use crate::config::AppConfig;
use crate::data::{NewNewsArticle, NewsRepository};
use crate::error::AppError;
use crate::metrics::SYNC_ARTICLES_TOTAL;

/// Source for a `sync.sources` entry
pub fn source_by_name(name: &str) -> Option<Arc<dyn NewsSource>> {
    let source: Arc<dyn NewsSource> = match name.trim().to_ascii_lowercase().as_str() {
        "bbc" => Arc::new(BbcSource::default()),
        "cnn" => Arc::new(CnnSource::default()),
        "guardian" => Arc::new(GuardianSource::default()),
        "aljazeera" => Arc::new(AlJazeeraSource::default()),
        "reuters" => Arc::new(ReutersSource::default()),
        _ => return None,
    };
    Some(source)
}

/// Outcome of syncing one source
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub source: String,
    /// Links listed by the source
    pub discovered: usize,
    /// Links not stored yet
    pub new_links: usize,
    /// Article pages that could not be fetched or parsed
    pub failed: usize,
    /// Articles stored without a summary
    pub unsummarized: usize,
    pub inserted: usize,
    /// Set when the whole source failed
    pub error: Option<String>,
}

pub struct Crawler {
    http_client: Arc<reqwest::Client>,
    news: Arc<dyn NewsRepository>,
    /// Bearer used for table writes
    token: String,
    sources: Vec<Arc<dyn NewsSource>>,
    summarizer: Option<Arc<dyn ArticleSummarizer>>,
    concurrency: usize,
    /// Held for the duration of a run
    running: tokio::sync::Mutex<()>,
}

impl Crawler {
    pub fn new(
        http_client: Arc<reqwest::Client>,
        news: Arc<dyn NewsRepository>,
        token: String,
        sources: Vec<Arc<dyn NewsSource>>,
        summarizer: Option<Arc<dyn ArticleSummarizer>>,
        concurrency: usize,
    ) -> Self {
        Self {
            http_client,
            news,
            token,
            sources,
            summarizer,
            concurrency: concurrency.max(1),
            running: tokio::sync::Mutex::new(()),
        }
    }

    /// Crawler for the configured project
    ///
    /// None without a service role key, since row-level security
    /// would reject the inserts.
    pub fn from_config(
        config: &AppConfig,
        http_client: Arc<reqwest::Client>,
        news: Arc<dyn NewsRepository>,
    ) -> Option<Self> {
        let token = config.crawler_token()?.to_string();
        let summarizer = ChatSummarizer::from_config(http_client.clone(), &config.sync.summarizer)
            .map(|s| Arc::new(s) as Arc<dyn ArticleSummarizer>);
        if summarizer.is_none() {
            tracing::warn!("No summarizer API key configured; articles will be stored without summaries");
        }

        let sources: Vec<Arc<dyn NewsSource>> = config
            .sync
            .sources
            .iter()
            .filter_map(|name| {
                let source = source_by_name(name);
                if source.is_none() {
                    tracing::warn!(source = %name, "Unknown news source; skipping");
                }
                source
            })
            .collect();

        Some(Self::new(
            http_client,
            news,
            token,
            sources,
            summarizer,
            config.sync.concurrency,
        ))
    }

    pub fn is_running(&self) -> bool {
        self.running.try_lock().is_err()
    }

    /// Sync every source
    ///
    /// Returns None without doing anything while another run is in
    /// progress. A failing source is logged and reported; the others
    /// still run.
    pub async fn sync(&self) -> Option<Vec<SyncReport>> {
        let Ok(_running) = self.running.try_lock() else {
            tracing::info!("Sync already in progress; skipping");
            return None;
        };

        let mut reports = Vec::with_capacity(self.sources.len());

        for source in &self.sources {
            let report = match self.sync_source(source.as_ref()).await {
                Ok(report) => {
                    tracing::info!(
                        source = %report.source,
                        discovered = report.discovered,
                        new_links = report.new_links,
                        failed = report.failed,
                        inserted = report.inserted,
                        "Source synced"
                    );
                    report
                }
                Err(error) => {
                    tracing::error!(source = source.name(), error = %error, "Source sync failed");
                    SYNC_ARTICLES_TOTAL
                        .with_label_values(&[source.name(), "source_failed"])
                        .inc();
                    SyncReport {
                        source: source.name().to_string(),
                        error: Some(error.to_string()),
                        ..Default::default()
                    }
                }
            };
            reports.push(report);
        }

        Some(reports)
    }

    async fn sync_source(&self, source: &dyn NewsSource) -> Result<SyncReport, AppError> {
        let name = source.name();
        let mut report = SyncReport {
            source: name.to_string(),
            ..Default::default()
        };

        let links = dedupe(source.latest_links(&self.http_client).await?);
        report.discovered = links.len();

        let existing = self.news.existing_source_links(&self.token, &links).await?;
        let new_links: Vec<String> = links
            .into_iter()
            .filter(|link| !existing.contains(link))
            .collect();
        report.new_links = new_links.len();

        if new_links.is_empty() {
            tracing::info!(source = name, "No new links found");
            return Ok(report);
        }

        let http = self.http_client.as_ref();
        let fetched: Vec<Result<ScrapedArticle, (String, AppError)>> = stream::iter(new_links)
            .map(move |link| async move {
                let result = source.fetch_article(http, &link).await;
                result.map_err(|e| (link, e))
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let mut scraped = Vec::with_capacity(fetched.len());
        for result in fetched {
            match result {
                Ok(article) => scraped.push(article),
                Err((link, error)) => {
                    report.failed += 1;
                    tracing::warn!(source = name, link = %link, error = %error, "Failed to fetch article");
                }
            }
        }

        // Oldest first, so insertion order follows publication order
        scraped.sort_by_key(|article| article.published_at);

        let mut articles: Vec<NewNewsArticle> = scraped
            .into_iter()
            .map(|article| {
                let mut article = article.into_new_article(name, source.category());
                sanitize_article(&mut article);
                article
            })
            .collect();

        for article in &mut articles {
            if !self.summarize(article).await {
                report.unsummarized += 1;
            }
        }

        report.inserted = self.news.insert_news(&self.token, &articles).await?;

        SYNC_ARTICLES_TOTAL
            .with_label_values(&[name, "inserted"])
            .inc_by(report.inserted as u64);
        SYNC_ARTICLES_TOTAL
            .with_label_values(&[name, "failed"])
            .inc_by(report.failed as u64);

        Ok(report)
    }

    /// Returns false when the article keeps no summary
    async fn summarize(&self, article: &mut NewNewsArticle) -> bool {
        let Some(summarizer) = &self.summarizer else {
            return false;
        };

        tracing::debug!(headline = %article.headline, "Generating summary");
        match summarizer.summarize(article).await {
            Ok(summary) => {
                summary.apply_to(article);
                true
            }
            Err(error) => {
                tracing::error!(link = %article.source_link, error = %error, "Failed to generate summary");
                false
            }
        }
    }
}

/// Drop repeated links, keeping the first occurrence
fn dedupe(links: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::with_capacity(links.len());
    links
        .into_iter()
        .filter(|link| seen.insert(link.clone()))
        .collect()
}
