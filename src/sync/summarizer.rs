//! Article summaries from an OpenAI-compatible chat completion API

use std::sync::Arc;

use axum::async_trait;
use serde::Deserialize;
use serde_json::json;

use crate::config::SummarizerConfig;
use crate::data::NewNewsArticle;
use crate::error::AppError;

const SYSTEM_PROMPT: &str = "You summarise international news articles for editors. \
Write a neutral, factual summary of 300 to 400 words without commentary or speculation. \
Keep every significant figure, date and direct quote with its attribution. \
List 3 to 5 self-contained key points, each covering a distinct aspect of the story. \
Tag the article with its primary and secondary topic categories and state whether \
the reported facts are VERIFIED, UNVERIFIED or PENDING. \
Answer only with JSON matching the provided schema.";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SummaryMetadata {
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(rename = "verificationStatus", default)]
    pub verification_status: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ArticleSummary {
    pub metadata: SummaryMetadata,
    pub summary: String,
    #[serde(default)]
    pub key_points: Vec<String>,
}

impl ArticleSummary {
    /// Copy the summary into the article's columns
    pub fn apply_to(self, article: &mut NewNewsArticle) {
        article.summary = Some(self.summary);
        article.bullet_points = Some(self.key_points);
        article.meta_keywords = Some(self.metadata.categories.join(", "));
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ArticleSummarizer: Send + Sync {
    async fn summarize(&self, article: &NewNewsArticle) -> Result<ArticleSummary, AppError>;
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    content: Option<String>,
}

fn response_format() -> serde_json::Value {
    json!({
        "type": "json_schema",
        "json_schema": {
            "name": "article_summary",
            "strict": false,
            "schema": {
                "type": "object",
                "required": ["metadata", "summary", "key_points"],
                "properties": {
                    "metadata": {
                        "type": "object",
                        "required": ["source", "categories", "verificationStatus"],
                        "properties": {
                            "source": { "type": "string" },
                            "categories": { "type": "array", "items": { "type": "string" } },
                            "verificationStatus": {
                                "type": "string",
                                "enum": ["VERIFIED", "UNVERIFIED", "PENDING"]
                            }
                        }
                    },
                    "summary": { "type": "string" },
                    "key_points": { "type": "array", "items": { "type": "string" } }
                }
            }
        }
    })
}

/// Parse the assistant message of a completion response
fn parse_completion(body: &str) -> Result<ArticleSummary, AppError> {
    let response: CompletionResponse = serde_json::from_str(body)
        .map_err(|e| AppError::Summarizer(format!("invalid completion response: {e}")))?;

    let content = response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| AppError::Summarizer("completion has no content".to_string()))?;

    serde_json::from_str(&content)
        .map_err(|e| AppError::Summarizer(format!("summary does not match schema: {e}")))
}

/// Chat-completion backed summarizer
pub struct ChatSummarizer {
    http_client: Arc<reqwest::Client>,
    endpoint: String,
    api_key: String,
    model: String,
}

impl ChatSummarizer {
    /// None when no API key is configured
    pub fn from_config(http_client: Arc<reqwest::Client>, config: &SummarizerConfig) -> Option<Self> {
        let api_key = config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())?;

        Some(Self {
            http_client,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            api_key: api_key.to_string(),
            model: config.model.clone(),
        })
    }
}

#[async_trait]
impl ArticleSummarizer for ChatSummarizer {
    async fn summarize(&self, article: &NewNewsArticle) -> Result<ArticleSummary, AppError> {
        let request = json!({
            "model": self.model,
            "temperature": 0.0,
            "response_format": response_format(),
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                {
                    "role": "user",
                    "content": format!(
                        "Source: {}\nHeadline: {}\nStory: {}",
                        article.source_name, article.headline, article.story
                    )
                }
            ]
        });

        let response = self
            .http_client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(AppError::Summarizer(format!(
                "completion request failed with status {status}"
            )));
        }

        parse_completion(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article() -> NewNewsArticle {
        NewNewsArticle {
            source_name: "BBC News".to_string(),
            category: "World".to_string(),
            headline: "Headline".to_string(),
            story: "Story".to_string(),
            summary: None,
            bullet_points: None,
            image_link: None,
            source_link: "https://www.bbc.com/news/articles/c1".to_string(),
            meta_description: None,
            meta_keywords: None,
        }
    }

    #[test]
    fn completion_content_is_parsed() {
        let content = json!({
            "metadata": {
                "source": "BBC News",
                "categories": ["Politics", "Europe"],
                "verificationStatus": "VERIFIED"
            },
            "summary": "Leaders met.",
            "key_points": ["One", "Two", "Three"]
        })
        .to_string();
        let body = json!({ "choices": [{ "message": { "role": "assistant", "content": content } }] })
            .to_string();

        let summary = parse_completion(&body).unwrap();
        assert_eq!(summary.metadata.verification_status, "VERIFIED");

        let mut article = article();
        summary.apply_to(&mut article);
        assert_eq!(article.summary.as_deref(), Some("Leaders met."));
        assert_eq!(article.bullet_points.as_ref().map(Vec::len), Some(3));
        assert_eq!(article.meta_keywords.as_deref(), Some("Politics, Europe"));
    }

    #[test]
    fn empty_or_malformed_completion_is_an_error() {
        assert!(matches!(
            parse_completion(r#"{"choices":[]}"#),
            Err(AppError::Summarizer(_))
        ));
        let body = json!({ "choices": [{ "message": { "content": "not json" } }] }).to_string();
        assert!(matches!(parse_completion(&body), Err(AppError::Summarizer(_))));
    }

    #[test]
    fn summarizer_requires_api_key() {
        let http = Arc::new(reqwest::Client::new());
        assert!(ChatSummarizer::from_config(http.clone(), &SummarizerConfig::default()).is_none());

        let config = SummarizerConfig {
            api_key: Some("sk-test".to_string()),
            base_url: "https://llm.example/v1/".to_string(),
            model: "small".to_string(),
        };
        let summarizer = ChatSummarizer::from_config(http, &config).unwrap();
        assert_eq!(summarizer.endpoint, "https://llm.example/v1/chat/completions");
    }

    #[test]
    fn schema_names_response_format() {
        let format = response_format();
        assert_eq!(format["json_schema"]["name"], "article_summary");
        assert_eq!(format["type"], "json_schema");
    }
}
