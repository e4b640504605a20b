//! Common test utilities for E2E tests
//!
//! The server runs against in-memory fakes of the identity provider
//! and the hosted tables.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use axum::async_trait;
use chrono::{Duration, TimeZone, Utc};
use newsdesk::auth::{
    AuthSession, AuthUser, IdentityProvider, OtpKind, ProviderError, SignOutScope, SignUpOutcome,
};
use newsdesk::data::{
    ContactRepository, FilterColumn, NewContactSubmission, NewNewsArticle, NewsArticle,
    NewsArticleChanges, NewsFilters, NewsPage, NewsRepository, Profile, ProfileRepository,
    SortField, SortOrder,
};
use newsdesk::error::AppError;
use newsdesk::{AppState, config};
use tokio::net::TcpListener;

pub const EMAIL: &str = "editor@example.com";
pub const PASSWORD: &str = "password123";
pub const ACCESS_TOKEN: &str = "valid-access-token";
pub const REFRESH_TOKEN: &str = "valid-refresh-token";
pub const REFRESHED_ACCESS_TOKEN: &str = "refreshed-access-token";
pub const OTP: &str = "123456";
pub const RESET_CODE: &str = "good-code";
pub const SESSION_SECRET: &str = "test-secret-key-32-bytes-long!!!";

pub fn test_user() -> AuthUser {
    AuthUser {
        id: "user-1".to_string(),
        email: Some(EMAIL.to_string()),
        user_metadata: serde_json::json!({ "full_name": "Ada Editor" }),
    }
}

fn auth_session(access_token: &str) -> AuthSession {
    AuthSession {
        access_token: access_token.to_string(),
        refresh_token: REFRESH_TOKEN.to_string(),
        expires_at: Utc::now() + Duration::hours(1),
        user: test_user(),
    }
}

// =============================================================================
// Identity provider
// =============================================================================

/// Calls worth asserting on
#[derive(Debug, Default)]
pub struct IdentityCalls {
    pub sign_outs: Vec<(String, SignOutScope)>,
    pub sign_ups: Vec<(String, String)>,
    pub resends: Vec<String>,
    pub reset_requests: Vec<(String, String)>,
    pub exchanges: Vec<(String, String)>,
    pub password_updates: Vec<String>,
    pub refreshes: usize,
}

#[derive(Default)]
pub struct FakeIdentity {
    pub calls: Mutex<IdentityCalls>,
    /// Answer every call as an unreachable provider
    pub unavailable: Mutex<bool>,
}

impl FakeIdentity {
    fn check_available(&self) -> Result<(), ProviderError> {
        if *self.unavailable.lock().unwrap() {
            Err(ProviderError::new(0, "connection refused"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl IdentityProvider for FakeIdentity {
    async fn sign_up(
        &self,
        email: &str,
        _password: &str,
        full_name: &str,
        _redirect_to: &str,
    ) -> Result<SignUpOutcome, ProviderError> {
        self.check_available()?;
        if email == "taken@example.com" {
            return Err(ProviderError::new(422, "User already registered"));
        }
        self.calls
            .lock()
            .unwrap()
            .sign_ups
            .push((email.to_string(), full_name.to_string()));
        Ok(SignUpOutcome::ConfirmationSent { user: None })
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, ProviderError> {
        self.check_available()?;
        if email == EMAIL && password == PASSWORD {
            Ok(auth_session(ACCESS_TOKEN))
        } else {
            Err(ProviderError::new(400, "Invalid login credentials"))
        }
    }

    async fn verify_otp(
        &self,
        _email: &str,
        token: &str,
        _kind: OtpKind,
    ) -> Result<AuthSession, ProviderError> {
        self.check_available()?;
        if token == OTP {
            Ok(auth_session(ACCESS_TOKEN))
        } else {
            Err(ProviderError::new(403, "Token has expired or is invalid"))
        }
    }

    async fn resend_otp(&self, email: &str, _kind: OtpKind) -> Result<(), ProviderError> {
        self.check_available()?;
        self.calls.lock().unwrap().resends.push(email.to_string());
        Ok(())
    }

    async fn reset_password_for_email(
        &self,
        email: &str,
        redirect_to: &str,
        _code_challenge: &str,
    ) -> Result<(), ProviderError> {
        self.check_available()?;
        self.calls
            .lock()
            .unwrap()
            .reset_requests
            .push((email.to_string(), redirect_to.to_string()));
        Ok(())
    }

    async fn exchange_code_for_session(
        &self,
        auth_code: &str,
        code_verifier: &str,
    ) -> Result<AuthSession, ProviderError> {
        self.check_available()?;
        self.calls
            .lock()
            .unwrap()
            .exchanges
            .push((auth_code.to_string(), code_verifier.to_string()));
        if auth_code == RESET_CODE && !code_verifier.is_empty() {
            Ok(auth_session(ACCESS_TOKEN))
        } else {
            Err(ProviderError::new(400, "invalid flow state, no valid flow state found"))
        }
    }

    async fn update_user_password(
        &self,
        _access_token: &str,
        password: &str,
    ) -> Result<AuthUser, ProviderError> {
        self.check_available()?;
        self.calls
            .lock()
            .unwrap()
            .password_updates
            .push(password.to_string());
        Ok(test_user())
    }

    async fn sign_out(&self, access_token: &str, scope: SignOutScope) -> Result<(), ProviderError> {
        self.calls
            .lock()
            .unwrap()
            .sign_outs
            .push((access_token.to_string(), scope));
        Ok(())
    }

    async fn get_user(&self, access_token: &str) -> Result<AuthUser, ProviderError> {
        self.check_available()?;
        if access_token == ACCESS_TOKEN || access_token == REFRESHED_ACCESS_TOKEN {
            Ok(test_user())
        } else {
            Err(ProviderError::new(401, "invalid JWT"))
        }
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<AuthSession, ProviderError> {
        self.check_available()?;
        self.calls.lock().unwrap().refreshes += 1;
        if refresh_token == REFRESH_TOKEN {
            Ok(auth_session(REFRESHED_ACCESS_TOKEN))
        } else {
            Err(ProviderError::new(400, "Invalid Refresh Token"))
        }
    }

    fn authorize_url(
        &self,
        provider: &str,
        redirect_to: &str,
        code_challenge: &str,
        extra_params: &[(&str, &str)],
    ) -> Result<url::Url, ProviderError> {
        let mut url = url::Url::parse("https://project.supabase.co/auth/v1/authorize")
            .map_err(|e| ProviderError::new(0, e.to_string()))?;
        url.query_pairs_mut()
            .append_pair("provider", provider)
            .append_pair("redirect_to", redirect_to)
            .append_pair("code_challenge", code_challenge)
            .append_pair("code_challenge_method", "s256")
            .extend_pairs(extra_params);
        Ok(url)
    }
}

// =============================================================================
// Tables
// =============================================================================

pub fn article(id: i64, headline: &str, category: &str, source: &str) -> NewsArticle {
    let created_at = Utc
        .with_ymd_and_hms(2025, 1, 1, 12, 0, 0)
        .single()
        .unwrap()
        + Duration::hours(id);
    NewsArticle {
        id,
        source_name: source.to_string(),
        category: category.to_string(),
        headline: headline.to_string(),
        story: format!("Story of {headline}"),
        summary: Some(format!("Summary of {headline}")),
        bullet_points: Some(vec!["First point".to_string(), "Second point".to_string()]),
        image_link: None,
        source_link: format!("https://news.example/articles/{id}"),
        meta_description: None,
        meta_keywords: Some("Politics, Europe".to_string()),
        created_at,
        updated_at: created_at,
    }
}

#[derive(Default)]
pub struct MemoryNews {
    pub rows: Mutex<Vec<NewsArticle>>,
    /// Bearer of every call, in order
    pub tokens: Mutex<Vec<String>>,
    pub fail_writes: Mutex<bool>,
}

impl MemoryNews {
    pub fn with_rows(rows: Vec<NewsArticle>) -> Self {
        Self {
            rows: Mutex::new(rows),
            ..Default::default()
        }
    }

    fn seen(&self, token: &str) {
        self.tokens.lock().unwrap().push(token.to_string());
    }

    fn check_writes(&self) -> Result<(), AppError> {
        if *self.fail_writes.lock().unwrap() {
            Err(AppError::Backend {
                status: 500,
                message: "write failed".to_string(),
            })
        } else {
            Ok(())
        }
    }
}

fn sort_key(article: &NewsArticle, field: SortField) -> String {
    match field {
        SortField::Headline => article.headline.to_lowercase(),
        SortField::Category => article.category.to_lowercase(),
        SortField::SourceName => article.source_name.to_lowercase(),
        SortField::CreatedAt => article.created_at.to_rfc3339(),
        SortField::UpdatedAt => article.updated_at.to_rfc3339(),
    }
}

#[async_trait]
impl NewsRepository for MemoryNews {
    async fn list_news(&self, token: &str, filters: &NewsFilters) -> Result<NewsPage, AppError> {
        self.seen(token);
        let query = filters
            .query
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(str::to_lowercase);

        let mut rows: Vec<NewsArticle> = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|a| {
                query
                    .as_deref()
                    .is_none_or(|q| a.headline.to_lowercase().contains(q))
            })
            .filter(|a| filters.category.as_deref().is_none_or(|c| a.category == c))
            .filter(|a| filters.source.as_deref().is_none_or(|s| a.source_name == s))
            .cloned()
            .collect();

        rows.sort_by_key(|a| sort_key(a, filters.sort));
        if filters.order == SortOrder::Desc {
            rows.reverse();
        }

        let count = rows.len() as u64;
        let data = rows
            .into_iter()
            .skip(filters.offset as usize)
            .take(filters.limit as usize)
            .collect();
        Ok(NewsPage { data, count })
    }

    async fn get_news(&self, token: &str, id: i64) -> Result<Option<NewsArticle>, AppError> {
        self.seen(token);
        Ok(self.rows.lock().unwrap().iter().find(|a| a.id == id).cloned())
    }

    async fn update_news(
        &self,
        token: &str,
        id: i64,
        changes: &NewsArticleChanges,
    ) -> Result<Option<NewsArticle>, AppError> {
        self.seen(token);
        self.check_writes()?;
        let mut rows = self.rows.lock().unwrap();
        Ok(rows.iter_mut().find(|a| a.id == id).map(|article| {
            changes.apply_to(article);
            article.updated_at = Utc::now();
            article.clone()
        }))
    }

    async fn delete_news(&self, token: &str, id: i64) -> Result<bool, AppError> {
        self.seen(token);
        self.check_writes()?;
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|a| a.id != id);
        Ok(rows.len() != before)
    }

    async fn distinct_values(
        &self,
        token: &str,
        column: FilterColumn,
    ) -> Result<Vec<String>, AppError> {
        self.seen(token);
        let mut values: Vec<String> = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .map(|a| match column {
                FilterColumn::Category => a.category.clone(),
                FilterColumn::SourceName => a.source_name.clone(),
            })
            .collect();
        values.sort();
        values.dedup();
        Ok(values)
    }

    async fn existing_source_links(
        &self,
        token: &str,
        links: &[String],
    ) -> Result<HashSet<String>, AppError> {
        self.seen(token);
        let rows = self.rows.lock().unwrap();
        Ok(links
            .iter()
            .filter(|link| rows.iter().any(|a| &a.source_link == *link))
            .cloned()
            .collect())
    }

    async fn insert_news(
        &self,
        token: &str,
        articles: &[NewNewsArticle],
    ) -> Result<usize, AppError> {
        self.seen(token);
        self.check_writes()?;
        let mut rows = self.rows.lock().unwrap();
        let mut inserted = 0;
        for new in articles {
            if rows.iter().any(|a| a.source_link == new.source_link) {
                continue;
            }
            let id = rows.iter().map(|a| a.id).max().unwrap_or(0) + 1;
            let now = Utc::now();
            rows.push(NewsArticle {
                id,
                source_name: new.source_name.clone(),
                category: new.category.clone(),
                headline: new.headline.clone(),
                story: new.story.clone(),
                summary: new.summary.clone(),
                bullet_points: new.bullet_points.clone(),
                image_link: new.image_link.clone(),
                source_link: new.source_link.clone(),
                meta_description: new.meta_description.clone(),
                meta_keywords: new.meta_keywords.clone(),
                created_at: now,
                updated_at: now,
            });
            inserted += 1;
        }
        Ok(inserted)
    }
}

#[derive(Default)]
pub struct MemoryContacts {
    pub rows: Mutex<Vec<NewContactSubmission>>,
    pub fail: Mutex<bool>,
}

#[async_trait]
impl ContactRepository for MemoryContacts {
    async fn insert_contact(&self, submission: &NewContactSubmission) -> Result<(), AppError> {
        if *self.fail.lock().unwrap() {
            return Err(AppError::Backend {
                status: 503,
                message: "unavailable".to_string(),
            });
        }
        self.rows.lock().unwrap().push(submission.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryProfiles {
    pub rows: Mutex<Vec<(String, Profile)>>,
}

#[async_trait]
impl ProfileRepository for MemoryProfiles {
    async fn upsert_profile(&self, token: &str, profile: &Profile) -> Result<(), AppError> {
        let mut rows = self.rows.lock().unwrap();
        rows.retain(|(_, p)| p.id != profile.id);
        rows.push((token.to_string(), profile.clone()));
        Ok(())
    }
}

// =============================================================================
// Server
// =============================================================================

pub fn test_config() -> config::AppConfig {
    config::AppConfig {
        server: config::ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0, // Let OS assign port
            domain: "localhost".to_string(),
            protocol: "http".to_string(),
        },
        backend: config::BackendConfig {
            url: "https://project.supabase.co".to_string(),
            anon_key: "test-anon-key".to_string(),
            service_role_key: None,
            timeout_seconds: 5,
        },
        auth: config::AuthConfig {
            session_secret: SESSION_SECRET.to_string(),
            session_max_age: 604800,
            otp_resend_cooldown_seconds: 60,
        },
        oauth: config::OAuthConfig {
            provider: "google".to_string(),
        },
        dashboard: config::DashboardConfig { page_size: 2 },
        sync: config::SyncConfig::default(),
        logging: config::LoggingConfig {
            level: "info".to_string(),
            format: "pretty".to_string(),
        },
    }
}

/// Test server instance
pub struct TestServer {
    pub addr: String,
    pub state: AppState,
    /// Follows redirects
    pub client: reqwest::Client,
    pub identity: Arc<FakeIdentity>,
    pub news: Arc<MemoryNews>,
    pub contacts: Arc<MemoryContacts>,
    pub profiles: Arc<MemoryProfiles>,
}

impl TestServer {
    /// Create a new test server instance
    pub async fn new() -> Self {
        Self::with_news(Vec::new()).await
    }

    /// Server whose `news` table starts with `rows`
    pub async fn with_news(rows: Vec<NewsArticle>) -> Self {
        Self::start(test_config(), MemoryNews::with_rows(rows)).await
    }

    pub async fn start(config: config::AppConfig, news: MemoryNews) -> Self {
        let identity = Arc::new(FakeIdentity::default());
        let news = Arc::new(news);
        let contacts = Arc::new(MemoryContacts::default());
        let profiles = Arc::new(MemoryProfiles::default());

        let state = AppState::from_parts(
            config,
            identity.clone(),
            news.clone(),
            contacts.clone(),
            profiles.clone(),
            Arc::new(reqwest::Client::new()),
        );

        // Create HTTP client
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .unwrap();

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let addr_str = format!("http://{}", addr);

        let app = newsdesk::build_router(state.clone());

        // Spawn server in background
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Wait a bit for server to start
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        Self {
            addr: addr_str,
            state,
            client,
            identity,
            news,
            contacts,
            profiles,
        }
    }

    /// Get base URL for requests
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.addr, path)
    }

    /// `Cookie` header value for a signed-in session
    pub fn session_cookie(&self) -> String {
        self.session_cookie_expiring(Utc::now() + Duration::hours(1))
    }

    pub fn session_cookie_expiring(&self, expires_at: chrono::DateTime<Utc>) -> String {
        use newsdesk::auth::{SESSION_COOKIE, Session, create_session_token};

        let session = Session {
            user_id: "user-1".to_string(),
            email: Some(EMAIL.to_string()),
            full_name: Some("Ada Editor".to_string()),
            access_token: ACCESS_TOKEN.to_string(),
            refresh_token: REFRESH_TOKEN.to_string(),
            expires_at,
            created_at: Utc::now(),
        };
        let token = create_session_token(&session, &self.state.config.auth.session_secret)
            .expect("Failed to create test token");
        format!("{SESSION_COOKIE}={token}")
    }
}

pub fn no_redirect_client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .timeout(std::time::Duration::from_secs(10))
        .build()
        .expect("failed to build no-redirect client")
}

pub fn location(response: &reqwest::Response) -> String {
    response
        .headers()
        .get("location")
        .and_then(|v| v.to_str().ok())
        .expect("location header")
        .to_string()
}

/// All `Set-Cookie` headers joined, for substring checks
pub fn set_cookies(response: &reqwest::Response) -> String {
    response
        .headers()
        .get_all("set-cookie")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Value of the named cookie in the `Set-Cookie` headers
pub fn cookie_value(response: &reqwest::Response, name: &str) -> Option<String> {
    response
        .headers()
        .get_all("set-cookie")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|header| header.split(';').next())
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| key.trim() == name)
        .map(|(_, value)| value.to_string())
}
