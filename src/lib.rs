//! Newsdesk - a server-rendered news dashboard
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      HTTP Layer (Axum)                       │
//! │  - Auth pages (sign in/up, OTP, password reset, OAuth)      │
//! │  - Dashboard, contact form, static pages                    │
//! │  - Route guard middleware                                   │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Service Layer                            │
//! │  - News listing, filters, pagination                        │
//! │  - Crawler (sources, summaries)                             │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  Hosted Backend (reqwest)                    │
//! │  - Identity API (sessions, OTP, OAuth)                      │
//! │  - Table API (news, contact_submissions, profiles)          │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - `api`: HTML handlers for the dashboard, contact and static pages
//! - `auth`: Identity client, session cookies, route guard
//! - `service`: News listing logic
//! - `sync`: News crawler
//! - `data`: Table API client
//! - `validation`: Form validation
//! - `config`: Configuration management
//! - `error`: Error types

pub mod api;
pub mod auth;
pub mod config;
pub mod data;
pub mod error;
pub mod metrics;
pub mod service;
pub mod sync;
pub mod validation;

use std::sync::Arc;

/// Request body limit for form posts
const MAX_BODY_BYTES: usize = 64 * 1024;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<config::AppConfig>,

    /// Identity provider (sessions, sign up, OAuth)
    pub identity: Arc<dyn auth::IdentityProvider>,

    /// `news` table
    pub news: Arc<dyn data::NewsRepository>,

    /// `contact_submissions` table
    pub contacts: Arc<dyn data::ContactRepository>,

    /// `profiles` table
    pub profiles: Arc<dyn data::ProfileRepository>,

    /// Crawler, present when a service role key is configured
    pub crawler: Option<Arc<sync::Crawler>>,

    /// Shared HTTP client
    pub http_client: Arc<reqwest::Client>,
}

impl AppState {
    /// Initialize application state
    ///
    /// # Steps
    /// 1. Build the shared HTTP client
    /// 2. Create the identity and table API clients
    /// 3. Create the crawler when a service role key is set
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be built
    pub async fn new(config: config::AppConfig) -> Result<Self, error::AppError> {
        tracing::info!("Initializing application state...");

        let http_client = Arc::new(
            reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(
                    config.backend.timeout_seconds,
                ))
                .user_agent(concat!("Newsdesk/", env!("CARGO_PKG_VERSION")))
                .build()
                .map_err(|e| {
                    error::AppError::Config(format!("failed to build HTTP client: {e}"))
                })?,
        );

        let identity = Arc::new(auth::GoTrueClient::new(
            http_client.clone(),
            &config.backend,
        ));
        let rest = Arc::new(data::RestClient::new(http_client.clone(), &config.backend));
        tracing::info!(url = %config.backend.url, "Backend clients created");

        let state = Self::from_parts(
            config,
            identity,
            rest.clone(),
            rest.clone(),
            rest,
            http_client,
        );

        if state.crawler.is_none() {
            tracing::info!("No service role key configured; crawler disabled");
        }

        tracing::info!("Application state initialized");
        Ok(state)
    }

    /// Assemble state from existing clients
    ///
    /// Used by `new` and by tests that swap in fake backends.
    pub fn from_parts(
        config: config::AppConfig,
        identity: Arc<dyn auth::IdentityProvider>,
        news: Arc<dyn data::NewsRepository>,
        contacts: Arc<dyn data::ContactRepository>,
        profiles: Arc<dyn data::ProfileRepository>,
        http_client: Arc<reqwest::Client>,
    ) -> Self {
        let crawler = sync::Crawler::from_config(&config, http_client.clone(), news.clone())
            .map(Arc::new);

        Self {
            config: Arc::new(config),
            identity,
            news,
            contacts,
            profiles,
            crawler,
            http_client,
        }
    }
}

/// Build the Axum router with all routes.
///
/// This is shared by the binary and integration tests to keep route
/// composition consistent across environments.
pub fn build_router(state: AppState) -> axum::Router {
    use axum::Router;
    use axum::middleware::{from_fn, from_fn_with_state};
    use tower_http::{
        compression::CompressionLayer, limit::RequestBodyLimitLayer, trace::TraceLayer,
    };

    Router::new()
        .route("/health", axum::routing::get(health_check))
        .merge(auth::auth_router())
        .merge(api::dashboard_router())
        .merge(api::contact_router())
        .merge(api::pages_router())
        .layer(from_fn_with_state(state.clone(), auth::route_guard))
        .layer(from_fn(api::track_requests))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
        .merge(api::metrics_router())
}

async fn health_check() -> &'static str {
    "OK"
}
