//! Configuration management
//!
//! Loads configuration from:
//! 1. Default values
//! 2. Configuration file (config/default.toml, config/local.toml)
//! 3. Environment variables (override)

use serde::Deserialize;
use std::net::IpAddr;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub backend: BackendConfig,
    pub auth: AuthConfig,
    pub oauth: OAuthConfig,
    pub dashboard: DashboardConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0")
    pub host: String,
    /// Port number (e.g., 8080)
    pub port: u16,
    /// Public domain (e.g., "news.example.com")
    pub domain: String,
    /// Protocol ("http" or "https")
    pub protocol: String,
}

impl ServerConfig {
    /// Get the public base URL of the site
    ///
    /// # Returns
    /// Full URL like "https://news.example.com"
    pub fn base_url(&self) -> String {
        format!("{}://{}", self.protocol, self.domain)
    }
}

/// Hosted backend (identity + table API)
#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    /// Project URL, e.g. "https://abc.supabase.co"
    pub url: String,
    /// Public anon key sent as `apikey` on every request
    pub anon_key: String,
    /// Service role key, only needed by the crawler
    pub service_role_key: Option<String>,
    /// Request timeout in seconds
    pub timeout_seconds: u64,
}

/// Authentication configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Session cookie signing key (32+ bytes)
    pub session_secret: String,
    /// Session cookie max age in seconds (default: 604800 = 7 days)
    pub session_max_age: i64,
    /// Minimum delay between two OTP resend requests
    pub otp_resend_cooldown_seconds: i64,
}

/// OAuth sign-in configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OAuthConfig {
    /// Provider name understood by the identity API
    pub provider: String,
}

/// Dashboard configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DashboardConfig {
    /// Rows per page
    pub page_size: u32,
}

/// Crawler configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
    /// Run the crawler on an interval
    #[serde(default)]
    pub enabled: bool,
    /// Interval between runs in seconds
    pub interval_seconds: u64,
    /// Article pages fetched in parallel per source
    pub concurrency: usize,
    /// Sources to crawl, in order
    #[serde(default = "default_sync_sources")]
    pub sources: Vec<String>,
    #[serde(default)]
    pub summarizer: SummarizerConfig,
}

/// Names accepted in `sync.sources`
pub const KNOWN_SOURCES: &[&str] = &["bbc", "cnn", "guardian", "aljazeera", "reuters"];

fn default_sync_sources() -> Vec<String> {
    KNOWN_SOURCES.iter().map(|s| s.to_string()).collect()
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_seconds: 3600,
            concurrency: 2,
            sources: default_sync_sources(),
            summarizer: SummarizerConfig::default(),
        }
    }
}

/// Chat-completion summarizer configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SummarizerConfig {
    /// API key; when absent articles are stored without a summary
    pub api_key: Option<String>,
    #[serde(default = "default_summarizer_base_url")]
    pub base_url: String,
    #[serde(default = "default_summarizer_model")]
    pub model: String,
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_summarizer_base_url(),
            model: default_summarizer_model(),
        }
    }
}

fn default_summarizer_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_summarizer_model() -> String {
    "gpt-4o-mini-2024-07-18".to_string()
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    pub level: String,
    /// Log format: "pretty" or "json"
    pub format: String,
}

impl LoggingConfig {
    /// Filter used when `RUST_LOG` is not set
    pub fn default_directive(&self) -> String {
        let level = self.level.trim().to_ascii_lowercase();
        format!("newsdesk={level},tower_http={level}")
    }
}

impl AppConfig {
    /// Load configuration from file and environment
    ///
    /// # Loading Order
    /// 1. Default values
    /// 2. config/default.toml (if exists)
    /// 3. config/local.toml (if exists)
    /// 4. Environment variables (NEWSDESK__*)
    ///
    /// # Errors
    /// Returns error if configuration is invalid
    pub fn load() -> Result<Self, crate::error::AppError> {
        let app_config = Self::read()?;
        app_config.validate()?;
        Ok(app_config)
    }

    /// Load without validating, so logging can be configured before
    /// `validate` reports anything
    pub fn read() -> Result<Self, crate::error::AppError> {
        use config::{Config, Environment, File};

        let config = Config::builder()
            // Start with default values
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("server.domain", "localhost:8080")?
            .set_default("server.protocol", "http")?
            .set_default("backend.timeout_seconds", 15)?
            .set_default("auth.session_max_age", 604800)?
            .set_default("auth.otp_resend_cooldown_seconds", 60)?
            .set_default("oauth.provider", "google")?
            .set_default("dashboard.page_size", 20)?
            .set_default("sync.enabled", false)?
            .set_default("sync.interval_seconds", 3600)?
            .set_default("sync.concurrency", 2)?
            .set_default("sync.sources", KNOWN_SOURCES.to_vec())?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(
                Environment::with_prefix("NEWSDESK")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("sync.sources"),
            )
            .build()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;

        config
            .try_deserialize()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))
    }

    pub fn should_use_secure_cookies(&self) -> bool {
        self.server.protocol.eq_ignore_ascii_case("https")
            || !is_local_server_domain(&self.server.domain)
    }

    /// Token the crawler writes with
    pub fn crawler_token(&self) -> Option<&str> {
        self.backend
            .service_role_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }

    pub fn validate(&self) -> Result<(), crate::error::AppError> {
        const MIN_SESSION_SECRET_BYTES: usize = 32;

        if self.auth.session_secret.as_bytes().len() < MIN_SESSION_SECRET_BYTES {
            return Err(crate::error::AppError::Config(format!(
                "auth.session_secret must be at least {} bytes",
                MIN_SESSION_SECRET_BYTES
            )));
        }

        if self.auth.session_max_age <= 0 {
            return Err(crate::error::AppError::Config(
                "auth.session_max_age must be greater than 0".to_string(),
            ));
        }

        if self.auth.otp_resend_cooldown_seconds < 0 {
            return Err(crate::error::AppError::Config(
                "auth.otp_resend_cooldown_seconds must not be negative".to_string(),
            ));
        }

        if url::Url::parse(&self.backend.url).is_err() {
            return Err(crate::error::AppError::Config(format!(
                "backend.url is not a valid URL: {}",
                self.backend.url
            )));
        }

        if self.backend.anon_key.trim().is_empty() {
            return Err(crate::error::AppError::Config(
                "backend.anon_key must not be empty".to_string(),
            ));
        }

        if !(1..=100).contains(&self.dashboard.page_size) {
            return Err(crate::error::AppError::Config(
                "dashboard.page_size must be between 1 and 100".to_string(),
            ));
        }

        if let Some(unknown) = self
            .sync
            .sources
            .iter()
            .find(|name| !KNOWN_SOURCES.contains(&name.trim().to_ascii_lowercase().as_str()))
        {
            return Err(crate::error::AppError::Config(format!(
                "sync.sources has unknown source {unknown:?}; expected one of {}",
                KNOWN_SOURCES.join(", ")
            )));
        }

        if self.sync.enabled && self.crawler_token().is_none() {
            return Err(crate::error::AppError::Config(
                "backend.service_role_key is required when sync.enabled=true".to_string(),
            ));
        }

        if !self.should_use_secure_cookies() {
            let host = normalized_server_host(&self.server.domain);
            tracing::warn!(
                host = %host,
                protocol = %self.server.protocol,
                "Using insecure session cookies for local development"
            );
        } else if !self.server.protocol.eq_ignore_ascii_case("https") {
            return Err(crate::error::AppError::Config(
                "server.protocol must be https for non-local server domains".to_string(),
            ));
        }

        Ok(())
    }
}

fn normalized_server_host(domain: &str) -> String {
    let trimmed = domain.trim();
    let parsed_host = url::Url::parse(&format!("http://{trimmed}"))
        .ok()
        .and_then(|url| url.host_str().map(|host| host.to_string()));
    let host = parsed_host.unwrap_or_else(|| trimmed.to_string());
    host.trim_end_matches('.').to_ascii_lowercase()
}

fn is_local_server_domain(domain: &str) -> bool {
    let host = normalized_server_host(domain);
    if host == "localhost" || host.ends_with(".localhost") {
        return true;
    }

    if let Ok(ip) = host.trim_matches(|c| c == '[' || c == ']').parse::<IpAddr>() {
        return ip.is_loopback() || ip.is_unspecified();
    }

    false
}
