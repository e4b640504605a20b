//! Prometheus metrics registry and instruments.
//!
//! This module is framework-agnostic and can be used from any layer.

use lazy_static::lazy_static;
use prometheus::{HistogramOpts, IntCounter, IntCounterVec, Opts, Registry};

lazy_static! {
    /// Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // HTTP Metrics
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("newsdesk_http_requests_total", "Total number of HTTP requests"),
        &["method", "endpoint", "status"]
    ).expect("metric can be created");

    // Backend Metrics
    pub static ref BACKEND_REQUESTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("newsdesk_backend_requests_total", "Total number of table API requests"),
        &["operation", "table", "status"]
    ).expect("metric can be created");
    pub static ref BACKEND_REQUEST_DURATION_SECONDS: prometheus::HistogramVec = prometheus::HistogramVec::new(
        HistogramOpts::new(
            "newsdesk_backend_request_duration_seconds",
            "Table API request duration in seconds"
        ).buckets(vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]),
        &["operation", "table"]
    ).expect("metric can be created");

    // Auth Metrics
    pub static ref AUTH_EVENTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("newsdesk_auth_events_total", "Total number of authentication events"),
        &["event", "outcome"]
    ).expect("metric can be created");

    // Contact Metrics
    pub static ref CONTACT_SUBMISSIONS_TOTAL: IntCounter = IntCounter::new(
        "newsdesk_contact_submissions_total",
        "Total number of stored contact submissions"
    ).expect("metric can be created");

    // Sync Metrics
    pub static ref SYNC_ARTICLES_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("newsdesk_sync_articles_total", "Total number of articles handled by the crawler"),
        &["source", "outcome"]
    ).expect("metric can be created");

    // Error Metrics
    pub static ref ERRORS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("newsdesk_errors_total", "Total number of errors"),
        &["error_type"]
    ).expect("metric can be created");
}

/// Initialize metrics registry.
pub fn init_metrics() {
    REGISTRY
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .expect("HTTP_REQUESTS_TOTAL can be registered");
    REGISTRY
        .register(Box::new(BACKEND_REQUESTS_TOTAL.clone()))
        .expect("BACKEND_REQUESTS_TOTAL can be registered");
    REGISTRY
        .register(Box::new(BACKEND_REQUEST_DURATION_SECONDS.clone()))
        .expect("BACKEND_REQUEST_DURATION_SECONDS can be registered");
    REGISTRY
        .register(Box::new(AUTH_EVENTS_TOTAL.clone()))
        .expect("AUTH_EVENTS_TOTAL can be registered");
    REGISTRY
        .register(Box::new(CONTACT_SUBMISSIONS_TOTAL.clone()))
        .expect("CONTACT_SUBMISSIONS_TOTAL can be registered");
    REGISTRY
        .register(Box::new(SYNC_ARTICLES_TOTAL.clone()))
        .expect("SYNC_ARTICLES_TOTAL can be registered");
    REGISTRY
        .register(Box::new(ERRORS_TOTAL.clone()))
        .expect("ERRORS_TOTAL can be registered");

    tracing::info!("Metrics registry initialized");
}

/// Record the outcome of an authentication action.
pub fn record_auth_event(event: &str, ok: bool) {
    let outcome = if ok { "success" } else { "failure" };
    AUTH_EVENTS_TOTAL.with_label_values(&[event, outcome]).inc();
}

/// Record a handled HTTP request.
pub fn record_http_request(method: &str, endpoint: &str, status: u16) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, endpoint, &status.to_string()])
        .inc();
}
