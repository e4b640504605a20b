//! E2E tests for the table and identity API clients against a mock backend

use std::sync::{Arc, Mutex};

use axum::{
    Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
};
use newsdesk::auth::{GoTrueClient, IdentityProvider, SignOutScope};
use newsdesk::config::BackendConfig;
use newsdesk::data::{
    ContactRepository, NewContactSubmission, NewNewsArticle, NewsFilters, NewsRepository,
    RestClient, SortField, SortOrder,
};
use newsdesk::error::AppError;
use tokio::net::TcpListener;

/// One request as seen by the mock backend
#[derive(Debug, Clone)]
struct Recorded {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    headers: HeaderMap,
    body: String,
}

impl Recorded {
    fn param(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

type Log = Arc<Mutex<Vec<Recorded>>>;

const ARTICLE_JSON: &str = r#"[{
    "id": 7,
    "source_name": "BBC News",
    "category": "World",
    "headline": "Summit opens",
    "story": "Leaders met.",
    "summary": null,
    "bullet_points": ["One"],
    "image_link": null,
    "source_link": "https://www.bbc.com/news/articles/c7",
    "meta_description": null,
    "meta_keywords": null,
    "created_at": "2025-03-01T10:00:00Z",
    "updated_at": "2025-03-01T10:00:00Z"
}]"#;

fn canned(method: &Method, path: &str, headers: &HeaderMap) -> Response {
    let bearer = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    match (method.as_str(), path) {
        (_, "/rest/v1/news") if bearer == "Bearer expired" => (
            StatusCode::UNAUTHORIZED,
            r#"{"code":"PGRST301","message":"JWT expired","details":null}"#,
        )
            .into_response(),
        ("GET", "/rest/v1/news") if bearer == "Bearer past-end" => (
            StatusCode::RANGE_NOT_SATISFIABLE,
            [("content-range", "*/42"), ("content-type", "application/json")],
            r#"{"code":"PGRST103","message":"Requested range not satisfiable","details":null}"#,
        )
            .into_response(),
        ("GET", "/rest/v1/news") => (
            StatusCode::OK,
            [("content-range", "0-0/42"), ("content-type", "application/json")],
            ARTICLE_JSON,
        )
            .into_response(),
        ("POST", "/rest/v1/news") => (
            StatusCode::CREATED,
            [("content-type", "application/json")],
            r#"[{"id":8}]"#,
        )
            .into_response(),
        ("POST", "/rest/v1/contact_submissions") => StatusCode::CREATED.into_response(),
        ("POST", "/auth/v1/token") if bearer == "Bearer anon-key" => (
            StatusCode::BAD_REQUEST,
            [("content-type", "application/json")],
            r#"{"code":400,"error_code":"invalid_credentials","msg":"Invalid login credentials"}"#,
        )
            .into_response(),
        ("POST", "/auth/v1/logout") => StatusCode::NO_CONTENT.into_response(),
        ("GET", "/auth/v1/user") => (
            StatusCode::OK,
            [("content-type", "application/json")],
            r#"{"id":"user-1","email":"ada@example.com","user_metadata":{"full_name":"Ada"}}"#,
        )
            .into_response(),
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn record(
    State(log): State<Log>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let query = url::form_urlencoded::parse(uri.query().unwrap_or_default().as_bytes())
        .into_owned()
        .collect();
    let response = canned(&method, uri.path(), &headers);
    log.lock().unwrap().push(Recorded {
        method,
        path: uri.path().to_string(),
        query,
        headers,
        body: String::from_utf8_lossy(&body).into_owned(),
    });
    response
}

/// Start the mock backend and return its config and request log
async fn mock_backend() -> (BackendConfig, Log) {
    let log: Log = Arc::default();
    let app = Router::new().fallback(record).with_state(log.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let config = BackendConfig {
        url: format!("http://{addr}/"),
        anon_key: "anon-key".to_string(),
        service_role_key: None,
        timeout_seconds: 5,
    };
    (config, log)
}

fn last(log: &Log) -> Recorded {
    log.lock().unwrap().last().cloned().expect("a request was made")
}

#[tokio::test]
async fn test_list_news_sends_filters_and_reads_total() {
    let (config, log) = mock_backend().await;
    let client = RestClient::new(Arc::new(reqwest::Client::new()), &config);

    let filters = NewsFilters {
        limit: 20,
        offset: 40,
        query: Some("summit".to_string()),
        sort: SortField::Headline,
        order: SortOrder::Asc,
        category: Some("World".to_string()),
        source: None,
    };
    let page = client.list_news("user-token", &filters).await.unwrap();

    assert_eq!(page.count, 42);
    assert_eq!(page.data.len(), 1);
    assert_eq!(page.data[0].headline, "Summit opens");

    let request = last(&log);
    assert_eq!(request.method, Method::GET);
    assert_eq!(request.path, "/rest/v1/news");
    assert_eq!(request.param("headline"), Some("ilike.*summit*"));
    assert_eq!(request.param("category"), Some("eq.World"));
    assert_eq!(request.param("source_name"), None);
    assert_eq!(request.param("order"), Some("headline.asc"));
    assert_eq!(request.param("offset"), Some("40"));
    assert_eq!(request.param("limit"), Some("20"));
    assert_eq!(request.header("apikey"), Some("anon-key"));
    assert_eq!(request.header("authorization"), Some("Bearer user-token"));
    assert_eq!(request.header("prefer"), Some("count=exact"));
}

#[tokio::test]
async fn test_list_news_past_the_end_keeps_total() {
    let (config, _log) = mock_backend().await;
    let client = RestClient::new(Arc::new(reqwest::Client::new()), &config);

    let filters = NewsFilters {
        offset: 1000,
        ..NewsFilters::default()
    };
    let page = client.list_news("past-end", &filters).await.unwrap();

    assert_eq!(page.count, 42);
    assert!(page.data.is_empty());
}

#[tokio::test]
async fn test_table_errors_carry_backend_message() {
    let (config, _log) = mock_backend().await;
    let client = RestClient::new(Arc::new(reqwest::Client::new()), &config);

    let error = client
        .list_news("expired", &NewsFilters::default())
        .await
        .unwrap_err();

    match error {
        AppError::Backend { status, message } => {
            assert_eq!(status, 401);
            assert_eq!(message, "JWT expired");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_insert_news_ignores_duplicates() {
    let (config, log) = mock_backend().await;
    let client = RestClient::new(Arc::new(reqwest::Client::new()), &config);

    let article = NewNewsArticle {
        source_name: "BBC News".to_string(),
        category: "World".to_string(),
        headline: "Summit opens".to_string(),
        story: "Leaders met.".to_string(),
        summary: None,
        bullet_points: None,
        image_link: None,
        source_link: "https://www.bbc.com/news/articles/c8".to_string(),
        meta_description: None,
        meta_keywords: None,
    };
    let inserted = client
        .insert_news("service-key", &[article.clone(), article])
        .await
        .unwrap();
    assert_eq!(inserted, 1);

    let request = last(&log);
    assert_eq!(request.method, Method::POST);
    assert_eq!(request.param("on_conflict"), Some("source_link"));
    assert_eq!(
        request.header("prefer"),
        Some("resolution=ignore-duplicates,return=representation")
    );
    assert_eq!(request.header("authorization"), Some("Bearer service-key"));

    let body: serde_json::Value = serde_json::from_str(&request.body).unwrap();
    assert_eq!(body.as_array().map(Vec::len), Some(2));

    // Nothing to insert means no request
    let before = log.lock().unwrap().len();
    assert_eq!(client.insert_news("service-key", &[]).await.unwrap(), 0);
    assert_eq!(log.lock().unwrap().len(), before);
}

#[tokio::test]
async fn test_existing_links_are_quoted() {
    let (config, log) = mock_backend().await;
    let client = RestClient::new(Arc::new(reqwest::Client::new()), &config);

    let links = vec![
        "https://x.example/a,b".to_string(),
        "https://x.example/c".to_string(),
    ];
    // The canned response is a full article row, which carries source_link
    let existing = client
        .existing_source_links("service-key", &links)
        .await
        .unwrap();
    assert!(existing.contains("https://www.bbc.com/news/articles/c7"));

    let request = last(&log);
    assert_eq!(request.param("select"), Some("source_link"));
    assert_eq!(
        request.param("source_link"),
        Some(r#"in.("https://x.example/a,b","https://x.example/c")"#)
    );
}

#[tokio::test]
async fn test_contact_insert_runs_as_anonymous() {
    let (config, log) = mock_backend().await;
    let client = RestClient::new(Arc::new(reqwest::Client::new()), &config);

    let submission = NewContactSubmission::new(
        "Grace".to_string(),
        "grace@example.com".to_string(),
        "Hello".to_string(),
        "A message that is long enough.".to_string(),
    );
    client.insert_contact(&submission).await.unwrap();

    let request = last(&log);
    assert_eq!(request.path, "/rest/v1/contact_submissions");
    assert_eq!(request.header("authorization"), Some("Bearer anon-key"));
    assert_eq!(request.header("prefer"), Some("return=minimal"));
    let body: serde_json::Value = serde_json::from_str(&request.body).unwrap();
    assert_eq!(body[0]["status"], "new");
}

#[tokio::test]
async fn test_identity_sign_in_error_is_parsed() {
    let (config, log) = mock_backend().await;
    let client = GoTrueClient::new(Arc::new(reqwest::Client::new()), &config);

    let error = client
        .sign_in_with_password("ada@example.com", "wrong")
        .await
        .unwrap_err();
    assert_eq!(error.status, 400);
    assert_eq!(error.code.as_deref(), Some("invalid_credentials"));
    assert_eq!(error.message, "Invalid login credentials");

    let request = last(&log);
    assert_eq!(request.path, "/auth/v1/token");
    assert_eq!(request.param("grant_type"), Some("password"));
    let body: serde_json::Value = serde_json::from_str(&request.body).unwrap();
    assert_eq!(body["email"], "ada@example.com");
}

#[tokio::test]
async fn test_identity_user_calls_use_access_token() {
    let (config, log) = mock_backend().await;
    let client = GoTrueClient::new(Arc::new(reqwest::Client::new()), &config);

    let user = client.get_user("user-token").await.unwrap();
    assert_eq!(user.id, "user-1");
    assert_eq!(user.full_name().as_deref(), Some("Ada"));
    assert_eq!(last(&log).header("authorization"), Some("Bearer user-token"));

    client
        .sign_out("user-token", SignOutScope::Others)
        .await
        .unwrap();
    let request = last(&log);
    assert_eq!(request.path, "/auth/v1/logout");
    assert_eq!(request.param("scope"), Some("others"));
    assert_eq!(request.header("apikey"), Some("anon-key"));
}
