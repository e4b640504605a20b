//! Shared HTML layout and marketing pages

use axum::{
    Router,
    extract::Query,
    http::StatusCode,
    response::{Html, IntoResponse, Redirect},
    routing::get,
};

use super::flash::{Flash, FlashKind};
use crate::AppState;
use crate::auth::{MaybeUser, Session};

/// Escape text for an HTML text node
pub fn escape(text: &str) -> String {
    html_escape::encode_text(text).into_owned()
}

/// Escape text for a double-quoted attribute value
pub fn attr(text: &str) -> String {
    html_escape::encode_double_quoted_attribute(text).into_owned()
}

const STYLE: &str = r#"
body { font-family: system-ui, sans-serif; margin: 0; color: #111827; background: #f9fafb; }
header, footer { display: flex; justify-content: space-between; align-items: center; padding: 0.75rem 2rem; background: #fff; border-bottom: 1px solid #e5e7eb; }
footer { border-top: 1px solid #e5e7eb; border-bottom: none; font-size: 0.875rem; }
nav a, footer a { margin-right: 1rem; color: inherit; }
main { max-width: 72rem; margin: 2rem auto; padding: 0 1rem; }
.alert { padding: 0.75rem 1rem; border-radius: 0.375rem; margin-bottom: 1rem; }
.alert-error { background: #fee2e2; color: #991b1b; }
.alert-success { background: #dcfce7; color: #166534; }
table { width: 100%; border-collapse: collapse; background: #fff; }
th, td { padding: 0.5rem; border-bottom: 1px solid #e5e7eb; text-align: left; vertical-align: top; }
form.inline { display: inline; }
label { display: block; margin-top: 0.75rem; }
input, textarea, select { padding: 0.4rem; }
.muted { color: #6b7280; font-size: 0.875rem; }
"#;

fn nav(user: Option<&Session>) -> String {
    match user {
        Some(session) => format!(
            r#"<nav><a href="/dashboard">Dashboard</a><a href="/contact">Contact</a></nav>
<div><span class="muted">{}</span>
<form class="inline" method="post" action="/sign-out"><button type="submit">Sign out</button></form></div>"#,
            escape(session.display_name())
        ),
        None => r#"<nav><a href="/about">About</a><a href="/contact">Contact</a></nav>
<div><a href="/sign-in">Sign in</a> <a href="/sign-up">Sign up</a></div>"#
            .to_string(),
    }
}

/// Rendered alert boxes for a flash
pub fn alerts(flash: &Flash) -> String {
    flash
        .messages()
        .map(|(kind, message)| {
            let role = match kind {
                FlashKind::Error => "alert",
                FlashKind::Success => "status",
            };
            format!(
                r#"<div class="alert alert-{}" role="{role}">{}</div>"#,
                kind.as_str(),
                escape(message)
            )
        })
        .collect()
}

/// Full page around `body`
///
/// `body` must already be escaped.
pub fn layout(title: &str, user: Option<&Session>, flash: &Flash, body: &str) -> Html<String> {
    layout_with_head(title, user, flash, "", body)
}

/// Same as [`layout`] with extra `<head>` markup
pub fn layout_with_head(
    title: &str,
    user: Option<&Session>,
    flash: &Flash,
    head: &str,
    body: &str,
) -> Html<String> {
    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title} - Newsdesk</title>
<style>{STYLE}</style>
{head}
</head>
<body>
<header><a href="/"><strong>Newsdesk</strong></a>{nav}</header>
<main>
{alerts}
{body}
</main>
<footer><span class="muted">Newsdesk</span><span><a href="/about">About</a><a href="/privacy">Privacy</a><a href="/terms">Terms</a><a href="/contact">Contact</a></span></footer>
</body>
</html>"#,
        title = escape(title),
        nav = nav(user),
        alerts = alerts(flash),
    ))
}

/// Standalone error page
pub fn error_page(status: StatusCode, message: &str) -> Html<String> {
    let heading = status.canonical_reason().unwrap_or("Error");
    let body = format!(
        r#"<h1>{}</h1><p>{}</p><p><a href="/">Back to the start page</a></p>"#,
        escape(heading),
        escape(message)
    );
    layout(heading, None, &Flash::default(), &body)
}

// =============================================================================
// Marketing pages
// =============================================================================

/// Create router for static pages
///
/// Routes:
/// - GET /about
/// - GET /privacy
/// - GET /terms
/// - GET /error
pub fn pages_router() -> Router<AppState> {
    Router::new()
        .route("/", get(root))
        .route("/about", get(about))
        .route("/privacy", get(privacy))
        .route("/terms", get(terms))
        .route("/error", get(generic_error))
}

/// GET /
///
/// The route guard normally answers first; this covers the same rule
/// when it does not.
async fn root(MaybeUser(user): MaybeUser) -> Redirect {
    match user {
        Some(_) => Redirect::to("/dashboard"),
        None => Redirect::to("/sign-in"),
    }
}

async fn about(MaybeUser(user): MaybeUser, Query(flash): Query<Flash>) -> Html<String> {
    layout(
        "About",
        user.as_ref(),
        &flash,
        r#"<h1>About Newsdesk</h1>
<p>Newsdesk collects articles from public news sources, summarises them and
keeps them in one searchable table.</p>
<p>Signed-in editors can filter, sort and correct articles from the dashboard.</p>"#,
    )
}

async fn privacy(MaybeUser(user): MaybeUser, Query(flash): Query<Flash>) -> Html<String> {
    layout(
        "Privacy Policy",
        user.as_ref(),
        &flash,
        r#"<h1>Privacy Policy</h1>
<p>We store your name and email address to run your account. Messages sent
through the contact form are kept until they have been answered.</p>
<p>Session cookies only hold the tokens issued by our identity provider and
are removed when you sign out.</p>"#,
    )
}

async fn terms(MaybeUser(user): MaybeUser, Query(flash): Query<Flash>) -> Html<String> {
    layout(
        "Terms of Service",
        user.as_ref(),
        &flash,
        r#"<h1>Terms of Service</h1>
<p>Article summaries are generated automatically and may contain mistakes.
Always follow the source link before relying on a story.</p>
<p>Accounts may be suspended for abuse of the service.</p>"#,
    )
}

async fn generic_error() -> impl IntoResponse {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        error_page(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Sorry, something went wrong.",
        ),
    )
}
