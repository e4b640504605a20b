//! Route guard middleware
//!
//! Runs on every request. Resolves the session cookie against the
//! identity provider where a routing decision depends on it, refreshes
//! expired access tokens, and applies the sign-in redirects.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts, State},
    http::{Request, request::Parts},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::CookieJar;

use super::provider::ProviderError;
use super::session::{
    SESSION_COOKIE, Session, issue_session_cookie, removal_cookie, verify_session_token,
};
use crate::AppState;
use crate::error::AppError;
use crate::metrics::record_auth_event;

/// Pages only meaningful to anonymous visitors
const ANONYMOUS_ONLY: &[&str] = &["/sign-in", "/sign-up", "/forgot-password"];

fn is_dashboard(path: &str) -> bool {
    path == "/dashboard" || path.starts_with("/dashboard/")
}

/// Whether the guard needs to confirm the session with the provider
fn needs_user(path: &str) -> bool {
    path == "/" || is_dashboard(path) || ANONYMOUS_ONLY.contains(&path)
}

/// Redirect target for a request, if any
pub fn redirect_for(path: &str, has_code: bool, signed_in: bool) -> Option<&'static str> {
    if path == "/" {
        return Some(if signed_in { "/dashboard" } else { "/sign-in" });
    }

    if is_dashboard(path) && !signed_in {
        return Some("/sign-in");
    }

    if signed_in && ANONYMOUS_ONLY.contains(&path) {
        return Some("/dashboard");
    }

    if path == "/reset-password" && !has_code {
        return Some("/forgot-password");
    }

    None
}

fn has_code_param(query: Option<&str>) -> bool {
    query.is_some_and(|query| {
        url::form_urlencoded::parse(query.as_bytes())
            .any(|(key, value)| key == "code" && !value.trim().is_empty())
    })
}

/// Outcome of checking a session with the provider
enum Resolved {
    Valid(Session),
    /// Access token was refreshed; the new cookie must be sent back
    Refreshed(Session),
    /// Provider rejected the tokens; drop the cookie
    Rejected,
    /// Provider unreachable or misbehaving; keep the cookie
    Unavailable,
}

fn classify(error: &ProviderError, action: &'static str) -> Resolved {
    if error.is_auth_failure() {
        tracing::debug!(action, message = %error.message, "Session rejected by identity provider");
        Resolved::Rejected
    } else {
        tracing::warn!(action, error = %error, "Identity provider unavailable");
        Resolved::Unavailable
    }
}

async fn resolve_session(state: &AppState, session: Session) -> Resolved {
    if session.is_expired() {
        return match state.identity.refresh_session(&session.refresh_token).await {
            Ok(auth) => {
                record_auth_event("refresh", true);
                Resolved::Refreshed(session.refreshed(&auth))
            }
            Err(error) => {
                record_auth_event("refresh", false);
                classify(&error, "refresh")
            }
        };
    }

    match state.identity.get_user(&session.access_token).await {
        Ok(user) => Resolved::Valid(Session {
            email: user.email.clone().or(session.email.clone()),
            full_name: user.full_name().or(session.full_name.clone()),
            ..session
        }),
        Err(error) => classify(&error, "get_user"),
    }
}

fn decode_cookie(jar: &CookieJar, secret: &str) -> Option<Result<Session, AppError>> {
    jar.get(SESSION_COOKIE)
        .map(|cookie| verify_session_token(cookie.value(), secret))
}

/// Middleware applying the route guard
///
/// # Usage
/// ```ignore
/// let app = Router::new()
///     .merge(routes)
///     .layer(middleware::from_fn_with_state(state.clone(), route_guard));
/// ```
pub async fn route_guard(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, AppError> {
    let path = request.uri().path().to_owned();
    let has_code = has_code_param(request.uri().query());
    let mut jar = jar;

    let session = match decode_cookie(&jar, &state.config.auth.session_secret) {
        None => None,
        Some(Err(_)) => {
            tracing::debug!(path = %path, "Dropping invalid session cookie");
            jar = jar.remove(removal_cookie());
            None
        }
        Some(Ok(session)) if needs_user(&path) => match resolve_session(&state, session).await {
            Resolved::Valid(session) => Some(session),
            Resolved::Refreshed(session) => {
                jar = jar.add(issue_session_cookie(&session, &state.config)?);
                Some(session)
            }
            Resolved::Rejected => {
                jar = jar.remove(removal_cookie());
                None
            }
            Resolved::Unavailable => None,
        },
        Some(Ok(session)) => (!session.is_expired()).then_some(session),
    };

    if let Some(target) = redirect_for(&path, has_code, session.is_some()) {
        tracing::debug!(path = %path, target, "Route guard redirect");
        return Ok((jar, Redirect::to(target)).into_response());
    }

    if let Some(session) = session {
        request.extensions_mut().insert(session);
    }

    Ok((jar, next.run(request).await).into_response())
}

/// Extractor for the signed-in user
///
/// Rejects with `Unauthorized`, which redirects to the sign-in page.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Session);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match MaybeUser::from_request_parts(parts, state).await {
            Ok(MaybeUser(Some(session))) => Ok(CurrentUser(session)),
            _ => Err(AppError::Unauthorized),
        }
    }
}

/// Optional user extractor, used for navigation
///
/// Returns None if not signed in, instead of error. Only decodes the
/// cookie; the provider is consulted by the guard.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<Session>);

#[async_trait]
impl<S> FromRequestParts<S> for MaybeUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(session) = parts.extensions.get::<Session>().cloned() {
            return Ok(MaybeUser(Some(session)));
        }

        let app_state = AppState::from_ref(state);
        let jar = CookieJar::from_headers(&parts.headers);
        let session = decode_cookie(&jar, &app_state.config.auth.session_secret)
            .and_then(Result::ok)
            .filter(|session| !session.is_expired());

        if let Some(session) = &session {
            parts.extensions.insert(session.clone());
        }

        Ok(MaybeUser(session))
    }
}
