//! Authentication pages and actions
//!
//! Thin wrappers over the identity provider. Provider failures are
//! turned into flash messages on the form that triggered them.

use axum::{
    Form, Router,
    extract::{Query, State},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
};
use axum_extra::extract::CookieJar;
use chrono::Utc;
use serde::Deserialize;

use super::cooldown;
use super::middleware::MaybeUser;
use super::pkce::{PkcePair, VERIFIER_COOKIE, verifier_cookie, verifier_removal_cookie};
use super::provider::{OtpKind, ProviderError, SignOutScope, SignUpOutcome};
use super::session::{Session, issue_session_cookie, removal_cookie};
use crate::AppState;
use crate::api::flash::{Flash, FlashKind, encoded_path, encoded_redirect};
use crate::api::pages::{attr, escape, layout, layout_with_head};
use crate::data::Profile;
use crate::error::AppError;
use crate::metrics::record_auth_event;
use crate::validation;

const SIGN_UP_FAILED: &str = "An error occurred during sign up. Please try again.";
const VERIFY_FAILED: &str = "Failed to verify code. Please try again.";
const RESEND_FAILED: &str = "Failed to resend verification code. Please try again.";
const RESEND_SENT: &str = "A new verification code has been sent to your email.";
const RESET_REQUEST_FAILED: &str = "Could not reset password";
const RESET_REQUEST_SENT: &str = "Check your email for a password reset link.";
const RESET_FAILED: &str = "Failed to reset password. Please try again.";
const RESET_DONE: &str = "Password updated successfully. Redirecting to sign in...";
const CALLBACK_FAILED: &str = "Authentication failed. Please try again.";
const CALLBACK_NO_CODE: &str = "No authentication code provided";

/// Create authentication router
///
/// Routes:
/// - GET/POST /sign-in
/// - GET/POST /sign-up, POST /sign-up/verify, POST /sign-up/resend
/// - GET/POST /forgot-password
/// - GET/POST /reset-password
/// - POST /auth/google, GET /auth/callback
/// - POST /sign-out
pub fn auth_router() -> Router<AppState> {
    Router::new()
        .route("/sign-in", get(sign_in_page).post(sign_in))
        .route("/sign-up", get(sign_up_page).post(sign_up))
        .route("/sign-up/verify", post(verify_otp))
        .route("/sign-up/resend", post(resend_otp))
        .route(
            "/forgot-password",
            get(forgot_password_page).post(forgot_password),
        )
        .route(
            "/reset-password",
            get(reset_password_page).post(reset_password),
        )
        .route("/auth/google", post(oauth_redirect))
        .route("/auth/callback", get(oauth_callback))
        .route("/sign-out", post(sign_out))
}

/// Network failures and 5xx answers get a generic message instead of
/// whatever the provider said
fn is_unexpected(error: &ProviderError) -> bool {
    error.status == 0 || error.status >= 500
}

fn provider_message<'a>(error: &'a ProviderError, fallback: &'a str) -> &'a str {
    if is_unexpected(error) {
        fallback
    } else {
        &error.message
    }
}

fn callback_url(state: &AppState) -> String {
    format!("{}/auth/callback", state.config.server.base_url())
}

/// Only same-site absolute paths are accepted as `next`
fn safe_next(next: Option<&str>) -> &str {
    match next {
        Some(path) if path.starts_with('/') && !path.starts_with("//") && !path.contains('\\') => {
            path
        }
        _ => "/dashboard",
    }
}

// =============================================================================
// Sign in
// =============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SignInForm {
    email: String,
    password: String,
}

/// GET /sign-in
async fn sign_in_page(Query(flash): Query<Flash>) -> Html<String> {
    layout(
        "Sign in",
        None,
        &flash,
        r#"<h1>Sign in</h1>
<form method="post" action="/sign-in">
<label>Email <input type="email" name="email" required autocomplete="email"></label>
<label>Password <input type="password" name="password" required autocomplete="current-password"></label>
<p><button type="submit">Sign in</button></p>
</form>
<form method="post" action="/auth/google"><button type="submit">Continue with Google</button></form>
<p><a href="/forgot-password">Forgot your password?</a></p>
<p class="muted">No account yet? <a href="/sign-up">Sign up</a></p>"#,
    )
}

/// POST /sign-in
async fn sign_in(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<SignInForm>,
) -> Result<Response, AppError> {
    let email = form.email.trim();

    match state
        .identity
        .sign_in_with_password(email, &form.password)
        .await
    {
        Ok(auth) => {
            record_auth_event("sign_in", true);
            tracing::info!(user_id = %auth.user.id, "User signed in");
            let cookie = issue_session_cookie(&Session::from_auth(&auth), &state.config)?;
            Ok((jar.add(cookie), Redirect::to("/dashboard")).into_response())
        }
        Err(error) => {
            record_auth_event("sign_in", false);
            tracing::info!(status = error.status, message = %error.message, "Sign in rejected");
            Ok(encoded_redirect(FlashKind::Error, "/sign-in", &error.message).into_response())
        }
    }
}

// =============================================================================
// Sign up and email verification
// =============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SignUpForm {
    full_name: String,
    email: String,
    password: String,
    confirm_password: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct VerifyForm {
    email: String,
    otp: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ResendForm {
    email: String,
}

fn sign_up_form(flash: &Flash, full_name: &str, email: &str) -> Html<String> {
    let body = format!(
        r#"<h1>Create an account</h1>
<form method="post" action="/sign-up">
<label>Full name <input type="text" name="full_name" value="{}" required autocomplete="name"></label>
<label>Email <input type="email" name="email" value="{}" required autocomplete="email"></label>
<label>Password <input type="password" name="password" required autocomplete="new-password"></label>
<label>Confirm password <input type="password" name="confirm_password" required autocomplete="new-password"></label>
<p class="muted">At least 8 characters, including a letter and a number.</p>
<p><button type="submit">Sign up</button></p>
</form>
<form method="post" action="/auth/google"><button type="submit">Continue with Google</button></form>
<p class="muted">Already have an account? <a href="/sign-in">Sign in</a></p>"#,
        attr(full_name),
        attr(email)
    );
    layout("Sign up", None, flash, &body)
}

/// Verification code form with resend button
fn otp_form(email: &str, flash: &Flash, resend_in: i64) -> Html<String> {
    let resend_button = if resend_in > 0 {
        format!(r#"<button type="submit" disabled>Resend code in {resend_in}s</button>"#)
    } else {
        r#"<button type="submit">Resend code</button>"#.to_string()
    };

    let body = format!(
        r#"<h1>Check your email</h1>
<p>We sent a 6-digit verification code to <strong>{email_text}</strong>.</p>
<form method="post" action="/sign-up/verify">
<input type="hidden" name="email" value="{email_attr}">
<label>Verification code <input type="text" name="otp" inputmode="numeric" pattern="[0-9]{{6}}" maxlength="6" required autocomplete="one-time-code"></label>
<p><button type="submit">Verify</button></p>
</form>
<form method="post" action="/sign-up/resend">
<input type="hidden" name="email" value="{email_attr}">
{resend_button}
</form>"#,
        email_text = escape(email),
        email_attr = attr(email),
    );
    layout("Verify your email", None, flash, &body)
}

/// GET /sign-up
async fn sign_up_page(Query(flash): Query<Flash>) -> Html<String> {
    sign_up_form(&flash, "", "")
}

/// POST /sign-up
async fn sign_up(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<SignUpForm>,
) -> Result<Response, AppError> {
    let email = form.email.trim();
    let full_name = form.full_name.trim();

    if let Err(errors) =
        validation::validate_sign_up(full_name, email, &form.password, &form.confirm_password)
    {
        let flash = Flash::error(errors.to_string());
        return Ok(sign_up_form(&flash, full_name, email).into_response());
    }

    let outcome = state
        .identity
        .sign_up(email, &form.password, full_name, &callback_url(&state))
        .await;

    match outcome {
        Ok(SignUpOutcome::ConfirmationSent { user }) => {
            record_auth_event("sign_up", true);
            tracing::info!(user_id = ?user.map(|u| u.id), "Sign up pending email verification");
            let cooldown_seconds = state.config.auth.otp_resend_cooldown_seconds;
            let jar = jar.add(cooldown::last_sent_cookie(Utc::now(), cooldown_seconds));
            Ok((jar, otp_form(email, &Flash::default(), cooldown_seconds)).into_response())
        }
        Ok(SignUpOutcome::SignedIn(auth)) => {
            record_auth_event("sign_up", true);
            tracing::info!(user_id = %auth.user.id, "Sign up completed without verification");
            let cookie = issue_session_cookie(&Session::from_auth(&auth), &state.config)?;
            Ok((jar.add(cookie), Redirect::to("/dashboard")).into_response())
        }
        Err(error) => {
            record_auth_event("sign_up", false);
            if is_unexpected(&error) {
                tracing::error!(error = %error, "Sign up failed");
            } else {
                tracing::info!(code = ?error.code, message = %error.message, "Sign up rejected");
            }
            let flash = Flash::error(provider_message(&error, SIGN_UP_FAILED));
            Ok(sign_up_form(&flash, full_name, email).into_response())
        }
    }
}

/// POST /sign-up/verify
async fn verify_otp(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<VerifyForm>,
) -> Result<Response, AppError> {
    let email = form.email.trim();
    let otp = form.otp.trim();
    let resend_in = cooldown::remaining(
        cooldown::last_sent(&jar),
        Utc::now(),
        state.config.auth.otp_resend_cooldown_seconds,
    );

    if let Err(errors) = validation::validate_verify_otp(email, otp) {
        let flash = Flash::error(errors.to_string());
        return Ok(otp_form(email, &flash, resend_in).into_response());
    }

    match state.identity.verify_otp(email, otp, OtpKind::Signup).await {
        Ok(auth) => {
            record_auth_event("verify_otp", true);
            tracing::info!(user_id = %auth.user.id, "Email verified");
            let cookie = issue_session_cookie(&Session::from_auth(&auth), &state.config)?;
            Ok((jar.add(cookie), Redirect::to("/dashboard")).into_response())
        }
        Err(error) => {
            record_auth_event("verify_otp", false);
            tracing::info!(status = error.status, message = %error.message, "OTP verification failed");
            let flash = Flash::error(provider_message(&error, VERIFY_FAILED));
            Ok(otp_form(email, &flash, resend_in).into_response())
        }
    }
}

/// POST /sign-up/resend
async fn resend_otp(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<ResendForm>,
) -> Result<Response, AppError> {
    let email = form.email.trim();
    let cooldown_seconds = state.config.auth.otp_resend_cooldown_seconds;
    let now = Utc::now();

    let resend_in = cooldown::remaining(cooldown::last_sent(&jar), now, cooldown_seconds);
    if resend_in > 0 {
        let flash = Flash::error(format!(
            "Please wait {resend_in}s before requesting a new code."
        ));
        return Ok(otp_form(email, &flash, resend_in).into_response());
    }

    match state.identity.resend_otp(email, OtpKind::Signup).await {
        Ok(()) => {
            record_auth_event("resend_otp", true);
            let jar = jar.add(cooldown::last_sent_cookie(now, cooldown_seconds));
            Ok((
                jar,
                otp_form(email, &Flash::success(RESEND_SENT), cooldown_seconds),
            )
                .into_response())
        }
        Err(error) => {
            record_auth_event("resend_otp", false);
            tracing::warn!(status = error.status, message = %error.message, "Resending OTP failed");
            let flash = Flash::error(provider_message(&error, RESEND_FAILED));
            Ok(otp_form(email, &flash, 0).into_response())
        }
    }
}

// =============================================================================
// Password reset
// =============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ForgotPasswordForm {
    email: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ResetQuery {
    code: Option<String>,
    error: Option<String>,
    success: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ResetPasswordForm {
    code: String,
    password: String,
    confirm_password: String,
}

/// GET /forgot-password
async fn forgot_password_page(Query(flash): Query<Flash>) -> Html<String> {
    layout(
        "Forgot password",
        None,
        &flash,
        r#"<h1>Reset your password</h1>
<form method="post" action="/forgot-password">
<label>Email <input type="email" name="email" required autocomplete="email"></label>
<p><button type="submit">Send reset link</button></p>
</form>
<p class="muted"><a href="/sign-in">Back to sign in</a></p>"#,
    )
}

/// POST /forgot-password
///
/// The recovery link carries a PKCE code; the verifier stays in a
/// cookie on this browser.
async fn forgot_password(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<ForgotPasswordForm>,
) -> Response {
    let email = form.email.trim();
    if email.is_empty() {
        return encoded_redirect(FlashKind::Error, "/forgot-password", "Email is required")
            .into_response();
    }

    let pkce = PkcePair::generate();
    let redirect_to = format!("{}/reset-password", state.config.server.base_url());

    match state
        .identity
        .reset_password_for_email(email, &redirect_to, &pkce.challenge)
        .await
    {
        Ok(()) => {
            record_auth_event("reset_request", true);
            let jar = jar.add(verifier_cookie(
                pkce.verifier,
                state.config.should_use_secure_cookies(),
            ));
            (
                jar,
                encoded_redirect(FlashKind::Success, "/forgot-password", RESET_REQUEST_SENT),
            )
                .into_response()
        }
        Err(error) => {
            record_auth_event("reset_request", false);
            tracing::error!(error = %error, "Reset password request failed");
            encoded_redirect(FlashKind::Error, "/forgot-password", RESET_REQUEST_FAILED)
                .into_response()
        }
    }
}

fn reset_form(code: &str, flash: &Flash) -> Html<String> {
    let action = format!("/reset-password?code={}", urlencoding::encode(code));
    let body = format!(
        r#"<h1>Choose a new password</h1>
<form method="post" action="{}">
<input type="hidden" name="code" value="{}">
<label>New password <input type="password" name="password" required autocomplete="new-password"></label>
<label>Confirm password <input type="password" name="confirm_password" required autocomplete="new-password"></label>
<p><button type="submit">Update password</button></p>
</form>"#,
        attr(&action),
        attr(code)
    );
    layout("Reset password", None, flash, &body)
}

/// GET /reset-password?code=...
async fn reset_password_page(Query(query): Query<ResetQuery>) -> Html<String> {
    let flash = Flash {
        error: query.error,
        success: query.success,
    };
    reset_form(query.code.as_deref().unwrap_or_default(), &flash)
}

fn reset_error(code: &str, message: &str) -> Response {
    let path = format!("/reset-password?code={}", urlencoding::encode(code));
    Redirect::to(&encoded_path(FlashKind::Error, &path, message)).into_response()
}

/// POST /reset-password
///
/// Exchange the recovery code, set the new password and end every
/// other session of the account.
async fn reset_password(
    State(state): State<AppState>,
    Query(query): Query<ResetQuery>,
    jar: CookieJar,
    Form(form): Form<ResetPasswordForm>,
) -> Response {
    let code = if form.code.trim().is_empty() {
        query.code.unwrap_or_default()
    } else {
        form.code.trim().to_string()
    };

    if let Err(errors) =
        validation::validate_reset_password(&form.password, &form.confirm_password)
    {
        return reset_error(&code, &errors.to_string());
    }

    let Some(verifier) = jar.get(VERIFIER_COOKIE).map(|c| c.value().to_string()) else {
        tracing::warn!("Reset password submitted without a code verifier");
        record_auth_event("reset_password", false);
        return reset_error(&code, RESET_FAILED);
    };

    let result = async {
        let auth = state
            .identity
            .exchange_code_for_session(&code, &verifier)
            .await?;
        state
            .identity
            .update_user_password(&auth.access_token, &form.password)
            .await?;
        Ok::<_, ProviderError>(auth)
    }
    .await;

    let auth = match result {
        Ok(auth) => auth,
        Err(error) => {
            record_auth_event("reset_password", false);
            tracing::error!(error = %error, "Reset password failed");
            return reset_error(&code, RESET_FAILED);
        }
    };

    if let Err(error) = state
        .identity
        .sign_out(&auth.access_token, SignOutScope::Others)
        .await
    {
        tracing::warn!(error = %error, "Failed to sign out other sessions");
    }

    record_auth_event("reset_password", true);
    tracing::info!(user_id = %auth.user.id, "Password updated");

    let page = layout_with_head(
        "Password updated",
        None,
        &Flash::success(RESET_DONE),
        r#"<meta http-equiv="refresh" content="2;url=/sign-in">"#,
        r#"<h1>Password updated</h1><p><a href="/sign-in">Continue to sign in</a></p>"#,
    );
    (jar.remove(verifier_removal_cookie()), page).into_response()
}

// =============================================================================
// OAuth
// =============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CallbackQuery {
    code: Option<String>,
    next: Option<String>,
}

/// POST /auth/google
///
/// Redirects to the identity provider's consent flow.
async fn oauth_redirect(State(state): State<AppState>, jar: CookieJar) -> Response {
    let pkce = PkcePair::generate();
    let url = state.identity.authorize_url(
        &state.config.oauth.provider,
        &callback_url(&state),
        &pkce.challenge,
        &[("access_type", "offline"), ("prompt", "consent")],
    );

    match url {
        Ok(url) => {
            let jar = jar.add(verifier_cookie(
                pkce.verifier,
                state.config.should_use_secure_cookies(),
            ));
            (jar, Redirect::to(url.as_str())).into_response()
        }
        Err(error) => {
            record_auth_event("oauth_redirect", false);
            tracing::error!(error = %error, "Failed to build OAuth URL");
            Redirect::to("/error").into_response()
        }
    }
}

/// GET /auth/callback?code=...&next=...
///
/// # Steps
/// 1. Exchange the code using the stored verifier
/// 2. Fetch the user
/// 3. Upsert the profile row (failures only logged)
/// 4. Set the session cookie and redirect to `next`
async fn oauth_callback(
    State(state): State<AppState>,
    Query(query): Query<CallbackQuery>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    let Some(code) = query.code.filter(|c| !c.trim().is_empty()) else {
        return Ok(encoded_redirect(FlashKind::Error, "/sign-in", CALLBACK_NO_CODE).into_response());
    };

    let verifier = jar
        .get(VERIFIER_COOKIE)
        .map(|c| c.value().to_string())
        .unwrap_or_default();

    let result = async {
        let auth = state
            .identity
            .exchange_code_for_session(&code, &verifier)
            .await?;
        let user = state.identity.get_user(&auth.access_token).await?;
        Ok::<_, ProviderError>((auth, user))
    }
    .await;

    let (auth, user) = match result {
        Ok(pair) => pair,
        Err(error) => {
            record_auth_event("oauth_callback", false);
            tracing::error!(error = %error, "OAuth callback failed");
            let jar = jar.remove(verifier_removal_cookie());
            return Ok((
                jar,
                encoded_redirect(FlashKind::Error, "/sign-in", CALLBACK_FAILED),
            )
                .into_response());
        }
    };

    let profile = Profile {
        id: user.id.clone(),
        email: user.email.clone(),
        full_name: user.full_name(),
        updated_at: Utc::now(),
    };
    if let Err(error) = state
        .profiles
        .upsert_profile(&auth.access_token, &profile)
        .await
    {
        tracing::error!(error = %error, user_id = %user.id, "Error updating profile");
    }

    record_auth_event("oauth_callback", true);
    tracing::info!(user_id = %user.id, "User signed in with OAuth");

    let session = Session::from_auth(&auth);
    let cookie = issue_session_cookie(&session, &state.config)?;
    let jar = jar.remove(verifier_removal_cookie()).add(cookie);
    Ok((jar, Redirect::to(safe_next(query.next.as_deref()))).into_response())
}

// =============================================================================
// Sign out
// =============================================================================

/// POST /sign-out
async fn sign_out(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    jar: CookieJar,
) -> Response {
    if let Some(session) = user {
        match state
            .identity
            .sign_out(&session.access_token, SignOutScope::Global)
            .await
        {
            Ok(()) => record_auth_event("sign_out", true),
            Err(error) => {
                record_auth_event("sign_out", false);
                tracing::warn!(error = %error, "Provider sign out failed");
            }
        }
        tracing::info!(user_id = %session.user_id, "User signed out");
    }

    (jar.remove(removal_cookie()), Redirect::to("/sign-in")).into_response()
}
