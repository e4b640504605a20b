//! Identity provider seam
//!
//! All account state lives with the hosted identity service. This
//! trait is the complete list of calls the site makes to it.

use axum::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure reported by the identity provider
///
/// `message` is what the provider said, suitable for showing to
/// the user on the sign-in and sign-up forms.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct ProviderError {
    /// HTTP status, 0 when the request never got a response
    pub status: u16,
    pub code: Option<String>,
    pub message: String,
}

impl ProviderError {
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            code: None,
            message: message.into(),
        }
    }

    /// The credentials or token were rejected, as opposed to the
    /// provider being unreachable
    pub fn is_auth_failure(&self) -> bool {
        matches!(self.status, 401 | 403)
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        let status = err.status().map(|s| s.as_u16()).unwrap_or(0);
        Self::new(status, err.to_string())
    }
}

/// Identity user record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    pub email: Option<String>,
    #[serde(default)]
    pub user_metadata: serde_json::Value,
}

impl AuthUser {
    pub fn full_name(&self) -> Option<String> {
        self.user_metadata
            .get("full_name")
            .and_then(|v| v.as_str())
            .map(ToOwned::to_owned)
    }
}

/// Tokens issued by the provider for a signed-in user
#[derive(Debug, Clone, PartialEq)]
pub struct AuthSession {
    pub access_token: String,
    pub refresh_token: String,
    /// When `access_token` stops being accepted
    pub expires_at: DateTime<Utc>,
    pub user: AuthUser,
}

/// Result of a sign-up request
#[derive(Debug, Clone, PartialEq)]
pub enum SignUpOutcome {
    /// A verification code was emailed
    ConfirmationSent { user: Option<AuthUser> },
    /// Email confirmation is disabled upstream; signed in directly
    SignedIn(AuthSession),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtpKind {
    Signup,
    Recovery,
}

impl OtpKind {
    pub fn as_str(self) -> &'static str {
        match self {
            OtpKind::Signup => "signup",
            OtpKind::Recovery => "recovery",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignOutScope {
    Global,
    Local,
    /// Every session except the one making the call
    Others,
}

impl SignOutScope {
    pub fn as_str(self) -> &'static str {
        match self {
            SignOutScope::Global => "global",
            SignOutScope::Local => "local",
            SignOutScope::Others => "others",
        }
    }
}

/// Identity provider operations
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        full_name: &str,
        redirect_to: &str,
    ) -> Result<SignUpOutcome, ProviderError>;

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, ProviderError>;

    async fn verify_otp(
        &self,
        email: &str,
        token: &str,
        kind: OtpKind,
    ) -> Result<AuthSession, ProviderError>;

    async fn resend_otp(&self, email: &str, kind: OtpKind) -> Result<(), ProviderError>;

    /// Email a recovery link; the link carries a PKCE auth code
    async fn reset_password_for_email(
        &self,
        email: &str,
        redirect_to: &str,
        code_challenge: &str,
    ) -> Result<(), ProviderError>;

    async fn exchange_code_for_session(
        &self,
        auth_code: &str,
        code_verifier: &str,
    ) -> Result<AuthSession, ProviderError>;

    async fn update_user_password(
        &self,
        access_token: &str,
        password: &str,
    ) -> Result<AuthUser, ProviderError>;

    async fn sign_out(&self, access_token: &str, scope: SignOutScope) -> Result<(), ProviderError>;

    async fn get_user(&self, access_token: &str) -> Result<AuthUser, ProviderError>;

    async fn refresh_session(&self, refresh_token: &str) -> Result<AuthSession, ProviderError>;

    /// URL of the provider's OAuth consent redirect
    fn authorize_url(
        &self,
        provider: &str,
        redirect_to: &str,
        code_challenge: &str,
        extra_params: &[(&str, &str)],
    ) -> Result<url::Url, ProviderError>;
}
