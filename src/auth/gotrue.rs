//! Hosted identity API client
//!
//! Implements [`IdentityProvider`] against the GoTrue REST interface
//! (`/auth/v1`) of the backend.

use std::sync::Arc;

use axum::async_trait;
use chrono::{Duration, TimeZone, Utc};
use reqwest::{Method, RequestBuilder};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;

use super::provider::{
    AuthSession, AuthUser, IdentityProvider, OtpKind, ProviderError, SignOutScope, SignUpOutcome,
};
use crate::config::BackendConfig;

/// Token endpoint response
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    expires_in: Option<i64>,
    expires_at: Option<i64>,
    user: AuthUser,
}

impl TokenResponse {
    fn into_session(self) -> AuthSession {
        let now = Utc::now();
        let expires_at = self
            .expires_at
            .and_then(|ts| Utc.timestamp_opt(ts, 0).single())
            .unwrap_or_else(|| now + Duration::seconds(self.expires_in.unwrap_or(3600)));

        AuthSession {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at,
            user: self.user,
        }
    }
}

/// Error body variants the identity API produces
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    error_code: Option<String>,
    msg: Option<String>,
    message: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

/// Build a `ProviderError` from a failed response body
fn parse_error(status: u16, body: &str) -> ProviderError {
    let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
    let message = parsed
        .msg
        .or(parsed.message)
        .or(parsed.error_description)
        .or_else(|| parsed.error.clone())
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| format!("Authentication request failed with status {status}"));

    ProviderError {
        status,
        code: parsed.error_code.or(parsed.error),
        message,
    }
}

/// Identity API client
#[derive(Clone)]
pub struct GoTrueClient {
    http_client: Arc<reqwest::Client>,
    /// `<project>/auth/v1`
    base_url: String,
    anon_key: String,
}

impl GoTrueClient {
    pub fn new(http_client: Arc<reqwest::Client>, backend: &BackendConfig) -> Self {
        Self {
            http_client,
            base_url: format!("{}/auth/v1", backend.url.trim_end_matches('/')),
            anon_key: backend.anon_key.clone(),
        }
    }

    fn request(&self, method: Method, path: &str, bearer: Option<&str>) -> RequestBuilder {
        self.http_client
            .request(method, format!("{}{}", self.base_url, path))
            .header("apikey", &self.anon_key)
            .bearer_auth(bearer.unwrap_or(&self.anon_key))
    }

    async fn execute(&self, request: RequestBuilder) -> Result<String, ProviderError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if status.is_success() {
            Ok(body)
        } else {
            let error = parse_error(status.as_u16(), &body);
            tracing::debug!(
                status = status.as_u16(),
                code = ?error.code,
                message = %error.message,
                "Identity API rejected request"
            );
            Err(error)
        }
    }

    async fn execute_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, ProviderError> {
        let body = self.execute(request).await?;
        serde_json::from_str(&body)
            .map_err(|e| ProviderError::new(0, format!("Unexpected identity API response: {e}")))
    }

    async fn token(
        &self,
        grant_type: &str,
        body: serde_json::Value,
    ) -> Result<AuthSession, ProviderError> {
        let request = self
            .request(Method::POST, "/token", None)
            .query(&[("grant_type", grant_type)])
            .json(&body);
        let response: TokenResponse = self.execute_json(request).await?;
        Ok(response.into_session())
    }
}

#[async_trait]
impl IdentityProvider for GoTrueClient {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        full_name: &str,
        redirect_to: &str,
    ) -> Result<SignUpOutcome, ProviderError> {
        let request = self
            .request(Method::POST, "/signup", None)
            .query(&[("redirect_to", redirect_to)])
            .json(&json!({
                "email": email,
                "password": password,
                "data": {
                    "full_name": full_name,
                    "email": email,
                },
            }));
        let value: serde_json::Value = self.execute_json(request).await?;

        // Auto-confirmed projects answer with a full session
        if value.get("access_token").is_some() {
            let token: TokenResponse = serde_json::from_value(value).map_err(|e| {
                ProviderError::new(0, format!("Unexpected identity API response: {e}"))
            })?;
            return Ok(SignUpOutcome::SignedIn(token.into_session()));
        }

        let user = serde_json::from_value::<AuthUser>(value).ok();
        Ok(SignUpOutcome::ConfirmationSent { user })
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, ProviderError> {
        self.token("password", json!({ "email": email, "password": password }))
            .await
    }

    async fn verify_otp(
        &self,
        email: &str,
        token: &str,
        kind: OtpKind,
    ) -> Result<AuthSession, ProviderError> {
        let request = self.request(Method::POST, "/verify", None).json(&json!({
            "type": kind.as_str(),
            "email": email,
            "token": token,
        }));
        let response: TokenResponse = self.execute_json(request).await?;
        Ok(response.into_session())
    }

    async fn resend_otp(&self, email: &str, kind: OtpKind) -> Result<(), ProviderError> {
        let request = self.request(Method::POST, "/resend", None).json(&json!({
            "type": kind.as_str(),
            "email": email,
        }));
        self.execute(request).await.map(|_| ())
    }

    async fn reset_password_for_email(
        &self,
        email: &str,
        redirect_to: &str,
        code_challenge: &str,
    ) -> Result<(), ProviderError> {
        let request = self
            .request(Method::POST, "/recover", None)
            .query(&[("redirect_to", redirect_to)])
            .json(&json!({
                "email": email,
                "code_challenge": code_challenge,
                "code_challenge_method": "s256",
            }));
        self.execute(request).await.map(|_| ())
    }

    async fn exchange_code_for_session(
        &self,
        auth_code: &str,
        code_verifier: &str,
    ) -> Result<AuthSession, ProviderError> {
        self.token(
            "pkce",
            json!({ "auth_code": auth_code, "code_verifier": code_verifier }),
        )
        .await
    }

    async fn update_user_password(
        &self,
        access_token: &str,
        password: &str,
    ) -> Result<AuthUser, ProviderError> {
        let request = self
            .request(Method::PUT, "/user", Some(access_token))
            .json(&json!({ "password": password }));
        self.execute_json(request).await
    }

    async fn sign_out(&self, access_token: &str, scope: SignOutScope) -> Result<(), ProviderError> {
        let request = self
            .request(Method::POST, "/logout", Some(access_token))
            .query(&[("scope", scope.as_str())]);
        self.execute(request).await.map(|_| ())
    }

    async fn get_user(&self, access_token: &str) -> Result<AuthUser, ProviderError> {
        let request = self.request(Method::GET, "/user", Some(access_token));
        self.execute_json(request).await
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<AuthSession, ProviderError> {
        self.token("refresh_token", json!({ "refresh_token": refresh_token }))
            .await
    }

    fn authorize_url(
        &self,
        provider: &str,
        redirect_to: &str,
        code_challenge: &str,
        extra_params: &[(&str, &str)],
    ) -> Result<url::Url, ProviderError> {
        let mut url = url::Url::parse(&format!("{}/authorize", self.base_url))
            .map_err(|e| ProviderError::new(0, format!("Invalid identity API URL: {e}")))?;

        {
            let mut pairs = url.query_pairs_mut();
            pairs
                .append_pair("provider", provider)
                .append_pair("redirect_to", redirect_to)
                .append_pair("code_challenge", code_challenge)
                .append_pair("code_challenge_method", "s256");
            for (key, value) in extra_params {
                pairs.append_pair(key, value);
            }
        }

        Ok(url)
    }
}
