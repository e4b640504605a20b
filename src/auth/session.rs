//! Session management
//!
//! Uses HMAC-signed tokens stored in cookies.
//! No server-side session storage needed: the cookie carries the
//! tokens the identity provider issued.

use axum_extra::extract::cookie::{Cookie, SameSite};
use base64::{Engine as _, engine::general_purpose};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use super::provider::AuthSession;
use crate::config::AppConfig;
use crate::error::AppError;

/// Session cookie name
pub const SESSION_COOKIE: &str = "session";

type HmacSha256 = Hmac<Sha256>;

/// User session data
///
/// Stored in a signed cookie.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Identity provider user id
    pub user_id: String,
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub access_token: String,
    pub refresh_token: String,
    /// When the access token expires
    pub expires_at: DateTime<Utc>,
    /// When session was created
    pub created_at: DateTime<Utc>,
}

impl Session {
    pub fn from_auth(auth: &AuthSession) -> Self {
        Self {
            user_id: auth.user.id.clone(),
            email: auth.user.email.clone(),
            full_name: auth.user.full_name(),
            access_token: auth.access_token.clone(),
            refresh_token: auth.refresh_token.clone(),
            expires_at: auth.expires_at,
            created_at: Utc::now(),
        }
    }

    /// Check if the access token is expired
    pub fn is_expired(&self) -> bool {
        self.expires_at < Utc::now()
    }

    /// Name shown in the navigation bar
    pub fn display_name(&self) -> &str {
        self.full_name
            .as_deref()
            .or(self.email.as_deref())
            .unwrap_or("Account")
    }

    /// Keep the original creation time across refreshes
    pub fn refreshed(&self, auth: &AuthSession) -> Self {
        Self {
            created_at: self.created_at,
            ..Self::from_auth(auth)
        }
    }
}

fn mac(secret: &str) -> Result<HmacSha256, AppError> {
    HmacSha256::new_from_slice(secret.as_bytes()).map_err(|e| AppError::Encryption(e.to_string()))
}

/// Create a signed session token
///
/// Token format: base64(payload).base64(hmac_sha256(payload))
pub fn create_session_token(session: &Session, secret: &str) -> Result<String, AppError> {
    let payload = serde_json::to_string(session).map_err(|e| AppError::Internal(e.into()))?;
    let payload_b64 = general_purpose::URL_SAFE_NO_PAD.encode(payload.as_bytes());

    let mut mac = mac(secret)?;
    mac.update(payload_b64.as_bytes());
    let signature = mac.finalize().into_bytes();
    let signature_b64 = general_purpose::URL_SAFE_NO_PAD.encode(signature);

    Ok(format!("{}.{}", payload_b64, signature_b64))
}

/// Verify and decode a session token
///
/// An expired access token is still returned so the caller can
/// refresh it.
///
/// # Errors
/// Returns `Unauthorized` if the signature is invalid or the token is malformed
pub fn verify_session_token(token: &str, secret: &str) -> Result<Session, AppError> {
    let (payload_b64, signature_b64) = token.split_once('.').ok_or(AppError::Unauthorized)?;
    if signature_b64.contains('.') {
        return Err(AppError::Unauthorized);
    }

    let signature = general_purpose::URL_SAFE_NO_PAD
        .decode(signature_b64)
        .map_err(|_| AppError::Unauthorized)?;

    let mut mac = mac(secret)?;
    mac.update(payload_b64.as_bytes());
    mac.verify_slice(&signature)
        .map_err(|_| AppError::Unauthorized)?;

    let payload = general_purpose::URL_SAFE_NO_PAD
        .decode(payload_b64)
        .map_err(|_| AppError::Unauthorized)?;

    serde_json::from_slice(&payload).map_err(|_| AppError::Unauthorized)
}

/// Build the session cookie for a signed token
pub fn session_cookie(token: String, config: &AppConfig) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(config.should_use_secure_cookies())
        .max_age(time::Duration::seconds(config.auth.session_max_age))
        .build()
}

/// Sign a session and wrap it in a cookie
pub fn issue_session_cookie(
    session: &Session,
    config: &AppConfig,
) -> Result<Cookie<'static>, AppError> {
    let token = create_session_token(session, &config.auth.session_secret)?;
    Ok(session_cookie(token, config))
}

/// Cookie that removes the session when added to a jar
pub fn removal_cookie() -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, "")).path("/").build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthUser;
    use chrono::Duration;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn session() -> Session {
        Session {
            user_id: "user-1".to_string(),
            email: Some("ada@example.com".to_string()),
            full_name: Some("Ada Lovelace".to_string()),
            access_token: "access".to_string(),
            refresh_token: "refresh".to_string(),
            expires_at: Utc::now() + Duration::hours(1),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn token_verifies_with_same_secret() {
        let session = session();
        let token = create_session_token(&session, SECRET).unwrap();
        assert_eq!(verify_session_token(&token, SECRET).unwrap(), session);
    }

    #[test]
    fn token_rejected_with_other_secret() {
        let token = create_session_token(&session(), SECRET).unwrap();
        let result = verify_session_token(&token, "another-secret-another-secret-xx");
        assert!(matches!(result, Err(AppError::Unauthorized)));
    }

    #[test]
    fn tampered_payload_is_rejected() {
        let token = create_session_token(&session(), SECRET).unwrap();
        let (_, signature) = token.split_once('.').unwrap();

        let mut forged = session();
        forged.user_id = "someone-else".to_string();
        let forged_payload = general_purpose::URL_SAFE_NO_PAD
            .encode(serde_json::to_string(&forged).unwrap().as_bytes());

        let result = verify_session_token(&format!("{forged_payload}.{signature}"), SECRET);
        assert!(matches!(result, Err(AppError::Unauthorized)));
    }

    #[test]
    fn malformed_tokens_are_rejected() {
        for token in ["", "no-dot", "a.b.c", "!!!.???"] {
            assert!(
                matches!(verify_session_token(token, SECRET), Err(AppError::Unauthorized)),
                "{token:?} should be rejected"
            );
        }
    }

    #[test]
    fn expired_session_still_decodes() {
        let mut session = session();
        session.expires_at = Utc::now() - Duration::minutes(5);
        let token = create_session_token(&session, SECRET).unwrap();

        let decoded = verify_session_token(&token, SECRET).unwrap();
        assert!(decoded.is_expired());
    }

    #[test]
    fn refreshed_session_keeps_creation_time() {
        let original = session();
        let auth = AuthSession {
            access_token: "new-access".to_string(),
            refresh_token: "new-refresh".to_string(),
            expires_at: Utc::now() + Duration::hours(2),
            user: AuthUser {
                id: "user-1".to_string(),
                email: Some("ada@example.com".to_string()),
                user_metadata: serde_json::json!({ "full_name": "Ada Lovelace" }),
            },
        };

        let refreshed = original.refreshed(&auth);
        assert_eq!(refreshed.created_at, original.created_at);
        assert_eq!(refreshed.access_token, "new-access");
        assert_eq!(refreshed.display_name(), "Ada Lovelace");
    }

    #[test]
    fn session_cookie_flags() {
        let config = crate::config::tests::valid_config();
        let cookie = issue_session_cookie(&session(), &config).unwrap();

        assert_eq!(cookie.name(), SESSION_COOKIE);
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(
            cookie.max_age(),
            Some(time::Duration::seconds(config.auth.session_max_age))
        );
    }
}
