//! PKCE (S256) helpers
//!
//! The verifier lives in a short-lived cookie between the redirect to
//! the identity provider and the callback that exchanges the code.

use axum_extra::extract::cookie::{Cookie, SameSite};
use base64::{Engine as _, engine::general_purpose};
use rand::Rng;
use sha2::{Digest, Sha256};

/// Cookie holding the verifier during a redirect round-trip
pub const VERIFIER_COOKIE: &str = "auth_code_verifier";

const VERIFIER_LEN: usize = 64;
const UNRESERVED: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-._~";

/// Verifier lifetime; recovery emails can take a while to arrive
const VERIFIER_MAX_AGE_SECONDS: i64 = 60 * 60;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PkcePair {
    pub verifier: String,
    pub challenge: String,
}

impl PkcePair {
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let verifier: String = (0..VERIFIER_LEN)
            .map(|_| UNRESERVED[rng.gen_range(0..UNRESERVED.len())] as char)
            .collect();
        let challenge = challenge_for(&verifier);
        Self {
            verifier,
            challenge,
        }
    }
}

/// `base64url(sha256(verifier))` without padding
pub fn challenge_for(verifier: &str) -> String {
    let digest = Sha256::digest(verifier.as_bytes());
    general_purpose::URL_SAFE_NO_PAD.encode(digest)
}

pub fn verifier_cookie(verifier: String, secure: bool) -> Cookie<'static> {
    Cookie::build((VERIFIER_COOKIE, verifier))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(time::Duration::seconds(VERIFIER_MAX_AGE_SECONDS))
        .build()
}

pub fn verifier_removal_cookie() -> Cookie<'static> {
    Cookie::build((VERIFIER_COOKIE, "")).path("/").build()
}
