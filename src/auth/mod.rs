//! Authentication
//!
//! Handles:
//! - Identity provider client (hosted GoTrue API)
//! - Signed session cookies
//! - Route guard and user extractors
//! - Sign-in, sign-up, password reset and OAuth pages

mod cooldown;
mod gotrue;
mod middleware;
mod pkce;
mod provider;
mod routes;
pub mod session;

pub use gotrue::GoTrueClient;
pub use middleware::{CurrentUser, MaybeUser, redirect_for, route_guard};
pub use pkce::{PkcePair, challenge_for};
pub use provider::{
    AuthSession, AuthUser, IdentityProvider, OtpKind, ProviderError, SignOutScope, SignUpOutcome,
};
pub use routes::auth_router;
pub use session::{SESSION_COOKIE, Session, create_session_token, verify_session_token};
