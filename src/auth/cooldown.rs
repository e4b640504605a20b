//! OTP resend cooldown
//!
//! The time of the last send is kept in a cookie as a unix timestamp.

use axum_extra::extract::CookieJar;
use axum_extra::extract::cookie::{Cookie, SameSite};
use chrono::{DateTime, Utc};

pub const LAST_SENT_COOKIE: &str = "otp_last_sent";

/// Seconds left before another code may be sent
///
/// Zero when no code was sent yet or the cooldown has elapsed. A
/// timestamp in the future counts as just sent.
pub fn remaining(last_sent: Option<i64>, now: DateTime<Utc>, cooldown_seconds: i64) -> i64 {
    let Some(last_sent) = last_sent else {
        return 0;
    };

    let elapsed = now.timestamp().saturating_sub(last_sent).max(0);
    cooldown_seconds.saturating_sub(elapsed).max(0)
}

/// Read the last-sent timestamp from the request cookies
pub fn last_sent(jar: &CookieJar) -> Option<i64> {
    jar.get(LAST_SENT_COOKIE)
        .and_then(|cookie| cookie.value().parse().ok())
}

pub fn last_sent_cookie(now: DateTime<Utc>, cooldown_seconds: i64) -> Cookie<'static> {
    Cookie::build((LAST_SENT_COOKIE, now.timestamp().to_string()))
        .path("/sign-up")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(cooldown_seconds.max(1)))
        .build()
}
