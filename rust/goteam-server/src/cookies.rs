use std::time::Duration;

use axum_extra::extract::cookie::{Cookie, SameSite};

/// Cookie carrying the identity token.
pub const AUTH_COOKIE: &str = "auth-token";

/// Cookie carrying the hierarchy state token.
pub const STATE_COOKIE: &str = "state-token";

/// Builds a cookie that holds `token` for `ttl`.
pub fn token_cookie(name: &'static str, token: String, ttl: Duration) -> Cookie<'static> {
    let max_age = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);

    Cookie::build((name, token))
        .http_only(true)
        .same_site(SameSite::Strict)
        .path("/")
        .max_age(cookie::time::Duration::seconds(max_age))
        .build()
}
