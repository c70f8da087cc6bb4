//! Session cookie transport
//!
//! The session token only ever travels in the `AuthToken` cookie. It is
//! never returned in a response body, and an `Authorization` header is not
//! consulted.

use axum::http::{
    header::{COOKIE, SET_COOKIE},
    HeaderMap, HeaderValue,
};
use cookie::{Cookie, CookieBuilder, SameSite};
use time::OffsetDateTime;

use super::jwt::IssuedToken;

pub const AUTH_COOKIE_NAME: &str = "AuthToken";

#[derive(Debug, thiserror::Error)]
pub enum CookieError {
    #[error("Cookie value contains invalid characters")]
    InvalidValue,
}

/// Attributes shared by the set and clear forms. `Lax` rather than `Strict`
/// so the cookie survives the top-level redirect back from the OAuth provider.
fn base_cookie(value: String) -> CookieBuilder<'static> {
    Cookie::build((AUTH_COOKIE_NAME, value))
        .path("/")
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Lax)
}

fn to_header(cookie: &Cookie<'_>) -> Result<HeaderValue, CookieError> {
    HeaderValue::from_str(&cookie.to_string()).map_err(|_| CookieError::InvalidValue)
}

/// Append a `Set-Cookie` carrying `issued` to the response headers
pub fn attach(headers: &mut HeaderMap, issued: &IssuedToken) -> Result<(), CookieError> {
    let value = session_cookie(issued, OffsetDateTime::now_utc())?;
    headers.append(SET_COOKIE, value);
    Ok(())
}

/// Append a `Set-Cookie` that removes the session cookie
pub fn clear(headers: &mut HeaderMap) -> Result<(), CookieError> {
    let mut cookie = base_cookie(String::new()).build();
    cookie.make_removal();
    headers.append(SET_COOKIE, to_header(&cookie)?);
    Ok(())
}

/// Read the session token from the request's `Cookie` headers.
/// An empty value counts as absent.
pub fn extract(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(Result::ok)
        .find(|cookie| cookie.name() == AUTH_COOKIE_NAME)
        .map(|cookie| cookie.value_trimmed().to_string())
        .filter(|value| !value.is_empty())
}

fn session_cookie(issued: &IssuedToken, now: OffsetDateTime) -> Result<HeaderValue, CookieError> {
    let max_age = (issued.expires_at - now).max(time::Duration::ZERO);

    let cookie = base_cookie(issued.token.clone())
        .expires(issued.expires_at)
        .max_age(max_age)
        .build();
    to_header(&cookie)
}
