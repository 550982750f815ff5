//! CSRF state cookie handling

use axum::http::{header, HeaderMap, Uri};

pub const OAUTH_STATE_COOKIE: &str = "oauth_state";

/// Lifetime of the state cookie in seconds
pub const STATE_MAX_AGE_SECS: u64 = 300;

/// Extract a cookie value by name, searching every `Cookie` header
pub fn get_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .find_map(|cookie| {
            let (key, value) = cookie.trim().split_once('=')?;
            (key == name).then(|| value.to_string())
        })
}

/// Create the short-lived state cookie set at login
pub fn create_state_cookie(state: &str, secure: bool) -> String {
    let mut cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        OAUTH_STATE_COOKIE, state, STATE_MAX_AGE_SECS
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// Create a cookie that clears the state cookie
pub fn clear_state_cookie() -> String {
    format!(
        "{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0; Expires=Thu, 01 Jan 1970 00:00:00 GMT",
        OAUTH_STATE_COOKIE
    )
}

/// Whether the browser reached us over HTTPS.
///
/// True when this listener terminates TLS itself, when a proxy reports
/// `X-Forwarded-Proto: https`, or when the request line carries an absolute
/// `https` URI.
pub fn is_secure_request(headers: &HeaderMap, uri: &Uri, tls: bool) -> bool {
    if tls {
        return true;
    }

    let forwarded_https = headers
        .get("x-forwarded-proto")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(|proto| proto.trim().eq_ignore_ascii_case("https"))
        .unwrap_or(false);

    forwarded_https || uri.scheme_str() == Some("https")
}
