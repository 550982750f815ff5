//! GET / - send the browser to Discord's consent screen

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode, Uri},
    response::{IntoResponse, Response},
};
use tracing::{debug, error, info};

use super::cookies::{create_state_cookie, is_secure_request};
use super::discord::{DISCORD_AUTHORIZE_URL, REQUIRED_SCOPES};
use super::oauth::LoginSettings;
use super::server::{found, AppState};

/// Build the Discord authorization URL for one login attempt
pub fn authorize_url(settings: &LoginSettings<'_>, csrf_state: &str) -> String {
    format!(
        "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&state={}",
        DISCORD_AUTHORIZE_URL,
        urlencoding::encode(settings.client_id),
        urlencoding::encode(settings.redirect_uri),
        urlencoding::encode(&REQUIRED_SCOPES.join(" ")),
        urlencoding::encode(csrf_state)
    )
}

pub async fn login(State(state): State<AppState>, headers: HeaderMap, uri: Uri) -> Response {
    let settings = match state.oauth.login_settings() {
        Ok(settings) => settings,
        Err(e) => {
            error!("Cannot start login: {}", e);
            return (StatusCode::INTERNAL_SERVER_ERROR, "Server configuration error").into_response();
        }
    };

    let csrf_state = uuid::Uuid::new_v4().to_string();
    let secure = is_secure_request(&headers, &uri, state.tls);
    let oauth_url = authorize_url(&settings, &csrf_state);

    info!("Starting Discord login (secure cookie: {})", secure);
    debug!("Redirecting to {}", oauth_url);

    found(&oauth_url, create_state_cookie(&csrf_state, secure))
}
