//! GET /callback - finish the Discord login and check guild membership

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use tracing::{debug, error, info, warn};

use super::cookies::{clear_state_cookie, get_cookie, OAUTH_STATE_COOKIE};
use super::discord::DiscordClient;
use super::oauth::CallbackSettings;
use super::server::{found, AppState};
use crate::error::{Result, VerifyError};

/// Query parameters from Discord OAuth callback
#[derive(Debug, Default)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    /// Set by Discord when the user denies consent
    pub error: Option<String>,
    pub error_description: Option<String>,
}

impl CallbackParams {
    /// Collect the known keys from raw query pairs. A repeated key keeps its
    /// first value.
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        let mut params = Self::default();
        for (key, value) in pairs {
            let slot = match key.as_str() {
                "code" => &mut params.code,
                "state" => &mut params.state,
                "error" => &mut params.error,
                "error_description" => &mut params.error_description,
                _ => continue,
            };
            slot.get_or_insert(value);
        }
        params
    }
}

/// A user who passed every check, ready to hand to the frontend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedMember {
    pub display_name: String,
    pub id: String,
    pub tag: String,
    pub avatar_url: String,
}

impl VerifiedMember {
    pub fn success_url(&self, frontend_url: &str) -> String {
        format!(
            "{}/verification/callback?name={}&id={}&tag={}&avatar={}",
            frontend_url,
            urlencoding::encode(&self.display_name),
            urlencoding::encode(&self.id),
            urlencoding::encode(&self.tag),
            urlencoding::encode(&self.avatar_url)
        )
    }
}

pub fn error_url(frontend_url: &str, message: &str) -> String {
    format!(
        "{}/verification/error?msg={}",
        frontend_url,
        urlencoding::encode(message)
    )
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

pub async fn oauth_callback(
    State(state): State<AppState>,
    headers: HeaderMap,
    query: std::result::Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> Response {
    let settings = match state.oauth.callback_settings() {
        Ok(settings) => settings,
        Err(e) => {
            error!("Cannot handle callback: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Server configuration error: missing required environment variables",
            )
                .into_response();
        }
    };

    let params = match query {
        Ok(Query(pairs)) => CallbackParams::from_pairs(pairs),
        Err(rejection) => {
            warn!("Unreadable callback query: {}", rejection);
            CallbackParams::default()
        }
    };

    if let Some(ref denied) = params.error {
        warn!(
            "Discord returned an authorization error: {} ({})",
            denied,
            params.error_description.as_deref().unwrap_or("no description")
        );
    }

    let stored_state = get_cookie(&headers, OAUTH_STATE_COOKIE);

    let target = match verify_member(&state.discord, &settings, &params, stored_state.as_deref()).await {
        Ok(member) => {
            info!("User {} ({}) verified as guild member", member.tag, member.id);
            member.success_url(settings.frontend_url)
        }
        Err(e) => {
            warn!("Verification rejected: {}", e);
            error_url(settings.frontend_url, &e.user_message())
        }
    };

    found(&target, clear_state_cookie())
}

/// Run the callback checks in order; the first failure ends the flow.
pub async fn verify_member(
    discord: &DiscordClient,
    settings: &CallbackSettings<'_>,
    params: &CallbackParams,
    stored_state: Option<&str>,
) -> Result<VerifiedMember> {
    match (non_empty(params.state.as_deref()), non_empty(stored_state)) {
        (Some(returned), Some(stored)) if returned == stored => {}
        _ => return Err(VerifyError::InvalidState),
    }

    let code = non_empty(params.code.as_deref()).ok_or(VerifyError::MissingCode)?;

    let token = discord.exchange_code(settings, code).await?;
    let access_token = token.access_token().ok_or(VerifyError::TokenExchange)?;
    debug!(
        "Token issued (type {}, expires in {}s)",
        token.token_type.as_deref().unwrap_or("unknown"),
        token.expires_in.unwrap_or_default()
    );
    if !token.has_required_scopes() {
        return Err(VerifyError::ScopesMissing);
    }

    let user = discord.current_user(access_token).await?;
    let (Some(id), Some(username)) = (user.id(), user.username()) else {
        return Err(VerifyError::InvalidUser);
    };

    let guilds = discord.current_user_guilds(access_token).await?;
    let Some(guild) = guilds.iter().find(|guild| guild.id == settings.guild_id) else {
        return Err(VerifyError::NotAMember);
    };
    debug!(
        "User {} is a member of {}",
        id,
        guild.name.as_deref().unwrap_or(&guild.id)
    );

    Ok(VerifiedMember {
        display_name: user.display_name().unwrap_or(username).to_string(),
        id: id.to_string(),
        tag: username.to_string(),
        avatar_url: user.avatar_url(),
    })
}
