//! Discord API interactions for the verification flow

use serde::Deserialize;
use tracing::{debug, error};

use super::oauth::CallbackSettings;
use crate::error::{Result, VerifyError};

pub const DISCORD_API_BASE: &str = "https://discord.com/api";
pub const DISCORD_AUTHORIZE_URL: &str = "https://discord.com/api/oauth2/authorize";
pub const DISCORD_CDN_BASE: &str = "https://cdn.discordapp.com";

/// Scopes requested at login and required on the issued token.
pub const REQUIRED_SCOPES: [&str; 2] = ["identify", "guilds"];

/// Discord OAuth token response
#[derive(Deserialize, Debug)]
pub struct TokenResponse {
    pub access_token: Option<String>,
    pub token_type: Option<String>,
    pub scope: Option<String>,
    pub expires_in: Option<u64>,
}

impl TokenResponse {
    /// The access token, if Discord issued a non-empty one.
    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref().filter(|token| !token.is_empty())
    }

    /// Granted scopes, split on spaces. A missing field grants nothing.
    pub fn scopes(&self) -> Vec<&str> {
        self.scope
            .as_deref()
            .map(|scope| scope.split(' ').collect())
            .unwrap_or_default()
    }

    pub fn has_required_scopes(&self) -> bool {
        let granted = self.scopes();
        REQUIRED_SCOPES.iter().all(|scope| granted.contains(scope))
    }
}

/// Discord user info from /users/@me
#[derive(Deserialize, Debug, Default)]
pub struct DiscordUser {
    pub id: Option<String>,
    pub username: Option<String>,
    pub global_name: Option<String>,
    pub avatar: Option<String>,
    pub discriminator: Option<String>,
}

impl DiscordUser {
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref().filter(|id| !id.is_empty())
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref().filter(|name| !name.is_empty())
    }

    /// Global display name, falling back to the username.
    pub fn display_name(&self) -> Option<&str> {
        self.global_name
            .as_deref()
            .filter(|name| !name.is_empty())
            .or_else(|| self.username())
    }

    /// CDN URL of the custom avatar, or of the default embed avatar.
    pub fn avatar_url(&self) -> String {
        match (self.id(), self.avatar.as_deref().filter(|hash| !hash.is_empty())) {
            (Some(id), Some(hash)) => format!("{}/avatars/{}/{}.png", DISCORD_CDN_BASE, id, hash),
            _ => {
                let discriminator = self
                    .discriminator
                    .as_deref()
                    .and_then(leading_integer)
                    .unwrap_or(0);
                format!("{}/embed/avatars/{}.png", DISCORD_CDN_BASE, discriminator % 5)
            }
        }
    }
}

/// Integer prefix of `value`: leading whitespace, an optional sign, then
/// digits. `"12abc"` reads as 12, `"abc"` as `None`.
fn leading_integer(value: &str) -> Option<i64> {
    let trimmed = value.trim_start();
    let (negative, rest) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    let end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    let magnitude: i64 = rest[..end].parse().ok()?;
    Some(if negative { -magnitude } else { magnitude })
}

/// A guild from /users/@me/guilds. Only the id matters for membership.
#[derive(Debug, Clone)]
pub struct GuildSummary {
    pub id: String,
    pub name: Option<String>,
}

impl GuildSummary {
    /// Read one array entry. Entries without a string `id` yield `None`;
    /// a malformed `name` is ignored.
    fn from_entry(entry: &serde_json::Value) -> Option<Self> {
        Some(Self {
            id: entry.get("id")?.as_str()?.to_string(),
            name: entry
                .get("name")
                .and_then(serde_json::Value::as_str)
                .map(str::to_string),
        })
    }
}

/// Thin client over the three Discord endpoints used by the callback
#[derive(Clone)]
pub struct DiscordClient {
    http: reqwest::Client,
    api_base: String,
}

impl DiscordClient {
    pub fn new(api_base: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: api_base.into(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.api_base, path)
    }

    /// POST /oauth2/token with the authorization code.
    pub async fn exchange_code(
        &self,
        settings: &CallbackSettings<'_>,
        code: &str,
    ) -> Result<TokenResponse> {
        let response = self
            .http
            .post(self.endpoint("/oauth2/token"))
            .form(&[
                ("client_id", settings.client_id),
                ("client_secret", settings.client_secret),
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", settings.redirect_uri),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            error!("Token exchange failed ({}): {}", status, error_text);
            return Err(VerifyError::TokenExchange);
        }

        Ok(response.json().await?)
    }

    /// GET /users/@me
    pub async fn current_user(&self, access_token: &str) -> Result<DiscordUser> {
        let response = self
            .http
            .get(self.endpoint("/users/@me"))
            .bearer_auth(access_token)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            error!("User info request failed ({}): {}", status, error_text);
            return Err(VerifyError::UserFetch);
        }

        Ok(response.json().await?)
    }

    /// GET /users/@me/guilds
    ///
    /// Fails with [`VerifyError::InvalidGuilds`] when the body is not a JSON
    /// array. Entries without a string `id` are skipped.
    pub async fn current_user_guilds(&self, access_token: &str) -> Result<Vec<GuildSummary>> {
        let response = self
            .http
            .get(self.endpoint("/users/@me/guilds"))
            .bearer_auth(access_token)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            error!("Guild list request failed ({}): {}", status, error_text);
            return Err(VerifyError::GuildFetch);
        }

        let body: serde_json::Value = response.json().await?;
        let serde_json::Value::Array(entries) = body else {
            return Err(VerifyError::InvalidGuilds);
        };

        let guilds: Vec<GuildSummary> = entries.iter().filter_map(GuildSummary::from_entry).collect();
        debug!("User belongs to {} guilds", guilds.len());

        Ok(guilds)
    }
}
