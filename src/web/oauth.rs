//! OAuth configuration sourced from the environment

use tracing::warn;

use super::discord::DISCORD_API_BASE;
use crate::error::ConfigError;

pub const FRONTEND_URL: &str = "FRONTEND_URL";
pub const DISCORD_CLIENT_ID: &str = "DISCORD_CLIENT_ID";
pub const DISCORD_CLIENT_SECRET: &str = "DISCORD_CLIENT_SECRET";
pub const DISCORD_REDIRECT_URI: &str = "DISCORD_REDIRECT_URI";
pub const DISCORD_GUILD_ID: &str = "DISCORD_GUILD_ID";

/// OAuth configuration
///
/// Every field is optional at load time. Handlers decide per request which
/// ones they need and answer `500` when one is missing.
#[derive(Clone, Debug, Default)]
pub struct OAuthConfig {
    pub frontend_url: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub redirect_uri: Option<String>,
    pub guild_id: Option<String>,
    pub api_base: String,
}

/// Settings needed to start a login.
#[derive(Debug)]
pub struct LoginSettings<'a> {
    pub client_id: &'a str,
    pub redirect_uri: &'a str,
}

/// Settings needed to finish a login.
#[derive(Debug)]
pub struct CallbackSettings<'a> {
    pub frontend_url: &'a str,
    pub client_id: &'a str,
    pub client_secret: &'a str,
    pub redirect_uri: &'a str,
    pub guild_id: &'a str,
}

impl OAuthConfig {
    pub fn from_env() -> Self {
        let config = Self {
            frontend_url: env_value(FRONTEND_URL).map(|url| url.trim_end_matches('/').to_string()),
            client_id: env_value(DISCORD_CLIENT_ID),
            client_secret: env_value(DISCORD_CLIENT_SECRET),
            redirect_uri: env_value(DISCORD_REDIRECT_URI),
            guild_id: env_value(DISCORD_GUILD_ID),
            api_base: env_value("DISCORD_API_BASE")
                .map(|base| base.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DISCORD_API_BASE.to_string()),
        };

        for name in config.missing() {
            warn!("{} is not set; affected endpoints will answer 500", name);
        }

        config
    }

    /// Names of the required variables that are absent.
    pub fn missing(&self) -> Vec<&'static str> {
        [
            (FRONTEND_URL, &self.frontend_url),
            (DISCORD_CLIENT_ID, &self.client_id),
            (DISCORD_CLIENT_SECRET, &self.client_secret),
            (DISCORD_REDIRECT_URI, &self.redirect_uri),
            (DISCORD_GUILD_ID, &self.guild_id),
        ]
        .into_iter()
        .filter(|(_, value)| value.is_none())
        .map(|(name, _)| name)
        .collect()
    }

    pub fn login_settings(&self) -> Result<LoginSettings<'_>, ConfigError> {
        Ok(LoginSettings {
            client_id: require(DISCORD_CLIENT_ID, &self.client_id)?,
            redirect_uri: require(DISCORD_REDIRECT_URI, &self.redirect_uri)?,
        })
    }

    pub fn callback_settings(&self) -> Result<CallbackSettings<'_>, ConfigError> {
        Ok(CallbackSettings {
            frontend_url: require(FRONTEND_URL, &self.frontend_url)?,
            client_id: require(DISCORD_CLIENT_ID, &self.client_id)?,
            client_secret: require(DISCORD_CLIENT_SECRET, &self.client_secret)?,
            redirect_uri: require(DISCORD_REDIRECT_URI, &self.redirect_uri)?,
            guild_id: require(DISCORD_GUILD_ID, &self.guild_id)?,
        })
    }
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.is_empty())
}

fn require<'a>(name: &'static str, value: &'a Option<String>) -> Result<&'a str, ConfigError> {
    value
        .as_deref()
        .ok_or(ConfigError::Missing { name })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_config() -> OAuthConfig {
        OAuthConfig {
            frontend_url: Some("https://frontend.example".to_string()),
            client_id: Some("client".to_string()),
            client_secret: Some("secret".to_string()),
            redirect_uri: Some("https://api.example/callback".to_string()),
            guild_id: Some("42".to_string()),
            api_base: DISCORD_API_BASE.to_string(),
        }
    }

    #[test]
    fn test_from_env_reads_all_values() {
        temp_env::with_vars(
            [
                (FRONTEND_URL, Some("https://frontend.example/")),
                (DISCORD_CLIENT_ID, Some("client")),
                (DISCORD_CLIENT_SECRET, Some("secret")),
                (DISCORD_REDIRECT_URI, Some("https://api.example/callback")),
                (DISCORD_GUILD_ID, Some("42")),
                ("DISCORD_API_BASE", None),
            ],
            || {
                let config = OAuthConfig::from_env();
                assert_eq!(config.frontend_url.as_deref(), Some("https://frontend.example"));
                assert_eq!(config.guild_id.as_deref(), Some("42"));
                assert_eq!(config.api_base, DISCORD_API_BASE);
                assert!(config.missing().is_empty());
            },
        );
    }

    #[test]
    fn test_empty_values_count_as_missing() {
        temp_env::with_vars(
            [
                (FRONTEND_URL, Some("")),
                (DISCORD_CLIENT_ID, Some("client")),
                (DISCORD_CLIENT_SECRET, None),
                (DISCORD_REDIRECT_URI, Some("https://api.example/callback")),
                (DISCORD_GUILD_ID, Some("42")),
            ],
            || {
                let config = OAuthConfig::from_env();
                assert_eq!(config.missing(), vec![FRONTEND_URL, DISCORD_CLIENT_SECRET]);
            },
        );
    }

    #[test]
    fn test_login_only_needs_client_id_and_redirect_uri() {
        let config = OAuthConfig {
            frontend_url: None,
            client_secret: None,
            guild_id: None,
            ..full_config()
        };

        let settings = config.login_settings().unwrap();
        assert_eq!(settings.client_id, "client");
        assert_eq!(
            config.callback_settings().unwrap_err(),
            ConfigError::Missing { name: FRONTEND_URL }
        );
    }

    #[test]
    fn test_login_rejects_missing_redirect_uri() {
        let config = OAuthConfig {
            redirect_uri: None,
            ..full_config()
        };

        assert_eq!(
            config.login_settings().unwrap_err(),
            ConfigError::Missing {
                name: DISCORD_REDIRECT_URI
            }
        );
    }

    #[test]
    fn test_callback_requires_guild_id() {
        let config = OAuthConfig {
            guild_id: None,
            ..full_config()
        };

        assert!(config.login_settings().is_ok());
        assert_eq!(
            config.callback_settings().unwrap_err(),
            ConfigError::Missing {
                name: DISCORD_GUILD_ID
            }
        );
    }
}
