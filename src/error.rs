use thiserror::Error;

/// A required setting is absent. Surfaces as a plain `500`, never a redirect.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required environment variable {name}")]
    Missing { name: &'static str },
}

/// Failures of the verification callback.
///
/// The `Display` text of each variant is the message handed to the frontend
/// error page, so it must stay short and human readable.
#[derive(Error, Debug)]
pub enum VerifyError {
    // CSRF
    #[error("Invalid or missing state parameter")]
    InvalidState,

    #[error("Missing code")]
    MissingCode,

    // Token exchange
    #[error("Token exchange failed")]
    TokenExchange,

    #[error("Required scopes missing")]
    ScopesMissing,

    // Profile
    #[error("Failed to fetch user profile")]
    UserFetch,

    #[error("Invalid user data")]
    InvalidUser,

    // Guilds
    #[error("Failed to fetch guilds")]
    GuildFetch,

    #[error("Invalid guild data")]
    InvalidGuilds,

    #[error("You are not in our server please join janvi's server first")]
    NotAMember,

    // Transport or body decoding failure while talking to Discord
    #[error("{0}")]
    Http(#[from] reqwest::Error),
}

impl VerifyError {
    /// Message for the `msg` query parameter of the error page.
    pub fn user_message(&self) -> String {
        let message = self.to_string();
        if message.trim().is_empty() {
            "Unknown error occurred".to_string()
        } else {
            message
        }
    }
}

pub type Result<T> = std::result::Result<T, VerifyError>;
