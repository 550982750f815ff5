//! Web server for Discord OAuth guild verification
//!
//! `/` starts a Discord login, `/callback` finishes it and sends the browser
//! to the frontend's success or error page.

mod callback;
mod cookies;
mod discord;
mod login;
mod oauth;
mod server;

pub use oauth::OAuthConfig;
pub use server::{start_web_server, WebServerConfig};
