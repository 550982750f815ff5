//! Web server implementation for OAuth verification

use axum::{
    extract::Host,
    handler::HandlerWithoutStateExt,
    http::{header, StatusCode, Uri},
    response::{IntoResponse, Redirect, Response},
    routing::get,
    BoxError, Router,
};
use axum_server::tls_rustls::RustlsConfig;
use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    path::PathBuf,
    sync::Arc,
};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use super::callback::oauth_callback;
use super::discord::DiscordClient;
use super::login::login;
use super::oauth::OAuthConfig;

/// Certificate and key used when the server terminates TLS itself
#[derive(Debug, Clone)]
pub struct TlsPaths {
    /// Path to certificate PEM file (cert + CA bundle)
    pub cert_path: PathBuf,
    /// Path to private key PEM file
    pub key_path: PathBuf,
}

/// Web server configuration
#[derive(Debug, Clone)]
pub struct WebServerConfig {
    pub host: IpAddr,
    pub port: u16,
    pub tls: Option<TlsPaths>,
    /// Plain HTTP port that redirects to HTTPS (TLS only)
    pub http_redirect_port: Option<u16>,
}

impl Default for WebServerConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 3000,
            tls: None,
            http_redirect_port: None,
        }
    }
}

impl WebServerConfig {
    /// Create config from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let tls = match (std::env::var("TLS_CERT_PATH"), std::env::var("TLS_KEY_PATH")) {
            (Ok(cert), Ok(key)) => Some(TlsPaths {
                cert_path: PathBuf::from(cert),
                key_path: PathBuf::from(key),
            }),
            (Ok(_), Err(_)) | (Err(_), Ok(_)) => {
                warn!("Only one of TLS_CERT_PATH / TLS_KEY_PATH is set; serving plain HTTP");
                None
            }
            _ => None,
        };

        Self {
            host: std::env::var("HOST")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.host),
            port: std::env::var("PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.port),
            tls,
            http_redirect_port: std::env::var("HTTP_REDIRECT_PORT")
                .ok()
                .and_then(|s| s.parse().ok()),
        }
    }
}

/// Shared state for web handlers
#[derive(Clone)]
pub struct AppState {
    pub oauth: Arc<OAuthConfig>,
    pub discord: DiscordClient,
    /// Whether this listener terminates TLS
    pub tls: bool,
}

/// `302 Found` to `location` carrying exactly one `Set-Cookie` header
pub fn found(location: &str, cookie: String) -> Response {
    (
        StatusCode::FOUND,
        [
            (header::LOCATION, location.to_string()),
            (header::SET_COOKIE, cookie),
        ],
    )
        .into_response()
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(login))
        .route("/callback", get(oauth_callback))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the web server for OAuth verification
pub async fn start_web_server(config: WebServerConfig, oauth: OAuthConfig) -> anyhow::Result<()> {
    let state = AppState {
        discord: DiscordClient::new(oauth.api_base.clone()),
        oauth: Arc::new(oauth),
        tls: config.tls.is_some(),
    };
    let app = router(state);
    let addr = SocketAddr::new(config.host, config.port);

    let Some(tls) = config.tls else {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        info!("Web server listening on http://{}", listener.local_addr()?);
        axum::serve(listener, app).await?;
        return Ok(());
    };

    // Load TLS configuration
    let cert_path = tls.cert_path.canonicalize().unwrap_or_else(|_| tls.cert_path.clone());
    let key_path = tls.key_path.canonicalize().unwrap_or_else(|_| tls.key_path.clone());

    info!("Loading TLS certificates:");
    info!("  Certificate: {}", cert_path.display());
    info!("  Private key: {}", key_path.display());

    if !tls.cert_path.exists() {
        return Err(anyhow::anyhow!(
            "Certificate file not found: {}",
            cert_path.display()
        ));
    }
    if !tls.key_path.exists() {
        return Err(anyhow::anyhow!(
            "Private key file not found: {}",
            key_path.display()
        ));
    }

    let tls_config = RustlsConfig::from_pem_file(&tls.cert_path, &tls.key_path)
        .await
        .map_err(|e| anyhow::anyhow!(
            "Failed to load TLS certificates: {}\n  Certificate: {}\n  Private key: {}\n\nHint: The private key must be in PKCS#8 PEM format. If you have an RSA key, convert it with:\n  openssl pkcs8 -topk8 -inform PEM -outform PEM -nocrypt -in private.key -out key.pem",
            e, cert_path.display(), key_path.display()
        ))?;

    if let Some(http_port) = config.http_redirect_port {
        tokio::spawn(redirect_http_to_https(config.host, http_port, config.port));
    }

    info!("Web server listening on https://{}", addr);
    axum_server::bind_rustls(addr, tls_config)
        .serve(app.into_make_service())
        .await?;

    Ok(())
}

fn make_https(host: &str, uri: Uri, https_port: u16) -> Result<Uri, BoxError> {
    let mut parts = uri.into_parts();

    parts.scheme = Some(axum::http::uri::Scheme::HTTPS);

    if parts.path_and_query.is_none() {
        parts.path_and_query = Some("/".parse()?);
    }

    let authority: axum::http::uri::Authority = host.parse()?;
    let bare_host = authority.host();

    // Only add port if it's not the default HTTPS port
    if https_port == 443 {
        parts.authority = Some(bare_host.parse()?);
    } else {
        parts.authority = Some(format!("{bare_host}:{https_port}").parse()?);
    }

    Ok(Uri::from_parts(parts)?)
}

/// Redirect all HTTP requests to HTTPS
async fn redirect_http_to_https(host: IpAddr, http_port: u16, https_port: u16) {
    let redirect = move |Host(host): Host, uri: Uri| async move {
        match make_https(&host, uri, https_port) {
            Ok(uri) => Ok(Redirect::permanent(&uri.to_string())),
            Err(error) => {
                warn!(%error, "Failed to convert URI to HTTPS");
                Err(StatusCode::BAD_REQUEST)
            }
        }
    };

    let addr = SocketAddr::new(host, http_port);
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            error!("Failed to bind HTTP redirect server on port {}: {}", http_port, e);
            return;
        }
    };

    info!("HTTP redirect server listening on http://{}", addr);

    if let Err(e) = axum::serve(listener, redirect.into_make_service()).await {
        error!("HTTP redirect server error: {}", e);
    }
}

/// Health check endpoint
async fn health() -> &'static str {
    "OAuth Verification Server Running"
}
