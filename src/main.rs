use anyhow::Result;
use clap::Parser;
use dotenv::dotenv;
use std::net::IpAddr;
use tracing::info;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod error;
mod web;

/// Discord OAuth login that verifies membership of a required guild
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Address to bind (overrides HOST)
    #[arg(long)]
    host: Option<IpAddr>,

    /// Port to listen on (overrides PORT)
    #[arg(long, short = 'p')]
    port: Option<u16>,

    /// Log at DEBUG instead of INFO
    #[arg(long, short = 'v')]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let args = Args::parse();

    let level = if args.verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_level(true),
        )
        .with(level)
        .init();

    let oauth = web::OAuthConfig::from_env();

    let mut web_config = web::WebServerConfig::from_env();
    if let Some(host) = args.host {
        web_config.host = host;
    }
    if let Some(port) = args.port {
        web_config.port = port;
    }

    info!("=== Discord OAuth Configuration ===");
    match oauth.redirect_uri.as_deref() {
        Some(redirect_uri) => {
            info!("Add this Redirect URI in Discord Developer Portal:");
            info!("  {}", redirect_uri);
        }
        None => info!("DISCORD_REDIRECT_URI is not set"),
    }
    info!("Portal: https://discord.com/developers/applications -> OAuth2 -> Redirects");

    web::start_web_server(web_config, oauth).await
}
