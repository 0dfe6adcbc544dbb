use anyhow::Result;
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use tracing_subscriber::{self, layer::SubscriberExt, util::SubscriberInitExt};

use bitbucket_insight::tools::BitbucketConfig;

#[derive(Parser)]
#[command(author, version = env!("CARGO_PKG_VERSION"))]
#[command(
    about = "Bitbucket Insight MCP Server - Model Context Protocol server for Bitbucket Cloud repositories, pull requests, and issues"
)]
#[command(
    long_about = "Bitbucket Insight MCP Server provides access to Bitbucket Cloud repositories, pull requests, and issues through the Model Context Protocol. Its pull request diff retrieval falls back through per-commit diffs, branch comparison, and commit-range comparison when the direct diff endpoint is unavailable, and degrades oversized diffs to per-file summaries instead of failing. Supports both stdio and HTTP/SSE interfaces for integration with MCP clients like Claude Desktop."
)]
#[command(propagate_version = true)]
#[command(disable_version_flag = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the server in stdin/stdout mode for MCP client integration like Claude Desktop
    Stdio {
        /// Enable debug logging for troubleshooting and development
        #[arg(short, long)]
        debug: bool,

        /// Bitbucket username for app-password authentication (overrides BITBUCKET_USERNAME environment variable)
        #[arg(short = 'u', long)]
        username: Option<String>,

        /// Bitbucket app password (overrides BITBUCKET_APP_PASSWORD environment variable)
        #[arg(short = 'p', long)]
        app_password: Option<String>,

        /// Bitbucket access token, preferred over username/app-password (overrides BITBUCKET_ACCESS_TOKEN environment variable)
        #[arg(short = 't', long)]
        access_token: Option<String>,

        /// Override of the Bitbucket API base URL
        #[arg(long)]
        base_url: Option<String>,
    },
    /// Run the server with HTTP/SSE interface for web-based access and testing
    Http {
        /// Address to bind the HTTP server to for web interface access
        #[arg(short, long, default_value = "0.0.0.0:8080")]
        address: String,

        /// Enable debug logging for troubleshooting and development
        #[arg(short, long)]
        debug: bool,

        /// Bitbucket username for app-password authentication (overrides BITBUCKET_USERNAME environment variable)
        #[arg(short = 'u', long)]
        username: Option<String>,

        /// Bitbucket app password (overrides BITBUCKET_APP_PASSWORD environment variable)
        #[arg(short = 'p', long)]
        app_password: Option<String>,

        /// Bitbucket access token, preferred over username/app-password (overrides BITBUCKET_ACCESS_TOKEN environment variable)
        #[arg(short = 't', long)]
        access_token: Option<String>,

        /// Override of the Bitbucket API base URL
        #[arg(long)]
        base_url: Option<String>,
    },
}

/// Merge command line flags with environment variable fallbacks
fn build_config(
    username: Option<String>,
    app_password: Option<String>,
    access_token: Option<String>,
    base_url: Option<String>,
) -> BitbucketConfig {
    BitbucketConfig {
        username: username.or_else(|| std::env::var("BITBUCKET_USERNAME").ok()),
        app_password: app_password.or_else(|| std::env::var("BITBUCKET_APP_PASSWORD").ok()),
        access_token: access_token.or_else(|| std::env::var("BITBUCKET_ACCESS_TOKEN").ok()),
        base_url,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize rustls crypto provider early to prevent "no process-level CryptoProvider available" panics
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    let cli = Cli::parse();

    match cli.command {
        Commands::Stdio {
            debug: _,
            username,
            app_password,
            access_token,
            base_url,
        } => {
            let config = build_config(username, app_password, access_token, base_url);
            bitbucket_insight::transport::stdio::run_stdio_server(config).await
        }
        Commands::Http {
            address,
            debug,
            username,
            app_password,
            access_token,
            base_url,
        } => {
            let config = build_config(username, app_password, access_token, base_url);
            run_http_server(address, debug, config).await
        }
    }
}

async fn run_http_server(address: String, debug: bool, config: BitbucketConfig) -> Result<()> {
    // Setup tracing
    let level = if debug { "debug" } else { "info" };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("{},{}", level, env!("CARGO_CRATE_NAME")).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_ansi(false)) // Disable ANSI color codes
        .init();

    // Parse socket address
    let addr: SocketAddr = address.parse()?;

    tracing::info!("Access the Bitbucket Insight server at http://{}/sse", addr);

    let app = bitbucket_insight::transport::sse_server::SseServerApp::new(addr, config);
    app.serve().await?;

    Ok(())
}
