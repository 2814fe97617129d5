//! gitshelf - serve a directory of git repositories over Smart HTTP and JSON
//!
//! # Usage
//! ```bash
//! gitshelf /srv/git                       # Serve every repository under /srv/git
//! gitshelf /srv/git --host 0.0.0.0 -p 8080
//! git clone http://127.0.0.1:3001/project.git
//! ```

mod error;
mod git;
mod models;
mod routes;
mod smart_http;
#[cfg(test)]
mod test_support;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use clap::Parser;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use git::Registry;
use routes::{AppState, SiteInfo};
use smart_http::Bridge;

/// Serve git repositories for cloning, fetching, pushing and browsing
#[derive(Parser)]
#[command(name = "gitshelf")]
#[command(about = "Git Smart HTTP server with a repository browsing API", long_about = None)]
struct Cli {
    /// Directory whose subdirectories are the served repositories
    #[arg(value_name = "ROOT")]
    root: PathBuf,

    /// Address to listen on
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Port to run the server on
    #[arg(short, long, default_value = "3001")]
    port: u16,

    /// Git executable used for upload-pack and receive-pack
    #[arg(long, value_name = "PATH", default_value = "git")]
    git_bin: PathBuf,

    /// Title shown on the repository index
    #[arg(long, default_value = "Git Repositories")]
    title: String,

    /// Description shown on the repository index
    #[arg(long, default_value = "Publish your git repositories with ease")]
    description: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let bridge = Bridge::new(&cli.git_bin);
    let version = bridge
        .check_git()
        .await
        .with_context(|| format!("git executable {} is not usable", cli.git_bin.display()))?;
    tracing::info!("Using {}", version);

    let root = std::fs::canonicalize(&cli.root)
        .with_context(|| format!("repository root {} does not exist", cli.root.display()))?;
    let registry = Arc::new(Registry::new(&root));
    registry
        .reload()
        .with_context(|| format!("failed to scan {}", root.display()))?;

    let state = AppState {
        registry,
        bridge,
        site: Arc::new(SiteInfo {
            title: cli.title,
            description: cli.description,
        }),
    };

    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .merge(routes::create_router(state))
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let addr = format!("{}:{}", cli.host, cli.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind to {}", addr))?;
    tracing::info!("Serving {} on http://{}", root.display(), addr);

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
        tracing::info!("Shutting down");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}
