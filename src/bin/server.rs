#![forbid(unsafe_code)]

//! HTTP entry point. Resolves the runtime config, opens the store and serves
//! the `/api/v1` routes until Ctrl+C.

use std::{
    net::{IpAddr, SocketAddr},
    path::PathBuf,
};

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use tubegraph::{
    Engine, api,
    config::{RuntimeOverrides, resolve_runtime_config},
};

#[derive(Debug, Parser)]
#[command(name = "tubegraph-server", about = "Serve the video graph API")]
struct ServerArgs {
    /// SQLite database path.
    #[arg(long)]
    database: Option<PathBuf>,
    /// Directory holding uploaded media and thumbnails.
    #[arg(long)]
    asset_root: Option<PathBuf>,
    #[arg(long)]
    host: Option<String>,
    #[arg(long)]
    port: Option<u16>,
    /// Alternate `.env` file.
    #[arg(long = "env-file")]
    env_file: Option<PathBuf>,
}

impl From<ServerArgs> for RuntimeOverrides {
    fn from(args: ServerArgs) -> Self {
        Self {
            database: args.database,
            asset_root: args.asset_root,
            host: args.host,
            port: args.port,
            env_path: args.env_file,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tubegraph=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = resolve_runtime_config(ServerArgs::parse().into())?;
    let host: IpAddr = config
        .host
        .parse()
        .with_context(|| format!("invalid listen host {}", config.host))?;
    let engine = Engine::open(&config).await?;
    let app = api::router(engine);

    let addr = SocketAddr::new(host, config.port);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding to {addr}"))?;
    info!(%addr, "API server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("running API server")?;

    Ok(())
}

async fn shutdown_signal() {
    // Only graceful shutdown depends on this; Ctrl+C still ends the process.
    if let Err(err) = signal::ctrl_c().await {
        warn!(error = %err, "failed to install Ctrl+C handler");
    }
    info!("shutting down");
}
