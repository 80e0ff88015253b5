//! `bookshelf` server entry point.

use anyhow::{Context, Result};
use bookshelf_core::{core_version, init_logging, Catalogue};
use bookshelf_server::{build_router, AppState, CoverStore, ServerConfig};
use clap::Parser;
use log::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    let config = ServerConfig::parse();

    let log_dir = config
        .resolved_log_dir()
        .context("failed to resolve log directory")?;
    init_logging(config.log_level(), &log_dir.to_string_lossy()).map_err(anyhow::Error::msg)?;

    let catalogue = Catalogue::open(&config.db_path)
        .with_context(|| format!("failed to open catalogue `{}`", config.db_path.display()))?;
    let covers = CoverStore::open(config.static_dir.clone()).with_context(|| {
        format!(
            "failed to prepare static directory `{}`",
            config.static_dir.display()
        )
    })?;
    let app = build_router(AppState::new(catalogue, covers));

    let listener = tokio::net::TcpListener::bind(config.socket_addr())
        .await
        .with_context(|| format!("failed to bind {}", config.socket_addr()))?;
    let addr = listener.local_addr()?;

    info!(
        "event=server_start module=server status=ok addr={} db_path={} version={}",
        addr,
        config.db_path.display(),
        core_version()
    );
    println!("Bookshelf is running at http://{addr}/home");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("event=server_stop module=server status=ok");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("event=signal_listen module=server status=error error={err}");
    }
}
