//! vscore-report - read-side reporting service
//!
//! **Module Identity:**
//! - Name: vscore-report
//! - Port: 5781 (configurable)
//!
//! Opens the shared database read-only and never writes to it.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vscore_common::config::{RootFolderInitializer, RootFolderResolver, TomlConfig};

use vscore_report::{build_router, AppState};

/// Command-line arguments for vscore-report
#[derive(Parser, Debug)]
#[command(name = "vscore-report")]
#[command(about = "Household vulnerability reporting service")]
#[command(version)]
struct Args {
    /// Root folder holding vscore.db (overrides VSCORE_ROOT_FOLDER and TOML)
    #[arg(short, long)]
    root_folder: Option<PathBuf>,

    /// Port to listen on
    #[arg(short, long, env = "VSCORE_REPORT_PORT")]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let toml_config = TomlConfig::load_or_default();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| toml_config.logging.level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting vscore-report v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let root_folder = RootFolderResolver::new("vscore-report")
        .with_cli_arg(args.root_folder.clone())
        .with_toml_config(toml_config.clone())
        .resolve();

    let db_path = RootFolderInitializer::new(root_folder).database_path();
    info!("Database (read-only): {}", db_path.display());

    let pool = vscore_report::db::connect_readonly(&db_path).await?;

    let app = build_router(AppState::new(pool));

    let port = args.port.unwrap_or(toml_config.server.report_port);
    let addr: SocketAddr = format!("{}:{}", toml_config.server.bind_address, port)
        .parse()
        .context("Invalid bind address")?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received terminate signal, shutting down"),
    }
}
