//! vscore-pipeline - Vulnerability Scoring Pipeline service
//!
//! **Module Identity:**
//! - Name: vscore-pipeline
//! - Port: 5780 (configurable)
//!
//! Owns all writes to `vulnerability_records`. Runs either as an HTTP
//! service (`POST /refresh`) or, with `--once`, as a single refresh that
//! prints its JSON result and exits non-zero on error.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vscore_common::config::{RootFolderInitializer, RootFolderResolver, TomlConfig};

use vscore_pipeline::{refresh_vulnerability_scores, AppState, RefreshOptions};

/// Command-line arguments for vscore-pipeline
#[derive(Parser, Debug)]
#[command(name = "vscore-pipeline")]
#[command(about = "Household vulnerability scoring pipeline")]
#[command(version)]
struct Args {
    /// Root folder holding vscore.db (overrides VSCORE_ROOT_FOLDER and TOML)
    #[arg(short, long)]
    root_folder: Option<PathBuf>,

    /// Port to listen on
    #[arg(short, long, env = "VSCORE_PIPELINE_PORT")]
    port: Option<u16>,

    /// Run one refresh, print the result as JSON and exit
    #[arg(long)]
    once: bool,
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
        "Starting vscore-pipeline v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let root_folder = RootFolderResolver::new("vscore-pipeline")
        .with_cli_arg(args.root_folder.clone())
        .with_toml_config(toml_config.clone())
        .resolve();

    let initializer = RootFolderInitializer::new(root_folder);
    initializer
        .ensure_directory_exists()
        .context("Failed to initialize root folder")?;

    let db_path = initializer.database_path();
    info!("Database: {}", db_path.display());

    let pool = vscore_common::db::init_database(&db_path)
        .await
        .context("Failed to open database")?;

    if args.once {
        let result = refresh_vulnerability_scores(&pool, &RefreshOptions::default()).await;
        println!("{}", serde_json::to_string_pretty(&result)?);
        pool.close().await;

        if result.status.is_error() {
            std::process::exit(1);
        }
        return Ok(());
    }

    let state = AppState::new(pool);
    let app = vscore_pipeline::build_router(state);

    let port = args.port.unwrap_or(toml_config.server.pipeline_port);
    let addr: SocketAddr = format!("{}:{}", toml_config.server.bind_address, port)
        .parse()
        .context("Invalid bind address")?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
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
