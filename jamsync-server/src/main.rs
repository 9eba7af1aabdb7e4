//! JamSync server - Main entry point
//!
//! Serves the song sheet API and the live session socket.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use jamsync_common::config::{LoggingConfig, RootFolderInitializer, RootFolderResolver, TomlConfig};
use jamsync_server::ingest::Ingestors;
use jamsync_server::sync::Hub;
use jamsync_server::{build_router, db, AppState};
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter};

const DEFAULT_BIND_ADDR: &str = "127.0.0.1";

/// Command-line arguments for jamsync-server
#[derive(Parser, Debug)]
#[command(name = "jamsync-server")]
#[command(about = "Song sheet and live rehearsal session server")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "5780", env = "JAMSYNC_PORT")]
    port: u16,

    /// Root folder holding the database
    #[arg(short, long, env = "JAMSYNC_ROOT_FOLDER")]
    root_folder: Option<PathBuf>,

    /// TOML config file
    #[arg(short, long, env = "JAMSYNC_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Installed before the config is read; its level is swapped in after
    let env_filter = EnvFilter::try_from_default_env().ok();
    let filter_from_env = env_filter.is_some();
    let (filter, filter_handle) = reload::Layer::new(
        env_filter.unwrap_or_else(|| EnvFilter::new(LoggingConfig::default().filter_directives())),
    );
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let config = TomlConfig::load_or_default(args.config.as_deref());

    if !filter_from_env {
        let directives = config.logging.filter_directives();
        if let Err(e) = filter_handle.reload(EnvFilter::new(&directives)) {
            warn!("Failed to apply log level {}: {}", config.logging.level, e);
        }
    }

    info!(
        "Starting JamSync server v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let root_folder = RootFolderResolver::new(args.root_folder.clone(), &config).resolve();
    let initializer = RootFolderInitializer::new(root_folder);
    initializer
        .ensure_directory_exists()
        .context("Failed to create root folder")?;

    let db_path = initializer.database_path();
    info!("Database path: {}", db_path.display());
    let pool = db::init_database_pool(&db_path)
        .await
        .context("Failed to open database")?;

    let ingestors = Ingestors::from_config(&config.feeds).context("Failed to build feed clients")?;
    let hub = Hub::spawn(config.session.default_bpm);

    let app = build_router(AppState::new(pool, ingestors, hub));

    let host = config.bind_addr.as_deref().unwrap_or(DEFAULT_BIND_ADDR);
    let addr: SocketAddr = format!("{}:{}", host, args.port)
        .parse()
        .with_context(|| format!("Invalid bind address {}:{}", host, args.port))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    info!("jamsync-server listening on http://{}", addr);
    info!("Session socket: ws://{}/ws", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
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
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
