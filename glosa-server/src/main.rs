use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use glosa_server::app;
use glosa_server::config::ServerConfig;
use glosa_server::providers::{FixedCycleFeed, GreatCircleRouter};
use glosa_server::state::AppState;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "glosa-server",
    about = "Green-light optimal speed advisory daemon"
)]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Override the configured bind host.
    #[arg(long)]
    host: Option<String>,
    /// Override the configured bind port.
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => ServerConfig::from_file(path)?,
        None => ServerConfig::default(),
    };
    if let Some(host) = cli.host {
        config.host = host;
    }
    if let Some(port) = cli.port {
        config.port = port;
    }

    let state = Arc::new(AppState::new(
        config.clone(),
        Arc::new(GreatCircleRouter::default()),
        Arc::new(FixedCycleFeed::default()),
    ));

    // sweep tokens that authenticated but never opened a connection
    let reaper = state.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(60));
        loop {
            ticker.tick().await;
            let swept = reaper.registry.sweep_stale(reaper.config.idle_timeout());
            if swept > 0 {
                info!("reaped {swept} abandoned session tokens");
            }
        }
    });

    let listener = TcpListener::bind(config.bind_addr()).await?;
    info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install ctrl-c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        _ = terminate => {}
    }
    info!("shutdown signal received");
}
