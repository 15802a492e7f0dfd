use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use skillgraph_mcp::config::{AppConfig, AppState, DetectionLocks};
use skillgraph_mcp::server::SkillGraphServer;
use skillgraph_mcp::storage::{StorageBackend, SurrealStorage};

#[derive(Parser)]
#[command(name = "skillgraph-mcp")]
#[command(about = "Semantic relationship engine for skill catalogs")]
struct Cli {
    #[arg(long, env, default_value_os_t = default_data_dir())]
    data_dir: PathBuf,

    /// Embedding dimensionality; must match the external embedding provider.
    #[arg(long, env = "EMBEDDING_DIMENSION", default_value = "1024")]
    dimension: usize,

    /// Louvain resolution. Higher values produce more, smaller communities.
    #[arg(long, env, default_value = "1.0")]
    resolution: f32,

    /// Candidate-edge budget per detection run.
    #[arg(long, env, default_value = "50000")]
    max_edges: usize,

    /// Wall-clock budget per detection run, in milliseconds.
    #[arg(long, env = "DETECTION_BUDGET_MS", default_value = "30000")]
    detection_budget: u64,

    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Reconnect timeout in seconds before shutdown after connection loss.
    #[arg(long, env, default_value = "10")]
    reconnect_timeout: u64,
}

fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("skillgraph-mcp")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(&cli.log_level)
        .with_writer(std::io::stderr)
        .init();

    let storage = Arc::new(SurrealStorage::new(&cli.data_dir, cli.dimension).await?);

    if let Err(e) = storage.check_dimension(cli.dimension).await {
        tracing::error!("{}", e);
        std::process::exit(1);
    }

    let state = Arc::new(AppState {
        config: AppConfig {
            data_dir: cli.data_dir,
            dimension: cli.dimension,
            resolution: cli.resolution,
            max_edges: cli.max_edges,
            detection_budget_ms: cli.detection_budget,
            log_level: cli.log_level,
        },
        storage: storage.clone(),
        detection_locks: DetectionLocks::new(),
    });

    let server = SkillGraphServer::new(state.clone());

    let transport = rmcp::transport::io::stdio();
    let service = rmcp::service::serve_server(server, transport).await?;

    tracing::info!(
        reconnect_timeout_sec = cli.reconnect_timeout,
        "Server started, waiting for signals..."
    );

    #[cfg(unix)]
    let mut terminate = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;

    let reconnect_timeout = Duration::from_secs(cli.reconnect_timeout);
    let shutdown_reason: &str;

    tokio::select! {
        res = service.waiting() => {
            match res {
                Err(e) => {
                    tracing::error!("Server error: {}", e);
                    shutdown_reason = "server_error";
                }
                Ok(_) => {
                    tracing::info!(
                        timeout_sec = cli.reconnect_timeout,
                        "Connection closed, waiting for reconnect..."
                    );

                    tokio::select! {
                        _ = tokio::time::sleep(reconnect_timeout) => {}
                        _ = tokio::signal::ctrl_c() => {
                            tracing::info!("Received SIGINT during reconnect wait");
                        }
                    }
                    tracing::info!("No reconnect within timeout, shutting down");
                    shutdown_reason = "connection_timeout";
                }
            }
        },
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutting down gracefully... (SIGINT)");
            shutdown_reason = "sigint";
        },
        _ = async {
            #[cfg(unix)]
            {
                terminate.recv().await;
            }
            #[cfg(not(unix))]
            {
                std::future::pending::<()>().await;
            }
        } => {
            tracing::info!("Shutting down gracefully... (SIGTERM)");
            shutdown_reason = "sigterm";
        }
    }

    tracing::info!(reason = shutdown_reason, "Initiating graceful shutdown...");

    tracing::info!("Flushing database...");
    if let Err(e) = state.storage.shutdown().await {
        tracing::warn!("Database shutdown error: {}", e);
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
