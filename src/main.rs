//! MikroTik exporter binary entry point.
//!
//! Loads the YAML configuration, builds the modules and serves `/probe`
//! and `/metrics` until interrupted.

use std::net::SocketAddr;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use mikrotik_exporter::{
    api::NetworkDialer,
    config::AppConfig,
    exposition::ExporterRegistry,
    probe::Prober,
    server::{AppState, create_router},
};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

/// Prometheus exporter for MikroTik RouterOS devices
#[derive(Parser, Debug)]
#[command(name = "mikrotik-exporter", version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.yml", env = "MIKROTIK_EXPORTER_CONFIG")]
    config: String,

    /// Listen address, e.g. 0.0.0.0:9436 (overrides config file)
    #[arg(long, env = "MIKROTIK_EXPORTER_LISTEN")]
    listen: Option<SocketAddr>,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = "info", env = "MIKROTIK_EXPORTER_LOG_LEVEL")]
    log_level: String,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value_t = LogFormat::Text,
        env = "MIKROTIK_EXPORTER_LOG_FORMAT"
    )]
    log_format: LogFormat,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let json = cli.log_format == LogFormat::Json;
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level)))
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(|| tracing_subscriber::fmt::layer()))
        .init();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "MikroTik exporter starting");

    // Load configuration from file
    tracing::info!(path = %cli.config, "Loading configuration");
    let config = AppConfig::load(&cli.config)?;

    let addr = match cli.listen {
        Some(addr) => addr,
        None => format!("{}:{}", config.server.bind, config.server.port).parse()?,
    };

    let prober = Prober::from_config(&config, Arc::new(NetworkDialer))?;
    tracing::info!(
        modules = config.modules.len(),
        devices = prober.devices().len(),
        "Configuration loaded"
    );

    let shutdown = CancellationToken::new();
    let app = create_router(AppState {
        prober: Arc::new(prober),
        registry: ExporterRegistry::new()?,
        shutdown: shutdown.clone(),
    });

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on: http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM, then cancel in-flight scrapes.
async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal");
        }
    }

    shutdown.cancel();
}
