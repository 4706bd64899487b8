// src/main.rs
use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};

use heartbeat_relay::{
    config::{self, DEFAULT_CONFIG_PATH},
    heartbeat::HeartbeatBuffer,
    metrics::{start_metrics_server, MetricsRegistry},
    relay::Relay,
    server::{RequestHandler, ServerBuilder},
};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration (the debug toggle decides the log filter)
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = config::load(config_path.as_deref()).await?;

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(config.logging.crate_directive().parse()?)
                .add_directive("hyper=info".parse()?),
        )
        .init();

    match &config_path {
        Some(path) => info!("Loaded configuration from: {}", path.display()),
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
            info!("Loaded configuration from: {}", DEFAULT_CONFIG_PATH)
        }
        None => info!("No configuration file, using defaults"),
    }

    // Initialize metrics
    let metrics = if config.metrics.enabled {
        let registry = MetricsRegistry::new()?;
        let collector = registry.collector();
        start_metrics_server(
            config.metrics.listen_addr()?,
            registry,
            config.metrics.path.clone(),
        )
        .await?;
        Some(collector)
    } else {
        None
    };

    // One buffer for the whole process, shared by both endpoints
    let buffer = Arc::new(HeartbeatBuffer::new());
    let relay = Arc::new(Relay::new(&config, buffer, metrics));
    let handler = RequestHandler::new(relay.clone());

    let addr = config.server.listen_addr()?;
    info!(
        mode = relay.mode().as_str(),
        "Starting heartbeat relay on {} (receive: {}, monitor: {})",
        addr,
        config.routes.receive,
        config.routes.monitor
    );

    // A listener that cannot start is the only fatal condition.
    if let Err(e) = ServerBuilder::new(addr)
        .with_handler(handler)
        .with_shutdown(shutdown_signal())
        .serve()
        .await
    {
        error!("Heartbeat relay failed: {:#}", e);
        return Err(e);
    }

    Ok(())
}

// Graceful shutdown handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
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
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
