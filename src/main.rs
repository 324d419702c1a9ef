//! request-shield demo gateway.
//!
//! # Architecture Overview
//!
//! ```text
//!                    ┌──────────────────────────────────────────────┐
//!                    │              REQUEST-SHIELD GATEWAY           │
//!                    │                                               │
//!   Client Request   │  ┌──────────┐   ┌──────────┐   ┌──────────┐  │
//!   ─────────────────┼─▶│  rate    │──▶│ threat   │──▶│ zero-    │  │
//!                    │  │  limiter │   │ detector │   │ trust    │  │
//!                    │  └────┬─────┘   └────┬─────┘   └────┬─────┘  │
//!                    │       │429           │403           │401     │
//!                    │       ▼              ▼              ▼        │
//!                    │  ┌────────────────────────────────────────┐  │
//!                    │  │            security monitor            │  │
//!                    │  │     events → alerts → dashboard        │  │
//!                    │  └────────────────────────────────────────┘  │
//!                    │                                               │
//!                    │  Cross-cutting: config / store / cache /      │
//!                    │  tracing / metrics                            │
//!                    └──────────────────────────────────────────────┘
//! ```

use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use request_shield::config::{self, ShieldConfig};
use request_shield::http::{router, GatewayState};
use request_shield::observability::metrics;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing subscriber
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "request_shield=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("request-shield v{} starting", env!("CARGO_PKG_VERSION"));

    // Load configuration; defaults apply when no file is given.
    let config = match std::env::args().nth(1) {
        Some(path) => config::load_from_file(&path)?,
        None => ShieldConfig::default(),
    };

    tracing::info!(
        bind_address = %config.listener.bind_address,
        max_requests = config.rate_limit.max_requests,
        window_ms = config.rate_limit.window_ms,
        strict_mode = config.zero_trust.strict_mode,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let bind_address = config.listener.bind_address.clone();
    let state = GatewayState::from_config(config)?;
    let app = router(state).into_make_service_with_connect_info::<SocketAddr>();

    let listener = TcpListener::bind(&bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C).
async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    tracing::info!("Shutdown signal received");
}
