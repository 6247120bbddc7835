//! Payments API Server Binary
//!
//! Starts the HTTP API for payment plans and proof-of-payment review.
//!
//! # Usage
//!
//! ```bash
//! # Run with default configuration
//! cargo run --bin payments-api
//!
//! # Run with environment variables
//! API_PORT=8080 API_DATABASE_URL=postgres://... cargo run --bin payments-api
//! ```
//!
//! # Environment Variables
//!
//! * `API_HOST` - Server host (default: 0.0.0.0)
//! * `API_PORT` - Server port (default: 8080)
//! * `API_DATABASE_URL` - PostgreSQL connection string
//! * `API_LOG_LEVEL` - Log level: trace, debug, info, warn, error (default: info)
//! * `API_LOG_JSON` - Emit JSON log lines (default: false)
//! * `API_STORAGE_ROOT` - Directory for uploaded proofs (default: ./storage)
//! * `API_TIMEZONE` - Business timezone for overdue checks (default: America/Mexico_City)
//! * `API_CALL_TIMEOUT_MS` / `API_RETRY_BACKOFF_MS` - Store call deadline and retry pause
//! * `API_MAX_UPLOAD_BYTES` - Largest accepted proof file

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use core_kernel::SystemClock;
use domain_payments::{PaymentPorts, ProofEventFeed, ServiceSettings};
use infra_db::{
    create_pool, run_migrations, LocalObjectStorage, PostgresNotificationSink,
    PostgresPaymentAdapter,
};
use interface_api::{config::ApiConfig, create_router, AppState};

/// Main entry point for the API server.
///
/// Initializes logging, loads configuration, connects to the database,
/// applies migrations, and serves until Ctrl+C or SIGTERM.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (useful for local development)
    dotenvy::dotenv().ok();

    let config = ApiConfig::from_env().context("loading configuration")?;
    init_tracing(&config.log_level, config.log_json);

    tracing::info!(
        host = %config.host,
        port = %config.port,
        timezone = %config.timezone,
        "Starting payments API server"
    );

    let pool = create_pool(config.database_config())
        .await
        .context("connecting to database")?;
    run_migrations(&pool).await.context("running migrations")?;

    let store = Arc::new(PostgresPaymentAdapter::new(pool.clone()));
    let storage = LocalObjectStorage::new(config.storage_root.clone())
        .await
        .context("opening proof storage")?;
    let ports = PaymentPorts {
        plans: store.clone(),
        proofs: store,
        storage: Arc::new(storage),
        notifier: Arc::new(PostgresNotificationSink::new(pool)),
    };
    let settings = ServiceSettings {
        clock: Arc::new(SystemClock),
        timezone: config.business_timezone()?,
        policy: config.call_policy(),
    };

    let state = AppState::new(ports, settings, ProofEventFeed::new())
        .with_max_upload_bytes(config.max_upload_bytes);
    let app = create_router(state);

    let addr: SocketAddr = config.server_addr().parse()?;
    tracing::info!(%addr, "Server listening");

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Initializes the tracing subscriber for structured logging.
///
/// `RUST_LOG` wins over the configured level when set.
fn init_tracing(log_level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .init();
    }
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
///
/// In-flight requests complete before the process exits. If a handler cannot
/// be installed the error is logged and that signal is never awaited.
async fn shutdown_signal() {
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
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
