// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Beacon-Tracker API Server
//!
//! Ingests location updates from group members' devices, tracks fence
//! membership and stillness, and alerts the group over Telegram.

use beacon_tracker::{
    config::{Config, StorageBackend},
    db::{FirestoreDb, MemoryStore, Storage},
    services::{
        AccountLocks, Broadcaster, IngestService, LogNotifier, Notifier, OfflineSweeper,
        RateLimiter, TelegramNotifier,
    },
    AppState,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging()?;

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(
        port = config.port,
        backend = ?config.storage_backend,
        "Starting Beacon-Tracker API"
    );

    let storage = match config.storage_backend {
        StorageBackend::Firestore => {
            let db = FirestoreDb::new(&config.gcp_project_id).await?;
            Storage::from_backend(Arc::new(db))
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage, data is lost on restart");
            Storage::from_backend(Arc::new(MemoryStore::new()))
        }
    };

    let notifier: Arc<dyn Notifier> = match &config.telegram_bot_token {
        Some(token) => Arc::new(TelegramNotifier::new(token.clone())),
        None => {
            tracing::warn!("TELEGRAM_BOT_TOKEN not set, alerts will only be logged");
            Arc::new(LogNotifier)
        }
    };
    let alerts = Arc::new(Broadcaster::new(storage.accounts.clone(), notifier));

    // Shared by ingest and the sweeper so both serialize on the same account
    let locks = AccountLocks::new();

    let shutdown = CancellationToken::new();
    let sweeper = OfflineSweeper::new(
        storage.clone(),
        alerts.clone(),
        locks.clone(),
        config.offline_threshold,
        config.offline_check_interval,
    );
    let sweeper_task = tokio::spawn(sweeper.run(shutdown.clone()));

    // Build shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        storage: storage.clone(),
        rate_limiter: RateLimiter::new(),
        ingest_service: IngestService::new(storage, alerts, locks),
    });

    // Build router
    let app = beacon_tracker::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
    .await?;

    shutdown.cancel();
    sweeper_task.await?;
    tracing::info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal(shutdown: CancellationToken) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
    shutdown.cancel();
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("beacon_tracker=debug".parse()?)
                .add_directive("info".parse()?),
        )
        .with(format)
        .init();
    Ok(())
}
