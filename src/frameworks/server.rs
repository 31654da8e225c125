// Framework bootstrap for the orbit server runtime.

use crate::domain::WorldSummary;
use crate::frameworks::config;
use crate::interface_adapters::net::{system_status_handler, ws_handler};
use crate::interface_adapters::state::AppState;
use crate::use_cases::game::world_task;
use crate::use_cases::{GameEvent, WorldSettings};

use axum::{Router, routing::get};
use std::net::SocketAddr;
use std::{io::Result, sync::Arc};
use tokio::sync::{Notify, mpsc, watch};

fn init_runtime() {
    let _ = dotenvy::dotenv();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json = matches!(std::env::var("LOG_FORMAT").as_deref(), Ok("json"));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .json()
            .with_current_span(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init();
    }

    std::panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::capture();
        tracing::error!(%info, ?backtrace, "panic");
    }));
}

/// Serves the default world on an already bound listener.
pub async fn run(listener: tokio::net::TcpListener) -> Result<()> {
    run_world(listener, WorldSettings::default()).await
}

pub async fn run_world(listener: tokio::net::TcpListener, settings: WorldSettings) -> Result<()> {
    let address = listener.local_addr()?;
    let shutdown = Arc::new(Notify::new());
    let state = build_state(settings, shutdown.clone());

    // Start the Web Server
    let app = Router::new()
        .route("/ws", get(ws_handler))
        .route("/system", get(system_status_handler))
        .with_state(state);

    tracing::info!(%address, "listening");

    // Serve app and report errors rather than panicking
    let served = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .inspect_err(|e| {
        tracing::error!(error = %e, "server error");
    });

    // Stop the simulation once no connection can reach it any more.
    shutdown.notify_one();
    served
}

pub async fn run_with_config() -> Result<()> {
    init_runtime();

    let address = SocketAddr::from(([127, 0, 0, 1], config::http_port()));

    // Bind TCP listener with error handling
    let listener = tokio::net::TcpListener::bind(address)
        .await
        .inspect_err(|e| {
            tracing::error!(%address, error = %e, "failed to bind");
        })?;

    run_world(listener, config::world_settings()).await
}

fn build_state(settings: WorldSettings, shutdown: Arc<Notify>) -> Arc<AppState> {
    // input_tx/rx: every connection feeds the single world task.
    let (input_tx, input_rx) = mpsc::channel::<GameEvent>(config::INPUT_CHANNEL_CAPACITY);
    // summary_tx/rx: world counts for the status endpoint.
    let (summary_tx, summary_rx) = watch::channel(WorldSummary::default());

    tracing::debug!(
        seed = settings.seed,
        ticks_per_sync = settings.ticks_per_sync(),
        gravity_mode = ?settings.tuning.physics.gravity_mode,
        "world configured"
    );
    tokio::spawn(world_task(input_rx, settings, summary_tx, shutdown));

    Arc::new(AppState {
        input_tx,
        summary_rx,
        outbound_capacity: config::OUTBOUND_CHANNEL_CAPACITY,
    })
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}
