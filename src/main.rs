// Main entry point - Dependency injection and server setup
mod domain;
mod application;
mod infrastructure;
mod presentation;

use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use crate::application::coordinator::{Coordinator, CoordinatorSettings};
use crate::application::sources::push_listener::PushChannel;
use crate::application::sources::simulator::Simulator;
use crate::infrastructure::config::load_settings;
use crate::infrastructure::device_log::DeviceLog;
use crate::infrastructure::http_bridge::HttpBridge;
use crate::presentation::app_state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Load configuration
    let settings = load_settings().context("Failed to load configuration")?;

    // Create adapters (infrastructure layer)
    let bridge = Arc::new(HttpBridge::new(
        &settings.bridge.base_url,
        settings.bridge.request_timeout(),
    )?);
    let device_log = Arc::new(DeviceLog::new(settings.logging.device_log_capacity));
    let push_channel = PushChannel::new(settings.telemetry.push_channel_capacity);

    // Create the coordinator (application layer)
    let (coordinator, handle) = Coordinator::new(
        CoordinatorSettings::from(&settings),
        bridge,
        push_channel.clone(),
        device_log.clone(),
    );
    let coordinator = match settings.telemetry.simulator_seed {
        Some(seed) => coordinator.with_simulator(Simulator::with_seed(seed)),
        None => coordinator,
    };
    let coordinator_task = tokio::spawn(coordinator.run());

    // Create application state
    let state = Arc::new(AppState {
        coordinator: handle.clone(),
        push_channel,
        device_log,
    });

    // Build router (presentation layer)
    let router = presentation::router(state);

    // Start server
    let addr: SocketAddr = settings
        .server
        .bind_addr
        .parse()
        .with_context(|| format!("Invalid server.bind_addr {:?}", settings.server.bind_addr))?;
    tracing::info!(
        "Starting psu-telemetry service on {} (bridge at {})",
        addr,
        settings.bridge.base_url
    );

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await?;

    handle.shutdown().await;
    coordinator_task.await?;

    Ok(())
}
