mod bootstrap;
mod health;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use prodcat_core::config::{AppConfig, LoadOptions};
use prodcat_core::service::CatalogService;

fn init_logging(config: &AppConfig) {
    use prodcat_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

pub async fn run() -> Result<()> {
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config).await?;

    health::spawn(
        &app.config.server.bind_address,
        app.config.server.health_check_port,
        Arc::clone(app.catalog.store()),
    )
    .await?;
    spawn_signal_refresh(app.catalog.clone())?;

    tracing::info!(
        event_name = "system.server.started",
        correlation_id = "bootstrap",
        "prodcat-server started"
    );
    wait_for_shutdown().await?;
    tracing::info!(
        event_name = "system.server.stopping",
        correlation_id = "shutdown",
        "prodcat-server stopping"
    );

    // Let an in-flight refresh finish publishing before the process exits.
    let grace = Duration::from_secs(app.config.server.graceful_shutdown_secs);
    if tokio::time::timeout(grace, app.catalog.store().begin_refresh()).await.is_err() {
        tracing::warn!(
            event_name = "system.server.shutdown_timeout",
            correlation_id = "shutdown",
            grace_secs = grace.as_secs(),
            "catalog refresh still running at shutdown"
        );
    }

    Ok(())
}

/// Reloads the catalog whenever the process receives `SIGUSR1`. A failed
/// reload leaves the current snapshot in place.
#[cfg(unix)]
fn spawn_signal_refresh(catalog: CatalogService) -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut refresh_signal = signal(SignalKind::user_defined1())?;
    tokio::spawn(async move {
        while refresh_signal.recv().await.is_some() {
            tracing::info!(
                event_name = "system.server.refresh_requested",
                correlation_id = "signal",
                "catalog refresh requested by SIGUSR1"
            );
            let _ = catalog.refresh_catalog().await;
        }
    });

    Ok(())
}

#[cfg(not(unix))]
fn spawn_signal_refresh(_catalog: CatalogService) -> std::io::Result<()> {
    Ok(())
}

async fn wait_for_shutdown() -> Result<()> {
    tokio::signal::ctrl_c().await?;
    Ok(())
}
