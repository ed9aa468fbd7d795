//! Visit Scheduler
//!
//! Runs the booking core with its background expiry task.
//! Reads configuration from TOML file (~/.config/visit-scheduler/config.toml).

use std::net::SocketAddr;
use std::sync::Arc;

use tracing::{error, info, warn};

use visit_scheduler::application::start_application_expiry_task;
use visit_scheduler::config::AppConfig;
use visit_scheduler::infrastructure::{
    InMemoryPrisonDirectory, InMemoryPrisonerService, InMemorySessionTemplates,
};
use visit_scheduler::shared::shutdown::ShutdownCoordinator;
use visit_scheduler::{
    connect_and_migrate, create_event_bus, default_config_path, BookingOrchestrator,
    Collaborators, DatabaseConfig,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // ── Load configuration ─────────────────────────────────────
    let config_path = default_config_path();
    let app_cfg = match AppConfig::load(&config_path) {
        Ok(cfg) => {
            tracing_subscriber::fmt()
                .with_env_filter(
                    tracing_subscriber::EnvFilter::try_from_default_env()
                        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cfg.logging.level)),
                )
                .init();
            info!("Configuration loaded from {}", config_path.display());
            cfg
        }
        Err(e) => {
            tracing_subscriber::fmt()
                .with_env_filter(
                    tracing_subscriber::EnvFilter::try_from_default_env()
                        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
                )
                .init();
            error!("Failed to load config: {}. Using defaults.", e);
            AppConfig::default()
        }
    };

    info!("Starting Visit Scheduler...");

    // ── Prometheus metrics ─────────────────────────────────────
    if app_cfg.metrics.enabled {
        let addr: SocketAddr = app_cfg.metrics.listen.parse()?;
        metrics_exporter_prometheus::PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()?;
        info!("Prometheus metrics exposed on http://{}/metrics", addr);
    }

    // ── Database ───────────────────────────────────────────────
    let db_config = DatabaseConfig {
        url: app_cfg.database.url.clone(),
        max_connections: app_cfg.database.max_connections,
    };
    let db = match connect_and_migrate(&db_config).await {
        Ok(db) => db,
        Err(e) => {
            error!("Failed to prepare database: {}", e);
            return Err(e.into());
        }
    };

    // ── Collaborators ──────────────────────────────────────────
    let prisons = Arc::new(InMemoryPrisonDirectory::new());
    for prison in app_cfg.prisons.iter().cloned() {
        prisons.insert(prison);
    }
    let templates = Arc::new(InMemorySessionTemplates::with_templates(
        app_cfg.session_templates.iter().cloned(),
    ));
    let prisoners = Arc::new(InMemoryPrisonerService::new());
    for prisoner in app_cfg.prisoners.iter().cloned() {
        prisoners.insert(prisoner);
    }
    info!(
        prisons = app_cfg.prisons.len(),
        templates = templates.len(),
        prisoners = prisoners.len(),
        "Collaborators seeded from configuration"
    );
    let event_bus = create_event_bus();

    let booking = BookingOrchestrator::new(
        db.clone(),
        Collaborators {
            templates,
            prisons,
            prisoners,
            audit: event_bus.clone(),
        },
        app_cfg.booking.clone(),
    );

    // ── Background tasks ───────────────────────────────────────
    let shutdown = ShutdownCoordinator::new(app_cfg.server.shutdown_timeout);
    shutdown.start_signal_listener();

    let expiry_task = start_application_expiry_task(
        booking.reclaimer(),
        shutdown.signal(),
        app_cfg.booking.expiry_check_interval_secs,
    );

    info!("Visit Scheduler running. Press Ctrl+C to shutdown gracefully.");
    shutdown.signal().wait().await;

    let finished = shutdown
        .shutdown_with_cleanup(|| async move {
            if let Err(e) = expiry_task.await {
                warn!("Expiry task ended abnormally: {}", e);
            }
        })
        .await;
    if !finished {
        warn!("Shutdown timed out waiting for background tasks");
    }

    if let Err(e) = db.close().await {
        warn!("Error closing database connection: {}", e);
    } else {
        info!("Database connection closed");
    }

    info!("Visit Scheduler shutdown complete");
    Ok(())
}
