//! SportMonks Ingestion Service
//!
//! Polls SportMonks for fixtures with odds, canonicalizes bookmaker labels and
//! stores fixtures and wide odds rows in PostgreSQL. Rows are optionally
//! published to a Redis Stream.

use anyhow::Result;
use sportmonks_ingestion::health;
use sportmonks_ingestion::service::IngestionService;
use sportmonks_ingestion::Config;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    // Local runs may keep settings in .env; deployments use env vars and secret files.
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("sportmonks_ingestion=info".parse()?),
        )
        .init();

    info!("SportMonks Ingestion Service v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env()?;
    let health_port = config.health_port;
    let run_once = config.run_once;
    let sync_reference = config.sync_reference;

    let service = IngestionService::new(config).await?;

    // Start health check server
    let app = health::router(service.health());
    let health_addr = format!("0.0.0.0:{}", health_port);
    info!("Health endpoint listening on {}", health_addr);

    let listener = tokio::net::TcpListener::bind(&health_addr).await?;

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("Health server error: {:?}", e);
        }
    });

    if sync_reference {
        if let Err(e) = service.sync_reference_data().await {
            error!("Reference data sync failed: {:?}", e);
        }
    }

    // Check if running in one-shot mode (manual trigger)
    if run_once {
        info!("Running in one-shot mode (RUN_ONCE=true)");
        match service.poll_once().await {
            Ok(summary) => {
                info!(
                    "One-shot sync completed: {} fixtures, {} odds rows stored",
                    summary.fixtures, summary.rows
                );
            }
            Err(e) => {
                error!("One-shot sync failed: {:?}", e);
                return Err(e);
            }
        }
        return Ok(());
    }

    // Handle shutdown gracefully (continuous mode)
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    tokio::select! {
        result = service.run() => {
            if let Err(e) = result {
                error!("Service error: {:?}", e);
            }
        }
        _ = ctrl_c => {
            info!("Shutting down...");
        }
    }

    Ok(())
}
