mod board;
mod catalog;
mod config;
mod ingest;
mod registry;

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use catalog::StationCatalog;
use config::Config;
use ingest::IngestManager;
use registry::TrainRegistry;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    // Load config
    let config = Config::load("config.yaml").expect("Failed to load config");
    config.validate();
    tracing::info!(topology = %config.topology_file.display(), "Loaded configuration");

    // The catalog is load-bearing for every later resolution, so a broken
    // topology file aborts startup.
    let catalog = Arc::new(
        StationCatalog::load(&config.topology_file).expect("Failed to load station topology"),
    );
    if catalog.is_empty() {
        tracing::warn!("Station topology is empty; no train positions will resolve");
    } else {
        tracing::info!(stations = catalog.len(), "Loaded station topology");
    }

    let registry = Arc::new(TrainRegistry::new());
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

    // Start the ingestion loop in the background
    let ingest =
        Arc::new(IngestManager::new(catalog, registry.clone(), config.snapshots.clone()));
    let updates_rx = ingest.update_sender().subscribe();
    let ingest_handle = tokio::spawn(ingest.start(shutdown_rx.clone()));

    // Start the display board loop
    let board_handle = tokio::spawn(board::run(
        registry,
        config.board.clone(),
        updates_rx,
        shutdown_rx,
    ));

    tokio::signal::ctrl_c()
        .await
        .expect("Failed to listen for ctrl-c");
    tracing::info!("Shutdown requested, stopping loops");
    let _ = shutdown_tx.send(true);

    // Let in-flight ticks finish.
    let _ = tokio::join!(ingest_handle, board_handle);
}
