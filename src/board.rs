//! Stand-in for the kiosk display layer: periodically queries the registry
//! and logs a per-line summary. The real screen consumes the same query
//! surface at the same cadence, waking early when a new cycle is published.

use std::sync::Arc;

use tokio::sync::{broadcast, watch};
use tracing::{debug, info};

use crate::config::BoardConfig;
use crate::ingest::PositionUpdate;
use crate::registry::TrainRegistry;

pub async fn run(
    registry: Arc<TrainRegistry>,
    config: BoardConfig,
    mut updates: broadcast::Receiver<PositionUpdate>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut interval =
        tokio::time::interval(tokio::time::Duration::from_secs(config.refresh_secs.max(1)));

    loop {
        tokio::select! {
            _ = interval.tick() => refresh(&registry).await,
            update = updates.recv() => match update {
                Ok(update) => {
                    debug!(trains = update.trains, timestamp = %update.timestamp, "New position cycle published");
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!(skipped, "Missed position cycle notifications");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            _ = shutdown.changed() => break,
        }
    }
}

async fn refresh(registry: &TrainRegistry) {
    let trains = registry.all_trains().await;
    if trains.is_empty() {
        return;
    }

    let mut lines: Vec<String> = trains.iter().map(|t| t.line.clone()).collect();
    lines.sort();
    lines.dedup();

    for line in &lines {
        let on_line = registry.trains_on_line(line).await;
        info!(line = %line, trains = on_line.len(), "Line status");
        for train in on_line {
            let next = train.upcoming.first().map(String::as_str).unwrap_or("");
            info!(
                train = %train.train_id,
                station = %train.station.name,
                direction = train.direction.as_str(),
                next,
                destination = %train.destination,
                "Train position"
            );
        }
    }
}
