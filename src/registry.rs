//! In-memory registry of the latest resolved train positions.

use std::collections::HashMap;

use tokio::sync::RwLock;

use crate::ingest::resolver::TrainRecord;

/// Latest position data for every known train, keyed by train id.
///
/// Train ids are assumed unique across lines; if two lines ever reuse a
/// number, the later row in the snapshot wins for that cycle.
#[derive(Default)]
pub struct TrainRegistry {
    trains: RwLock<HashMap<String, TrainRecord>>,
}

impl TrainRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the entire registry with one ingestion cycle's records.
    /// The map is built first and swapped under a single write lock, so a
    /// concurrent reader sees either the previous cycle or the new one,
    /// never a mix and never an empty mid-update state.
    pub async fn replace_all(&self, records: Vec<TrainRecord>) {
        let mut map = HashMap::with_capacity(records.len());
        for record in records {
            map.insert(record.train_id.clone(), record);
        }
        *self.trains.write().await = map;
    }

    /// Position data for a single train, if known.
    pub async fn get(&self, train_id: &str) -> Option<TrainRecord> {
        self.trains.read().await.get(train_id).cloned()
    }

    /// Snapshot of all known trains, in no particular order.
    pub async fn all_trains(&self) -> Vec<TrainRecord> {
        self.trains.read().await.values().cloned().collect()
    }

    /// Trains currently on the given line.
    pub async fn trains_on_line(&self, line: &str) -> Vec<TrainRecord> {
        self.trains
            .read()
            .await
            .values()
            .filter(|t| t.line == line)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Station;
    use crate::ingest::resolver::Direction;
    use std::sync::Arc;

    fn record(train_id: &str, line: &str) -> TrainRecord {
        TrainRecord {
            train_id: train_id.to_string(),
            line: line.to_string(),
            station: Arc::new(Station {
                code: "R01".to_string(),
                name: "Maple Junction".to_string(),
                x: 0.0,
                y: 0.0,
                line: line.to_string(),
                common_stations: Vec::new(),
            }),
            direction: Direction::Forward,
            destination: "R03".to_string(),
            upcoming: Vec::new(),
        }
    }

    #[tokio::test]
    async fn get_and_all_after_replace() {
        let registry = TrainRegistry::new();
        registry
            .replace_all(vec![record("77", "R"), record("12", "B")])
            .await;

        let train = registry.get("77").await.unwrap();
        assert_eq!(train.line, "R");
        assert!(registry.get("99").await.is_none());
        assert_eq!(registry.all_trains().await.len(), 2);
    }

    #[tokio::test]
    async fn replace_all_discards_previous_cycle() {
        let registry = TrainRegistry::new();
        registry.replace_all(vec![record("77", "R")]).await;
        registry.replace_all(vec![record("12", "B")]).await;

        assert!(registry.get("77").await.is_none());
        assert!(registry.get("12").await.is_some());
        assert_eq!(registry.all_trains().await.len(), 1);
    }

    #[tokio::test]
    async fn replace_all_with_empty_cycle_clears_registry() {
        let registry = TrainRegistry::new();
        registry.replace_all(vec![record("77", "R")]).await;
        registry.replace_all(Vec::new()).await;

        assert!(registry.all_trains().await.is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn concurrent_reads_never_observe_a_mixed_cycle() {
        let registry = Arc::new(TrainRegistry::new());
        let red = vec![record("1", "R"), record("2", "R"), record("3", "R")];
        let blue = vec![record("1", "B"), record("2", "B"), record("3", "B")];
        registry.replace_all(red.clone()).await;

        // Every snapshot a reader takes must come from a single cycle.
        let reader = {
            let registry = registry.clone();
            tokio::spawn(async move {
                for _ in 0..500 {
                    let trains = registry.all_trains().await;
                    assert_eq!(trains.len(), 3);
                    let line = trains[0].line.as_str();
                    assert!(trains.iter().all(|t| t.line == line));
                }
            })
        };

        for i in 0..200 {
            let cycle = if i % 2 == 0 { blue.clone() } else { red.clone() };
            registry.replace_all(cycle).await;
        }
        reader.await.unwrap();
    }

    #[tokio::test]
    async fn trains_on_line_filters_by_line() {
        let registry = TrainRegistry::new();
        registry
            .replace_all(vec![record("77", "R"), record("78", "R"), record("12", "B")])
            .await;

        let red = registry.trains_on_line("R").await;
        assert_eq!(red.len(), 2);
        assert!(red.iter().all(|t| t.line == "R"));
        assert!(registry.trains_on_line("G").await.is_empty());
    }
}
