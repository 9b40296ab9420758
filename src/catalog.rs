//! Static station topology, loaded once at startup from the subway map CSV.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use tracing::{info, warn};

/// A subway station. Immutable after load; shared via `Arc` so train
/// records reference the catalog's copy instead of cloning it.
#[derive(Debug, Clone)]
pub struct Station {
    pub code: String,
    pub name: String,
    /// Map coordinates, used by rendering collaborators only.
    pub x: f64,
    pub y: f64,
    /// The line this station belongs to.
    pub line: String,
    /// Codes of interchange stations shared with other lines.
    pub common_stations: Vec<String>,
}

/// Lookup structure over the station topology.
#[derive(Debug)]
pub struct StationCatalog {
    stations: HashMap<String, Arc<Station>>,
    /// Line id -> stations ordered by station code ascending. This ordering
    /// defines "next" and "previous" for the position resolver.
    by_line: HashMap<String, Vec<Arc<Station>>>,
}

impl StationCatalog {
    /// Load the topology file. The first row is a header and is skipped
    /// unconditionally. Data rows need at least 7 fields:
    /// [1]=line, [3]=station code, [4]=name, [5]=x, [6]=y; everything from
    /// field 7 on is an interchange station code. Short rows and rows with
    /// unparseable coordinates are skipped, not fatal.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, CatalogError> {
        let file = std::fs::File::open(path.as_ref())?;
        let mut rdr = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(file);

        let mut stations: HashMap<String, Arc<Station>> = HashMap::new();
        let mut skipped = 0usize;

        for result in rdr.records() {
            let record = result?;
            if record.len() < 7 {
                skipped += 1;
                continue;
            }

            let line = record.get(1).unwrap_or("").to_string();
            let code = record.get(3).unwrap_or("").to_string();
            let name = record.get(4).unwrap_or("").to_string();
            if code.is_empty() {
                skipped += 1;
                continue;
            }

            let coords = record
                .get(5)
                .and_then(|s| s.parse::<f64>().ok())
                .zip(record.get(6).and_then(|s| s.parse::<f64>().ok()));
            let (x, y) = match coords {
                Some(xy) => xy,
                None => {
                    warn!(code = %code, "Skipping topology row with unparseable coordinates");
                    skipped += 1;
                    continue;
                }
            };

            let common_stations: Vec<String> = record
                .iter()
                .skip(7)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();

            stations.insert(
                code.clone(),
                Arc::new(Station {
                    code,
                    name,
                    x,
                    y,
                    line,
                    common_stations,
                }),
            );
        }

        let mut by_line: HashMap<String, Vec<Arc<Station>>> = HashMap::new();
        for station in stations.values() {
            by_line
                .entry(station.line.clone())
                .or_default()
                .push(station.clone());
        }
        for sequence in by_line.values_mut() {
            sequence.sort_by(|a, b| a.code.cmp(&b.code));
        }

        if skipped > 0 {
            warn!(skipped, "Skipped topology rows (short or unparseable)");
        }
        info!(
            stations = stations.len(),
            lines = by_line.len(),
            "Loaded station topology"
        );

        Ok(Self { stations, by_line })
    }

    /// Look up a station by its code.
    pub fn get(&self, code: &str) -> Option<&Arc<Station>> {
        self.stations.get(code)
    }

    /// All stations on a line, ordered by station code ascending.
    /// Unknown lines yield an empty slice.
    pub fn stations_on_line(&self, line: &str) -> &[Arc<Station>] {
        self.by_line.get(line).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}
