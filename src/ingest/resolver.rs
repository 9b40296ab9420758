//! Snapshot parsing and station-sequence resolution.
//!
//! A snapshot file is one line per train: line, train number, current
//! station code, direction, destination. Each row is cross-referenced
//! against the station catalog to produce a [`TrainRecord`] with the
//! train's surrounding stations along its line.

use std::path::Path;
use std::sync::Arc;

use tracing::warn;

use super::IngestError;
use crate::catalog::{Station, StationCatalog};

/// First field of a snapshot header row. Simulator restarts can repeat the
/// header mid-file, so every row is checked against it.
const HEADER_SENTINEL: &str = "LineName";

/// Shown in place of a station name past the final station of a line.
pub const END_OF_LINE: &str = "End of Line";
/// Shown in place of a station name before the first station of a line.
pub const START_OF_LINE: &str = "Start of Line";
/// Number of surrounding stations computed per train.
pub const SURROUNDING_COUNT: usize = 4;

/// Travel direction along a line's station sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

impl Direction {
    /// The simulator emits "forward" for one travel direction; any other
    /// token means the train is heading the opposite way.
    pub fn parse(s: &str) -> Self {
        if s == "forward" {
            Direction::Forward
        } else {
            Direction::Backward
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Forward => "forward",
            Direction::Backward => "backward",
        }
    }
}

/// Resolved position data for one train, valid for one ingestion cycle.
#[derive(Debug, Clone)]
pub struct TrainRecord {
    pub train_id: String,
    pub line: String,
    /// The catalog's station, shared rather than copied.
    pub station: Arc<Station>,
    pub direction: Direction,
    pub destination: String,
    /// Exactly [`SURROUNDING_COUNT`] station names ahead of (Forward) or
    /// behind (Backward) the train, padded with [`END_OF_LINE`] /
    /// [`START_OF_LINE`] sentinels. Empty when the current station could
    /// not be located on the line's sequence; consumers must check.
    pub upcoming: Vec<String>,
}

/// Parse a snapshot file into train records. Rows referencing unknown
/// station codes are dropped; short rows and repeated headers are skipped.
pub fn resolve_snapshot(
    path: &Path,
    catalog: &StationCatalog,
) -> Result<Vec<TrainRecord>, IngestError> {
    let file = std::fs::File::open(path)?;
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .has_headers(false)
        .from_reader(file);

    let mut records = Vec::new();
    let mut dropped = 0usize;

    for result in rdr.records() {
        let row = result?;
        if row.get(0).map_or(true, |f| f == HEADER_SENTINEL) {
            continue;
        }
        if row.len() < 5 {
            dropped += 1;
            continue;
        }

        let line = row.get(0).unwrap_or("").to_string();
        let train_id = row.get(1).unwrap_or("").to_string();
        let station_code = row.get(2).unwrap_or("").to_string();
        let direction = Direction::parse(row.get(3).unwrap_or(""));
        let destination = row.get(4).unwrap_or("").to_string();

        let Some(station) = catalog.get(&station_code) else {
            dropped += 1;
            continue;
        };

        let upcoming = surrounding_stations(catalog, &line, &station_code, direction);
        records.push(TrainRecord {
            train_id,
            line,
            station: station.clone(),
            direction,
            destination,
            upcoming,
        });
    }

    if dropped > 0 {
        warn!(
            dropped,
            file = %path.display(),
            "Dropped snapshot rows (short or unresolvable station)"
        );
    }
    Ok(records)
}

/// The names of the [`SURROUNDING_COUNT`] stations ahead of (Forward) or
/// behind (Backward, immediately-previous first) the given station on its
/// line. Positions past either end of the line are filled with sentinels.
/// Returns an empty list when the station does not appear on the line's
/// sequence, which happens when a snapshot row's line disagrees with the
/// topology about where the station belongs.
pub fn surrounding_stations(
    catalog: &StationCatalog,
    line: &str,
    station_code: &str,
    direction: Direction,
) -> Vec<String> {
    let sequence = catalog.stations_on_line(line);
    let Some(index) = sequence.iter().position(|s| s.code == station_code) else {
        return Vec::new();
    };

    let mut names = Vec::with_capacity(SURROUNDING_COUNT);
    for offset in 1..=SURROUNDING_COUNT {
        let name = match direction {
            Direction::Forward => sequence
                .get(index + offset)
                .map(|s| s.name.clone())
                .unwrap_or_else(|| END_OF_LINE.to_string()),
            Direction::Backward => index
                .checked_sub(offset)
                .and_then(|i| sequence.get(i))
                .map(|s| s.name.clone())
                .unwrap_or_else(|| START_OF_LINE.to_string()),
        };
        names.push(name);
    }
    names
}
