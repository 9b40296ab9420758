use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::warn;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Station topology CSV, consumed once at startup.
    pub topology_file: PathBuf,
    /// Snapshot ingestion configuration
    #[serde(default)]
    pub snapshots: SnapshotConfig,
    /// Display board configuration
    #[serde(default)]
    pub board: BoardConfig,
}

/// Configuration for the snapshot ingestion loop
#[derive(Debug, Clone, Deserialize)]
pub struct SnapshotConfig {
    /// Directory the external simulator writes position snapshots into
    /// (default: "out")
    #[serde(default = "SnapshotConfig::default_directory")]
    pub directory: PathBuf,
    /// Interval in seconds between ingestion ticks (default: 15)
    #[serde(default = "SnapshotConfig::default_interval_secs")]
    pub interval_secs: u64,
    /// File extension of snapshot files, without the dot (default: "csv")
    #[serde(default = "SnapshotConfig::default_extension")]
    pub extension: String,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            directory: Self::default_directory(),
            interval_secs: Self::default_interval_secs(),
            extension: Self::default_extension(),
        }
    }
}

impl SnapshotConfig {
    fn default_directory() -> PathBuf {
        PathBuf::from("out")
    }
    fn default_interval_secs() -> u64 {
        15
    }
    fn default_extension() -> String {
        "csv".to_string()
    }
}

/// Configuration for the display board refresh loop
#[derive(Debug, Clone, Deserialize)]
pub struct BoardConfig {
    /// Interval in seconds between board refreshes (default: 5)
    #[serde(default = "BoardConfig::default_refresh_secs")]
    pub refresh_secs: u64,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            refresh_secs: Self::default_refresh_secs(),
        }
    }
}

impl BoardConfig {
    fn default_refresh_secs() -> u64 {
        5
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::ReadError(e.to_string()))?;

        serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Warn about degenerate interval values instead of failing startup.
    pub fn validate(&self) {
        if self.snapshots.interval_secs == 0 {
            warn!("snapshots.interval_secs is 0; the ingestion loop will run at 1s");
        }
        if self.board.refresh_secs == 0 {
            warn!("board.refresh_secs is 0; the board loop will run at 1s");
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(String),
    #[error("Failed to parse config: {0}")]
    ParseError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_config_parses() {
        let yaml = r#"
topology_file: data/Map.csv
snapshots:
  directory: /tmp/subway-out
  interval_secs: 30
  extension: csv
board:
  refresh_secs: 10
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.topology_file, PathBuf::from("data/Map.csv"));
        assert_eq!(config.snapshots.directory, PathBuf::from("/tmp/subway-out"));
        assert_eq!(config.snapshots.interval_secs, 30);
        assert_eq!(config.board.refresh_secs, 10);
    }

    #[test]
    fn missing_sections_use_defaults() {
        let yaml = "topology_file: Map.csv\n";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.snapshots.directory, PathBuf::from("out"));
        assert_eq!(config.snapshots.interval_secs, 15);
        assert_eq!(config.snapshots.extension, "csv");
        assert_eq!(config.board.refresh_secs, 5);
    }

    #[test]
    fn missing_topology_file_is_an_error() {
        let yaml = "snapshots:\n  interval_secs: 15\n";
        assert!(serde_yaml::from_str::<Config>(yaml).is_err());
    }
}
