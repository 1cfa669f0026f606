//! Configuration loading

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub daemon: DaemonConfig,
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Bind address for web server
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Directory holding the built web front end
    #[serde(default = "default_web_root")]
    pub web_root: String,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            web_root: default_web_root(),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_web_root() -> String {
    "web".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Twin served on `/ws/twins/{twin}` and `/api/twins/{twin}/sensors`
    #[serde(default = "default_twin_id")]
    pub twin_id: String,
    /// Building catalog the sensor table is seeded from
    #[serde(default = "default_catalog")]
    pub catalog: String,
    /// Broadcast capacity per connected client before it is considered lagging
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            twin_id: default_twin_id(),
            catalog: default_catalog(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

fn default_twin_id() -> String {
    "campus".to_string()
}

fn default_catalog() -> String {
    "./assets/campus.toml".to_string()
}

fn default_channel_capacity() -> usize {
    256
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Milliseconds between simulated updates
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
    /// Drift amplitude as a fraction of each sensor's catalog value
    #[serde(default = "default_drift")]
    pub drift: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            tick_ms: default_tick_ms(),
            drift: default_drift(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_tick_ms() -> u64 {
    2000
}

fn default_drift() -> f64 {
    0.08
}

/// Load configuration from file
pub fn load_config(path: &Path) -> Result<Config> {
    if path.exists() {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    } else {
        info!(
            path = %path.display(),
            "Configuration file not found, using defaults"
        );
        Ok(Config::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.daemon.bind, "0.0.0.0:8080");
        assert_eq!(config.feed.twin_id, "campus");
        assert!(config.simulation.enabled);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[feed]\ntwin_id = \"north\"\n\n[simulation]\ntick_ms = 500").unwrap();
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.feed.twin_id, "north");
        assert_eq!(config.feed.catalog, "./assets/campus.toml");
        assert_eq!(config.simulation.tick_ms, 500);
        assert_eq!(config.simulation.drift, 0.08);
        assert_eq!(config.daemon.web_root, "web");
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[feed\ntwin_id = ").unwrap();
        assert!(load_config(file.path()).is_err());
    }
}
