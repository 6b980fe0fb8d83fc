//! Persisted settings

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::protocol::{
    DiscoveryPolicy, IngestorConfig, DEFAULT_BAUD_RATE, DEFAULT_READ_TIMEOUT_MS, DOWNLOAD_COMMAND,
};

/// Errors reading or writing the settings file
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Reading or writing the file failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not valid settings JSON
    #[error("Invalid settings file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Application settings, stored as JSON.
///
/// Every field has a default so older or hand-written files keep loading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Port selected on the last run
    pub port: Option<String>,

    /// Baud rate
    pub baud_rate: u32,

    /// Serial read timeout in milliseconds
    pub read_timeout_ms: u64,

    /// How port refresh decides which ports to offer
    pub discovery: DiscoveryPolicy,

    /// Seconds between port watcher scans
    pub watch_interval_secs: u64,

    /// Command that asks the logger for its stored readings
    pub download_command: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            port: None,
            baud_rate: DEFAULT_BAUD_RATE,
            read_timeout_ms: DEFAULT_READ_TIMEOUT_MS,
            discovery: DiscoveryPolicy::default(),
            watch_interval_secs: 3,
            download_command: DOWNLOAD_COMMAND.to_string(),
        }
    }
}

impl Settings {
    /// Default location: `<config dir>/templog/settings.json`
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("templog")
            .join("settings.json")
    }

    /// Load settings from `path`
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Load settings, falling back to defaults when the file does not exist
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        match Self::load(path) {
            Err(ConfigError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                Ok(Self::default())
            }
            other => other,
        }
    }

    /// Save settings to `path`, creating parent directories
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Port watcher period, at least one second
    pub fn watch_interval(&self) -> Duration {
        Duration::from_secs(self.watch_interval_secs.max(1))
    }

    /// Connection parameters for the ingestor
    pub fn ingestor_config(&self) -> IngestorConfig {
        IngestorConfig {
            baud_rate: self.baud_rate,
            read_timeout: Duration::from_millis(self.read_timeout_ms),
            download_command: self.download_command.clone(),
            record_events: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_settings_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");

        let settings = Settings {
            port: Some("/dev/ttyUSB0".into()),
            discovery: DiscoveryPolicy::ProbeOpenable,
            ..Settings::default()
        };
        settings.save(&path).unwrap();

        assert_eq!(Settings::load(&path).unwrap(), settings);
    }

    #[test]
    fn test_missing_fields_take_defaults() {
        let settings: Settings = serde_json::from_str(r#"{ "baud_rate": 115200 }"#).unwrap();
        assert_eq!(settings.baud_rate, 115200);
        assert_eq!(settings.download_command, "GET_DATA");
        assert_eq!(settings.discovery, DiscoveryPolicy::ListAll);
    }

    #[test]
    fn test_policy_serialized_snake_case() {
        let json = serde_json::to_string(&DiscoveryPolicy::ProbeOpenable).unwrap();
        assert_eq!(json, "\"probe_openable\"");
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load_or_default(dir.path().join("absent.json")).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "not json").unwrap();
        assert!(matches!(Settings::load(&path), Err(ConfigError::Parse(_))));
    }
}
