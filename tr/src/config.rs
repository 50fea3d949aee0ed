//! Daemon configuration loading

use std::path::{Path, PathBuf};

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};

/// Daemon configuration, loaded from YAML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    pub daemon: DaemonSection,
    pub storage: StorageSection,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonSection {
    /// IPC socket path; defaults under the user runtime directory.
    #[serde(rename = "socket-path")]
    pub socket_path: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR).
    #[serde(rename = "log-level")]
    pub log_level: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSection {
    /// State document path; defaults under the user data directory.
    #[serde(rename = "state-path")]
    pub state_path: Option<PathBuf>,
}

impl DaemonConfig {
    /// Load configuration with a fallback chain: explicit path, then
    /// `.tabrotor.yml` in the working directory, then the user config
    /// directory, then defaults.
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        if let Some(path) = config_path {
            return Self::load_from_file(path)
                .context(format!("Failed to load config from {}", path.display()));
        }

        let local_config = PathBuf::from(".tabrotor.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("tabrotor").join("tabrotor.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).context("Failed to read config file")?;
        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;
        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    /// Effective socket path.
    pub fn socket_path(&self) -> PathBuf {
        self.daemon.socket_path.clone().unwrap_or_else(|| {
            dirs::runtime_dir()
                .or_else(dirs::data_local_dir)
                .unwrap_or_else(|| PathBuf::from("."))
                .join("tabrotor")
                .join("daemon.sock")
        })
    }

    /// Effective state document path.
    pub fn state_path(&self) -> PathBuf {
        self.storage.state_path.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("tabrotor")
                .join("state.json")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_paths_are_populated() {
        let config = DaemonConfig::default();
        assert!(config.socket_path().ends_with("tabrotor/daemon.sock"));
        assert!(config.state_path().ends_with("tabrotor/state.json"));
    }

    #[test]
    fn test_deserialize_config() {
        let yaml = r#"
daemon:
  socket-path: /tmp/tr-test/daemon.sock
  log-level: DEBUG

storage:
  state-path: /tmp/tr-test/state.json
"#;
        let config: DaemonConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.socket_path(), PathBuf::from("/tmp/tr-test/daemon.sock"));
        assert_eq!(config.state_path(), PathBuf::from("/tmp/tr-test/state.json"));
        assert_eq!(config.daemon.log_level.as_deref(), Some("DEBUG"));
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let yaml = r#"
daemon:
  log-level: WARN
"#;
        let config: DaemonConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.daemon.log_level.as_deref(), Some("WARN"));
        assert!(config.daemon.socket_path.is_none());
    }
}
