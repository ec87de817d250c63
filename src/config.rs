use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct NudgeConfig {
    pub engine: EngineConfig,
    pub storage: StorageConfig,
    pub sources: SourcesConfig,
    pub notify: NotifyConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EngineConfig {
    pub tick_secs: u64,
    pub log_level: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub db_path: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SourcesConfig {
    /// Local path or `http(s)://` URL of the reminder list.
    pub reminders: String,
    pub location_path: String,
    pub device_state_path: String,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct NotifyConfig {
    /// Program run with the reminder message as its only argument, e.g. `notify-send`.
    pub command: Option<String>,
}

impl Default for NudgeConfig {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            storage: StorageConfig::default(),
            sources: SourcesConfig::default(),
            notify: NotifyConfig::default(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_secs: 1,
            log_level: "info".into(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: in_nudge_dir("state.db"),
        }
    }
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            reminders: in_nudge_dir("reminders.json"),
            location_path: in_nudge_dir("location.json"),
            device_state_path: in_nudge_dir("device.json"),
        }
    }
}

fn in_nudge_dir(file: &str) -> String {
    default_nudge_dir()
        .join(file)
        .to_string_lossy()
        .into_owned()
}

/// Returns `~/.nudge/`
pub fn default_nudge_dir() -> PathBuf {
    dirs::home_dir()
        .expect("home directory must exist")
        .join(".nudge")
}

/// Returns the default config file path: `~/.nudge/config.toml`
pub fn default_config_path() -> PathBuf {
    default_nudge_dir().join("config.toml")
}

impl NudgeConfig {
    /// Load config from TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            NudgeConfig::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides (NUDGE_DB, NUDGE_REMINDERS, NUDGE_LOG_LEVEL).
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("NUDGE_DB") {
            self.storage.db_path = val;
        }
        if let Ok(val) = std::env::var("NUDGE_REMINDERS") {
            self.sources.reminders = val;
        }
        if let Ok(val) = std::env::var("NUDGE_LOG_LEVEL") {
            self.engine.log_level = val;
        }
    }

    pub fn resolved_db_path(&self) -> PathBuf {
        expand_tilde(&self.storage.db_path)
    }

    /// Cycle cadence. Zero is clamped to one second so the loop never spins.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.engine.tick_secs.max(1))
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        dirs::home_dir()
            .expect("home directory must exist")
            .join(rest)
    } else {
        PathBuf::from(path)
    }
}
