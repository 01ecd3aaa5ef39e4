/// Application settings
/// Stored in ~/.config/newtab-server/config.toml; every field has a default

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::assembler::Theme;
use crate::core::metrics::now_playing::DEFAULT_PLAYER_SERVICE;
use crate::core::sampler::SamplerSettings;

pub const APP_DIR: &str = "newtab-server";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub bind_host: String,
    pub port: u16,
    /// Path of the INI layout file
    pub layout: PathBuf,
    /// How often the page asks for a fresh render
    #[serde(with = "humantime_serde")]
    pub refresh: Duration,
    pub sampler: SamplerConfig,
    pub now_playing: NowPlayingConfig,
    pub theme: Theme,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplerConfig {
    pub enabled: bool,
    #[serde(with = "humantime_serde")]
    pub interval: Duration,
    #[serde(with = "humantime_serde")]
    pub retention: Duration,
    #[serde(with = "humantime_serde")]
    pub sweep_every: Duration,
    pub store_path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NowPlayingConfig {
    pub service: String,
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_host: "127.0.0.1".to_string(),
            port: 9001,
            layout: PathBuf::from("newtab-server.cfg"),
            refresh: Duration::from_secs(30),
            sampler: SamplerConfig::default(),
            now_playing: NowPlayingConfig::default(),
            theme: Theme::default(),
        }
    }
}

impl Default for SamplerConfig {
    fn default() -> Self {
        let defaults = SamplerSettings::default();
        Self {
            enabled: true,
            interval: defaults.interval,
            retention: defaults.retention,
            sweep_every: defaults.sweep_every,
            store_path: None,
        }
    }
}

impl Default for NowPlayingConfig {
    fn default() -> Self {
        Self {
            service: DEFAULT_PLAYER_SERVICE.to_string(),
            timeout: Duration::from_secs(2),
        }
    }
}

impl SamplerConfig {
    pub fn settings(&self) -> SamplerSettings {
        SamplerSettings {
            interval: self.interval,
            retention: self.retention,
            sweep_every: self.sweep_every,
        }
    }

    /// Configured store path, or the per-user data directory
    pub fn store_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.store_path {
            return Ok(path.clone());
        }
        let data_dir = dirs::data_dir().context("Failed to get data directory")?;
        Ok(data_dir.join(APP_DIR).join("history.jsonl"))
    }
}

impl AppConfig {
    /// Default config file path
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().context("Failed to get config directory")?;
        Ok(config_dir.join(APP_DIR).join("config.toml"))
    }

    /// Load settings from `path`, or from the default location.
    /// A missing file yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => Self::config_path()?,
        };

        if !path.exists() {
            tracing::debug!(path = %path.display(), "no settings file, using defaults");
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read settings file {}", path.display()))?;

        let config: Self = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse settings file {}", path.display()))?;

        config.validate()?;
        Ok(config)
    }

    /// Save settings to `path`
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }
        let contents = toml::to_string_pretty(self).context("Failed to serialize settings")?;
        fs::write(path, contents).context("Failed to write settings file")?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.refresh.is_zero() {
            bail!("refresh interval must be greater than zero");
        }
        if self.now_playing.timeout.is_zero() {
            bail!("now_playing timeout must be greater than zero");
        }
        if self.sampler.enabled {
            self.sampler.settings().validate()?;
        }
        Ok(())
    }
}

/// Durations as humantime strings ("60s", "24h", "1h 30m")
mod humantime_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&humantime::format_duration(*value).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let s = String::deserialize(deserializer)?;
        humantime::parse_duration(&s).map_err(serde::de::Error::custom)
    }
}
