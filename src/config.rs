use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::errors::{AppError, AppResult};

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_WAIT_SECONDS: u64 = 10;
pub const DEFAULT_NOTIFICATION_SECONDS: u64 = 10;
pub const REQUEST_TIMEOUT_SECONDS: u64 = 5;

pub fn get_local_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".kodi-playing")
}

pub fn get_settings_path() -> PathBuf {
    get_local_dir().join("settings.toml")
}

pub fn get_log_path() -> PathBuf {
    get_local_dir().join("kodi-playing.csv")
}

/// What to do with `last_known_event` when a track is skipped.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkipPolicy {
    /// Ignore the skipped track entirely; it is evaluated again on the next tick.
    #[default]
    Reevaluate,
    /// Remember the skipped track so it is not evaluated again every tick.
    Remember,
}

/// Skip patterns may be written as a list or as one comma separated string.
#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
enum SkipTitles {
    List(Vec<String>),
    Joined(String),
}

impl From<SkipTitles> for Vec<String> {
    fn from(value: SkipTitles) -> Self {
        let raw = match value {
            SkipTitles::List(list) => list,
            SkipTitles::Joined(joined) => joined.split(',').map(str::to_string).collect(),
        };
        raw.into_iter()
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .collect()
    }
}

fn deserialize_skip_titles<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    SkipTitles::deserialize(deserializer).map(Into::into)
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub address: String,
    pub port: u16,
    /// Poll interval in seconds.
    pub wait: u64,
    /// Seconds a notification stays on screen; 0 disables notifications.
    pub show_notification: u64,
    #[serde(deserialize_with = "deserialize_skip_titles")]
    pub skip_titles: Vec<String>,
    pub skip_policy: SkipPolicy,
    pub request_timeout: u64,
    pub autostart: bool,
    pub log_file: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            address: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            wait: DEFAULT_WAIT_SECONDS,
            show_notification: DEFAULT_NOTIFICATION_SECONDS,
            skip_titles: Vec::new(),
            skip_policy: SkipPolicy::default(),
            request_timeout: REQUEST_TIMEOUT_SECONDS,
            autostart: false,
            log_file: None,
        }
    }
}

impl Settings {
    /// Load settings from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> AppResult<Self> {
        if !path.exists() {
            log::info!("No settings at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let data = fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("Failed to read {:?}: {}", path, e)))?;
        let settings = Self::from_toml(&data)?;
        log::info!("Loaded settings from {:?}", path);
        Ok(settings)
    }

    pub fn from_toml(data: &str) -> AppResult<Self> {
        let settings: Settings = toml::from_str(data)?;
        settings.validate()
    }

    fn validate(mut self) -> AppResult<Self> {
        if self.address.trim().is_empty() {
            return Err(AppError::Config("address must not be empty".to_string()));
        }
        self.address = self.address.trim().to_string();
        self.wait = self.wait.max(1);
        self.request_timeout = self.request_timeout.max(1);
        Ok(self)
    }

    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.address, self.port)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.wait)
    }

    pub fn notification_duration(&self) -> Duration {
        Duration::from_secs(self.show_notification)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }

    pub fn log_path(&self) -> PathBuf {
        self.log_file.clone().unwrap_or_else(get_log_path)
    }
}
