//! Game settings and preferences
//!
//! Stored as a JSON file next to the player's stats. Environment variables
//! override whatever the file says.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::FEEDBACK_INTERVAL_MS;
use crate::feedback::DEFAULT_TIMEOUT_MS;

pub const ENV_API_URL: &str = "LANE_DASH_API_URL";
pub const ENV_SEED: &str = "LANE_DASH_SEED";
pub const ENV_STATS_PATH: &str = "LANE_DASH_STATS_PATH";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Game settings/preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Difficulty service base URL; `None` plays with local adjustment only
    pub api_base_url: Option<String>,
    /// Play time between difficulty exchanges
    pub feedback_interval_ms: u64,
    /// Time an exchange may stay unanswered before falling back
    pub request_timeout_ms: u64,
    /// Fixed run seed (random when unset)
    pub seed: Option<u64>,
    pub stats_path: PathBuf,
    pub highscores_path: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base_url: None,
            feedback_interval_ms: FEEDBACK_INTERVAL_MS,
            request_timeout_ms: DEFAULT_TIMEOUT_MS,
            seed: None,
            stats_path: PathBuf::from("lane_dash_stats.json"),
            highscores_path: PathBuf::from("lane_dash_highscores.json"),
        }
    }
}

impl Settings {
    /// Load settings from `path`; a missing file gives defaults
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        match fs::read_to_string(path) {
            Ok(json) => {
                let settings = serde_json::from_str(&json)?;
                log::info!("Loaded settings from {}", path.display());
                Ok(settings)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::info!("Using default settings");
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        log::info!("Settings saved");
        Ok(())
    }

    /// Apply `LANE_DASH_*` environment overrides
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|name| env::var(name).ok())
    }

    /// Apply overrides from an arbitrary variable lookup
    pub fn with_overrides_from<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_API_URL).filter(|v| !v.trim().is_empty()) {
            self.api_base_url = Some(url);
        }
        if let Some(raw) = lookup(ENV_SEED) {
            match raw.parse::<u64>() {
                Ok(seed) => self.seed = Some(seed),
                Err(_) => log::warn!("Ignoring {}={:?}: not a u64", ENV_SEED, raw),
            }
        }
        if let Some(path) = lookup(ENV_STATS_PATH).filter(|v| !v.is_empty()) {
            self.stats_path = PathBuf::from(path);
        }
        self
    }
}
