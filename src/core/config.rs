//! Client configuration
//!
//! Loaded from `mawaqit.json` in the working directory or from the user
//! config directory, then overridden by `MAWAQIT_*` environment variables.
//! Every field has a default, so a partial file is fine.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::core::error::{MawaqitError, Result, ResultExt};
use crate::core::models::{PrayerLabels, Region};

/// Config file name looked up in each search path
pub const CONFIG_FILE: &str = "mawaqit.json";

/// Environment override for the server base URL
pub const ENV_BASE_URL: &str = "MAWAQIT_BASE_URL";

/// Environment override for the default region
pub const ENV_REGION: &str = "MAWAQIT_REGION";

/// Configuration for the mawaqit client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Server root, without a trailing slash
    pub base_url: String,
    /// Path of the schedule listing
    pub schedule_path: String,
    /// Path of the save endpoint
    pub save_path: String,
    /// Reverse geocoding endpoint
    pub geocode_url: String,
    /// Language requested from the geocoder
    pub geocode_language: String,
    /// User agent sent with every request
    pub user_agent: String,
    /// Per-request timeout
    pub timeout_seconds: u64,
    /// Offset of the local wall clock from UTC
    pub utc_offset_minutes: i32,
    /// Region used when nothing else selects one
    pub default_region: Region,
    /// Wire labels of the schedule rows
    pub labels: PrayerLabels,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5000".to_string(),
            schedule_path: "/api/v1/mawaqit".to_string(),
            save_path: "/save".to_string(),
            geocode_url: "https://nominatim.openstreetmap.org/reverse".to_string(),
            geocode_language: "ar".to_string(),
            user_agent: format!("mawaqit-client/{}", env!("CARGO_PKG_VERSION")),
            timeout_seconds: 10,
            // Africa/Algiers, no daylight saving
            utc_offset_minutes: 60,
            default_region: Region::new("الجزائر"),
            labels: PrayerLabels::default(),
        }
    }
}

impl ClientConfig {
    /// Full URL of the schedule listing
    pub fn schedule_url(&self) -> String {
        join_url(&self.base_url, &self.schedule_path)
    }

    /// Full URL of the save endpoint
    pub fn save_url(&self) -> String {
        join_url(&self.base_url, &self.save_path)
    }

    /// Parse a config from JSON text
    pub fn from_json(content: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(content)
            .map_err(|e| MawaqitError::invalid_config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config file that must exist
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(MawaqitError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content).context(format!("loading {}", path.display()))
    }

    /// Default search paths, most specific first
    pub fn search_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        if let Ok(cwd) = std::env::current_dir() {
            paths.push(cwd.join(CONFIG_FILE));
        }

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("mawaqit").join("config.json"));
        }

        paths
    }

    /// Load from an explicit path, or the first existing search path, or defaults
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match explicit {
            Some(path) => Self::load_from_file(path)?,
            None => match Self::search_paths().into_iter().find(|p| p.exists()) {
                Some(path) => {
                    tracing::debug!(path = %path.display(), "using config file");
                    Self::load_from_file(&path)?
                }
                None => Self::default(),
            },
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Apply `MAWAQIT_*` overrides from a variable lookup
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_BASE_URL).filter(|v| !v.is_empty()) {
            self.base_url = url;
        }
        if let Some(region) = lookup(ENV_REGION).filter(|v| !v.is_empty()) {
            self.default_region = Region::new(region);
        }
    }

    /// Reject values no request could be built from
    pub fn validate(&self) -> Result<()> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(MawaqitError::invalid_config(format!(
                "base_url must be an http(s) URL, got {:?}",
                self.base_url
            )));
        }
        if self.timeout_seconds == 0 {
            return Err(MawaqitError::invalid_config("timeout_seconds must be positive"));
        }
        if self.utc_offset_minutes.abs() >= 24 * 60 {
            return Err(MawaqitError::invalid_config("utc_offset_minutes out of range"));
        }
        Ok(())
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}
