//! Saved region recall
//!
//! The server remembers a saved region in a browser cookie and pre-selects
//! it on the next visit. A command-line client has no cookie jar that
//! survives between runs, so the last acknowledged save is also kept in a
//! small JSON file and read back at start-up.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::core::error::Result;
use crate::core::models::Region;

/// State file format version
pub const STORE_VERSION: u32 = 1;

/// Last region acknowledged by the save endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedRegion {
    pub version: u32,
    pub region: Region,
    /// When the save was acknowledged (RFC 3339)
    #[serde(default)]
    pub saved_at: String,
}

impl SavedRegion {
    pub fn new(region: Region) -> Self {
        Self {
            version: STORE_VERSION,
            region,
            saved_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Read a state file; missing, unreadable or stale files yield `None`
    pub fn load_from_file(path: &Path) -> Option<Self> {
        if !path.exists() {
            return None;
        }

        let content = std::fs::read_to_string(path).ok()?;
        let saved: Self = serde_json::from_str(&content).ok()?;
        if saved.version != STORE_VERSION {
            tracing::debug!(path = %path.display(), version = saved.version, "ignoring saved region");
            return None;
        }
        Some(saved)
    }

    /// Write the state file, creating parent directories
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Default location in the user config directory
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("mawaqit").join("state.json"))
    }
}
