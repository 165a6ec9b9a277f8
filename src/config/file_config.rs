use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    // Core settings (can override CLI)
    pub sheet_path: Option<String>,
    pub state_db_path: Option<String>,
    pub request_timeout_sec: Option<u64>,
    pub interval_secs: Option<u64>,
    pub dry_run: Option<bool>,

    // Back-ends
    pub sonarr: Option<BackendConfig>,
    pub radarr: Option<BackendConfig>,

    pub staleness: Option<StalenessFileConfig>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct BackendConfig {
    pub url: Option<String>,
    pub api_key: Option<String>,
    /// Must match one of the back-end's root folders.
    pub root_folder: Option<String>,
    /// Quality profile name; the back-end's first profile when absent.
    pub quality_profile: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct StalenessFileConfig {
    pub check_interval_secs: Option<u64>,
    pub stale_after_secs: Option<u64>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}
