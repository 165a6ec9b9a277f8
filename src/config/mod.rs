mod file_config;

pub use file_config::{BackendConfig, FileConfig, StalenessFileConfig};

use anyhow::{bail, Result};
use std::path::PathBuf;

use crate::reconcile::StalenessConfig;

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub sheet_path: Option<PathBuf>,
    pub state_db_path: Option<PathBuf>,
    pub request_timeout_sec: u64,
    pub interval_secs: u64,
    pub dry_run: bool,
    pub sonarr_url: Option<String>,
    pub sonarr_api_key: Option<String>,
    pub sonarr_root_folder: Option<String>,
    pub sonarr_quality_profile: Option<String>,
    pub radarr_url: Option<String>,
    pub radarr_api_key: Option<String>,
    pub radarr_root_folder: Option<String>,
    pub radarr_quality_profile: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    // Core settings
    pub sheet_path: PathBuf,
    pub state_db_path: Option<PathBuf>,
    pub request_timeout_sec: u64,
    pub interval_secs: u64,
    pub dry_run: bool,

    // Back-ends, None when disabled
    pub sonarr: Option<BackendSettings>,
    pub radarr: Option<BackendSettings>,

    pub staleness: StalenessConfig,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendSettings {
    pub url: String,
    pub api_key: String,
    pub root_folder: String,
    pub quality_profile: Option<String>,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let sheet_path = file
            .sheet_path
            .map(PathBuf::from)
            .or_else(|| cli.sheet_path.clone())
            .ok_or_else(|| {
                anyhow::anyhow!("sheet_path must be specified via --sheet-path or in config file")
            })?;
        if !sheet_path.is_file() {
            bail!("Request sheet does not exist: {:?}", sheet_path);
        }

        let state_db_path = file
            .state_db_path
            .map(PathBuf::from)
            .or_else(|| cli.state_db_path.clone());

        let request_timeout_sec = file
            .request_timeout_sec
            .unwrap_or(cli.request_timeout_sec);
        if request_timeout_sec == 0 {
            bail!("request_timeout_sec must be greater than 0");
        }
        let interval_secs = file.interval_secs.unwrap_or(cli.interval_secs);
        let dry_run = file.dry_run.unwrap_or(cli.dry_run);

        let sonarr = resolve_backend(
            "sonarr",
            file.sonarr.unwrap_or_default(),
            BackendConfig {
                url: cli.sonarr_url.clone(),
                api_key: cli.sonarr_api_key.clone(),
                root_folder: cli.sonarr_root_folder.clone(),
                quality_profile: cli.sonarr_quality_profile.clone(),
            },
        )?;
        let radarr = resolve_backend(
            "radarr",
            file.radarr.unwrap_or_default(),
            BackendConfig {
                url: cli.radarr_url.clone(),
                api_key: cli.radarr_api_key.clone(),
                root_folder: cli.radarr_root_folder.clone(),
                quality_profile: cli.radarr_quality_profile.clone(),
            },
        )?;
        if sonarr.is_none() && radarr.is_none() {
            bail!("At least one of sonarr or radarr must be configured");
        }

        // Staleness settings - merge file config with defaults
        let defaults = StalenessConfig::default();
        let staleness_file = file.staleness.unwrap_or_default();
        let staleness = StalenessConfig {
            check_interval_secs: staleness_file
                .check_interval_secs
                .unwrap_or(defaults.check_interval_secs),
            stale_after_secs: staleness_file
                .stale_after_secs
                .unwrap_or(defaults.stale_after_secs),
        };

        Ok(Self {
            sheet_path,
            state_db_path,
            request_timeout_sec,
            interval_secs,
            dry_run,
            sonarr,
            radarr,
            staleness,
        })
    }
}

/// A back-end is enabled by its url; once enabled it needs an api key and a
/// root folder.
fn resolve_backend(
    name: &str,
    file: BackendConfig,
    cli: BackendConfig,
) -> Result<Option<BackendSettings>> {
    let Some(url) = file.url.or(cli.url) else {
        return Ok(None);
    };
    let Some(api_key) = file.api_key.or(cli.api_key) else {
        bail!("{} api_key must be specified when {} url is set", name, name);
    };
    let Some(root_folder) = file.root_folder.or(cli.root_folder) else {
        bail!("{} root_folder must be specified when {} url is set", name, name);
    };
    Ok(Some(BackendSettings {
        url,
        api_key,
        root_folder,
        quality_profile: file.quality_profile.or(cli.quality_profile),
    }))
}
