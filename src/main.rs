use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, level_filters::LevelFilter, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use request_reconciler::backend::{AcquisitionProfile, MediaBackend, RadarrClient, SonarrClient};
use request_reconciler::config::{AppConfig, BackendSettings, CliConfig, FileConfig};
use request_reconciler::reconcile::{
    BackendSetup, InMemoryStalenessStore, RequestDispatcher, RunMode, SqliteStalenessStore,
    StalenessStore,
};
use request_reconciler::requests::JsonFileSheet;

fn parse_path(s: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(s);
    if path_buf.is_absolute() {
        return Ok(path_buf);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(path_buf))
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to a TOML config file. Values in the file override CLI arguments.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// Path to the JSON request sheet.
    #[clap(long, value_parser = parse_path)]
    pub sheet_path: Option<PathBuf>,

    /// Path to the SQLite database keeping staleness state between runs.
    #[clap(long, value_parser = parse_path)]
    pub state_db_path: Option<PathBuf>,

    /// Timeout in seconds for back-end requests.
    #[clap(long, default_value_t = 30)]
    pub request_timeout_sec: u64,

    /// Seconds between runs. 0 runs once and exits.
    #[clap(long, default_value_t = 0)]
    pub interval_secs: u64,

    /// Classify and log without adding tracks or writing to the sheet.
    #[clap(long)]
    pub dry_run: bool,

    /// Base URL of the Sonarr instance.
    #[clap(long)]
    pub sonarr_url: Option<String>,

    #[clap(long)]
    pub sonarr_api_key: Option<String>,

    /// Root folder new series are added to.
    #[clap(long)]
    pub sonarr_root_folder: Option<String>,

    /// Quality profile name for new series.
    #[clap(long)]
    pub sonarr_quality_profile: Option<String>,

    /// Base URL of the Radarr instance.
    #[clap(long)]
    pub radarr_url: Option<String>,

    #[clap(long)]
    pub radarr_api_key: Option<String>,

    /// Root folder new movies are added to.
    #[clap(long)]
    pub radarr_root_folder: Option<String>,

    /// Quality profile name for new movies.
    #[clap(long)]
    pub radarr_quality_profile: Option<String>,
}

impl CliArgs {
    fn to_cli_config(&self) -> CliConfig {
        CliConfig {
            sheet_path: self.sheet_path.clone(),
            state_db_path: self.state_db_path.clone(),
            request_timeout_sec: self.request_timeout_sec,
            interval_secs: self.interval_secs,
            dry_run: self.dry_run,
            sonarr_url: self.sonarr_url.clone(),
            sonarr_api_key: self.sonarr_api_key.clone(),
            sonarr_root_folder: self.sonarr_root_folder.clone(),
            sonarr_quality_profile: self.sonarr_quality_profile.clone(),
            radarr_url: self.radarr_url.clone(),
            radarr_api_key: self.radarr_api_key.clone(),
            radarr_root_folder: self.radarr_root_folder.clone(),
            radarr_quality_profile: self.radarr_quality_profile.clone(),
        }
    }
}

/// Resolve the acquisition profile against the live back-end. Any failure
/// here is fatal.
async fn setup_backend(
    backend: Arc<dyn MediaBackend>,
    settings: &BackendSettings,
) -> Result<BackendSetup> {
    let profile = AcquisitionProfile::resolve(
        backend.as_ref(),
        Some(settings.root_folder.as_str()),
        settings.quality_profile.as_deref(),
    )
    .await?;
    Ok(BackendSetup { backend, profile })
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("Failed to initialize logging")?;

    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading config from {:?}", path);
            Some(FileConfig::load(path)?)
        }
        None => None,
    };
    let config = AppConfig::resolve(&cli_args.to_cli_config(), file_config)?;

    let mut backends = Vec::new();
    if let Some(settings) = &config.sonarr {
        info!("Connecting to Sonarr at {}", settings.url);
        let client = SonarrClient::new(
            &settings.url,
            &settings.api_key,
            config.request_timeout_sec,
        )?;
        backends.push(setup_backend(Arc::new(client), settings).await?);
    }
    if let Some(settings) = &config.radarr {
        info!("Connecting to Radarr at {}", settings.url);
        let client = RadarrClient::new(
            &settings.url,
            &settings.api_key,
            config.request_timeout_sec,
        )?;
        backends.push(setup_backend(Arc::new(client), settings).await?);
    }

    let staleness_store: Arc<dyn StalenessStore> = match &config.state_db_path {
        Some(path) => {
            info!("Opening staleness database at {:?}", path);
            Arc::new(SqliteStalenessStore::new(path)?)
        }
        None => {
            if config.interval_secs == 0 {
                warn!(
                    "No state_db_path configured: staleness is not remembered between runs and no request will ever be marked STALE"
                );
            }
            Arc::new(InMemoryStalenessStore::new())
        }
    };

    let mode = if config.dry_run {
        RunMode::DryRun
    } else {
        RunMode::Actual
    };
    let dispatcher =
        RequestDispatcher::new(backends, config.staleness.clone(), staleness_store, mode);
    let sheet = JsonFileSheet::open(&config.sheet_path)?;

    if config.interval_secs == 0 {
        let report = dispatcher
            .run(&sheet, chrono::Utc::now().timestamp())
            .await?;
        info!("Run finished: {:?}", report);
        return Ok(());
    }

    info!("Watching {:?} every {}s", config.sheet_path, config.interval_secs);
    let mut interval = tokio::time::interval(Duration::from_secs(config.interval_secs));
    loop {
        interval.tick().await;
        match dispatcher.run(&sheet, chrono::Utc::now().timestamp()).await {
            Ok(report) => info!("Run finished: {:?}", report),
            Err(e) => error!("Run failed: {:#}", e),
        }
    }
}
