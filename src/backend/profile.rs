//! Start-up resolution of where and at what quality a back-end acquires.

use thiserror::Error;
use tracing::{info, warn};

use super::media_backend::MediaBackend;

/// Fatal configuration problems detected before any request is processed.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("{backend}: no root folder configured")]
    MissingRootFolder { backend: &'static str },

    #[error("{backend}: root folder {configured:?} not found (available: {available:?})")]
    UnknownRootFolder {
        backend: &'static str,
        configured: String,
        available: Vec<String>,
    },

    #[error("{backend}: quality profile {configured:?} not found (available: {available:?})")]
    UnknownQualityProfile {
        backend: &'static str,
        configured: String,
        available: Vec<String>,
    },

    #[error("{backend}: no quality profiles available")]
    NoQualityProfiles { backend: &'static str },

    #[error("{backend}: failed to query {what}: {source}")]
    Unreachable {
        backend: &'static str,
        what: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

/// Root folder and quality profile every new track is added with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcquisitionProfile {
    pub root_folder_path: String,
    pub quality_profile_id: i64,
    pub quality_profile_name: String,
}

fn same_path(a: &str, b: &str) -> bool {
    a.trim_end_matches('/') == b.trim_end_matches('/')
}

impl AcquisitionProfile {
    /// Match the configured root folder and quality profile against what
    /// the back-end reports.
    ///
    /// With no quality profile configured the first one the back-end lists
    /// is used, with a warning.
    pub async fn resolve(
        backend: &dyn MediaBackend,
        root_folder: Option<&str>,
        quality_profile: Option<&str>,
    ) -> Result<Self, StartupError> {
        let name = backend.kind().display_name();
        let kind = backend.kind();

        let configured_root = root_folder
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .ok_or(StartupError::MissingRootFolder { backend: name })?;

        let folders = backend
            .root_folders()
            .await
            .map_err(|source| StartupError::Unreachable {
                backend: name,
                what: "root folders",
                source,
            })?;
        let root = folders
            .iter()
            .find(|f| same_path(&f.path, configured_root))
            .ok_or_else(|| StartupError::UnknownRootFolder {
                backend: name,
                configured: configured_root.to_string(),
                available: folders.iter().map(|f| f.path.clone()).collect(),
            })?;

        let profiles = backend
            .quality_profiles()
            .await
            .map_err(|source| StartupError::Unreachable {
                backend: name,
                what: "quality profiles",
                source,
            })?;
        if profiles.is_empty() {
            return Err(StartupError::NoQualityProfiles { backend: name });
        }

        let profile = match quality_profile.map(str::trim).filter(|q| !q.is_empty()) {
            Some(wanted) => profiles
                .iter()
                .find(|p| p.name.eq_ignore_ascii_case(wanted))
                .ok_or_else(|| StartupError::UnknownQualityProfile {
                    backend: name,
                    configured: wanted.to_string(),
                    available: profiles.iter().map(|p| p.name.clone()).collect(),
                })?,
            None => {
                let first = &profiles[0];
                warn!(
                    "{}: no quality profile configured, falling back to '{}'",
                    name, first.name
                );
                first
            }
        };

        info!(
            "{} ({:?}) will add to {} with quality profile '{}'",
            name, kind, root.path, profile.name
        );

        Ok(Self {
            root_folder_path: root.path.clone(),
            quality_profile_id: profile.id,
            quality_profile_name: profile.name.clone(),
        })
    }
}
