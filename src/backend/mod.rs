//! Acquisition back-ends (Sonarr for series, Radarr for movies).
//!
//! [`MediaBackend`] is the capability interface both back-ends implement;
//! [`TrackStore`] layers the per-run track index on top of it.

mod arr_http;
mod arr_types;
mod media_backend;
mod models;
mod profile;
mod radarr;
mod sonarr;
mod track_store;

#[cfg(any(test, feature = "mock"))]
pub use media_backend::MockMediaBackend;
pub use media_backend::MediaBackend;
pub use models::*;
pub use profile::{AcquisitionProfile, StartupError};
pub use radarr::RadarrClient;
pub use sonarr::SonarrClient;
pub use track_store::{TrackStore, TrackStoreError};
