//! Radarr client: the movie back-end.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use tracing::{debug, info};

use super::arr_http::ArrHttp;
use super::arr_types::*;
use super::media_backend::MediaBackend;
use super::models::{
    BackendKind, EpisodeRecord, NewTrack, QualityProfile, QueueSnapshot, RootFolder, Track,
    TrackDetails,
};
use super::profile::AcquisitionProfile;

/// Client for a Radarr v3 instance.
#[derive(Clone)]
pub struct RadarrClient {
    http: ArrHttp,
}

impl RadarrClient {
    pub fn new(base_url: &str, api_key: &str, timeout_secs: u64) -> Result<Self> {
        Ok(Self {
            http: ArrHttp::new(base_url, api_key, timeout_secs)?,
        })
    }

    fn to_track(movie: RadarrMovie) -> Track {
        Track {
            track_id: movie.id,
            external_id: movie.tmdb_id,
            title: movie.title,
            details: TrackDetails::Movie {
                has_file: movie.has_file,
            },
        }
    }
}

#[async_trait]
impl MediaBackend for RadarrClient {
    fn kind(&self) -> BackendKind {
        BackendKind::Movie
    }

    async fn lookup_canonical_title(&self, external_id: u64) -> Result<Option<String>> {
        let movie: Option<RadarrMovieLookup> = self
            .http
            .get("movie/lookup/tmdb", &[("tmdbId", external_id.to_string())])
            .await?;
        Ok(movie.map(|m| m.title).filter(|t| !t.trim().is_empty()))
    }

    async fn find_track(&self, external_id: u64) -> Result<Option<Track>> {
        let movies: Vec<RadarrMovie> = self
            .http
            .get("movie", &[("tmdbId", external_id.to_string())])
            .await?;
        Ok(movies
            .into_iter()
            .find(|m| m.tmdb_id == external_id)
            .map(Self::to_track))
    }

    async fn create_track_and_search(
        &self,
        new_track: &NewTrack,
        profile: &AcquisitionProfile,
    ) -> Result<Track> {
        let body = RadarrAddMovie {
            title: new_track.title.clone(),
            tmdb_id: new_track.external_id,
            quality_profile_id: profile.quality_profile_id,
            root_folder_path: profile.root_folder_path.clone(),
            monitored: true,
            minimum_availability: "released",
            add_options: RadarrAddOptions {
                search_for_movie: true,
            },
        };
        let movie: RadarrMovie = self
            .http
            .post("movie", &body)
            .await
            .with_context(|| format!("Failed to add movie tmdb:{}", new_track.external_id))?;
        info!(
            "Added movie '{}' (tmdb:{}) to Radarr as #{}",
            movie.title, movie.tmdb_id, movie.id
        );
        Ok(Self::to_track(movie))
    }

    async fn queue_snapshot(&self, track_id: i64) -> Result<Option<QueueSnapshot>> {
        let records: Vec<ArrQueueRecord> = self
            .http
            .get("queue/details", &[("movieId", track_id.to_string())])
            .await?;
        debug!("Radarr queue for movie #{}: {} records", track_id, records.len());
        Ok(aggregate_queue(&records))
    }

    async fn episode_breakdown(&self, track_id: i64) -> Result<Vec<EpisodeRecord>> {
        bail!("Radarr has no episodes (movie #{})", track_id)
    }

    async fn available_source_count(&self, track_id: i64) -> Result<usize> {
        let releases: Vec<ArrRelease> = self
            .http
            .get("release", &[("movieId", track_id.to_string())])
            .await?;
        Ok(releases.iter().filter(|r| r.approved).count())
    }

    async fn root_folders(&self) -> Result<Vec<RootFolder>> {
        let folders: Vec<ArrRootFolder> = self.http.get("rootfolder", &[]).await?;
        Ok(folders.into_iter().map(RootFolder::from).collect())
    }

    async fn quality_profiles(&self) -> Result<Vec<QualityProfile>> {
        let profiles: Vec<ArrQualityProfile> = self.http.get("qualityprofile", &[]).await?;
        Ok(profiles.into_iter().map(QualityProfile::from).collect())
    }
}
