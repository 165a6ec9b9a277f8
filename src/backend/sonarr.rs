//! Sonarr client: the series back-end.

use anyhow::{Context, Result};
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

/// Client for a Sonarr v3 instance.
#[derive(Clone)]
pub struct SonarrClient {
    http: ArrHttp,
}

impl SonarrClient {
    pub fn new(base_url: &str, api_key: &str, timeout_secs: u64) -> Result<Self> {
        Ok(Self {
            http: ArrHttp::new(base_url, api_key, timeout_secs)?,
        })
    }

    fn to_track(series: SonarrSeries) -> Track {
        let episode_summary = series.episode_summary();
        Track {
            track_id: series.id,
            external_id: series.tvdb_id,
            title: series.title,
            details: TrackDetails::Series {
                episode_summary,
                next_airing: series.next_airing,
            },
        }
    }
}

#[async_trait]
impl MediaBackend for SonarrClient {
    fn kind(&self) -> BackendKind {
        BackendKind::Series
    }

    async fn lookup_canonical_title(&self, external_id: u64) -> Result<Option<String>> {
        let results: Vec<SonarrSeriesLookup> = self
            .http
            .get("series/lookup", &[("term", format!("tvdb:{}", external_id))])
            .await?;
        Ok(results.into_iter().next().map(|s| s.title))
    }

    async fn find_track(&self, external_id: u64) -> Result<Option<Track>> {
        let series: Vec<SonarrSeries> = self
            .http
            .get("series", &[("tvdbId", external_id.to_string())])
            .await?;
        // Older Sonarr builds ignore the filter and return the whole library.
        Ok(series
            .into_iter()
            .find(|s| s.tvdb_id == external_id)
            .map(Self::to_track))
    }

    async fn create_track_and_search(
        &self,
        new_track: &NewTrack,
        profile: &AcquisitionProfile,
    ) -> Result<Track> {
        let body = SonarrAddSeries {
            title: new_track.title.clone(),
            tvdb_id: new_track.external_id,
            quality_profile_id: profile.quality_profile_id,
            root_folder_path: profile.root_folder_path.clone(),
            monitored: true,
            season_folder: true,
            series_type: if new_track.anime { "anime" } else { "standard" },
            add_options: SonarrAddOptions {
                monitor: "all",
                search_for_missing_episodes: true,
            },
        };
        let series: SonarrSeries = self
            .http
            .post("series", &body)
            .await
            .with_context(|| format!("Failed to add series tvdb:{}", new_track.external_id))?;
        info!(
            "Added series '{}' (tvdb:{}) to Sonarr as #{}",
            series.title, series.tvdb_id, series.id
        );
        Ok(Self::to_track(series))
    }

    async fn queue_snapshot(&self, track_id: i64) -> Result<Option<QueueSnapshot>> {
        let records: Vec<ArrQueueRecord> = self
            .http
            .get("queue/details", &[("seriesId", track_id.to_string())])
            .await?;
        debug!("Sonarr queue for series #{}: {} records", track_id, records.len());
        Ok(aggregate_queue(&records))
    }

    async fn episode_breakdown(&self, track_id: i64) -> Result<Vec<EpisodeRecord>> {
        let episodes: Vec<SonarrEpisode> = self
            .http
            .get("episode", &[("seriesId", track_id.to_string())])
            .await?;
        Ok(episodes.into_iter().map(EpisodeRecord::from).collect())
    }

    async fn available_source_count(&self, track_id: i64) -> Result<usize> {
        let releases: Vec<ArrRelease> = self
            .http
            .get("release", &[("seriesId", track_id.to_string())])
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
