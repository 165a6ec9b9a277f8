//! Wire types for the Sonarr and Radarr v3 APIs.
//!
//! Only the fields the reconciler reads are modelled; everything else in the
//! responses is ignored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::models::{EpisodeRecord, EpisodeSummary, QualityProfile, QueueSnapshot, RootFolder};

// =============================================================================
// Shared
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArrRootFolder {
    pub id: i64,
    pub path: String,
}

impl From<ArrRootFolder> for RootFolder {
    fn from(f: ArrRootFolder) -> Self {
        RootFolder {
            id: f.id,
            path: f.path,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArrQualityProfile {
    pub id: i64,
    pub name: String,
}

impl From<ArrQualityProfile> for QualityProfile {
    fn from(p: ArrQualityProfile) -> Self {
        QualityProfile {
            id: p.id,
            name: p.name,
        }
    }
}

/// One entry of `/api/v3/queue/details`.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ArrQueueRecord {
    pub size: Option<f64>,
    pub sizeleft: Option<f64>,
    pub timeleft: Option<String>,
    pub status: Option<String>,
    pub tracked_download_state: Option<String>,
    pub download_client: Option<String>,
}

/// Collapse the queue records of one track into a single snapshot.
///
/// Byte counts are summed only when every record carries both of them;
/// text fields come from the first record that has them.
pub fn aggregate_queue(records: &[ArrQueueRecord]) -> Option<QueueSnapshot> {
    if records.is_empty() {
        return None;
    }

    let all_sized = records
        .iter()
        .all(|r| r.size.is_some() && r.sizeleft.is_some());
    let (total_bytes, bytes_remaining) = if all_sized {
        let total: f64 = records.iter().filter_map(|r| r.size).sum();
        let left: f64 = records.iter().filter_map(|r| r.sizeleft).sum();
        (Some(total.max(0.0) as u64), Some(left.max(0.0) as u64))
    } else {
        (None, None)
    };

    let first_text = |f: fn(&ArrQueueRecord) -> Option<&String>| {
        records
            .iter()
            .filter_map(f)
            .find(|s| !s.trim().is_empty())
            .cloned()
    };

    Some(QueueSnapshot {
        total_bytes,
        bytes_remaining,
        time_remaining: first_text(|r| r.timeleft.as_ref()),
        status_text: first_text(|r| r.status.as_ref().or(r.tracked_download_state.as_ref())),
        client_name: first_text(|r| r.download_client.as_ref()),
    })
}

/// One entry of `/api/v3/release`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArrRelease {
    #[serde(default)]
    pub approved: bool,
}

// =============================================================================
// Sonarr
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SonarrSeriesLookup {
    pub title: String,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SonarrSeasonStatistics {
    #[serde(default)]
    pub episode_file_count: u32,
    #[serde(default)]
    pub total_episode_count: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SonarrSeason {
    pub season_number: u32,
    pub statistics: Option<SonarrSeasonStatistics>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SonarrSeries {
    pub id: i64,
    pub title: String,
    pub tvdb_id: u64,
    pub next_airing: Option<DateTime<Utc>>,
    #[serde(default)]
    pub seasons: Vec<SonarrSeason>,
}

impl SonarrSeries {
    /// Episode counts from per-season statistics, season zero excluded.
    ///
    /// None when any numbered season lacks statistics, which is the case
    /// for a series that was added moments ago.
    pub fn episode_summary(&self) -> Option<EpisodeSummary> {
        let numbered: Vec<&SonarrSeason> =
            self.seasons.iter().filter(|s| s.season_number > 0).collect();
        if numbered.is_empty() {
            return None;
        }
        numbered
            .iter()
            .try_fold(EpisodeSummary::default(), |acc, season| {
                season.statistics.as_ref().map(|stats| EpisodeSummary {
                    total: acc.total + stats.total_episode_count,
                    have: acc.have + stats.episode_file_count,
                })
            })
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SonarrAddOptions {
    pub monitor: &'static str,
    pub search_for_missing_episodes: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SonarrAddSeries {
    pub title: String,
    pub tvdb_id: u64,
    pub quality_profile_id: i64,
    pub root_folder_path: String,
    pub monitored: bool,
    pub season_folder: bool,
    pub series_type: &'static str,
    pub add_options: SonarrAddOptions,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SonarrEpisode {
    pub season_number: u32,
    #[serde(default)]
    pub has_file: bool,
}

impl From<SonarrEpisode> for EpisodeRecord {
    fn from(e: SonarrEpisode) -> Self {
        EpisodeRecord {
            season_number: e.season_number,
            has_file: e.has_file,
        }
    }
}

// =============================================================================
// Radarr
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RadarrMovieLookup {
    pub title: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RadarrMovie {
    pub id: i64,
    pub title: String,
    pub tmdb_id: u64,
    #[serde(default)]
    pub has_file: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RadarrAddOptions {
    pub search_for_movie: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RadarrAddMovie {
    pub title: String,
    pub tmdb_id: u64,
    pub quality_profile_id: i64,
    pub root_folder_path: String,
    pub monitored: bool,
    pub minimum_availability: &'static str,
    pub add_options: RadarrAddOptions,
}
