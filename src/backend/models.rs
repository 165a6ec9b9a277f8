//! Back-end neutral models for tracks, queue state and episodes.

use chrono::{DateTime, Utc};

/// Which acquisition back-end a track lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BackendKind {
    Series,
    Movie,
}

impl BackendKind {
    /// Display name of the back-end serving this kind.
    pub fn display_name(&self) -> &'static str {
        match self {
            BackendKind::Series => "Sonarr",
            BackendKind::Movie => "Radarr",
        }
    }

    /// Catalog whose ids identify items of this kind.
    pub fn id_label(&self) -> &'static str {
        match self {
            BackendKind::Series => "TVDB",
            BackendKind::Movie => "TMDB",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Series => "series",
            BackendKind::Movie => "movie",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "series" => Some(BackendKind::Series),
            "movie" => Some(BackendKind::Movie),
            _ => None,
        }
    }
}

/// Episode counts of a series, season zero excluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EpisodeSummary {
    pub total: u32,
    pub have: u32,
}

impl EpisodeSummary {
    /// Count episodes outside season zero, and those among them with a file.
    pub fn from_episodes(episodes: &[EpisodeRecord]) -> Self {
        episodes
            .iter()
            .filter(|e| e.season_number > 0)
            .fold(Self::default(), |acc, e| Self {
                total: acc.total + 1,
                have: acc.have + u32::from(e.has_file),
            })
    }

    pub fn is_complete(&self) -> bool {
        self.total > 0 && self.have >= self.total
    }
}

/// One episode as reported by the series back-end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EpisodeRecord {
    pub season_number: u32,
    pub has_file: bool,
}

/// Kind-specific state of a track.
#[derive(Debug, Clone, PartialEq)]
pub enum TrackDetails {
    Series {
        /// Absent when the back-end returned no per-season statistics.
        episode_summary: Option<EpisodeSummary>,
        next_airing: Option<DateTime<Utc>>,
    },
    Movie {
        has_file: bool,
    },
}

/// A back-end's record that acquisition has begun for a catalog item.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    pub track_id: i64,
    pub external_id: u64,
    pub title: String,
    pub details: TrackDetails,
}

impl Track {
    pub fn kind(&self) -> BackendKind {
        match self.details {
            TrackDetails::Series { .. } => BackendKind::Series,
            TrackDetails::Movie { .. } => BackendKind::Movie,
        }
    }
}

/// Everything needed to add a new track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTrack {
    pub title: String,
    pub external_id: u64,
    /// Series only: add with the anime series type.
    pub anime: bool,
}

/// Point-in-time description of an in-flight transfer.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QueueSnapshot {
    pub total_bytes: Option<u64>,
    pub bytes_remaining: Option<u64>,
    pub time_remaining: Option<String>,
    pub status_text: Option<String>,
    pub client_name: Option<String>,
}

/// Root folder known to a back-end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootFolder {
    pub id: i64,
    pub path: String,
}

/// Quality profile known to a back-end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualityProfile {
    pub id: i64,
    pub name: String,
}

/// Track state gathered for one progress computation.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackSnapshot {
    pub kind: BackendKind,
    pub track_id: i64,
    pub queue: Option<QueueSnapshot>,
    pub state: SnapshotState,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SnapshotState {
    Series {
        episodes: EpisodeSummary,
        next_airing: Option<DateTime<Utc>>,
    },
    Movie {
        has_file: bool,
    },
}
