//! Per-run index of tracks in one back-end.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use thiserror::Error;
use tracing::{debug, error, warn};

use super::media_backend::MediaBackend;
use super::models::{
    BackendKind, EpisodeSummary, NewTrack, SnapshotState, Track, TrackDetails, TrackSnapshot,
};
use super::profile::AcquisitionProfile;

#[derive(Debug, Error)]
pub enum TrackStoreError {
    /// `create` was called for an id that already resolved to a track.
    #[error("{backend} already tracks {id_label} {external_id} as #{track_id}")]
    AlreadyTracked {
        backend: &'static str,
        id_label: &'static str,
        external_id: u64,
        track_id: i64,
    },

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

/// Find, create and describe tracks in one back-end.
///
/// The index only lives for one run; every run rebuilds it from the
/// back-end, so tracks added or removed by hand in between are picked up.
pub struct TrackStore {
    backend: Arc<dyn MediaBackend>,
    profile: AcquisitionProfile,
    index: HashMap<u64, Track>,
}

impl TrackStore {
    pub fn new(backend: Arc<dyn MediaBackend>, profile: AcquisitionProfile) -> Self {
        Self {
            backend,
            profile,
            index: HashMap::new(),
        }
    }

    pub fn kind(&self) -> BackendKind {
        self.backend.kind()
    }

    pub fn backend(&self) -> &dyn MediaBackend {
        self.backend.as_ref()
    }

    /// Track for a catalog id, from the index or the back-end.
    pub async fn find_by_external_id(&mut self, external_id: u64) -> Result<Option<Track>> {
        if let Some(track) = self.index.get(&external_id) {
            return Ok(Some(track.clone()));
        }
        let found = self.backend.find_track(external_id).await?;
        if let Some(track) = &found {
            debug!(
                "{}: {} {} is track #{}",
                self.kind().display_name(),
                self.kind().id_label(),
                external_id,
                track.track_id
            );
            self.index.insert(external_id, track.clone());
        }
        Ok(found)
    }

    /// Add a track and trigger its search.
    ///
    /// Callers must have checked [`find_by_external_id`](Self::find_by_external_id)
    /// first; creating a tracked id is a logic error.
    pub async fn create(&mut self, new_track: &NewTrack) -> Result<Track, TrackStoreError> {
        if let Some(existing) = self.index.get(&new_track.external_id) {
            error!(
                "{}: refusing to add {} {} again, already track #{}",
                self.kind().display_name(),
                self.kind().id_label(),
                new_track.external_id,
                existing.track_id
            );
            return Err(TrackStoreError::AlreadyTracked {
                backend: self.kind().display_name(),
                id_label: self.kind().id_label(),
                external_id: new_track.external_id,
                track_id: existing.track_id,
            });
        }
        let track = self
            .backend
            .create_track_and_search(new_track, &self.profile)
            .await?;
        self.index.insert(new_track.external_id, track.clone());
        Ok(track)
    }

    /// Gather what the progress engine needs about a track.
    ///
    /// Failed calls degrade to "no data": no queue snapshot, or an empty
    /// episode summary.
    pub async fn describe(&self, track: &Track) -> TrackSnapshot {
        let name = self.kind().display_name();
        let queue = match self.backend.queue_snapshot(track.track_id).await {
            Ok(queue) => queue,
            Err(e) => {
                warn!("{}: failed to read queue for #{}: {:#}", name, track.track_id, e);
                None
            }
        };

        let state = match &track.details {
            TrackDetails::Movie { has_file } => SnapshotState::Movie {
                has_file: *has_file,
            },
            TrackDetails::Series {
                episode_summary,
                next_airing,
            } => {
                let episodes = match episode_summary {
                    Some(summary) => *summary,
                    None => self.episode_summary_from_breakdown(track.track_id).await,
                };
                SnapshotState::Series {
                    episodes,
                    next_airing: *next_airing,
                }
            }
        };

        TrackSnapshot {
            kind: track.kind(),
            track_id: track.track_id,
            queue,
            state,
        }
    }

    async fn episode_summary_from_breakdown(&self, track_id: i64) -> EpisodeSummary {
        match self.backend.episode_breakdown(track_id).await {
            Ok(episodes) => EpisodeSummary::from_episodes(&episodes),
            Err(e) => {
                warn!(
                    "{}: failed to read episodes for #{}: {:#}",
                    self.kind().display_name(),
                    track_id,
                    e
                );
                EpisodeSummary::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::media_backend::MockMediaBackend;
    use crate::backend::models::{EpisodeRecord, QueueSnapshot};

    fn profile() -> AcquisitionProfile {
        AcquisitionProfile {
            root_folder_path: "/tv".to_string(),
            quality_profile_id: 1,
            quality_profile_name: "Any".to_string(),
        }
    }

    fn series(track_id: i64, external_id: u64, summary: Option<EpisodeSummary>) -> Track {
        Track {
            track_id,
            external_id,
            title: "Firefly".to_string(),
            details: TrackDetails::Series {
                episode_summary: summary,
                next_airing: None,
            },
        }
    }

    #[tokio::test]
    async fn test_find_caches_hits() {
        let mut backend = MockMediaBackend::new();
        backend.expect_kind().return_const(BackendKind::Series);
        backend
            .expect_find_track()
            .times(1)
            .returning(|id| Ok(Some(series(9, id, None))));
        let mut store = TrackStore::new(Arc::new(backend), profile());

        let first = store.find_by_external_id(78874).await.unwrap().unwrap();
        let second = store.find_by_external_id(78874).await.unwrap().unwrap();
        assert_eq!(first, second);
        assert_eq!(first.track_id, 9);
    }

    #[tokio::test]
    async fn test_find_miss_is_not_cached() {
        let mut backend = MockMediaBackend::new();
        backend.expect_kind().return_const(BackendKind::Series);
        backend.expect_find_track().times(2).returning(|_| Ok(None));
        let mut store = TrackStore::new(Arc::new(backend), profile());

        assert!(store.find_by_external_id(1).await.unwrap().is_none());
        assert!(store.find_by_external_id(1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_created_track_is_found_without_backend_call() {
        let mut backend = MockMediaBackend::new();
        backend.expect_kind().return_const(BackendKind::Series);
        backend
            .expect_create_track_and_search()
            .times(1)
            .returning(|new, _| Ok(series(5, new.external_id, None)));
        backend.expect_find_track().never();
        let mut store = TrackStore::new(Arc::new(backend), profile());

        let new_track = NewTrack {
            title: "Firefly".to_string(),
            external_id: 78874,
            anime: false,
        };
        let created = store.create(&new_track).await.unwrap();
        let found = store.find_by_external_id(78874).await.unwrap().unwrap();
        assert_eq!(created, found);
    }

    #[tokio::test]
    async fn test_create_twice_is_rejected() {
        let mut backend = MockMediaBackend::new();
        backend.expect_kind().return_const(BackendKind::Series);
        backend
            .expect_create_track_and_search()
            .times(1)
            .returning(|new, _| Ok(series(5, new.external_id, None)));
        let mut store = TrackStore::new(Arc::new(backend), profile());
        let new_track = NewTrack {
            title: "Firefly".to_string(),
            external_id: 78874,
            anime: false,
        };
        store.create(&new_track).await.unwrap();
        let err = store.create(&new_track).await.unwrap_err();
        assert!(matches!(err, TrackStoreError::AlreadyTracked { track_id: 5, .. }));
    }

    #[tokio::test]
    async fn test_describe_uses_breakdown_when_summary_missing() {
        let mut backend = MockMediaBackend::new();
        backend.expect_kind().return_const(BackendKind::Series);
        backend.expect_queue_snapshot().returning(|_| Ok(None));
        backend.expect_episode_breakdown().times(1).returning(|_| {
            Ok(vec![
                EpisodeRecord {
                    season_number: 0,
                    has_file: true,
                },
                EpisodeRecord {
                    season_number: 1,
                    has_file: true,
                },
                EpisodeRecord {
                    season_number: 1,
                    has_file: false,
                },
            ])
        });
        let store = TrackStore::new(Arc::new(backend), profile());

        let snapshot = store.describe(&series(3, 78874, None)).await;
        assert_eq!(
            snapshot.state,
            SnapshotState::Series {
                episodes: EpisodeSummary { total: 2, have: 1 },
                next_airing: None,
            }
        );
        assert_eq!(snapshot.kind, BackendKind::Series);
    }

    #[tokio::test]
    async fn test_describe_prefers_summary() {
        let mut backend = MockMediaBackend::new();
        backend.expect_kind().return_const(BackendKind::Series);
        backend.expect_queue_snapshot().returning(|_| {
            Ok(Some(QueueSnapshot {
                status_text: Some("downloading".to_string()),
                ..Default::default()
            }))
        });
        backend.expect_episode_breakdown().never();
        let store = TrackStore::new(Arc::new(backend), profile());

        let summary = EpisodeSummary { total: 10, have: 4 };
        let snapshot = store.describe(&series(3, 78874, Some(summary))).await;
        assert!(snapshot.queue.is_some());
        assert!(matches!(
            snapshot.state,
            SnapshotState::Series { episodes, .. } if episodes == summary
        ));
    }

    #[tokio::test]
    async fn test_describe_degrades_on_errors() {
        let mut backend = MockMediaBackend::new();
        backend.expect_kind().return_const(BackendKind::Series);
        backend
            .expect_queue_snapshot()
            .returning(|_| Err(anyhow::anyhow!("timeout")));
        backend
            .expect_episode_breakdown()
            .returning(|_| Err(anyhow::anyhow!("timeout")));
        let store = TrackStore::new(Arc::new(backend), profile());

        let snapshot = store.describe(&series(3, 78874, None)).await;
        assert!(snapshot.queue.is_none());
        assert_eq!(
            snapshot.state,
            SnapshotState::Series {
                episodes: EpisodeSummary::default(),
                next_airing: None,
            }
        );
    }
}
