//! Capability interface of an acquisition back-end.

use anyhow::Result;
use async_trait::async_trait;

use super::models::{
    BackendKind, EpisodeRecord, NewTrack, QualityProfile, QueueSnapshot, RootFolder, Track,
};
use super::profile::AcquisitionProfile;

/// Operations the reconciler needs from a series or movie back-end.
///
/// Every call is a blocking round trip from the caller's point of view;
/// callers await them one at a time.
#[cfg_attr(any(test, feature = "mock"), mockall::automock)]
#[async_trait]
pub trait MediaBackend: Send + Sync {
    /// Kind of items this back-end manages.
    fn kind(&self) -> BackendKind;

    /// Canonical title for a catalog id, or None if the catalog has no entry.
    async fn lookup_canonical_title(&self, external_id: u64) -> Result<Option<String>>;

    /// Existing track for a catalog id.
    async fn find_track(&self, external_id: u64) -> Result<Option<Track>>;

    /// Add a track and start searching for it straight away.
    async fn create_track_and_search(
        &self,
        new_track: &NewTrack,
        profile: &AcquisitionProfile,
    ) -> Result<Track>;

    /// Aggregated state of the track's queued transfers, if any.
    async fn queue_snapshot(&self, track_id: i64) -> Result<Option<QueueSnapshot>>;

    /// Per-episode file state. Series back-ends only.
    async fn episode_breakdown(&self, track_id: i64) -> Result<Vec<EpisodeRecord>>;

    /// Number of releases the indexers currently offer for the track.
    ///
    /// Expensive: the back-end runs an interactive indexer search.
    async fn available_source_count(&self, track_id: i64) -> Result<usize>;

    async fn root_folders(&self) -> Result<Vec<RootFolder>>;

    async fn quality_profiles(&self) -> Result<Vec<QualityProfile>>;
}
