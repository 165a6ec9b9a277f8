use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::Mutex;

use request_reconciler::backend::{
    AcquisitionProfile, BackendKind, EpisodeRecord, EpisodeSummary, MediaBackend, NewTrack,
    QualityProfile, QueueSnapshot, RootFolder, Track, TrackDetails,
};

/// In-process stand-in for Sonarr or Radarr.
///
/// Titles, tracks and availability are scripted by the test; every
/// capability call except `kind` is counted.
pub struct FakeBackend {
    kind: BackendKind,
    titles: Mutex<HashMap<u64, String>>,
    tracks: Mutex<HashMap<u64, Track>>,
    queues: Mutex<HashMap<i64, QueueSnapshot>>,
    available: AtomicUsize,
    find_fails: AtomicBool,
    next_track_id: AtomicI64,
    calls: AtomicUsize,
    creates: AtomicUsize,
    availability_checks: AtomicUsize,
}

#[allow(dead_code)]
impl FakeBackend {
    pub fn new(kind: BackendKind) -> Self {
        Self {
            kind,
            titles: Mutex::new(HashMap::new()),
            tracks: Mutex::new(HashMap::new()),
            queues: Mutex::new(HashMap::new()),
            available: AtomicUsize::new(0),
            find_fails: AtomicBool::new(false),
            next_track_id: AtomicI64::new(1),
            calls: AtomicUsize::new(0),
            creates: AtomicUsize::new(0),
            availability_checks: AtomicUsize::new(0),
        }
    }

    pub fn profile(&self) -> AcquisitionProfile {
        AcquisitionProfile {
            root_folder_path: match self.kind {
                BackendKind::Series => "/tv".to_string(),
                BackendKind::Movie => "/movies".to_string(),
            },
            quality_profile_id: 1,
            quality_profile_name: "Any".to_string(),
        }
    }

    pub fn add_title(&self, external_id: u64, title: &str) {
        self.titles
            .lock()
            .unwrap()
            .insert(external_id, title.to_string());
    }

    pub fn track(&self, external_id: u64) -> Option<Track> {
        self.tracks.lock().unwrap().get(&external_id).cloned()
    }

    pub fn set_has_file(&self, external_id: u64, has_file: bool) {
        if let Some(track) = self.tracks.lock().unwrap().get_mut(&external_id) {
            track.details = TrackDetails::Movie { has_file };
        }
    }

    pub fn set_episodes(&self, external_id: u64, total: u32, have: u32) {
        if let Some(track) = self.tracks.lock().unwrap().get_mut(&external_id) {
            track.details = TrackDetails::Series {
                episode_summary: Some(EpisodeSummary { total, have }),
                next_airing: None,
            };
        }
    }

    pub fn set_queue(&self, track_id: i64, queue: Option<QueueSnapshot>) {
        let mut queues = self.queues.lock().unwrap();
        match queue {
            Some(queue) => queues.insert(track_id, queue),
            None => queues.remove(&track_id),
        };
    }

    pub fn set_available(&self, count: usize) {
        self.available.store(count, Ordering::SeqCst);
    }

    pub fn set_find_fails(&self, fails: bool) {
        self.find_fails.store(fails, Ordering::SeqCst);
    }

    /// Capability calls made so far, `kind` excluded.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn creates(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    pub fn availability_checks(&self) -> usize {
        self.availability_checks.load(Ordering::SeqCst)
    }

    fn count(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl MediaBackend for FakeBackend {
    fn kind(&self) -> BackendKind {
        self.kind
    }

    async fn lookup_canonical_title(&self, external_id: u64) -> Result<Option<String>> {
        self.count();
        Ok(self.titles.lock().unwrap().get(&external_id).cloned())
    }

    async fn find_track(&self, external_id: u64) -> Result<Option<Track>> {
        self.count();
        if self.find_fails.load(Ordering::SeqCst) {
            bail!("connection refused");
        }
        Ok(self.track(external_id))
    }

    async fn create_track_and_search(
        &self,
        new_track: &NewTrack,
        _profile: &AcquisitionProfile,
    ) -> Result<Track> {
        self.count();
        self.creates.fetch_add(1, Ordering::SeqCst);
        let mut tracks = self.tracks.lock().unwrap();
        if tracks.contains_key(&new_track.external_id) {
            return Err(anyhow!("already added"));
        }
        let details = match self.kind {
            BackendKind::Series => TrackDetails::Series {
                episode_summary: Some(EpisodeSummary::default()),
                next_airing: None,
            },
            BackendKind::Movie => TrackDetails::Movie { has_file: false },
        };
        let track = Track {
            track_id: self.next_track_id.fetch_add(1, Ordering::SeqCst),
            external_id: new_track.external_id,
            title: new_track.title.clone(),
            details,
        };
        tracks.insert(new_track.external_id, track.clone());
        Ok(track)
    }

    async fn queue_snapshot(&self, track_id: i64) -> Result<Option<QueueSnapshot>> {
        self.count();
        Ok(self.queues.lock().unwrap().get(&track_id).cloned())
    }

    async fn episode_breakdown(&self, _track_id: i64) -> Result<Vec<EpisodeRecord>> {
        self.count();
        Ok(Vec::new())
    }

    async fn available_source_count(&self, _track_id: i64) -> Result<usize> {
        self.count();
        self.availability_checks.fetch_add(1, Ordering::SeqCst);
        Ok(self.available.load(Ordering::SeqCst))
    }

    async fn root_folders(&self) -> Result<Vec<RootFolder>> {
        self.count();
        Ok(vec![RootFolder {
            id: 1,
            path: self.profile().root_folder_path,
        }])
    }

    async fn quality_profiles(&self) -> Result<Vec<QualityProfile>> {
        self.count();
        Ok(vec![QualityProfile {
            id: 1,
            name: "Any".to_string(),
        }])
    }
}
