//! Availability throttling and staleness detection.
//!
//! Asking a back-end which releases its indexers currently offer is an
//! interactive search, so it is rate limited per track. Two timestamps are
//! kept per track: when availability was last checked, and when the track
//! was first seen without any available release. The second one drives the
//! STALE verdict and is cleared as soon as a release shows up again.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::staleness_store::StalenessStore;
use crate::backend::{BackendKind, MediaBackend};

/// Track ids are only unique within one back-end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TrackKey {
    pub backend: BackendKind,
    pub track_id: i64,
}

impl TrackKey {
    pub fn new(backend: BackendKind, track_id: i64) -> Self {
        Self { backend, track_id }
    }
}

/// Per-track memory. Timestamps are unix seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StalenessRecord {
    pub last_check_at: Option<i64>,
    pub first_unavailable_at: Option<i64>,
}

/// Configuration for the throttle.
#[derive(Debug, Clone)]
pub struct StalenessConfig {
    /// Minimum time between two availability checks of the same track.
    pub check_interval_secs: u64,
    /// How long a track may go without any available release before it is
    /// marked STALE.
    pub stale_after_secs: u64,
}

impl Default for StalenessConfig {
    fn default() -> Self {
        Self {
            check_interval_secs: 6 * 3600,    // 6 hours
            stale_after_secs: 14 * 24 * 3600, // 14 days
        }
    }
}

/// Outcome of consulting the throttle for one track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AvailabilityVerdict {
    /// No check this run, or releases are available.
    Throttled,
    /// Nothing available yet, still within the grace period.
    Monitoring { message: String },
    /// Nothing available for longer than the grace period.
    Stale { message: String },
}

pub const MONITORING_MESSAGE: &str = "no releases found yet (monitoring)";

/// Human-readable age, in the largest whole unit among days, hours, minutes.
pub fn format_age(secs: i64) -> String {
    let secs = secs.max(0);
    if secs >= 86400 {
        format!("{}d", secs / 86400)
    } else if secs >= 3600 {
        format!("{}h", secs / 3600)
    } else {
        format!("{}m", secs / 60)
    }
}

/// Per-run throttle. Records are loaded from the store when the run starts
/// and every change is written back immediately.
pub struct StalenessThrottle {
    config: StalenessConfig,
    records: HashMap<TrackKey, StalenessRecord>,
    store: Arc<dyn StalenessStore>,
}

impl StalenessThrottle {
    /// Build the throttle for a run. A store that cannot be read is treated
    /// as empty.
    pub fn load(config: StalenessConfig, store: Arc<dyn StalenessStore>) -> Self {
        let records = match store.load_all() {
            Ok(records) => records,
            Err(e) => {
                warn!("Failed to load staleness records, starting empty: {:#}", e);
                HashMap::new()
            }
        };
        debug!("Loaded {} staleness records", records.len());
        Self {
            config,
            records,
            store,
        }
    }

    pub fn record(&self, key: &TrackKey) -> Option<&StalenessRecord> {
        self.records.get(key)
    }

    fn persist(&mut self, key: TrackKey, record: StalenessRecord) {
        self.records.insert(key, record);
        if let Err(e) = self.store.save(key, &record) {
            warn!(
                "Failed to persist staleness record for {:?} #{}: {:#}",
                key.backend, key.track_id, e
            );
        }
    }

    /// Decide whether the track is stale, querying availability at most once
    /// per check interval.
    pub async fn check(
        &mut self,
        backend: &dyn MediaBackend,
        track_id: i64,
        now: i64,
    ) -> AvailabilityVerdict {
        let key = TrackKey::new(backend.kind(), track_id);
        let mut record = self.records.get(&key).copied().unwrap_or_default();

        if let Some(last) = record.last_check_at {
            if now - last < self.config.check_interval_secs as i64 {
                return AvailabilityVerdict::Throttled;
            }
        }

        let available = backend.available_source_count(track_id).await;
        record.last_check_at = Some(now);

        let count = match available {
            Ok(count) => count,
            Err(e) => {
                warn!(
                    "{}: availability check for #{} failed: {:#}",
                    key.backend.display_name(),
                    track_id,
                    e
                );
                self.persist(key, record);
                return AvailabilityVerdict::Throttled;
            }
        };

        if count > 0 {
            debug!(
                "{}: #{} has {} available releases",
                key.backend.display_name(),
                track_id,
                count
            );
            record.first_unavailable_at = None;
            self.persist(key, record);
            return AvailabilityVerdict::Throttled;
        }

        let verdict = match record.first_unavailable_at {
            None => {
                record.first_unavailable_at = Some(now);
                AvailabilityVerdict::Monitoring {
                    message: MONITORING_MESSAGE.to_string(),
                }
            }
            Some(first) if now - first > self.config.stale_after_secs as i64 => {
                info!(
                    "{}: #{} has had no releases since {}, marking stale",
                    key.backend.display_name(),
                    track_id,
                    first
                );
                AvailabilityVerdict::Stale {
                    message: format!(
                        "No releases found for {} - marked STALE",
                        format_age(now - first)
                    ),
                }
            }
            Some(_) => AvailabilityVerdict::Monitoring {
                message: MONITORING_MESSAGE.to_string(),
            },
        };
        self.persist(key, record);
        verdict
    }
}
