//! Progress computation for a track.
//!
//! Rules are applied in order and the first one that fits wins:
//! active transfer with byte counts, active transfer without, finished
//! movie or series, and finally the staleness fallback.

use tracing::debug;

use super::staleness::{AvailabilityVerdict, StalenessThrottle};
use crate::backend::{MediaBackend, QueueSnapshot, SnapshotState, TrackSnapshot};
use crate::requests::LifecycleStatus;

pub const COMPLETE_TEXT: &str = "Complete";

const BYTE_UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

/// Render a byte count in binary units, two decimals at most.
pub fn format_bytes(bytes: u64) -> String {
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < BYTE_UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    let rendered = format!("{:.2}", value);
    let rendered = rendered.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", rendered, BYTE_UNITS[unit])
}

/// Percentage with one decimal place.
pub fn format_percent(done: u64, total: u64) -> String {
    if total == 0 {
        return "0.0%".to_string();
    }
    format!("{:.1}%", done as f64 / total as f64 * 100.0)
}

/// Progress text and the status it implies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Progress {
    pub text: String,
    pub status: LifecycleStatus,
}

impl Progress {
    fn in_progress(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            status: LifecycleStatus::InProgress,
        }
    }

    fn complete() -> Self {
        Self {
            text: COMPLETE_TEXT.to_string(),
            status: LifecycleStatus::Done,
        }
    }
}

/// First pass over a snapshot, before staleness is consulted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressStep {
    Decided(Progress),
    /// Nothing is downloading and the track is not finished.
    NeedsAvailability { base: String },
}

fn via(client: Option<&str>) -> String {
    client
        .filter(|c| !c.trim().is_empty())
        .map(|c| format!(" via {}", c))
        .unwrap_or_default()
}

fn transfer_text(queue: &QueueSnapshot) -> String {
    let client = via(queue.client_name.as_deref());
    match (queue.total_bytes, queue.bytes_remaining) {
        (Some(total), Some(remaining)) if total > 0 => {
            let done = total.saturating_sub(remaining);
            let eta = queue
                .time_remaining
                .as_deref()
                .filter(|t| !t.trim().is_empty())
                .map(|t| format!(", ETA {}", t))
                .unwrap_or_default();
            format!(
                "Downloading {} ({}/{}){}{}",
                format_percent(done, total),
                format_bytes(done),
                format_bytes(total),
                eta,
                client
            )
        }
        _ => {
            let status = queue
                .status_text
                .as_deref()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or("Downloading");
            format!("{}{}", status, client)
        }
    }
}

/// Apply rules 1 to 4.
pub fn classify(snapshot: &TrackSnapshot) -> ProgressStep {
    if let Some(queue) = &snapshot.queue {
        return ProgressStep::Decided(Progress::in_progress(transfer_text(queue)));
    }

    match &snapshot.state {
        SnapshotState::Movie { has_file: true } => ProgressStep::Decided(Progress::complete()),
        SnapshotState::Movie { has_file: false } => ProgressStep::NeedsAvailability {
            base: "no file yet".to_string(),
        },
        SnapshotState::Series {
            episodes,
            next_airing,
        } => {
            if episodes.total == 0 {
                return ProgressStep::Decided(Progress::in_progress(
                    "already added, no episodes returned yet",
                ));
            }
            let counts = format!("{}/{} episodes", episodes.have, episodes.total);
            if let Some(next) = next_airing {
                // A pending episode means the series is not done, whatever the counts say.
                return ProgressStep::Decided(Progress::in_progress(format!(
                    "{}, next airs {}",
                    counts,
                    next.format("%Y-%m-%d")
                )));
            }
            if episodes.is_complete() {
                return ProgressStep::Decided(Progress::complete());
            }
            ProgressStep::NeedsAvailability { base: counts }
        }
    }
}

/// Rule 5: fold the throttle's verdict into the base text.
pub fn apply_verdict(base: &str, verdict: AvailabilityVerdict) -> Progress {
    match verdict {
        AvailabilityVerdict::Stale { message } => Progress {
            text: message,
            status: LifecycleStatus::Stale,
        },
        AvailabilityVerdict::Monitoring { message } => {
            Progress::in_progress(format!("{}, {}", base, message))
        }
        AvailabilityVerdict::Throttled => {
            Progress::in_progress(format!("{}, no active download", base))
        }
    }
}

/// Turns a track snapshot into progress text and a candidate status.
pub struct ProgressEngine;

impl ProgressEngine {
    pub async fn evaluate(
        snapshot: &TrackSnapshot,
        throttle: &mut StalenessThrottle,
        backend: &dyn MediaBackend,
        now: i64,
    ) -> Progress {
        match classify(snapshot) {
            ProgressStep::Decided(progress) => progress,
            ProgressStep::NeedsAvailability { base } => {
                debug!(
                    "{}: #{} idle ({}), consulting staleness",
                    snapshot.kind.display_name(),
                    snapshot.track_id,
                    base
                );
                let verdict = throttle.check(backend, snapshot.track_id, now).await;
                apply_verdict(&base, verdict)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackendKind, EpisodeSummary, MockMediaBackend};
    use crate::reconcile::staleness::{StalenessConfig, MONITORING_MESSAGE};
    use crate::reconcile::staleness_store::InMemoryStalenessStore;
    use chrono::{TimeZone, Utc};
    use std::sync::Arc;

    const GB: u64 = 1024 * 1024 * 1024;

    fn movie(has_file: bool, queue: Option<QueueSnapshot>) -> TrackSnapshot {
        TrackSnapshot {
            kind: BackendKind::Movie,
            track_id: 1,
            queue,
            state: SnapshotState::Movie { has_file },
        }
    }

    fn series(total: u32, have: u32, next: bool) -> TrackSnapshot {
        TrackSnapshot {
            kind: BackendKind::Series,
            track_id: 2,
            queue: None,
            state: SnapshotState::Series {
                episodes: EpisodeSummary { total, have },
                next_airing: next.then(|| Utc.with_ymd_and_hms(2026, 11, 2, 1, 0, 0).unwrap()),
            },
        }
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(1024), "1 KB");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(GB), "1 GB");
        assert_eq!(format_bytes(2 * GB), "2 GB");
        assert_eq!(format_bytes(GB + GB / 4), "1.25 GB");
        assert_eq!(format_bytes(5 * 1024 * GB), "5 TB");
        assert_eq!(format_bytes(2048 * 1024 * GB), "2048 TB");
    }

    #[test]
    fn test_format_percent() {
        assert_eq!(format_percent(GB, 2 * GB), "50.0%");
        assert_eq!(format_percent(1, 3), "33.3%");
        assert_eq!(format_percent(0, 0), "0.0%");
    }

    #[test]
    fn test_download_with_bytes() {
        let queue = QueueSnapshot {
            total_bytes: Some(2 * GB),
            bytes_remaining: Some(GB),
            time_remaining: Some("00:12:00".to_string()),
            status_text: Some("downloading".to_string()),
            client_name: Some("qBittorrent".to_string()),
        };
        let step = classify(&movie(false, Some(queue)));
        assert_eq!(
            step,
            ProgressStep::Decided(Progress {
                text: "Downloading 50.0% (1 GB/2 GB), ETA 00:12:00 via qBittorrent".to_string(),
                status: LifecycleStatus::InProgress,
            })
        );
    }

    #[test]
    fn test_download_wins_over_existing_file() {
        let queue = QueueSnapshot {
            total_bytes: Some(100),
            bytes_remaining: Some(100),
            ..Default::default()
        };
        let ProgressStep::Decided(progress) = classify(&movie(true, Some(queue))) else {
            panic!("expected a decision");
        };
        assert_eq!(progress.text, "Downloading 0.0% (0 B/100 B)");
        assert_eq!(progress.status, LifecycleStatus::InProgress);
    }

    #[test]
    fn test_download_without_bytes() {
        let queue = QueueSnapshot {
            status_text: Some("Paused".to_string()),
            client_name: Some("SABnzbd".to_string()),
            ..Default::default()
        };
        let ProgressStep::Decided(progress) = classify(&movie(false, Some(queue))) else {
            panic!("expected a decision");
        };
        assert_eq!(progress.text, "Paused via SABnzbd");

        let ProgressStep::Decided(progress) =
            classify(&movie(false, Some(QueueSnapshot::default())))
        else {
            panic!("expected a decision");
        };
        assert_eq!(progress.text, "Downloading");
    }

    #[test]
    fn test_zero_total_bytes_falls_back_to_status() {
        let queue = QueueSnapshot {
            total_bytes: Some(0),
            bytes_remaining: Some(0),
            status_text: Some("queued".to_string()),
            ..Default::default()
        };
        let ProgressStep::Decided(progress) = classify(&movie(false, Some(queue))) else {
            panic!("expected a decision");
        };
        assert_eq!(progress.text, "queued");
    }

    #[test]
    fn test_movie_with_file_is_complete() {
        assert_eq!(
            classify(&movie(true, None)),
            ProgressStep::Decided(Progress {
                text: "Complete".to_string(),
                status: LifecycleStatus::Done,
            })
        );
    }

    #[test]
    fn test_movie_without_file_needs_availability() {
        assert_eq!(
            classify(&movie(false, None)),
            ProgressStep::NeedsAvailability {
                base: "no file yet".to_string()
            }
        );
    }

    #[test]
    fn test_series_without_episodes() {
        let ProgressStep::Decided(progress) = classify(&series(0, 0, false)) else {
            panic!("expected a decision");
        };
        assert_eq!(progress.text, "already added, no episodes returned yet");
        assert_eq!(progress.status, LifecycleStatus::InProgress);
    }

    #[test]
    fn test_series_with_next_airing_never_completes() {
        let ProgressStep::Decided(progress) = classify(&series(10, 10, true)) else {
            panic!("expected a decision");
        };
        assert_eq!(progress.text, "10/10 episodes, next airs 2026-11-02");
        assert_eq!(progress.status, LifecycleStatus::InProgress);
    }

    #[test]
    fn test_series_complete() {
        assert_eq!(
            classify(&series(10, 10, false)),
            ProgressStep::Decided(Progress {
                text: "Complete".to_string(),
                status: LifecycleStatus::Done,
            })
        );
    }

    #[test]
    fn test_series_missing_episodes_needs_availability() {
        assert_eq!(
            classify(&series(10, 4, false)),
            ProgressStep::NeedsAvailability {
                base: "4/10 episodes".to_string()
            }
        );
    }

    #[test]
    fn test_apply_verdict() {
        assert_eq!(
            apply_verdict("no file yet", AvailabilityVerdict::Throttled).text,
            "no file yet, no active download"
        );
        let monitoring = apply_verdict(
            "4/10 episodes",
            AvailabilityVerdict::Monitoring {
                message: MONITORING_MESSAGE.to_string(),
            },
        );
        assert_eq!(
            monitoring.text,
            "4/10 episodes, no releases found yet (monitoring)"
        );
        assert_eq!(monitoring.status, LifecycleStatus::InProgress);

        let stale = apply_verdict(
            "no file yet",
            AvailabilityVerdict::Stale {
                message: "No releases found for 15d - marked STALE".to_string(),
            },
        );
        assert_eq!(stale.status, LifecycleStatus::Stale);
        assert_eq!(stale.text, "No releases found for 15d - marked STALE");
    }

    #[tokio::test]
    async fn test_evaluate_consults_throttle_only_when_idle() {
        let mut backend = MockMediaBackend::new();
        backend.expect_kind().return_const(BackendKind::Movie);
        backend
            .expect_available_source_count()
            .times(1)
            .returning(|_| Ok(0));
        let mut throttle = StalenessThrottle::load(
            StalenessConfig::default(),
            Arc::new(InMemoryStalenessStore::new()),
        );

        let done = ProgressEngine::evaluate(&movie(true, None), &mut throttle, &backend, 0).await;
        assert_eq!(done.status, LifecycleStatus::Done);

        let idle = ProgressEngine::evaluate(&movie(false, None), &mut throttle, &backend, 0).await;
        assert_eq!(idle.text, "no file yet, no releases found yet (monitoring)");
    }
}
