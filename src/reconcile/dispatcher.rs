//! The reconciliation run: classify every request row, drive it one step
//! forward and write the result back.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use tracing::{debug, info, warn};

use super::identity::{IdentityCheck, IdentityResolver};
use super::progress::{Progress, ProgressEngine};
use super::staleness::{StalenessConfig, StalenessThrottle};
use super::staleness_store::{InMemoryStalenessStore, StalenessStore};
use crate::backend::{AcquisitionProfile, BackendKind, MediaBackend, NewTrack, TrackStore};
use crate::requests::{LifecycleStatus, MediaKind, Request, RequestSheet};

/// Whether a run may change anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Classify and log only: no tracks are added, nothing is written back.
    DryRun,
    Actual,
}

/// What happened to one request during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    UnknownKind { raw: String },
    BackendNotConfigured { kind: BackendKind },
    MissingId { kind: BackendKind },
    IdMismatch {
        kind: BackendKind,
        external_id: u64,
        found: Option<String>,
    },
    Created { kind: BackendKind },
    WouldCreate { kind: BackendKind },
    Progress { kind: BackendKind, progress: Progress },
    BackendUnavailable { kind: BackendKind, detail: String },
}

impl Outcome {
    /// Text written to the request's display cell.
    pub fn display_text(&self) -> String {
        match self {
            Outcome::UnknownKind { raw } => {
                format!("Unknown type '{}' (use TV, ANIME or MOVIE)", raw)
            }
            Outcome::BackendNotConfigured { kind } => {
                format!("{} is not configured", kind.display_name())
            }
            Outcome::MissingId { kind } => format!("Missing {} ID", kind.id_label()),
            Outcome::IdMismatch {
                kind,
                external_id,
                found,
            } => format!(
                "ID/title mismatch: {} {} is '{}'",
                kind.id_label(),
                external_id,
                found.as_deref().unwrap_or("NOT FOUND")
            ),
            Outcome::Created { kind } => format!("Added to {} + searching", kind.display_name()),
            Outcome::WouldCreate { kind } => {
                format!("[dry-run] would add to {}", kind.display_name())
            }
            Outcome::Progress { kind, progress } => match progress.status {
                LifecycleStatus::Done => format!("{} in {}", progress.text, kind.display_name()),
                _ => format!("{}: {}", kind.display_name(), progress.text),
            },
            Outcome::BackendUnavailable { kind, detail } => format!(
                "{} unavailable ({}), will retry",
                kind.display_name(),
                detail
            ),
        }
    }

    /// Status to write for this outcome; None leaves the status cell alone.
    ///
    /// This is the single place where outcomes map to lifecycle states.
    pub fn status(&self) -> Option<LifecycleStatus> {
        match self {
            Outcome::UnknownKind { .. } => None,
            Outcome::BackendNotConfigured { .. } => None,
            Outcome::MissingId { .. } => Some(LifecycleStatus::NeedsId),
            Outcome::IdMismatch { .. } => Some(LifecycleStatus::NeedsId),
            Outcome::Created { .. } => Some(LifecycleStatus::InProgress),
            Outcome::WouldCreate { .. } => None,
            Outcome::Progress { progress, .. } => Some(progress.status.clone()),
            Outcome::BackendUnavailable { .. } => None,
        }
    }
}

/// Summary of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub mode: RunMode,
    pub rows_seen: usize,
    pub skipped_terminal: usize,
    pub processed: usize,
    pub created: usize,
    pub completed: usize,
    pub in_progress: usize,
    pub needs_id: usize,
    pub stale: usize,
    pub unavailable: usize,
    pub diagnostics: usize,
    pub write_failures: usize,
    pub duration_ms: i64,
}

impl RunReport {
    fn new(mode: RunMode) -> Self {
        Self {
            mode,
            rows_seen: 0,
            skipped_terminal: 0,
            processed: 0,
            created: 0,
            completed: 0,
            in_progress: 0,
            needs_id: 0,
            stale: 0,
            unavailable: 0,
            diagnostics: 0,
            write_failures: 0,
            duration_ms: 0,
        }
    }

    fn count(&mut self, outcome: &Outcome) {
        self.processed += 1;
        match outcome {
            Outcome::UnknownKind { .. } | Outcome::BackendNotConfigured { .. } => {
                self.diagnostics += 1
            }
            Outcome::MissingId { .. } | Outcome::IdMismatch { .. } => self.needs_id += 1,
            Outcome::Created { .. } | Outcome::WouldCreate { .. } => self.created += 1,
            Outcome::BackendUnavailable { .. } => self.unavailable += 1,
            Outcome::Progress { progress, .. } => match progress.status {
                LifecycleStatus::Done => self.completed += 1,
                LifecycleStatus::Stale => self.stale += 1,
                _ => self.in_progress += 1,
            },
        }
    }
}

/// A configured back-end and the profile new tracks are added with.
#[derive(Clone)]
pub struct BackendSetup {
    pub backend: Arc<dyn MediaBackend>,
    pub profile: AcquisitionProfile,
}

/// State owned by a single run and dropped at its end.
struct RunState {
    stores: HashMap<BackendKind, TrackStore>,
    throttle: StalenessThrottle,
}

/// Drives every eligible request one step towards a terminal state.
pub struct RequestDispatcher {
    backends: Vec<BackendSetup>,
    staleness_config: StalenessConfig,
    staleness_store: Arc<dyn StalenessStore>,
    mode: RunMode,
}

impl RequestDispatcher {
    pub fn new(
        backends: Vec<BackendSetup>,
        staleness_config: StalenessConfig,
        staleness_store: Arc<dyn StalenessStore>,
        mode: RunMode,
    ) -> Self {
        Self {
            backends,
            staleness_config,
            staleness_store,
            mode,
        }
    }

    /// Store the run's throttle writes to. A dry run works on a scratch copy
    /// so it never moves the persisted clocks.
    fn run_store(&self) -> Arc<dyn StalenessStore> {
        match self.mode {
            RunMode::Actual => self.staleness_store.clone(),
            RunMode::DryRun => {
                let records = match self.staleness_store.load_all() {
                    Ok(records) => records,
                    Err(e) => {
                        warn!("Failed to load staleness records, starting empty: {:#}", e);
                        HashMap::new()
                    }
                };
                Arc::new(InMemoryStalenessStore::with_records(records))
            }
        }
    }

    fn new_run_state(&self) -> RunState {
        let stores = self
            .backends
            .iter()
            .map(|setup| {
                (
                    setup.backend.kind(),
                    TrackStore::new(setup.backend.clone(), setup.profile.clone()),
                )
            })
            .collect();
        RunState {
            stores,
            throttle: StalenessThrottle::load(self.staleness_config.clone(), self.run_store()),
        }
    }

    /// Process every eligible row once. `now` is unix seconds.
    ///
    /// Only a failure to read the request store fails the run; everything
    /// else is reported per row.
    pub async fn run(&self, sheet: &dyn RequestSheet, now: i64) -> Result<RunReport> {
        let start = Instant::now();
        let mut report = RunReport::new(self.mode);
        let mut state = self.new_run_state();

        let rows = sheet.read_rows().await?;
        report.rows_seen = rows.len();
        info!("Starting reconciliation of {} rows in {:?} mode", rows.len(), self.mode);

        for snapshot in rows {
            if snapshot.lifecycle_status.is_terminal() {
                report.skipped_terminal += 1;
                continue;
            }

            // The row may have been closed out since the run started.
            let request = match sheet.read_row(snapshot.row_key).await {
                Ok(Some(request)) if !request.lifecycle_status.is_terminal() => request,
                Ok(_) => {
                    debug!("{} closed out during the run, skipping", snapshot.row_key);
                    report.skipped_terminal += 1;
                    continue;
                }
                Err(e) => {
                    warn!("Failed to re-read {}: {:#}", snapshot.row_key, e);
                    continue;
                }
            };

            let outcome = self.evaluate(&request, &mut state, now).await;
            debug!(
                "{} '{}' [{}] -> {:?}",
                request.row_key, request.title, request.lifecycle_status, outcome
            );
            report.count(&outcome);
            self.write_back(sheet, &request, &outcome, &mut report).await;
        }

        report.duration_ms = start.elapsed().as_millis() as i64;
        info!(
            "Reconciliation finished in {}ms: {} rows, {} terminal, {} created, {} completed, {} in progress, {} need id, {} stale, {} unavailable",
            report.duration_ms,
            report.rows_seen,
            report.skipped_terminal,
            report.created,
            report.completed,
            report.in_progress,
            report.needs_id,
            report.stale,
            report.unavailable
        );
        Ok(report)
    }

    async fn evaluate(&self, request: &Request, state: &mut RunState, now: i64) -> Outcome {
        let kind = match request.kind {
            MediaKind::Series => BackendKind::Series,
            MediaKind::Movie => BackendKind::Movie,
            MediaKind::Unknown => {
                return Outcome::UnknownKind {
                    raw: request.kind_text.clone(),
                }
            }
        };
        let Some(store) = state.stores.get_mut(&kind) else {
            return Outcome::BackendNotConfigured { kind };
        };
        let Some(external_id) = request.external_id else {
            return Outcome::MissingId { kind };
        };

        let canonical_title =
            match IdentityResolver::verify(store.backend(), external_id, &request.title).await {
                IdentityCheck::Verified { canonical_title } => canonical_title,
                IdentityCheck::Mismatch { found } => {
                    return Outcome::IdMismatch {
                        kind,
                        external_id,
                        found,
                    }
                }
            };

        let existing = match store.find_by_external_id(external_id).await {
            Ok(existing) => existing,
            Err(e) => {
                warn!(
                    "{}: failed to look up {} {}: {:#}",
                    kind.display_name(),
                    kind.id_label(),
                    external_id,
                    e
                );
                return Outcome::BackendUnavailable {
                    kind,
                    detail: e.to_string(),
                };
            }
        };

        match existing {
            None if self.mode == RunMode::DryRun => {
                info!(
                    "[dry-run] would add '{}' ({} {}) to {}",
                    canonical_title,
                    kind.id_label(),
                    external_id,
                    kind.display_name()
                );
                Outcome::WouldCreate { kind }
            }
            None => {
                let new_track = NewTrack {
                    title: canonical_title,
                    external_id,
                    anime: request.anime,
                };
                match store.create(&new_track).await {
                    Ok(_) => Outcome::Created { kind },
                    Err(e) => {
                        warn!(
                            "{}: failed to add {} {}: {:#}",
                            kind.display_name(),
                            kind.id_label(),
                            external_id,
                            e
                        );
                        Outcome::BackendUnavailable {
                            kind,
                            detail: e.to_string(),
                        }
                    }
                }
            }
            Some(track) => {
                let snapshot = store.describe(&track).await;
                let progress =
                    ProgressEngine::evaluate(&snapshot, &mut state.throttle, store.backend(), now)
                        .await;
                Outcome::Progress { kind, progress }
            }
        }
    }

    async fn write_back(
        &self,
        sheet: &dyn RequestSheet,
        request: &Request,
        outcome: &Outcome,
        report: &mut RunReport,
    ) {
        let text = outcome.display_text();
        let status = outcome
            .status()
            .filter(|status| *status != request.lifecycle_status);

        if self.mode == RunMode::DryRun {
            info!(
                "[dry-run] {}: would write '{}'{}",
                request.row_key,
                text,
                status
                    .as_ref()
                    .map(|s| format!(" and status {}", s))
                    .unwrap_or_default()
            );
            return;
        }

        if let Err(e) = sheet.write_display_text(request.row_key, &text).await {
            warn!("Failed to write display text for {}: {:#}", request.row_key, e);
            report.write_failures += 1;
        }
        if let Some(status) = status {
            info!(
                "{} '{}': {} -> {}",
                request.row_key, request.title, request.lifecycle_status, status
            );
            if let Err(e) = sheet.write_lifecycle_status(request.row_key, &status).await {
                warn!("Failed to write status for {}: {:#}", request.row_key, e);
                report.write_failures += 1;
            }
        }
    }
}
