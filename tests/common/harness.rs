use std::sync::Arc;

use request_reconciler::backend::{BackendKind, MediaBackend};
use request_reconciler::reconcile::{
    BackendSetup, InMemoryStalenessStore, RequestDispatcher, RunMode, RunReport,
    StalenessConfig, StalenessStore,
};
use request_reconciler::requests::MemorySheet;

use super::fake_backend::FakeBackend;

pub const HOUR: i64 = 3600;
pub const DAY: i64 = 24 * HOUR;

/// A sheet, a fake Sonarr, a fake Radarr and the staleness store shared by
/// every run the harness makes.
pub struct TestHarness {
    pub sheet: MemorySheet,
    pub series: Arc<FakeBackend>,
    pub movie: Arc<FakeBackend>,
    pub staleness_store: Arc<dyn StalenessStore>,
}

#[allow(dead_code)]
impl TestHarness {
    pub fn new(rows: &[&[&str]]) -> Self {
        Self::with_store(rows, Arc::new(InMemoryStalenessStore::new()))
    }

    pub fn with_store(rows: &[&[&str]], staleness_store: Arc<dyn StalenessStore>) -> Self {
        Self {
            sheet: MemorySheet::from_rows(rows),
            series: Arc::new(FakeBackend::new(BackendKind::Series)),
            movie: Arc::new(FakeBackend::new(BackendKind::Movie)),
            staleness_store,
        }
    }

    pub fn dispatcher(&self, mode: RunMode) -> RequestDispatcher {
        let backends = [self.series.clone(), self.movie.clone()]
            .into_iter()
            .map(|fake| BackendSetup {
                profile: fake.profile(),
                backend: fake as Arc<dyn MediaBackend>,
            })
            .collect();
        RequestDispatcher::new(
            backends,
            StalenessConfig::default(),
            self.staleness_store.clone(),
            mode,
        )
    }

    /// One actual run at `now` (unix seconds).
    pub async fn run(&self, now: i64) -> RunReport {
        self.dispatcher(RunMode::Actual)
            .run(&self.sheet, now)
            .await
            .unwrap()
    }

    /// (display text, status) of a row.
    pub async fn cells(&self, row: usize) -> (String, String) {
        let rows = self.sheet.rows().await;
        (rows[row][3].clone(), rows[row][4].clone())
    }

    pub fn total_calls(&self) -> usize {
        self.series.calls() + self.movie.calls()
    }
}
