//! Request store implementations.
//!
//! The request queue lives outside this crate. [`RequestSheet`] is the
//! boundary; [`JsonFileSheet`] keeps the rows in a JSON document on disk and
//! [`MemorySheet`] keeps them in memory.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::models::{
    LifecycleStatus, Request, RowKey, COL_DISPLAY_TEXT, COL_STATUS, ROW_WIDTH,
};

/// Read/write access to the request queue.
#[async_trait]
pub trait RequestSheet: Send + Sync {
    /// Read every row of the queue.
    async fn read_rows(&self) -> Result<Vec<Request>>;

    /// Write the engine's display text for a row.
    async fn write_display_text(&self, row_key: RowKey, text: &str) -> Result<()>;

    /// Write the lifecycle status for a row, in canonical case.
    async fn write_lifecycle_status(&self, row_key: RowKey, status: &LifecycleStatus)
        -> Result<()>;

    /// Re-read a single row, picking up edits made since the last read.
    async fn read_row(&self, row_key: RowKey) -> Result<Option<Request>> {
        let rows = self.read_rows().await?;
        Ok(rows.into_iter().find(|r| r.row_key == row_key))
    }

    /// Read the rows that are not in a terminal state.
    async fn read_eligible_rows(&self) -> Result<Vec<Request>> {
        let rows = self.read_rows().await?;
        Ok(rows
            .into_iter()
            .filter(|r| !r.lifecycle_status.is_terminal())
            .collect())
    }
}

fn requests_from_rows(rows: &[Vec<String>]) -> Vec<Request> {
    rows.iter()
        .enumerate()
        .filter(|(_, cells)| cells.iter().any(|c| !c.trim().is_empty()))
        .map(|(idx, cells)| Request::from_cells(RowKey(idx), cells))
        .collect()
}

fn set_cell(rows: &mut [Vec<String>], row_key: RowKey, column: usize, value: &str) -> Result<()> {
    let Some(row) = rows.get_mut(row_key.0) else {
        bail!("No such row in request sheet: {}", row_key);
    };
    if row.len() < ROW_WIDTH {
        row.resize(ROW_WIDTH, String::new());
    }
    row[column] = value.to_string();
    Ok(())
}

/// Write a status unless the row was closed out since it was read; a
/// terminal status on the sheet is never replaced. Returns whether the cell
/// changed.
fn set_status(rows: &mut [Vec<String>], row_key: RowKey, status: &LifecycleStatus) -> Result<bool> {
    let current = rows
        .get(row_key.0)
        .and_then(|row| row.get(COL_STATUS))
        .map(|cell| LifecycleStatus::parse(cell));
    if let Some(current) = current.filter(|c| c.is_terminal()) {
        warn!(
            "{} was set to {} meanwhile, not overwriting it with {}",
            row_key, current, status
        );
        return Ok(false);
    }
    set_cell(rows, row_key, COL_STATUS, status.as_str())?;
    Ok(true)
}

/// Request sheet stored as a JSON array of rows, each an array of strings.
///
/// Every write re-reads the document, changes a single cell and persists the
/// whole document through a sibling temp file, so edits made to other rows
/// in the meantime are kept and a crash never leaves a half-written sheet
/// behind.
pub struct JsonFileSheet {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileSheet {
    /// Open the sheet at `path`. The file must exist.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read request sheet: {:?}", path))?;
        let rows: Vec<Vec<String>> = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse request sheet: {:?}", path))?;
        info!("Opened request sheet {:?} with {} rows", path, rows.len());
        Ok(Self {
            path,
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<Vec<Vec<String>>> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("Failed to read request sheet: {:?}", self.path))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse request sheet: {:?}", self.path))
    }

    async fn persist(&self, rows: &[Vec<String>]) -> Result<()> {
        let json = serde_json::to_string_pretty(rows)?;
        let tmp_path = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, json)
            .await
            .with_context(|| format!("Failed to write {:?}", tmp_path))?;
        tokio::fs::rename(&tmp_path, &self.path)
            .await
            .with_context(|| format!("Failed to replace {:?}", self.path))?;
        Ok(())
    }
}

#[async_trait]
impl RequestSheet for JsonFileSheet {
    async fn read_rows(&self) -> Result<Vec<Request>> {
        let rows = self.load().await?;
        let requests = requests_from_rows(&rows);
        debug!("Read {} requests from {:?}", requests.len(), self.path);
        Ok(requests)
    }

    async fn write_display_text(&self, row_key: RowKey, text: &str) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut rows = self.load().await?;
        set_cell(&mut rows, row_key, COL_DISPLAY_TEXT, text)?;
        self.persist(&rows).await
    }

    async fn write_lifecycle_status(
        &self,
        row_key: RowKey,
        status: &LifecycleStatus,
    ) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut rows = self.load().await?;
        if set_status(&mut rows, row_key, status)? {
            self.persist(&rows).await?;
        }
        Ok(())
    }
}

/// In-memory request sheet.
#[derive(Default)]
pub struct MemorySheet {
    rows: Mutex<Vec<Vec<String>>>,
}

impl MemorySheet {
    pub fn new(rows: Vec<Vec<String>>) -> Self {
        Self {
            rows: Mutex::new(rows),
        }
    }

    /// Convenience constructor from string slices.
    pub fn from_rows(rows: &[&[&str]]) -> Self {
        Self::new(
            rows.iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        )
    }

    /// Snapshot of all cells, padded to the full row width.
    pub async fn rows(&self) -> Vec<Vec<String>> {
        self.rows
            .lock()
            .await
            .iter()
            .map(|r| {
                let mut r = r.clone();
                if r.len() < ROW_WIDTH {
                    r.resize(ROW_WIDTH, String::new());
                }
                r
            })
            .collect()
    }

    /// Replace a single cell, simulating an edit made by a human.
    pub async fn edit_cell(&self, row_key: RowKey, column: usize, value: &str) -> Result<()> {
        let mut rows = self.rows.lock().await;
        set_cell(&mut rows, row_key, column, value)
    }
}

#[async_trait]
impl RequestSheet for MemorySheet {
    async fn read_rows(&self) -> Result<Vec<Request>> {
        Ok(requests_from_rows(&self.rows.lock().await))
    }

    async fn write_display_text(&self, row_key: RowKey, text: &str) -> Result<()> {
        let mut rows = self.rows.lock().await;
        set_cell(&mut rows, row_key, COL_DISPLAY_TEXT, text)
    }

    async fn write_lifecycle_status(
        &self,
        row_key: RowKey,
        status: &LifecycleStatus,
    ) -> Result<()> {
        let mut rows = self.rows.lock().await;
        set_status(&mut rows, row_key, status).map(|_| ())
    }
}
