//! Data models for the request queue.
//!
//! A request row is five order-significant cells: title, type, external id,
//! display text and lifecycle status.

use serde::{Deserialize, Serialize};

/// Number of cells in a request row.
pub const ROW_WIDTH: usize = 5;

pub const COL_TITLE: usize = 0;
pub const COL_KIND: usize = 1;
pub const COL_EXTERNAL_ID: usize = 2;
pub const COL_DISPLAY_TEXT: usize = 3;
pub const COL_STATUS: usize = 4;

/// Opaque handle back to a row of the request store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RowKey(pub usize);

impl std::fmt::Display for RowKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "row {}", self.0)
    }
}

/// Kind of media a request asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Series,
    Movie,
    Unknown,
}

impl MediaKind {
    /// Parses the free-text type cell. `TV` and `ANIME` are series, `MOVIE`
    /// is a movie; the second value is true for anime.
    pub fn parse(raw: &str) -> (Self, bool) {
        match raw.trim().to_ascii_uppercase().as_str() {
            "TV" => (MediaKind::Series, false),
            "ANIME" => (MediaKind::Series, true),
            "MOVIE" => (MediaKind::Movie, false),
            _ => (MediaKind::Unknown, false),
        }
    }
}

/// Lifecycle status of a request row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleStatus {
    New,
    NeedsId,
    InProgress,
    Done,        // terminal
    Transferred, // terminal, only ever set by a human
    Skip,        // terminal
    Stale,       // terminal
    Unrecognized(String),
}

impl LifecycleStatus {
    /// Returns true if rows in this state must never be touched again.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            LifecycleStatus::Done
                | LifecycleStatus::Transferred
                | LifecycleStatus::Skip
                | LifecycleStatus::Stale
        )
    }

    pub fn as_str(&self) -> &str {
        match self {
            LifecycleStatus::New => "NEW",
            LifecycleStatus::NeedsId => "NEEDS_ID",
            LifecycleStatus::InProgress => "IN_PROGRESS",
            LifecycleStatus::Done => "DONE",
            LifecycleStatus::Transferred => "TRANSFERRED",
            LifecycleStatus::Skip => "SKIP",
            LifecycleStatus::Stale => "STALE",
            LifecycleStatus::Unrecognized(raw) => raw,
        }
    }

    /// Case-insensitive parse. A blank cell is `New`.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        match trimmed.to_ascii_uppercase().as_str() {
            "" | "NEW" => LifecycleStatus::New,
            "NEEDS_ID" => LifecycleStatus::NeedsId,
            "IN_PROGRESS" => LifecycleStatus::InProgress,
            "DONE" => LifecycleStatus::Done,
            "TRANSFERRED" => LifecycleStatus::Transferred,
            "SKIP" => LifecycleStatus::Skip,
            "STALE" => LifecycleStatus::Stale,
            _ => LifecycleStatus::Unrecognized(trimmed.to_string()),
        }
    }
}

impl std::fmt::Display for LifecycleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the request queue, as read at the start of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub row_key: RowKey,
    pub title: String,
    pub kind: MediaKind,
    /// Series request that should be added with the anime series type.
    pub anime: bool,
    /// Raw type cell, kept for diagnostics.
    pub kind_text: String,
    pub external_id: Option<u64>,
    pub lifecycle_status: LifecycleStatus,
}

impl Request {
    /// Builds a request from raw cells. Missing trailing cells read as empty.
    pub fn from_cells(row_key: RowKey, cells: &[String]) -> Self {
        let cell = |idx: usize| cells.get(idx).map(String::as_str).unwrap_or("");
        let (kind, anime) = MediaKind::parse(cell(COL_KIND));
        Self {
            row_key,
            title: cell(COL_TITLE).trim().to_string(),
            kind,
            anime,
            kind_text: cell(COL_KIND).trim().to_string(),
            external_id: parse_external_id(cell(COL_EXTERNAL_ID)),
            lifecycle_status: LifecycleStatus::parse(cell(COL_STATUS)),
        }
    }
}

/// Parses the external id cell. Anything but a positive integer is absent.
pub fn parse_external_id(raw: &str) -> Option<u64> {
    match raw.trim().parse::<u64>() {
        Ok(0) | Err(_) => None,
        Ok(id) => Some(id),
    }
}
