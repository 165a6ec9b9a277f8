//! Persistence for staleness records.
//!
//! The throttle loads every record when a run starts and writes each change
//! through. [`InMemoryStalenessStore`] remembers for the life of the process;
//! [`SqliteStalenessStore`] survives restarts, which is what lets staleness
//! trigger under short-lived, timer-driven invocations.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use anyhow::{bail, Context, Result};
use rusqlite::{params, Connection};
use tracing::info;

use super::staleness::{StalenessRecord, TrackKey};
use crate::backend::BackendKind;

/// Storage of per-track staleness records.
pub trait StalenessStore: Send + Sync {
    fn load_all(&self) -> Result<HashMap<TrackKey, StalenessRecord>>;

    fn save(&self, key: TrackKey, record: &StalenessRecord) -> Result<()>;
}

/// Process-lifetime store.
#[derive(Default)]
pub struct InMemoryStalenessStore {
    records: Mutex<HashMap<TrackKey, StalenessRecord>>,
}

impl InMemoryStalenessStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store starting out with a copy of `records`.
    pub fn with_records(records: HashMap<TrackKey, StalenessRecord>) -> Self {
        Self {
            records: Mutex::new(records),
        }
    }
}

impl StalenessStore for InMemoryStalenessStore {
    fn load_all(&self) -> Result<HashMap<TrackKey, StalenessRecord>> {
        let records = self
            .records
            .lock()
            .map_err(|_| anyhow::anyhow!("staleness store lock poisoned"))?;
        Ok(records.clone())
    }

    fn save(&self, key: TrackKey, record: &StalenessRecord) -> Result<()> {
        let mut records = self
            .records
            .lock()
            .map_err(|_| anyhow::anyhow!("staleness store lock poisoned"))?;
        records.insert(key, *record);
        Ok(())
    }
}

/// Schema version stored in `PRAGMA user_version`.
const SCHEMA_VERSION: i64 = 1;

const CREATE_STALENESS_TABLE_V1: &str = "CREATE TABLE IF NOT EXISTS staleness (
    backend TEXT NOT NULL,
    track_id INTEGER NOT NULL,
    last_check_at INTEGER,
    first_unavailable_at INTEGER,
    PRIMARY KEY (backend, track_id)
);";

/// SQLite-backed store.
pub struct SqliteStalenessStore {
    conn: Mutex<Connection>,
}

impl SqliteStalenessStore {
    /// Open or create the database at `db_path`.
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let is_new = !db_path.as_ref().exists();
        let conn = Connection::open(&db_path)
            .with_context(|| format!("Failed to open staleness db {:?}", db_path.as_ref()))?;
        if is_new {
            Self::create_schema(&conn)?;
            info!("Created new staleness database at {:?}", db_path.as_ref());
        }

        let version = conn
            .query_row("PRAGMA user_version;", [], |row| row.get::<usize, i64>(0))
            .context("Failed to read database version")?;
        if version != SCHEMA_VERSION {
            bail!(
                "Staleness database version {} is not supported (expected {})",
                version,
                SCHEMA_VERSION
            );
        }

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::create_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn create_schema(conn: &Connection) -> Result<()> {
        conn.execute(CREATE_STALENESS_TABLE_V1, [])?;
        conn.execute(&format!("PRAGMA user_version = {}", SCHEMA_VERSION), [])?;
        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow::anyhow!("staleness db lock poisoned"))
    }
}

impl StalenessStore for SqliteStalenessStore {
    fn load_all(&self) -> Result<HashMap<TrackKey, StalenessRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT backend, track_id, last_check_at, first_unavailable_at FROM staleness",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, Option<i64>>(2)?,
                row.get::<_, Option<i64>>(3)?,
            ))
        })?;

        let mut records = HashMap::new();
        for row in rows {
            let (backend, track_id, last_check_at, first_unavailable_at) = row?;
            let Some(kind) = BackendKind::from_str(&backend) else {
                bail!("Unknown backend {:?} in staleness db", backend);
            };
            records.insert(
                TrackKey::new(kind, track_id),
                StalenessRecord {
                    last_check_at,
                    first_unavailable_at,
                },
            );
        }
        Ok(records)
    }

    fn save(&self, key: TrackKey, record: &StalenessRecord) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO staleness (backend, track_id, last_check_at, first_unavailable_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(backend, track_id) DO UPDATE SET
                last_check_at = excluded.last_check_at,
                first_unavailable_at = excluded.first_unavailable_at",
            params![
                key.backend.as_str(),
                key.track_id,
                record.last_check_at,
                record.first_unavailable_at
            ],
        )?;
        Ok(())
    }
}
