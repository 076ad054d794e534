//! SQLite World Store.
//!
//! Persists frame graphs to a local SQLite database, one row per frame, keyed
//! by world name.  Saving a world replaces all of its frames inside a single
//! transaction, so a failed save leaves the previous content intact.
//!
//! # Storage layout
//!
//! Table `worlds`:
//!
//! | column     | type | description                           |
//! |------------|------|---------------------------------------|
//! | name       | TEXT | world name, primary key               |
//! | root       | TEXT | name of the root frame                |
//! | created_at | TEXT | RFC-3339 time of the first save (UTC) |
//! | updated_at | TEXT | RFC-3339 time of the last save (UTC)  |
//!
//! Table `frames`:
//!
//! | column | type | description                                           |
//! |--------|------|-------------------------------------------------------|
//! | world  | TEXT | owning world                                          |
//! | name   | TEXT | frame name, unique per world                          |
//! | parent | TEXT | parent frame name (NULL for the root)                 |
//! | pose   | BLOB | 12 little-endian f64: row-major rotation, translation |
//!
//! # Example
//!
//! ```rust
//! use wrt_graph::{FrameGraph, Pose, WorldStore};
//! use wrt_store::sqlite::SqliteWorldStore;
//!
//! let mut store = SqliteWorldStore::open_in_memory().unwrap();
//!
//! let mut graph = FrameGraph::new("world");
//! graph.insert("table", "world", Pose::from_translation(0.0, 2.0, 0.0)).unwrap();
//! store.save("lab", &graph).unwrap();
//!
//! let loaded = store.load("lab").unwrap().unwrap();
//! assert_eq!(loaded, graph);
//! ```

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use serde::Serialize;
use thiserror::Error;
use tracing::debug;
use wrt_graph::{FrameGraph, WorldStore};
use wrt_types::{DEFAULT_TOLERANCE, FrameRecord, POSE_FLOATS, WrtError};

const POSE_BYTES: usize = POSE_FLOATS * 8;

// ─────────────────────────────────────────────────────────────────────────────
// Error type
// ─────────────────────────────────────────────────────────────────────────────

/// Errors that can arise from the SQLite store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Pose of frame '{frame}' is {len} bytes, expected {expected}", expected = POSE_BYTES)]
    PoseBlob { frame: String, len: usize },
    #[error("Invalid timestamp '{0}'")]
    Timestamp(String),
}

impl From<StoreError> for WrtError {
    fn from(err: StoreError) -> Self {
        WrtError::storage(err)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// WorldSummary
// ─────────────────────────────────────────────────────────────────────────────

/// One stored world, as listed by [`SqliteWorldStore::list_worlds`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorldSummary {
    pub name: String,
    pub root: String,
    /// Number of frames, root included.
    pub frame_count: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Pose serialisation helpers
// ─────────────────────────────────────────────────────────────────────────────

fn pose_to_bytes(pose: &[f64; POSE_FLOATS]) -> Vec<u8> {
    pose.iter().flat_map(|f| f.to_le_bytes()).collect()
}

fn bytes_to_pose(frame: &str, bytes: &[u8]) -> Result<[f64; POSE_FLOATS], StoreError> {
    if bytes.len() != POSE_BYTES {
        return Err(StoreError::PoseBlob {
            frame: frame.to_string(),
            len: bytes.len(),
        });
    }
    let mut pose = [0.0; POSE_FLOATS];
    for (slot, chunk) in pose.iter_mut().zip(bytes.chunks_exact(8)) {
        let mut raw = [0u8; 8];
        raw.copy_from_slice(chunk);
        *slot = f64::from_le_bytes(raw);
    }
    Ok(pose)
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, StoreError> {
    raw.parse::<DateTime<Utc>>()
        .map_err(|_| StoreError::Timestamp(raw.to_string()))
}

// ─────────────────────────────────────────────────────────────────────────────
// SqliteWorldStore
// ─────────────────────────────────────────────────────────────────────────────

/// SQLite-backed [`WorldStore`].
pub struct SqliteWorldStore {
    conn: Connection,
    tolerance: f64,
}

impl SqliteWorldStore {
    /// Open (or create) a persistent SQLite database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        Self::with_connection(conn)
    }

    /// Open a temporary in-memory database (useful for testing).
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        let store = Self {
            conn,
            tolerance: DEFAULT_TOLERANCE,
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Tolerance applied when stored poses are validated on load.
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    fn init_schema(&self) -> Result<(), StoreError> {
        self.conn.execute_batch(
            "PRAGMA foreign_keys = ON;
             CREATE TABLE IF NOT EXISTS worlds (
                name       TEXT NOT NULL PRIMARY KEY,
                root       TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS frames (
                world  TEXT NOT NULL REFERENCES worlds(name) ON DELETE CASCADE,
                name   TEXT NOT NULL,
                parent TEXT,
                pose   BLOB NOT NULL,
                PRIMARY KEY (world, name)
            );",
        )?;
        Ok(())
    }

    /// Root name and frame records of `world`, or `None` if never saved.
    pub fn load_records(&self, world: &str) -> Result<Option<(String, Vec<FrameRecord>)>, StoreError> {
        let root: Option<String> = self
            .conn
            .query_row(
                "SELECT root FROM worlds WHERE name = ?1",
                params![world],
                |row| row.get(0),
            )
            .optional()?;
        let Some(root) = root else {
            return Ok(None);
        };

        let mut stmt = self.conn.prepare(
            "SELECT name, parent, pose FROM frames
             WHERE world = ?1
             ORDER BY name ASC",
        )?;
        let rows = stmt.query_map(params![world], |row| {
            let name: String = row.get(0)?;
            let parent: Option<String> = row.get(1)?;
            let blob: Vec<u8> = row.get(2)?;
            Ok((name, parent, blob))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (name, parent, blob) = row?;
            let pose = bytes_to_pose(&name, &blob)?;
            records.push(FrameRecord { name, parent, pose });
        }
        debug!(world, frames = records.len(), "loaded world");
        Ok(Some((root, records)))
    }

    /// Replace every frame of `world` with `records` in one transaction.
    pub fn save_records(&mut self, world: &str, root: &str, records: &[FrameRecord]) -> Result<(), StoreError> {
        let now = Utc::now().to_rfc3339();
        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO worlds (name, root, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?3)
             ON CONFLICT(name) DO UPDATE SET root = excluded.root, updated_at = excluded.updated_at",
            params![world, root, now],
        )?;
        tx.execute("DELETE FROM frames WHERE world = ?1", params![world])?;
        {
            let mut insert = tx.prepare(
                "INSERT INTO frames (world, name, parent, pose)
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            for record in records {
                insert.execute(params![world, record.name, record.parent, pose_to_bytes(&record.pose)])?;
            }
        }
        tx.commit()?;
        debug!(world, frames = records.len(), "saved world");
        Ok(())
    }

    /// Every stored world, ordered by name.
    pub fn list_worlds(&self) -> Result<Vec<WorldSummary>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT w.name, w.root, w.created_at, w.updated_at, COUNT(f.name)
             FROM worlds w LEFT JOIN frames f ON f.world = w.name
             GROUP BY w.name
             ORDER BY w.name ASC",
        )?;
        let rows = stmt.query_map([], |row| {
            let name: String = row.get(0)?;
            let root: String = row.get(1)?;
            let created_at: String = row.get(2)?;
            let updated_at: String = row.get(3)?;
            let frame_count: i64 = row.get(4)?;
            Ok((name, root, created_at, updated_at, frame_count))
        })?;

        let mut worlds = Vec::new();
        for row in rows {
            let (name, root, created_at, updated_at, frame_count) = row?;
            worlds.push(WorldSummary {
                name,
                root,
                frame_count: usize::try_from(frame_count).unwrap_or_default(),
                created_at: parse_timestamp(&created_at)?,
                updated_at: parse_timestamp(&updated_at)?,
            });
        }
        Ok(worlds)
    }
}

impl WorldStore for SqliteWorldStore {
    fn load(&self, world: &str) -> Result<Option<FrameGraph>, WrtError> {
        match self.load_records(world)? {
            Some((root, records)) => FrameGraph::from_records(&root, records, self.tolerance).map(Some),
            None => Ok(None),
        }
    }

    fn save(&mut self, world: &str, graph: &FrameGraph) -> Result<(), WrtError> {
        self.save_records(world, graph.root(), &graph.to_records())?;
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
