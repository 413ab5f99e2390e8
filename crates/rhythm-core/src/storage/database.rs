//! SQLite-based cycle storage and statistics.
//!
//! Provides persistent storage for:
//! - Completed work and break cycles (append-only)
//! - Aggregate counts (all-time, per type, today)

use std::path::Path;

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::cycle::{Cycle, CycleType, Mood};
use crate::error::StorageError;

use super::{data_dir, CycleStore};

/// The four independent counts behind the statistics screen.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct CycleStatistics {
    pub total: u64,
    pub work: u64,
    pub breaks: u64,
    pub today: u64,
}

/// SQLite database for cycle storage.
pub struct Database {
    conn: Connection,
}

const SELECT_CYCLES: &str = "SELECT id, type, duration, mood, completed_at FROM cycles";
const NEWEST_FIRST: &str = "ORDER BY julianday(completed_at) DESC, id DESC";

impl Database {
    /// Get a reference to the underlying SQLite connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Open the database at `~/.config/rhythm/rhythm.db`.
    ///
    /// # Errors
    /// Returns an error if the data directory or database cannot be opened,
    /// or the schema cannot be created.
    pub fn open() -> Result<Self, StorageError> {
        let dir = data_dir().map_err(|e| StorageError::MigrationFailed(e.to_string()))?;
        Self::open_at(dir.join("rhythm.db"))
    }

    /// Open (or create) a database file at an explicit path.
    pub fn open_at(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref();
        let conn = Connection::open(path).map_err(|source| StorageError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let db = Self { conn };
        db.initialize()?;
        Ok(db)
    }

    /// Open an in-memory database (tests, dry runs).
    pub fn open_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.initialize()?;
        Ok(db)
    }

    /// Ensure the cycles table exists. Safe to call on every session start.
    pub fn initialize(&self) -> Result<(), StorageError> {
        self.conn
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS cycles (
                    id           INTEGER PRIMARY KEY AUTOINCREMENT,
                    type         TEXT NOT NULL CHECK (type IN ('work', 'break')),
                    duration     REAL NOT NULL CHECK (duration > 0),
                    mood         TEXT,
                    completed_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                    created_at   DATETIME DEFAULT CURRENT_TIMESTAMP
                );

                CREATE INDEX IF NOT EXISTS idx_cycles_completed_at ON cycles(completed_at);
                CREATE INDEX IF NOT EXISTS idx_cycles_type ON cycles(type);",
            )
            .map_err(|e| StorageError::MigrationFailed(e.to_string()))?;
        debug!("cycles table ready");
        Ok(())
    }

    /// Record a completed cycle, stamped with the current time.
    ///
    /// # Errors
    /// Returns an error if the store rejects the insert.
    pub fn add_cycle(
        &self,
        cycle_type: CycleType,
        duration_minutes: f64,
        mood: Option<Mood>,
    ) -> Result<i64, StorageError> {
        self.add_cycle_at(cycle_type, duration_minutes, mood, Utc::now())
    }

    /// Record a cycle with an explicit completion time (imports, seeding).
    pub fn add_cycle_at(
        &self,
        cycle_type: CycleType,
        duration_minutes: f64,
        mood: Option<Mood>,
        completed_at: DateTime<Utc>,
    ) -> Result<i64, StorageError> {
        let mood = match (cycle_type, mood) {
            (CycleType::Break, Some(m)) => {
                warn!(mood = %m, "dropping mood passed for a break cycle");
                None
            }
            (_, m) => m,
        };
        self.conn.execute(
            "INSERT INTO cycles (type, duration, mood, completed_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                cycle_type.as_str(),
                duration_minutes,
                mood.map(Mood::as_str),
                encode_timestamp(completed_at),
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        info!(id, cycle_type = %cycle_type, duration_minutes, mood = ?mood, "cycle added");
        Ok(id)
    }

    /// All cycles, newest first.
    pub fn all_cycles(&self) -> Result<Vec<Cycle>, StorageError> {
        self.query_cycles(&format!("{SELECT_CYCLES} {NEWEST_FIRST}"), [])
    }

    /// Cycles completed within `[start, end]`, newest first.
    pub fn cycles_by_date_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Cycle>, StorageError> {
        self.query_cycles(
            &format!(
                "{SELECT_CYCLES} WHERE julianday(completed_at) BETWEEN julianday(?1) AND julianday(?2) {NEWEST_FIRST}"
            ),
            params![encode_timestamp(start), encode_timestamp(end)],
        )
    }

    /// Cycles of a single type, newest first.
    pub fn cycles_by_type(&self, cycle_type: CycleType) -> Result<Vec<Cycle>, StorageError> {
        self.query_cycles(
            &format!("{SELECT_CYCLES} WHERE type = ?1 {NEWEST_FIRST}"),
            params![cycle_type.as_str()],
        )
    }

    /// Total, per-type, and today's counts. "Today" is the local calendar date.
    pub fn statistics(&self) -> Result<CycleStatistics, StorageError> {
        let count = |sql: &str| -> Result<u64, StorageError> {
            let n: i64 = self.conn.query_row(sql, [], |row| row.get(0))?;
            Ok(n.max(0) as u64)
        };
        Ok(CycleStatistics {
            total: count("SELECT COUNT(*) FROM cycles")?,
            work: count("SELECT COUNT(*) FROM cycles WHERE type = 'work'")?,
            breaks: count("SELECT COUNT(*) FROM cycles WHERE type = 'break'")?,
            today: count(
                "SELECT COUNT(*) FROM cycles
                 WHERE DATE(completed_at, 'localtime') = DATE('now', 'localtime')",
            )?,
        })
    }

    /// Delete every cycle. Maintenance and test paths only.
    pub fn clear_all_cycles(&self) -> Result<usize, StorageError> {
        let deleted = self.conn.execute("DELETE FROM cycles", [])?;
        info!(deleted, "all cycles cleared");
        Ok(deleted)
    }

    fn query_cycles<P: rusqlite::Params>(
        &self,
        sql: &str,
        params: P,
    ) -> Result<Vec<Cycle>, StorageError> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params, raw_cycle)?;
        let mut cycles = Vec::new();
        for row in rows {
            cycles.push(row?.decode()?);
        }
        Ok(cycles)
    }
}

impl CycleStore for Database {
    fn add_cycle(
        &self,
        cycle_type: CycleType,
        duration_minutes: f64,
        mood: Option<Mood>,
    ) -> Result<i64, StorageError> {
        Database::add_cycle(self, cycle_type, duration_minutes, mood)
    }

    fn all_cycles(&self) -> Result<Vec<Cycle>, StorageError> {
        Database::all_cycles(self)
    }

    fn statistics(&self) -> Result<CycleStatistics, StorageError> {
        Database::statistics(self)
    }
}

/// Column values before enum and timestamp decoding.
struct RawCycle {
    id: i64,
    cycle_type: String,
    duration: f64,
    mood: Option<String>,
    completed_at: Option<String>,
}

fn raw_cycle(row: &Row<'_>) -> rusqlite::Result<RawCycle> {
    Ok(RawCycle {
        id: row.get(0)?,
        cycle_type: row.get(1)?,
        duration: row.get(2)?,
        mood: row.get(3)?,
        completed_at: row.get(4)?,
    })
}

impl RawCycle {
    fn decode(self) -> Result<Cycle, StorageError> {
        let cycle_type = self
            .cycle_type
            .parse::<CycleType>()
            .map_err(|e| StorageError::InvalidRow(format!("cycle {}: {e}", self.id)))?;
        let mood = match self.mood.as_deref() {
            None | Some("") => None,
            Some(raw) => Some(
                raw.parse::<Mood>()
                    .map_err(|e| StorageError::InvalidRow(format!("cycle {}: {e}", self.id)))?,
            ),
        };
        let completed_at = self
            .completed_at
            .as_deref()
            .and_then(decode_timestamp)
            .ok_or_else(|| {
                StorageError::InvalidRow(format!("cycle {}: unreadable completed_at", self.id))
            })?;
        Ok(Cycle {
            id: self.id,
            cycle_type,
            duration_minutes: self.duration,
            mood,
            completed_at,
        })
    }
}

fn encode_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Accepts RFC 3339 as written by this module and SQLite's own
/// `CURRENT_TIMESTAMP` format (UTC, no offset).
fn decode_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|naive| naive.and_utc())
        })
}
