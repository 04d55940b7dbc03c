//! Ledger bookkeeping tables
//!
//! - `revchain_version`: exactly one row; `version_num` is the current
//!   revision, NULL at base
//! - `revchain_history`: append-only log of every applied record with the
//!   checksum it had at the time
//!
//! Readers treat missing tables as an untouched database, so `current` and
//! `history` never create anything.

use chrono::Utc;
use revchain_core::backend::RecordedChecksum;
use revchain_core::chain::Direction;
use revchain_core_types::RunId;
use rusqlite::{Connection, OptionalExtension};
use serde::Serialize;
use std::collections::HashMap;

use crate::errors::{from_rusqlite, Result};

pub const VERSION_TABLE: &str = "revchain_version";
pub const HISTORY_TABLE: &str = "revchain_history";

/// Create both tables and the marker row if they do not exist yet
pub fn ensure_tables(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS revchain_version (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            version_num TEXT
        );
        INSERT OR IGNORE INTO revchain_version (id, version_num) VALUES (1, NULL);
        CREATE TABLE IF NOT EXISTS revchain_history (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            revision TEXT NOT NULL,
            direction TEXT NOT NULL CHECK (direction IN ('upgrade', 'downgrade')),
            checksum TEXT NOT NULL,
            applied_at TEXT NOT NULL,
            run_id TEXT NOT NULL
        );",
    )
    .map_err(|e| from_rusqlite("ensure_tables", e))
}

fn table_exists(conn: &Connection, table: &str) -> Result<bool> {
    conn.query_row(
        "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
        [table],
        |_| Ok(true),
    )
    .optional()
    .map(|found| found.unwrap_or(false))
    .map_err(|e| from_rusqlite("table_exists", e))
}

/// Read the current revision (`None` = base or untouched database)
pub fn read_marker(conn: &Connection) -> Result<Option<String>> {
    if !table_exists(conn, VERSION_TABLE)? {
        return Ok(None);
    }
    let marker: Option<Option<String>> = conn
        .query_row(
            "SELECT version_num FROM revchain_version WHERE id = 1",
            [],
            |row| row.get(0),
        )
        .optional()
        .map_err(|e| from_rusqlite("read_marker", e))?;
    Ok(marker.flatten())
}

/// Overwrite the marker row
pub fn write_marker(conn: &Connection, revision: Option<&str>) -> Result<()> {
    conn.execute(
        "UPDATE revchain_version SET version_num = ?1 WHERE id = 1",
        [revision],
    )
    .map_err(|e| from_rusqlite("write_marker", e))?;
    Ok(())
}

/// Append one history row stamped with the current time
pub fn append_history(
    conn: &Connection,
    revision: &str,
    direction: Direction,
    checksum: &str,
    run_id: &RunId,
) -> Result<()> {
    let applied_at = Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO revchain_history (revision, direction, checksum, applied_at, run_id)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        rusqlite::params![
            revision,
            direction.as_str(),
            checksum,
            applied_at,
            run_id.as_str()
        ],
    )
    .map_err(|e| from_rusqlite("append_history", e))?;
    Ok(())
}

/// One row of `revchain_history`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryRow {
    pub id: i64,
    pub revision: String,
    pub direction: String,
    pub checksum: String,
    pub applied_at: String,
    pub run_id: String,
}

/// All history rows, oldest first
pub fn read_history(conn: &Connection) -> Result<Vec<HistoryRow>> {
    if !table_exists(conn, HISTORY_TABLE)? {
        return Ok(Vec::new());
    }
    let mut stmt = conn
        .prepare(
            "SELECT id, revision, direction, checksum, applied_at, run_id
             FROM revchain_history ORDER BY id",
        )
        .map_err(|e| from_rusqlite("read_history", e))?;
    let rows = stmt
        .query_map([], |row| {
            Ok(HistoryRow {
                id: row.get(0)?,
                revision: row.get(1)?,
                direction: row.get(2)?,
                checksum: row.get(3)?,
                applied_at: row.get(4)?,
                run_id: row.get(5)?,
            })
        })
        .map_err(|e| from_rusqlite("read_history", e))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| from_rusqlite("read_history", e))?;
    Ok(rows)
}

/// Checksums of records whose latest history row is an upgrade
pub fn applied_checksums(conn: &Connection) -> Result<Vec<RecordedChecksum>> {
    let history = read_history(conn)?;
    let mut latest: HashMap<&str, &HistoryRow> = HashMap::new();
    for row in &history {
        latest.insert(&row.revision, row);
    }

    let mut recorded: Vec<RecordedChecksum> = latest
        .into_values()
        .filter(|row| row.direction == Direction::Upgrade.as_str())
        .map(|row| RecordedChecksum {
            revision: row.revision.clone(),
            checksum: row.checksum.clone(),
        })
        .collect();
    recorded.sort_by(|a, b| a.revision.cmp(&b.revision));
    Ok(recorded)
}
