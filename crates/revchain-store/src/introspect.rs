//! Read the live schema back into a `SchemaState`
//!
//! Bookkeeping tables and SQLite's internal tables are not part of the
//! migrated schema and are skipped.

use revchain_core::{ColumnDef, ColumnType, SchemaState};
use rusqlite::Connection;

use crate::bookkeeping::{HISTORY_TABLE, VERSION_TABLE};
use crate::errors::{from_rusqlite, Result};

fn is_internal(table: &str) -> bool {
    table.starts_with("sqlite_") || table == VERSION_TABLE || table == HISTORY_TABLE
}

/// Map a declared type onto the vocabulary, falling back to SQLite's
/// affinity rules for types written outside revchain
pub fn column_type(declared: &str) -> ColumnType {
    if let Some(ty) = ColumnType::from_declared(declared) {
        return ty;
    }
    let upper = declared.to_ascii_uppercase();
    if upper.contains("INT") {
        ColumnType::Integer
    } else if upper.contains("CHAR") || upper.contains("CLOB") || upper.contains("TEXT") {
        ColumnType::Text
    } else if upper.is_empty() || upper.contains("BLOB") {
        ColumnType::Blob
    } else if upper.contains("REAL") || upper.contains("FLOA") || upper.contains("DOUB") {
        ColumnType::Real
    } else {
        ColumnType::Text
    }
}

/// Columns of one table in declaration order
pub fn table_columns(conn: &Connection, table: &str) -> Result<Vec<ColumnDef>> {
    let mut stmt = conn
        .prepare("SELECT name, type, \"notnull\", dflt_value, pk FROM pragma_table_info(?1) ORDER BY cid")
        .map_err(|e| from_rusqlite("introspect", e))?;
    let columns = stmt
        .query_map([table], |row| {
            let declared: String = row.get(1)?;
            let not_null: bool = row.get(2)?;
            let pk: i64 = row.get(4)?;
            Ok(ColumnDef {
                name: row.get(0)?,
                column_type: column_type(&declared),
                // SQLite reports INTEGER PRIMARY KEY columns as nullable
                nullable: !not_null && pk == 0,
                default: row.get(3)?,
                primary_key: pk > 0,
            })
        })
        .map_err(|e| from_rusqlite("introspect", e))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| from_rusqlite("introspect", e))?;
    Ok(columns)
}

/// Snapshot of every user table
pub fn introspect(conn: &Connection) -> Result<SchemaState> {
    let mut stmt = conn
        .prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
        .map_err(|e| from_rusqlite("introspect", e))?;
    let tables: Vec<String> = stmt
        .query_map([], |row| row.get(0))
        .map_err(|e| from_rusqlite("introspect", e))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| from_rusqlite("introspect", e))?;

    let mut state = SchemaState::new();
    for table in tables.into_iter().filter(|t| !is_internal(t)) {
        let columns = table_columns(conn, &table)?;
        state.insert_table(table, columns);
    }
    Ok(state)
}
