//! SQLite implementation of `MigrationBackend`
//!
//! Each record runs in its own transaction: the steps, the marker update and
//! the history row commit together or not at all. Steps are checked against
//! an introspected `SchemaState` before their DDL runs, so a missing or
//! duplicate object is reported as the same `SchemaError` the in-memory
//! backend raises.

use revchain_core::backend::{MigrationBackend, RecordApplication, RecordedChecksum};
use revchain_core::errors::MigrationError;
use revchain_core::SchemaState;
use rusqlite::Connection;

use crate::bookkeeping;
use crate::ddl;
use crate::errors::{from_rusqlite, step_rejected, Result};
use crate::introspect::introspect;

/// Live SQLite schema migrated through a borrowed connection
pub struct SqliteBackend<'c> {
    conn: &'c mut Connection,
}

impl<'c> SqliteBackend<'c> {
    pub fn new(conn: &'c mut Connection) -> Self {
        Self { conn }
    }

    /// Current user schema, excluding bookkeeping tables
    pub fn schema(&self) -> Result<SchemaState> {
        introspect(&*self.conn)
    }

    pub fn connection(&self) -> &Connection {
        &*self.conn
    }
}

impl MigrationBackend for SqliteBackend<'_> {
    fn current_revision(&mut self) -> Result<Option<String>> {
        bookkeeping::read_marker(self.conn)
    }

    fn apply_record(&mut self, application: &RecordApplication<'_>) -> Result<()> {
        let revision = &application.record.revision;
        let tx = self
            .conn
            .transaction()
            .map_err(|e| from_rusqlite("begin", e))?;

        bookkeeping::ensure_tables(&tx)?;
        let mut schema = introspect(&tx)?;

        for (step, op) in application.steps.iter().enumerate() {
            let mut next = schema.clone();
            next.apply(op).map_err(|source| MigrationError::StepFailed {
                revision: revision.clone(),
                step,
                source,
            })?;

            for sql in ddl::render(op, &schema) {
                tracing::debug!(revision = %revision, step, sql = %sql, "executing step");
                tx.execute_batch(&sql)
                    .map_err(|e| step_rejected(revision, step, e))?;
            }
            schema = next;
        }

        bookkeeping::write_marker(&tx, application.marker_after)?;
        bookkeeping::append_history(
            &tx,
            revision,
            application.direction,
            application.checksum,
            application.run_id,
        )?;

        tx.commit().map_err(|e| from_rusqlite("commit", e))?;
        Ok(())
    }

    fn recorded_checksums(&mut self) -> Result<Vec<RecordedChecksum>> {
        bookkeeping::applied_checksums(self.conn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_in_memory;
    use revchain_core::chain::Direction;
    use revchain_core::errors::{LedgerError, SchemaError};
    use revchain_core::{ColumnDef, ColumnType, MigrationRecord, SchemaOp};
    use revchain_core_types::RunId;

    fn apply(
        backend: &mut SqliteBackend<'_>,
        record: &MigrationRecord,
        marker: Option<&str>,
    ) -> Result<()> {
        let run_id = RunId::new();
        backend.apply_record(&RecordApplication {
            record,
            direction: Direction::Upgrade,
            steps: &record.upgrade_steps,
            marker_after: marker,
            checksum: "sum",
            run_id: &run_id,
        })
    }

    #[test]
    fn test_apply_record_commits_steps_and_marker() {
        let mut conn = open_in_memory().unwrap();
        let mut backend = SqliteBackend::new(&mut conn);
        let record = MigrationRecord::new("a1").with_upgrade(SchemaOp::CreateTable {
            table: "messages".to_string(),
            columns: vec![ColumnDef::new("id", ColumnType::Integer).primary_key()],
        });

        apply(&mut backend, &record, Some("a1")).unwrap();

        assert_eq!(backend.current_revision().unwrap().as_deref(), Some("a1"));
        assert!(backend.schema().unwrap().has_table("messages"));
    }

    #[test]
    fn test_failed_step_rolls_back_whole_record() {
        let mut conn = open_in_memory().unwrap();
        let mut backend = SqliteBackend::new(&mut conn);
        let record = MigrationRecord::new("a1")
            .with_upgrade(SchemaOp::CreateTable {
                table: "messages".to_string(),
                columns: vec![ColumnDef::new("id", ColumnType::Integer).primary_key()],
            })
            .with_upgrade(SchemaOp::DropColumn {
                table: "messages".to_string(),
                column: "missing".to_string(),
            });

        let err = apply(&mut backend, &record, Some("a1")).unwrap_err();

        assert_eq!(
            err,
            LedgerError::Migration(MigrationError::StepFailed {
                revision: "a1".to_string(),
                step: 1,
                source: SchemaError::ColumnNotFound {
                    table: "messages".to_string(),
                    column: "missing".to_string(),
                },
            })
        );
        assert_eq!(backend.current_revision().unwrap(), None);
        assert!(backend.schema().unwrap().is_empty());
        assert!(bookkeeping::read_history(backend.connection())
            .unwrap()
            .is_empty());
    }
}
