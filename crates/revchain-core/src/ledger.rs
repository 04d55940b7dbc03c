//! Replay engine
//!
//! `Ledger` owns a validated `Chain` and walks a backend from its current
//! revision to a target, one record at a time. The marker moves only after
//! a record's steps have all succeeded; the first failure halts the walk and
//! leaves the backend at the last fully applied record.

use std::time::Instant;

use revchain_core_types::RunId;
use serde::Serialize;

use crate::backend::{MigrationBackend, RecordApplication};
use crate::chain::{Chain, Direction, MigrationPlan, Target};
use crate::errors::{LedgerError, Result};
use crate::model::MigrationRecord;
use crate::{log_op_end, log_op_error, log_op_start};

/// Outcome of a completed walk
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationReport {
    pub run_id: RunId,
    pub direction: Direction,
    pub from: Option<String>,
    pub to: Option<String>,
    /// Revisions applied, in application order
    pub applied: Vec<String>,
    pub duration_ms: u64,
}

impl MigrationReport {
    /// True when the backend was already at the target
    pub fn is_noop(&self) -> bool {
        self.applied.is_empty()
    }
}

/// Migration ledger over a validated chain
#[derive(Debug, Clone)]
pub struct Ledger {
    chain: Chain,
}

impl Ledger {
    pub fn new(chain: Chain) -> Self {
        Self { chain }
    }

    /// Build the chain and wrap it
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::Chain` if the records fail integrity checks.
    pub fn from_records(records: Vec<MigrationRecord>) -> Result<Self> {
        Ok(Self::new(Chain::build(records)?))
    }

    pub fn chain(&self) -> &Chain {
        &self.chain
    }

    /// Current revision of the backend, checked against the chain
    ///
    /// # Errors
    ///
    /// Returns `RevisionNotFound` when the marker names a revision the chain
    /// does not contain (e.g. a database migrated by a newer checkout).
    pub fn current<B: MigrationBackend + ?Sized>(&self, backend: &mut B) -> Result<Option<String>> {
        let current = backend.current_revision()?;
        if let Some(rev) = &current {
            self.chain.record(rev)?;
        }
        Ok(current)
    }

    /// Compare checksums recorded at application time with the records now
    ///
    /// # Errors
    ///
    /// Returns `ChecksumMismatch` for the first applied record whose
    /// definition changed since it was applied.
    pub fn verify_checksums<B: MigrationBackend + ?Sized>(&self, backend: &mut B) -> Result<()> {
        for recorded in backend.recorded_checksums()? {
            // Records dropped from the chain are reported by `current`, not here
            let Some(record) = self.chain.get(&recorded.revision) else {
                continue;
            };
            let current = record.checksum()?;
            if current != recorded.checksum {
                return Err(LedgerError::ChecksumMismatch {
                    revision: recorded.revision,
                    recorded: recorded.checksum,
                    current,
                });
            }
        }
        Ok(())
    }

    /// Plan a walk without touching the schema
    ///
    /// # Errors
    ///
    /// Returns resolution and planning errors; see `Chain::resolve` and
    /// `Chain::plan`.
    pub fn plan<B: MigrationBackend + ?Sized>(
        &self,
        backend: &mut B,
        direction: Direction,
        target: &Target,
    ) -> Result<MigrationPlan> {
        let current = self.current(backend)?;
        let resolved = self.chain.resolve(target, current.as_deref())?;
        self.chain
            .plan(direction, current.as_deref(), resolved.as_deref())
    }

    /// Apply records forward until `target` is the current revision
    ///
    /// Re-running at the target applies nothing.
    ///
    /// # Errors
    ///
    /// Returns planning errors before anything runs, and the first
    /// `MigrationError` raised by the backend, after which the marker names
    /// the last fully applied record.
    pub fn upgrade<B: MigrationBackend + ?Sized>(
        &self,
        backend: &mut B,
        target: &Target,
    ) -> Result<MigrationReport> {
        self.walk(backend, Direction::Upgrade, target)
    }

    /// Undo records, newest first, until `target` is the current revision
    ///
    /// # Errors
    ///
    /// As for `upgrade`; additionally `MigrationError::Irreversible` before
    /// any step runs if the walk would cross an irreversible record.
    pub fn downgrade<B: MigrationBackend + ?Sized>(
        &self,
        backend: &mut B,
        target: &Target,
    ) -> Result<MigrationReport> {
        self.walk(backend, Direction::Downgrade, target)
    }

    fn walk<B: MigrationBackend + ?Sized>(
        &self,
        backend: &mut B,
        direction: Direction,
        target: &Target,
    ) -> Result<MigrationReport> {
        let start = Instant::now();
        let run_id = RunId::new();
        let op = direction.as_str();
        let target_text = target.to_string();

        log_op_start!(op, run_id = %run_id, target = %target_text);

        let result = self.walk_inner(backend, direction, target, &run_id);
        let duration_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok((from, applied)) => {
                log_op_end!(
                    op,
                    duration_ms = duration_ms,
                    run_id = %run_id,
                    applied = applied.len()
                );
                let to = match direction {
                    Direction::Upgrade => applied.last().cloned().or_else(|| from.clone()),
                    Direction::Downgrade => self.marker_after_downgrade(&applied, &from),
                };
                Ok(MigrationReport {
                    run_id,
                    direction,
                    from,
                    to,
                    applied,
                    duration_ms,
                })
            }
            Err(err) => {
                log_op_error!(op, err.clone(), duration_ms = duration_ms, run_id = %run_id);
                Err(err)
            }
        }
    }

    fn walk_inner<B: MigrationBackend + ?Sized>(
        &self,
        backend: &mut B,
        direction: Direction,
        target: &Target,
        run_id: &RunId,
    ) -> Result<(Option<String>, Vec<String>)> {
        self.verify_checksums(backend)?;
        let plan = self.plan(backend, direction, target)?;

        tracing::debug!(
            direction = %direction,
            from_revision = plan.from.as_deref().unwrap_or("<base>"),
            to_revision = plan.to.as_deref().unwrap_or("<base>"),
            plan_len = plan.len(),
            "planned walk"
        );

        let mut applied = Vec::with_capacity(plan.len());
        for planned in &plan.records {
            let record = self.chain.record(&planned.revision)?;
            let steps = match direction {
                Direction::Upgrade => &record.upgrade_steps,
                Direction::Downgrade => &record.downgrade_steps,
            };
            let checksum = record.checksum()?;

            backend.apply_record(&RecordApplication {
                record,
                direction,
                steps,
                marker_after: planned.marker_after.as_deref(),
                checksum: &checksum,
                run_id,
            })?;

            tracing::info!(
                event = revchain_core_types::schema::EVENT_RECORD_APPLIED,
                run_id = %run_id,
                direction = %direction,
                revision = %record.revision,
                step_count = steps.len(),
                noop = record.is_noop(),
                "record applied"
            );
            applied.push(record.revision.clone());
        }

        Ok((plan.from, applied))
    }

    fn marker_after_downgrade(&self, applied: &[String], from: &Option<String>) -> Option<String> {
        match applied.last() {
            None => from.clone(),
            Some(last) => self
                .chain
                .position(last)
                .and_then(|p| p.checked_sub(1))
                .and_then(|p| self.chain.at(p))
                .map(|r| r.revision.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::InMemoryBackend;
    use crate::errors::MigrationError;
    use crate::model::{ColumnDef, ColumnType, SchemaOp};

    fn create_messages() -> SchemaOp {
        SchemaOp::CreateTable {
            table: "messages".to_string(),
            columns: vec![ColumnDef::new("id", ColumnType::Integer).primary_key()],
        }
    }

    fn ledger() -> Ledger {
        Ledger::from_records(vec![
            MigrationRecord::new("a")
                .with_upgrade(create_messages())
                .with_downgrade(SchemaOp::DropTable {
                    table: "messages".to_string(),
                }),
            MigrationRecord::new("b").with_down_revision("a"),
        ])
        .unwrap()
    }

    #[test]
    fn test_report_describes_walk() {
        let ledger = ledger();
        let mut backend = InMemoryBackend::new();

        let report = ledger.upgrade(&mut backend, &Target::Head).unwrap();
        assert_eq!(report.direction, Direction::Upgrade);
        assert_eq!(report.from, None);
        assert_eq!(report.to.as_deref(), Some("b"));
        assert_eq!(report.applied, vec!["a", "b"]);

        let report = ledger.downgrade(&mut backend, &Target::Base).unwrap();
        assert_eq!(report.applied, vec!["b", "a"]);
        assert_eq!(report.to, None);
        assert!(backend.schema().is_empty());
    }

    #[test]
    fn test_second_upgrade_is_noop() {
        let ledger = ledger();
        let mut backend = InMemoryBackend::new();

        ledger.upgrade(&mut backend, &Target::Head).unwrap();
        let history_len = backend.history().len();

        let report = ledger.upgrade(&mut backend, &Target::Head).unwrap();
        assert!(report.is_noop());
        assert_eq!(report.to.as_deref(), Some("b"));
        assert_eq!(backend.history().len(), history_len);
    }

    #[test]
    fn test_marker_for_unknown_revision_rejected() {
        let ledger = ledger();
        let mut backend =
            InMemoryBackend::with_state(Default::default(), Some("from_the_future".to_string()));

        let err = ledger.upgrade(&mut backend, &Target::Head).unwrap_err();
        assert!(matches!(err, LedgerError::RevisionNotFound { .. }));
    }

    #[test]
    fn test_edited_record_detected() {
        let mut backend = InMemoryBackend::new();
        ledger().upgrade(&mut backend, &Target::Head).unwrap();

        let edited = Ledger::from_records(vec![
            MigrationRecord::new("a")
                .with_upgrade(create_messages())
                .with_message("edited after the fact")
                .with_downgrade(SchemaOp::DropTable {
                    table: "messages".to_string(),
                }),
            MigrationRecord::new("b").with_down_revision("a"),
        ])
        .unwrap();

        let err = edited.downgrade(&mut backend, &Target::Base).unwrap_err();
        assert!(matches!(err, LedgerError::ChecksumMismatch { ref revision, .. } if revision == "a"));
        assert_eq!(backend.marker(), Some("b"));
    }

    #[test]
    fn test_failure_halts_at_last_good_record() {
        let ledger = Ledger::from_records(vec![
            MigrationRecord::new("a").with_upgrade(create_messages()),
            MigrationRecord::new("b")
                .with_down_revision("a")
                .with_upgrade(SchemaOp::AddColumn {
                    table: "messages".to_string(),
                    column: ColumnDef::new("id", ColumnType::Integer),
                }),
            MigrationRecord::new("c").with_down_revision("b"),
        ])
        .unwrap();
        let mut backend = InMemoryBackend::new();

        let err = ledger.upgrade(&mut backend, &Target::Head).unwrap_err();
        match err {
            LedgerError::Migration(MigrationError::StepFailed { revision, step, .. }) => {
                assert_eq!(revision, "b");
                assert_eq!(step, 0);
            }
            other => panic!("expected step failure, got {other:?}"),
        }
        assert_eq!(backend.marker(), Some("a"));
        assert_eq!(backend.history().len(), 1);
    }
}
