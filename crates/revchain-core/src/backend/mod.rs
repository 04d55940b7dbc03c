//! Backend seam between the replay engine and a live schema
//!
//! The engine decides *what* to apply and in which order; a backend applies
//! one record at a time. `apply_record` is the unit of atomicity: either all
//! of the record's steps succeed and the marker moves, or nothing changes.

pub mod memory;

use revchain_core_types::RunId;

use crate::chain::Direction;
use crate::errors::Result;
use crate::model::{MigrationRecord, SchemaOp};

pub use memory::InMemoryBackend;

/// Everything a backend needs to apply one record
#[derive(Debug, Clone, Copy)]
pub struct RecordApplication<'a> {
    pub record: &'a MigrationRecord,
    pub direction: Direction,
    /// `upgrade_steps` or `downgrade_steps`, depending on `direction`
    pub steps: &'a [SchemaOp],
    /// Marker value once the record is applied (`None` = base)
    pub marker_after: Option<&'a str>,
    pub checksum: &'a str,
    pub run_id: &'a RunId,
}

/// Checksum stored when a still-applied record was upgraded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedChecksum {
    pub revision: String,
    pub checksum: String,
}

/// A schema the ledger can migrate
pub trait MigrationBackend {
    /// Read the current revision marker (`None` = base)
    ///
    /// # Errors
    ///
    /// Returns a persistence error if the marker cannot be read.
    fn current_revision(&mut self) -> Result<Option<String>>;

    /// Apply one record's steps and move the marker, all-or-nothing
    ///
    /// # Errors
    ///
    /// Returns `MigrationError::StepFailed` when a step cannot be applied,
    /// or a backend/persistence error. In every error case the schema and
    /// the marker are unchanged.
    fn apply_record(&mut self, application: &RecordApplication<'_>) -> Result<()>;

    /// Checksums recorded for records that are currently applied
    ///
    /// Backends without a history keep the default (nothing to verify).
    ///
    /// # Errors
    ///
    /// Returns a persistence error if the history cannot be read.
    fn recorded_checksums(&mut self) -> Result<Vec<RecordedChecksum>> {
        Ok(Vec::new())
    }
}

impl<B: MigrationBackend + ?Sized> MigrationBackend for &mut B {
    fn current_revision(&mut self) -> Result<Option<String>> {
        (**self).current_revision()
    }

    fn apply_record(&mut self, application: &RecordApplication<'_>) -> Result<()> {
        (**self).apply_record(application)
    }

    fn recorded_checksums(&mut self) -> Result<Vec<RecordedChecksum>> {
        (**self).recorded_checksums()
    }
}
