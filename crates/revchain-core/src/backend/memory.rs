use std::collections::HashMap;

use revchain_core_types::RunId;

use super::{MigrationBackend, RecordApplication, RecordedChecksum};
use crate::chain::Direction;
use crate::errors::{MigrationError, Result};
use crate::state::SchemaState;

/// One history row, as the in-memory backend keeps it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub revision: String,
    pub direction: Direction,
    pub checksum: String,
    pub run_id: RunId,
}

/// Backend over an in-memory `SchemaState`
///
/// Used for dry runs and the reversibility checker, and as a reference
/// implementation of the backend contract in tests.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBackend {
    schema: SchemaState,
    marker: Option<String>,
    history: Vec<HistoryEntry>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing schema and marker, e.g. one introspected from a database
    pub fn with_state(schema: SchemaState, marker: Option<String>) -> Self {
        Self {
            schema,
            marker,
            history: Vec::new(),
        }
    }

    pub fn schema(&self) -> &SchemaState {
        &self.schema
    }

    pub fn marker(&self) -> Option<&str> {
        self.marker.as_deref()
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }
}

impl MigrationBackend for InMemoryBackend {
    fn current_revision(&mut self) -> Result<Option<String>> {
        Ok(self.marker.clone())
    }

    fn apply_record(&mut self, application: &RecordApplication<'_>) -> Result<()> {
        let revision = &application.record.revision;
        self.schema
            .apply_all(application.steps)
            .map_err(|(step, source)| MigrationError::StepFailed {
                revision: revision.clone(),
                step,
                source,
            })?;

        self.marker = application.marker_after.map(str::to_string);
        self.history.push(HistoryEntry {
            revision: revision.clone(),
            direction: application.direction,
            checksum: application.checksum.to_string(),
            run_id: application.run_id.clone(),
        });
        Ok(())
    }

    fn recorded_checksums(&mut self) -> Result<Vec<RecordedChecksum>> {
        let mut latest: HashMap<&str, &HistoryEntry> = HashMap::new();
        for entry in &self.history {
            latest.insert(&entry.revision, entry);
        }

        let mut recorded: Vec<RecordedChecksum> = latest
            .into_values()
            .filter(|e| e.direction == Direction::Upgrade)
            .map(|e| RecordedChecksum {
                revision: e.revision.clone(),
                checksum: e.checksum.clone(),
            })
            .collect();
        recorded.sort_by(|a, b| a.revision.cmp(&b.revision));
        Ok(recorded)
    }
}
