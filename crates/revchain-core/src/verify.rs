//! Reversibility checker
//!
//! Replays the chain on an empty in-memory schema. Before moving on from a
//! record, its downgrade is applied to a copy of the upgraded schema and the
//! result compared with the schema the record started from.

use serde::Serialize;

use crate::chain::Chain;
use crate::errors::SchemaError;
use crate::state::SchemaState;

/// Why a record does not round-trip
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReversibilityIssue {
    /// An upgrade step failed; records after this one were not checked
    UpgradeFailed {
        revision: String,
        step: usize,
        error: String,
    },
    DowngradeFailed {
        revision: String,
        step: usize,
        error: String,
    },
    /// Upgrade then downgrade leaves a schema different from the one before
    NotRestored { revision: String },
}

impl ReversibilityIssue {
    pub fn revision(&self) -> &str {
        match self {
            ReversibilityIssue::UpgradeFailed { revision, .. }
            | ReversibilityIssue::DowngradeFailed { revision, .. }
            | ReversibilityIssue::NotRestored { revision } => revision,
        }
    }
}

impl std::fmt::Display for ReversibilityIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReversibilityIssue::UpgradeFailed {
                revision,
                step,
                error,
            } => write!(f, "{}: upgrade step {} fails: {}", revision, step, error),
            ReversibilityIssue::DowngradeFailed {
                revision,
                step,
                error,
            } => write!(f, "{}: downgrade step {} fails: {}", revision, step, error),
            ReversibilityIssue::NotRestored { revision } => {
                write!(f, "{}: downgrade does not restore the prior schema", revision)
            }
        }
    }
}

/// Check every reversible record of the chain, in linear order
///
/// Irreversible records are upgraded but not checked. An upgrade failure
/// stops the replay because later records would start from a schema the
/// chain never produces.
pub fn verify_reversibility(chain: &Chain) -> Vec<ReversibilityIssue> {
    let mut issues = Vec::new();
    let mut schema = SchemaState::new();

    for record in chain.history() {
        let before = schema.clone();

        if let Err((step, err)) = schema.apply_all(&record.upgrade_steps) {
            issues.push(upgrade_failed(&record.revision, step, &err));
            break;
        }
        if record.irreversible {
            continue;
        }

        let mut reverted = schema.clone();
        match reverted.apply_all(&record.downgrade_steps) {
            Err((step, err)) => issues.push(ReversibilityIssue::DowngradeFailed {
                revision: record.revision.clone(),
                step,
                error: err.to_string(),
            }),
            Ok(()) if !reverted.observably_eq(&before) => {
                issues.push(ReversibilityIssue::NotRestored {
                    revision: record.revision.clone(),
                })
            }
            Ok(()) => {}
        }
    }

    tracing::debug!(
        records = chain.len(),
        issues = issues.len(),
        "reversibility checked"
    );
    issues
}

fn upgrade_failed(revision: &str, step: usize, err: &SchemaError) -> ReversibilityIssue {
    ReversibilityIssue::UpgradeFailed {
        revision: revision.to_string(),
        step,
        error: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ColumnDef, ColumnType, MigrationRecord, SchemaOp};

    fn create_messages() -> SchemaOp {
        SchemaOp::CreateTable {
            table: "messages".to_string(),
            columns: vec![ColumnDef::new("id", ColumnType::Integer).primary_key()],
        }
    }

    fn add_tool_metadata() -> SchemaOp {
        SchemaOp::AddColumn {
            table: "messages".to_string(),
            column: ColumnDef::new("tool_metadata", ColumnType::Json),
        }
    }

    #[test]
    fn test_reversible_chain_has_no_issues() {
        let chain = Chain::build(vec![
            MigrationRecord::new("a")
                .with_upgrade(create_messages())
                .with_downgrade(SchemaOp::DropTable {
                    table: "messages".to_string(),
                }),
            MigrationRecord::new("b")
                .with_down_revision("a")
                .with_upgrade(add_tool_metadata())
                .with_downgrade(SchemaOp::DropColumn {
                    table: "messages".to_string(),
                    column: "tool_metadata".to_string(),
                }),
            MigrationRecord::new("c").with_down_revision("b"),
        ])
        .unwrap();

        assert!(verify_reversibility(&chain).is_empty());
    }

    #[test]
    fn test_missing_downgrade_reported() {
        let chain = Chain::build(vec![
            MigrationRecord::new("a")
                .with_upgrade(create_messages())
                .with_downgrade(SchemaOp::DropTable {
                    table: "messages".to_string(),
                }),
            MigrationRecord::new("b")
                .with_down_revision("a")
                .with_upgrade(add_tool_metadata()),
        ])
        .unwrap();

        let issues = verify_reversibility(&chain);
        assert_eq!(
            issues,
            vec![ReversibilityIssue::NotRestored {
                revision: "b".to_string()
            }]
        );
    }

    #[test]
    fn test_irreversible_record_skipped() {
        let chain = Chain::build(vec![MigrationRecord::new("a")
            .with_upgrade(create_messages())
            .irreversible()])
        .unwrap();

        assert!(verify_reversibility(&chain).is_empty());
    }

    #[test]
    fn test_failing_upgrade_stops_replay() {
        let chain = Chain::build(vec![
            MigrationRecord::new("a").with_upgrade(add_tool_metadata()),
            MigrationRecord::new("b").with_down_revision("a"),
        ])
        .unwrap();

        let issues = verify_reversibility(&chain);
        assert_eq!(issues.len(), 1);
        assert!(matches!(issues[0], ReversibilityIssue::UpgradeFailed { step: 0, .. }));
        assert_eq!(issues[0].revision(), "a");
    }
}
