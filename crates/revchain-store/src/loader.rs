//! Revision file loader
//!
//! A revisions directory holds one YAML file per record. Files are read in
//! file-name order, which is the authoring order the chain uses to break
//! ties between branches.

use revchain_core::MigrationRecord;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::{io_error, revision_file_invalid, Result};

const EXTENSIONS: [&str; 2] = ["yaml", "yml"];

/// Parse one revision from YAML text
///
/// `origin` names the source in error messages (usually the file name).
pub fn parse_revision_str(content: &str, origin: &str) -> Result<MigrationRecord> {
    // Steps are written as single-key maps (`- add_column: {...}`), not YAML tags
    let deserializer = serde_yaml::Deserializer::from_str(content);
    let record: MigrationRecord =
        serde_yaml::with::singleton_map_recursive::deserialize(deserializer)
            .map_err(|e| revision_file_invalid(origin, &format!("YAML parse error: {}", e)))?;

    validate_record(&record, origin)?;
    Ok(record)
}

/// Parse a single revision file
pub fn parse_revision_file(path: &Path) -> Result<MigrationRecord> {
    let content = fs::read_to_string(path).map_err(|e| io_error("read_revision_file", e))?;
    parse_revision_str(&content, &path.display().to_string())
}

fn validate_record(record: &MigrationRecord, origin: &str) -> Result<()> {
    if record.revision.trim().is_empty() {
        return Err(revision_file_invalid(origin, "revision must not be empty"));
    }

    if record.irreversible && !record.downgrade_steps.is_empty() {
        return Err(revision_file_invalid(
            origin,
            "an irreversible revision cannot declare downgrade steps",
        ));
    }

    if !record.irreversible
        && !record.upgrade_steps.is_empty()
        && record.downgrade_steps.is_empty()
    {
        tracing::warn!(
            revision = %record.revision,
            origin,
            "revision has upgrade steps but no downgrade steps"
        );
    }
    Ok(())
}

/// Revision files in a directory, sorted by file name
pub fn revision_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir).map_err(|e| io_error("read_revisions_dir", e))?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| io_error("read_revisions_dir", e))?.path();
        let is_revision = path.is_file()
            && path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| EXTENSIONS.contains(&ext));
        if is_revision {
            files.push(path);
        }
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

/// Load every revision in a directory, in authoring order
///
/// Duplicate revision ids are reported here with both file names, before
/// the chain sees them.
pub fn load_revisions_dir(dir: &Path) -> Result<Vec<MigrationRecord>> {
    let files = revision_files(dir)?;
    let mut seen: HashMap<String, PathBuf> = HashMap::new();
    let mut records = Vec::with_capacity(files.len());

    for path in files {
        let record = parse_revision_file(&path)?;
        if let Some(first) = seen.get(&record.revision) {
            return Err(revision_file_invalid(
                &path.display().to_string(),
                &format!(
                    "revision {} is already defined in {}",
                    record.revision,
                    first.display()
                ),
            ));
        }
        seen.insert(record.revision.clone(), path);
        records.push(record);
    }

    tracing::debug!(dir = %dir.display(), count = records.len(), "revisions loaded");
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use revchain_core::{ColumnType, SchemaOp};

    #[test]
    fn test_parse_add_column_revision() {
        let yaml = r#"
revision: "3f2a9c"
down_revision: "1b7e04"
message: "add tool metadata"
upgrade:
  - add_column: { table: messages, column: { name: tool_metadata, type: json } }
downgrade:
  - drop_column: { table: messages, column: tool_metadata }
"#;

        let record = parse_revision_str(yaml, "3f2a9c.yaml").unwrap();

        assert_eq!(record.revision, "3f2a9c");
        assert_eq!(record.down_revisions, vec!["1b7e04"]);
        match &record.upgrade_steps[0] {
            SchemaOp::AddColumn { table, column } => {
                assert_eq!(table, "messages");
                assert_eq!(column.column_type, ColumnType::Json);
                assert!(column.nullable);
            }
            other => panic!("unexpected step {other:?}"),
        }
    }

    #[test]
    fn test_parse_every_step_kind() {
        let yaml = r#"
revision: "7c1d2e"
down_revision: "3f2a9c"
upgrade:
  - create_table:
      table: audit_log
      columns:
        - { name: id, type: integer, primary_key: true }
        - { name: payload, type: json, nullable: false, default: "'{}'" }
  - rename_table: { from: audit_log, to: audit_events }
  - add_column: { table: audit_events, column: { name: actor, type: text } }
  - rename_column: { table: audit_events, from: actor, to: actor_id }
  - alter_column_type: { table: audit_events, column: actor_id, new_type: integer }
  - drop_column: { table: audit_events, column: actor_id }
downgrade:
  - drop_table: { table: audit_events }
"#;

        let record = parse_revision_str(yaml, "7c1d2e.yaml").unwrap();

        let kinds: Vec<_> = record.upgrade_steps.iter().map(SchemaOp::kind).collect();
        assert_eq!(
            kinds,
            vec![
                "create_table",
                "rename_table",
                "add_column",
                "rename_column",
                "alter_column_type",
                "drop_column",
            ]
        );
        match &record.upgrade_steps[4] {
            SchemaOp::AlterColumnType { new_type, .. } => {
                assert_eq!(*new_type, ColumnType::Integer)
            }
            other => panic!("unexpected step {other:?}"),
        }
        assert_eq!(
            record.downgrade_steps,
            vec![SchemaOp::DropTable {
                table: "audit_events".to_string()
            }]
        );
    }

    #[test]
    fn test_reject_unknown_step() {
        let yaml = r#"
revision: a1
upgrade:
  - truncate_table: { table: messages }
"#;
        let err = parse_revision_str(yaml, "a1.yaml").unwrap_err();
        assert!(err.to_string().contains("a1.yaml"));
    }

    #[test]
    fn test_parse_merge_revision() {
        let yaml = r#"
revision: m1
down_revision: [b2, c3]
"#;
        let record = parse_revision_str(yaml, "m1.yaml").unwrap();
        assert!(record.is_merge());
        assert!(record.is_noop());
    }

    #[test]
    fn test_reject_unknown_key() {
        let yaml = r#"
revision: a1
downgrades: []
"#;
        let err = parse_revision_str(yaml, "a1.yaml").unwrap_err();
        assert!(err.to_string().contains("a1.yaml"));
    }

    #[test]
    fn test_reject_irreversible_with_downgrade() {
        let yaml = r#"
revision: a1
irreversible: true
downgrade:
  - drop_table: { table: messages }
"#;
        let err = parse_revision_str(yaml, "a1.yaml").unwrap_err();
        assert!(err.to_string().contains("irreversible"));
    }
}
