use serde::{Deserialize, Serialize};

use super::column::{ColumnDef, ColumnType};

/// A single schema operation
///
/// Serialized externally tagged, so a revision file reads as
/// `- add_column: { table: messages, column: { name: x, type: text } }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaOp {
    CreateTable {
        table: String,
        columns: Vec<ColumnDef>,
    },
    DropTable {
        table: String,
    },
    RenameTable {
        from: String,
        to: String,
    },
    AddColumn {
        table: String,
        column: ColumnDef,
    },
    DropColumn {
        table: String,
        column: String,
    },
    AlterColumnType {
        table: String,
        column: String,
        new_type: ColumnType,
    },
    RenameColumn {
        table: String,
        from: String,
        to: String,
    },
}

impl SchemaOp {
    /// Stable name of the operation, as used in revision files
    pub fn kind(&self) -> &'static str {
        match self {
            SchemaOp::CreateTable { .. } => "create_table",
            SchemaOp::DropTable { .. } => "drop_table",
            SchemaOp::RenameTable { .. } => "rename_table",
            SchemaOp::AddColumn { .. } => "add_column",
            SchemaOp::DropColumn { .. } => "drop_column",
            SchemaOp::AlterColumnType { .. } => "alter_column_type",
            SchemaOp::RenameColumn { .. } => "rename_column",
        }
    }

    /// Table the operation acts on (the source table for renames)
    pub fn table(&self) -> &str {
        match self {
            SchemaOp::CreateTable { table, .. }
            | SchemaOp::DropTable { table }
            | SchemaOp::AddColumn { table, .. }
            | SchemaOp::DropColumn { table, .. }
            | SchemaOp::AlterColumnType { table, .. }
            | SchemaOp::RenameColumn { table, .. } => table,
            SchemaOp::RenameTable { from, .. } => from,
        }
    }
}

impl std::fmt::Display for SchemaOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SchemaOp::CreateTable { table, columns } => {
                write!(f, "create table {} ({} columns)", table, columns.len())
            }
            SchemaOp::DropTable { table } => write!(f, "drop table {}", table),
            SchemaOp::RenameTable { from, to } => write!(f, "rename table {} to {}", from, to),
            SchemaOp::AddColumn { table, column } => write!(
                f,
                "add column {}.{} {}",
                table, column.name, column.column_type
            ),
            SchemaOp::DropColumn { table, column } => {
                write!(f, "drop column {}.{}", table, column)
            }
            SchemaOp::AlterColumnType {
                table,
                column,
                new_type,
            } => write!(f, "alter column {}.{} type {}", table, column, new_type),
            SchemaOp::RenameColumn { table, from, to } => {
                write!(f, "rename column {}.{} to {}", table, from, to)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_externally_tagged_shape() {
        let op = SchemaOp::DropColumn {
            table: "messages".to_string(),
            column: "tool_metadata".to_string(),
        };
        let json = serde_json::to_value(&op).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"drop_column": {"table": "messages", "column": "tool_metadata"}})
        );
    }

    #[test]
    fn test_display_describes_step() {
        let op = SchemaOp::AddColumn {
            table: "messages".to_string(),
            column: ColumnDef::new("tool_metadata", ColumnType::Json),
        };
        assert_eq!(op.to_string(), "add column messages.tool_metadata JSON");
        assert_eq!(op.kind(), "add_column");
        assert_eq!(op.table(), "messages");
    }
}
