use revchain_core::{ColumnDef, ColumnType, MigrationRecord, SchemaOp};

/// The three-record chain used across tests:
/// A creates `messages`, B adds `tool_metadata`, C is a no-op
#[allow(dead_code)]
pub fn messages_chain() -> Vec<MigrationRecord> {
    vec![
        MigrationRecord::new("a1")
            .with_message("create messages")
            .with_upgrade(SchemaOp::CreateTable {
                table: "messages".to_string(),
                columns: vec![
                    ColumnDef::new("id", ColumnType::Integer).primary_key(),
                    ColumnDef::new("body", ColumnType::Text).not_null(),
                ],
            })
            .with_downgrade(SchemaOp::DropTable {
                table: "messages".to_string(),
            }),
        MigrationRecord::new("b2")
            .with_down_revision("a1")
            .with_message("add tool metadata")
            .with_upgrade(add_tool_metadata())
            .with_downgrade(SchemaOp::DropColumn {
                table: "messages".to_string(),
                column: "tool_metadata".to_string(),
            }),
        MigrationRecord::new("c3")
            .with_down_revision("b2")
            .with_message("placeholder"),
    ]
}

#[allow(dead_code)]
pub fn add_tool_metadata() -> SchemaOp {
    SchemaOp::AddColumn {
        table: "messages".to_string(),
        column: ColumnDef::new("tool_metadata", ColumnType::Json),
    }
}
