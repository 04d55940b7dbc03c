//! Render schema operations as SQLite DDL
//!
//! Every operation maps onto native `CREATE`/`DROP`/`ALTER TABLE` statements
//! except `alter_column_type`, which SQLite cannot express: the table is
//! rebuilt under a scratch name, copied, and renamed back. Indexes and
//! triggers on a rebuilt table are not carried over.

use revchain_core::{ColumnDef, SchemaOp, SchemaState};

const REBUILD_TABLE: &str = "__revchain_rebuild";

/// Quote an identifier for SQLite
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn column_sql(column: &ColumnDef) -> String {
    let mut sql = format!("{} {}", quote_ident(&column.name), column.column_type.sql_name());
    if !column.nullable {
        sql.push_str(" NOT NULL");
    }
    if let Some(default) = &column.default {
        sql.push_str(" DEFAULT ");
        sql.push_str(default);
    }
    sql
}

fn create_table_sql(table: &str, columns: &[ColumnDef]) -> String {
    let mut parts: Vec<String> = columns.iter().map(column_sql).collect();
    let keys: Vec<String> = columns
        .iter()
        .filter(|c| c.primary_key)
        .map(|c| quote_ident(&c.name))
        .collect();
    if !keys.is_empty() {
        parts.push(format!("PRIMARY KEY ({})", keys.join(", ")));
    }
    format!("CREATE TABLE {} ({})", quote_ident(table), parts.join(", "))
}

/// Statements for one operation, given the schema it applies to
///
/// `schema` is the state before `op`, which the caller has already checked
/// against it; it is only consulted for table rebuilds.
pub fn render(op: &SchemaOp, schema: &SchemaState) -> Vec<String> {
    match op {
        SchemaOp::CreateTable { table, columns } => vec![create_table_sql(table, columns)],

        SchemaOp::DropTable { table } => vec![format!("DROP TABLE {}", quote_ident(table))],

        SchemaOp::RenameTable { from, to } => vec![format!(
            "ALTER TABLE {} RENAME TO {}",
            quote_ident(from),
            quote_ident(to)
        )],

        SchemaOp::AddColumn { table, column } => vec![format!(
            "ALTER TABLE {} ADD COLUMN {}",
            quote_ident(table),
            column_sql(column)
        )],

        SchemaOp::DropColumn { table, column } => vec![format!(
            "ALTER TABLE {} DROP COLUMN {}",
            quote_ident(table),
            quote_ident(column)
        )],

        SchemaOp::RenameColumn { table, from, to } => vec![format!(
            "ALTER TABLE {} RENAME COLUMN {} TO {}",
            quote_ident(table),
            quote_ident(from),
            quote_ident(to)
        )],

        SchemaOp::AlterColumnType {
            table,
            column,
            new_type,
        } => {
            let columns: Vec<ColumnDef> = schema
                .columns(table)
                .unwrap_or_default()
                .iter()
                .cloned()
                .map(|mut c| {
                    if &c.name == column {
                        c.column_type = *new_type;
                    }
                    c
                })
                .collect();
            let names = columns
                .iter()
                .map(|c| quote_ident(&c.name))
                .collect::<Vec<_>>()
                .join(", ");

            vec![
                create_table_sql(REBUILD_TABLE, &columns),
                format!(
                    "INSERT INTO {} ({}) SELECT {} FROM {}",
                    quote_ident(REBUILD_TABLE),
                    names,
                    names,
                    quote_ident(table)
                ),
                format!("DROP TABLE {}", quote_ident(table)),
                format!(
                    "ALTER TABLE {} RENAME TO {}",
                    quote_ident(REBUILD_TABLE),
                    quote_ident(table)
                ),
            ]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use revchain_core::ColumnType;

    #[test]
    fn test_create_table_with_primary_key() {
        let sql = render(
            &SchemaOp::CreateTable {
                table: "messages".to_string(),
                columns: vec![
                    ColumnDef::new("id", ColumnType::Integer).primary_key(),
                    ColumnDef::new("status", ColumnType::Text)
                        .not_null()
                        .with_default("'pending'"),
                ],
            },
            &SchemaState::new(),
        );

        assert_eq!(
            sql,
            vec![
                "CREATE TABLE \"messages\" (\"id\" INTEGER NOT NULL, \"status\" TEXT NOT NULL DEFAULT 'pending', PRIMARY KEY (\"id\"))"
            ]
        );
    }

    #[test]
    fn test_add_nullable_column() {
        let sql = render(
            &SchemaOp::AddColumn {
                table: "messages".to_string(),
                column: ColumnDef::new("tool_metadata", ColumnType::Json),
            },
            &SchemaState::new(),
        );
        assert_eq!(
            sql,
            vec!["ALTER TABLE \"messages\" ADD COLUMN \"tool_metadata\" JSON"]
        );
    }

    #[test]
    fn test_alter_type_rebuilds_table() {
        let mut schema = SchemaState::new();
        schema.insert_table(
            "messages",
            vec![
                ColumnDef::new("id", ColumnType::Integer).primary_key(),
                ColumnDef::new("score", ColumnType::Integer),
            ],
        );

        let sql = render(
            &SchemaOp::AlterColumnType {
                table: "messages".to_string(),
                column: "score".to_string(),
                new_type: ColumnType::Real,
            },
            &schema,
        );

        assert_eq!(sql.len(), 4);
        assert!(sql[0].contains("\"score\" REAL"));
        assert!(sql[1].starts_with("INSERT INTO \"__revchain_rebuild\""));
        assert_eq!(sql[3], "ALTER TABLE \"__revchain_rebuild\" RENAME TO \"messages\"");
    }

    #[test]
    fn test_identifiers_are_quoted() {
        assert_eq!(quote_ident("odd\"name"), "\"odd\"\"name\"");
    }
}
