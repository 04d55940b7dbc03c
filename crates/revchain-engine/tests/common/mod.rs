use revchain_core::Ledger;
use revchain_engine::commands::load_ledger;
use rusqlite::Connection;
use std::fs;
use tempfile::TempDir;

/// Revisions: create messages -> add tool_metadata -> no-op
pub const REVISIONS: [(&str, &str); 3] = [
    (
        "001_create_messages.yaml",
        r#"
revision: "1b7e04"
message: "create messages"
upgrade:
  - create_table:
      table: messages
      columns:
        - { name: id, type: integer, primary_key: true }
downgrade:
  - drop_table: { table: messages }
"#,
    ),
    (
        "002_add_tool_metadata.yaml",
        r#"
revision: "3f2a9c"
down_revision: "1b7e04"
message: "add tool metadata"
upgrade:
  - add_column: { table: messages, column: { name: tool_metadata, type: json } }
downgrade:
  - drop_column: { table: messages, column: tool_metadata }
"#,
    ),
    (
        "003_code_only.yaml",
        r#"
revision: "9d41c0"
down_revision: "3f2a9c"
message: "code-only change"
"#,
    ),
];

/// Temp dir holding `revisions/` and `test.db`, kept alive with the connection
pub struct Workspace {
    _dir: TempDir,
    pub conn: Connection,
    pub ledger: Ledger,
}

#[allow(dead_code)]
pub fn setup() -> Workspace {
    setup_with(&REVISIONS)
}

#[allow(dead_code)]
pub fn setup_with(revisions: &[(&str, &str)]) -> Workspace {
    let dir = TempDir::new().unwrap();
    let revisions_dir = dir.path().join("revisions");
    fs::create_dir(&revisions_dir).unwrap();
    for (name, content) in revisions {
        fs::write(revisions_dir.join(name), content).unwrap();
    }
    let conn = revchain_store::db::open(dir.path().join("test.db")).unwrap();
    let ledger = load_ledger(&revisions_dir).unwrap();
    Workspace {
        _dir: dir,
        conn,
        ledger,
    }
}
