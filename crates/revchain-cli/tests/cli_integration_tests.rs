//! CLI integration tests
//!
//! Drive the built `revchain` binary against a scratch directory holding a
//! `migrations/` folder and a SQLite database.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use rusqlite::Connection;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

const CREATE_MESSAGES: &str = r#"
revision: "1b7e04"
message: "create messages"
upgrade:
  - create_table:
      table: messages
      columns:
        - { name: id, type: integer, primary_key: true }
        - { name: body, type: text, nullable: false, default: "''" }
downgrade:
  - drop_table: { table: messages }
"#;

const ADD_TOOL_METADATA: &str = r#"
revision: "3f2a9c"
down_revision: "1b7e04"
message: "add tool metadata"
upgrade:
  - add_column: { table: messages, column: { name: tool_metadata, type: json } }
downgrade:
  - drop_column: { table: messages, column: tool_metadata }
"#;

const CODE_ONLY: &str = r#"
revision: "9d41c0"
down_revision: "3f2a9c"
message: "code-only change"
"#;

fn setup_project(temp_dir: &TempDir) -> PathBuf {
    let migrations = temp_dir.path().join("migrations");
    fs::create_dir_all(&migrations).unwrap();
    fs::write(migrations.join("001_create_messages.yaml"), CREATE_MESSAGES).unwrap();
    fs::write(migrations.join("002_add_tool_metadata.yaml"), ADD_TOOL_METADATA).unwrap();
    fs::write(migrations.join("003_code_only.yaml"), CODE_ONLY).unwrap();
    temp_dir.path().join("revchain.db")
}

fn revchain(dir: &Path, args: &[&str]) -> Output {
    let cli_bin = env!("CARGO_BIN_EXE_revchain");
    Command::new(cli_bin)
        .current_dir(dir)
        .env_remove("REVCHAIN_DATABASE")
        .env_remove("REVCHAIN_MIGRATIONS")
        .env_remove("REVCHAIN_LOG_FORMAT")
        .env("RUST_LOG", "off")
        .args(args)
        .output()
        .expect("Failed to execute CLI")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn assert_success(output: &Output) {
    assert!(
        output.status.success(),
        "CLI command should succeed. Stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
}

fn create_empty_database(db_path: &Path) {
    Connection::open(db_path).unwrap();
}

fn columns(db_path: &Path, table: &str) -> Vec<String> {
    let conn = Connection::open(db_path).unwrap();
    let mut stmt = conn
        .prepare("SELECT name FROM pragma_table_info(?1) ORDER BY cid")
        .unwrap();
    let names = stmt
        .query_map([table], |row| row.get(0))
        .unwrap()
        .collect::<Result<Vec<String>, _>>()
        .unwrap();
    names
}

#[test]
fn test_cli_upgrade_to_head() {
    // Given: a project with three revisions and no database
    let temp_dir = TempDir::new().unwrap();
    let db_path = setup_project(&temp_dir);

    // When: `revchain upgrade`
    let output = revchain(temp_dir.path(), &["upgrade"]);

    // Then: every revision ran and the schema has the new column
    assert_success(&output);
    let out = stdout(&output);
    assert!(out.contains("<base> -> 9d41c0"), "unexpected output: {out}");
    assert_eq!(columns(&db_path, "messages"), vec!["id", "body", "tool_metadata"]);

    let current = revchain(temp_dir.path(), &["current"]);
    assert_success(&current);
    assert_eq!(stdout(&current).trim(), "9d41c0 (head)");
}

#[test]
fn test_cli_current_on_fresh_database() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = setup_project(&temp_dir);
    create_empty_database(&db_path);

    let output = revchain(temp_dir.path(), &["current"]);

    assert_success(&output);
    assert_eq!(stdout(&output).trim(), "<base>");
}

#[test]
fn test_cli_inspection_does_not_create_missing_database() {
    // Given: a project whose database path is mistyped
    let temp_dir = TempDir::new().unwrap();
    setup_project(&temp_dir);
    let typo = temp_dir.path().join("revchian.db");

    // When: running the read-only commands against it
    for command in ["current", "history", "heads", "check"] {
        let output = revchain(temp_dir.path(), &["--database", "revchian.db", command]);

        // Then: each fails and no database file appears
        assert!(!output.status.success(), "{command} should fail");
        assert!(
            String::from_utf8_lossy(&output.stderr).contains("revchian.db"),
            "{command} should name the database"
        );
        assert!(!typo.exists(), "{command} created {}", typo.display());
    }
}

#[test]
fn test_cli_downgrade_by_prefix() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = setup_project(&temp_dir);
    assert_success(&revchain(temp_dir.path(), &["upgrade"]));

    let output = revchain(temp_dir.path(), &["downgrade", "1b7e"]);

    assert_success(&output);
    assert_eq!(columns(&db_path, "messages"), vec!["id", "body"]);
    let current = revchain(temp_dir.path(), &["current"]);
    assert_eq!(stdout(&current).trim(), "1b7e04");
}

#[test]
fn test_cli_relative_targets() {
    let temp_dir = TempDir::new().unwrap();
    setup_project(&temp_dir);

    assert_success(&revchain(temp_dir.path(), &["upgrade", "+2"]));
    assert_eq!(stdout(&revchain(temp_dir.path(), &["current"])).trim(), "3f2a9c");

    assert_success(&revchain(temp_dir.path(), &["downgrade", "-1"]));
    assert_eq!(stdout(&revchain(temp_dir.path(), &["current"])).trim(), "1b7e04");
}

#[test]
fn test_cli_dry_run_leaves_database_unchanged() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = setup_project(&temp_dir);

    let output = revchain(temp_dir.path(), &["upgrade", "--dry-run"]);

    assert_success(&output);
    let out = stdout(&output);
    assert!(out.contains("Dry run"));
    assert!(out.contains("3f2a9c"));
    assert!(columns(&db_path, "messages").is_empty());
    assert_eq!(stdout(&revchain(temp_dir.path(), &["current"])).trim(), "<base>");
}

#[test]
fn test_cli_history_marks_current() {
    let temp_dir = TempDir::new().unwrap();
    setup_project(&temp_dir);
    assert_success(&revchain(temp_dir.path(), &["upgrade", "3f2a9c"]));

    let output = revchain(temp_dir.path(), &["history"]);

    assert_success(&output);
    let out = stdout(&output);
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("* <base> -> 1b7e04"));
    assert!(lines[1].starts_with("> 1b7e04 -> 3f2a9c"));
    assert!(lines[2].starts_with("  3f2a9c -> 9d41c0 [head]"));
}

#[test]
fn test_cli_show_by_prefix() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = setup_project(&temp_dir);
    create_empty_database(&db_path);

    let output = revchain(temp_dir.path(), &["show", "3f"]);

    assert_success(&output);
    let out = stdout(&output);
    assert!(out.contains("revision: 3f2a9c"));
    assert!(out.contains("down_revision: 1b7e04"));
    assert!(out.contains("applied: false"));
    assert!(out.contains("children: 9d41c0"));
}

#[test]
fn test_cli_heads_with_branch_label() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = setup_project(&temp_dir);
    create_empty_database(&db_path);
    fs::write(
        temp_dir.path().join("migrations/004_audit.yaml"),
        "revision: aa01\ndown_revision: 1b7e04\nbranch_label: audit\n",
    )
    .unwrap();

    let output = revchain(temp_dir.path(), &["heads"]);

    assert_success(&output);
    let out = stdout(&output);
    assert!(out.contains("9d41c0"));
    assert!(out.contains("aa01 (audit@head)"));

    // Two heads: plain `head` is ambiguous, the label is not
    assert!(!revchain(temp_dir.path(), &["upgrade"]).status.success());
    assert_success(&revchain(temp_dir.path(), &["upgrade", "audit@head"]));
    assert_eq!(stdout(&revchain(temp_dir.path(), &["current"])).trim(), "aa01 (head)");
}

#[test]
fn test_cli_check_clean() {
    let temp_dir = TempDir::new().unwrap();
    setup_project(&temp_dir);
    assert_success(&revchain(temp_dir.path(), &["upgrade"]));

    let output = revchain(temp_dir.path(), &["check"]);

    assert_success(&output);
    assert!(stdout(&output).contains("OK"));
}

#[test]
fn test_cli_check_fails_on_edited_revision() {
    // Given: an applied revision whose file is edited afterwards
    let temp_dir = TempDir::new().unwrap();
    setup_project(&temp_dir);
    assert_success(&revchain(temp_dir.path(), &["upgrade"]));
    fs::write(
        temp_dir.path().join("migrations/002_add_tool_metadata.yaml"),
        ADD_TOOL_METADATA.replace("add tool metadata", "add tool metadata (edited)"),
    )
    .unwrap();

    // When: running check
    let output = revchain(temp_dir.path(), &["check"]);

    // Then: the mismatch is reported and the exit status is non-zero
    assert!(!output.status.success());
    assert!(stdout(&output).contains("checksum mismatch: 3f2a9c"));

    // And: walks refuse to run
    let downgrade = revchain(temp_dir.path(), &["downgrade", "base"]);
    assert!(!downgrade.status.success());
}

#[test]
fn test_cli_check_fails_on_missing_downgrade() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = setup_project(&temp_dir);
    create_empty_database(&db_path);
    fs::write(
        temp_dir.path().join("migrations/002_add_tool_metadata.yaml"),
        "revision: \"3f2a9c\"\ndown_revision: \"1b7e04\"\nupgrade:\n  - add_column: { table: messages, column: { name: tool_metadata, type: json } }\n",
    )
    .unwrap();

    let output = revchain(temp_dir.path(), &["check"]);

    assert!(!output.status.success());
    assert!(stdout(&output).contains("not reversible: 3f2a9c"));
}

#[test]
fn test_cli_cycle_rejected_before_any_step() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = setup_project(&temp_dir);
    fs::write(
        temp_dir.path().join("migrations/001_create_messages.yaml"),
        CREATE_MESSAGES.replace("message:", "down_revision: \"9d41c0\"\nmessage:"),
    )
    .unwrap();

    let output = revchain(temp_dir.path(), &["upgrade"]);

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Cycle"));
    assert!(!db_path.exists() || columns(&db_path, "messages").is_empty());
}

#[test]
fn test_cli_config_file_and_flag_precedence() {
    // Given: a config file pointing at a non-default database
    let temp_dir = TempDir::new().unwrap();
    setup_project(&temp_dir);
    fs::write(
        temp_dir.path().join("revchain.toml"),
        "database = \"from_config.db\"\n",
    )
    .unwrap();

    // When: upgrading without flags, then with a --database flag
    assert_success(&revchain(temp_dir.path(), &["upgrade", "1b7e04"]));
    assert_success(&revchain(
        temp_dir.path(),
        &["--database", "from_flag.db", "upgrade"],
    ));

    // Then: each walk went to the database its source selected
    assert_eq!(
        columns(&temp_dir.path().join("from_config.db"), "messages"),
        vec!["id", "body"]
    );
    assert_eq!(
        columns(&temp_dir.path().join("from_flag.db"), "messages"),
        vec!["id", "body", "tool_metadata"]
    );
    assert!(!temp_dir.path().join("revchain.db").exists());
}

#[test]
fn test_cli_environment_selects_database() {
    let temp_dir = TempDir::new().unwrap();
    setup_project(&temp_dir);

    let output = Command::new(env!("CARGO_BIN_EXE_revchain"))
        .current_dir(temp_dir.path())
        .env("REVCHAIN_DATABASE", "from_env.db")
        .env("RUST_LOG", "off")
        .args(["upgrade"])
        .output()
        .expect("Failed to execute CLI");

    assert_success(&output);
    assert!(temp_dir.path().join("from_env.db").exists());
}
