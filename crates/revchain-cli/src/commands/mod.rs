pub mod check;
pub mod current;
pub mod downgrade;
pub mod heads;
pub mod history;
pub mod show;
pub mod upgrade;

use anyhow::Context;
use revchain_core::Ledger;
use revchain_engine::commands::engine_command::{
    apply_engine_command, EngineCommand, EngineCommandResult,
};
use rusqlite::Connection;

use crate::config::Settings;

/// Open the database for a migration, creating the file on first use
pub(crate) fn open_database(settings: &Settings) -> anyhow::Result<Connection> {
    revchain_store::db::open(&settings.database)
        .with_context(|| format!("opening database {}", settings.database.display()))
}

/// Open the database for inspection; a missing file is an error
pub(crate) fn open_existing_database(settings: &Settings) -> anyhow::Result<Connection> {
    revchain_store::db::open_existing(&settings.database)
        .with_context(|| format!("opening database {}", settings.database.display()))
}

pub(crate) fn load_ledger(settings: &Settings) -> anyhow::Result<Ledger> {
    revchain_engine::commands::load_ledger(&settings.migrations)
        .with_context(|| format!("loading revisions from {}", settings.migrations.display()))
}

pub(crate) fn revision_label(revision: Option<&str>) -> &str {
    revision.unwrap_or("<base>")
}

/// Run an upgrade or downgrade command and print what it did
pub(crate) fn migrate(settings: &Settings, cmd: EngineCommand) -> anyhow::Result<()> {
    let ledger = load_ledger(settings)?;
    let mut conn = open_database(settings)?;

    match apply_engine_command(cmd, &mut conn, &ledger)? {
        EngineCommandResult::Migrated(report) => {
            if report.is_noop() {
                println!("Already at {}", revision_label(report.to.as_deref()));
                return Ok(());
            }
            println!(
                "{} {} -> {} ({} records, {} ms)",
                report.direction,
                revision_label(report.from.as_deref()),
                revision_label(report.to.as_deref()),
                report.applied.len(),
                report.duration_ms
            );
            for revision in &report.applied {
                println!("  {}", revision);
            }
        }
        EngineCommandResult::DryRun(result) => {
            println!(
                "Dry run ({}): {} -> {}",
                result.plan.direction,
                revision_label(result.plan.from.as_deref()),
                revision_label(result.plan.to.as_deref())
            );
            for planned in &result.plan.records {
                println!(
                    "  {} ({} steps, marker -> {})",
                    planned.revision,
                    planned.step_count,
                    revision_label(planned.marker_after.as_deref())
                );
            }
            println!("Database unchanged.");
        }
    }
    Ok(())
}
