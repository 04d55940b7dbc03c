//! Engine-level commands that walk the live schema.

use revchain_core::{
    Direction, InMemoryBackend, Ledger, MigrationBackend, MigrationPlan, MigrationReport,
    SchemaState, Target,
};
use revchain_store::errors::Result;
use revchain_store::SqliteBackend;
use rusqlite::Connection;
use serde::Serialize;

/// Engine-level commands that require database access.
#[derive(Debug, Clone)]
pub enum EngineCommand {
    /// Apply records forward to `target`.
    Upgrade { target: Target, dry_run: bool },
    /// Undo records back to `target`.
    Downgrade { target: Target, dry_run: bool },
}

/// Outcome of a dry run: what would be applied and the schema it would leave.
#[derive(Debug, Clone, Serialize)]
pub struct DryRunResult {
    pub plan: MigrationPlan,
    pub report: MigrationReport,
    pub schema_after: SchemaState,
}

/// Result of applying an engine command.
#[derive(Debug, Clone)]
pub enum EngineCommandResult {
    /// The walk ran and committed.
    Migrated(MigrationReport),
    /// The walk was replayed on a copy of the schema; the database is unchanged.
    DryRun(DryRunResult),
}

/// Apply an engine command against a database.
pub fn apply_engine_command(
    cmd: EngineCommand,
    conn: &mut Connection,
    ledger: &Ledger,
) -> Result<EngineCommandResult> {
    let (direction, target, dry_run) = match cmd {
        EngineCommand::Upgrade { target, dry_run } => (Direction::Upgrade, target, dry_run),
        EngineCommand::Downgrade { target, dry_run } => (Direction::Downgrade, target, dry_run),
    };

    let mut backend = SqliteBackend::new(conn);
    if dry_run {
        let result = dry_run_walk(ledger, &mut backend, direction, &target)?;
        return Ok(EngineCommandResult::DryRun(result));
    }

    let report = walk(ledger, &mut backend, direction, &target)?;
    Ok(EngineCommandResult::Migrated(report))
}

fn walk<B: MigrationBackend + ?Sized>(
    ledger: &Ledger,
    backend: &mut B,
    direction: Direction,
    target: &Target,
) -> Result<MigrationReport> {
    match direction {
        Direction::Upgrade => ledger.upgrade(backend, target),
        Direction::Downgrade => ledger.downgrade(backend, target),
    }
}

/// Replay the walk on an in-memory copy of the live schema
///
/// Checksums and the plan are checked against the database first, so a dry
/// run fails for the same reasons the real walk would.
fn dry_run_walk(
    ledger: &Ledger,
    live: &mut SqliteBackend<'_>,
    direction: Direction,
    target: &Target,
) -> Result<DryRunResult> {
    ledger.verify_checksums(live)?;
    let plan = ledger.plan(live, direction, target)?;

    let mut scratch = InMemoryBackend::with_state(live.schema()?, live.current_revision()?);
    let report = walk(ledger, &mut scratch, direction, target)?;

    tracing::info!(
        direction = %direction,
        plan_len = plan.len(),
        "dry run complete; database unchanged"
    );

    Ok(DryRunResult {
        plan,
        report,
        schema_after: scratch.schema().clone(),
    })
}
