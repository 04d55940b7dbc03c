//! Show command
//!
//! Usage: revchain show REVISION

use clap::Args;
use revchain_engine::commands::engine_query::{
    apply_engine_query, EngineQuery, EngineQueryResult,
};

use super::{load_ledger, open_existing_database};
use crate::config::Settings;

#[derive(Debug, Args)]
pub struct ShowArgs {
    /// Full revision id or a unique prefix
    pub revision: String,
}

pub fn execute(args: ShowArgs, settings: &Settings) -> anyhow::Result<()> {
    let ledger = load_ledger(settings)?;
    let conn = open_existing_database(settings)?;

    let query = EngineQuery::Show {
        revision: args.revision,
    };
    let EngineQueryResult::Show(show) = apply_engine_query(query, &conn, &ledger)? else {
        return Ok(());
    };
    let record = &show.record;

    println!("revision: {}", record.revision);
    if record.down_revisions.is_empty() {
        println!("down_revision: <base>");
    } else {
        println!("down_revision: {}", record.down_revisions.join(", "));
    }
    if let Some(label) = &record.branch_label {
        println!("branch_label: {}", label);
    }
    println!("message: {}", record.message);
    println!("checksum: {}", show.checksum);
    println!("applied: {}", show.applied);
    if record.irreversible {
        println!("irreversible: true");
    }
    if !show.children.is_empty() {
        println!("children: {}", show.children.join(", "));
    }

    println!("upgrade:");
    for (i, op) in record.upgrade_steps.iter().enumerate() {
        println!("  {}. {}", i, op);
    }
    println!("downgrade:");
    for (i, op) in record.downgrade_steps.iter().enumerate() {
        println!("  {}. {}", i, op);
    }

    for row in &show.history {
        println!(
            "history: {} at {} (run {})",
            row.direction, row.applied_at, row.run_id
        );
    }
    Ok(())
}
