//! Check command: chain, reversibility and stored checksums
//!
//! Exits non-zero when any problem is found.

use anyhow::bail;
use revchain_engine::commands::engine_query::{
    apply_engine_query, EngineQuery, EngineQueryResult,
};

use super::{load_ledger, open_existing_database, revision_label};
use crate::config::Settings;

pub fn execute(settings: &Settings) -> anyhow::Result<()> {
    // Chain integrity errors surface here, before anything else is checked
    let ledger = load_ledger(settings)?;
    let conn = open_existing_database(settings)?;

    let EngineQueryResult::Check(report) = apply_engine_query(EngineQuery::Check, &conn, &ledger)?
    else {
        return Ok(());
    };

    println!(
        "{} records, heads: {}, current: {}",
        report.records,
        report.heads.join(", "),
        revision_label(report.current.as_deref())
    );

    if report.unknown_current {
        println!(
            "current revision {} is not in the chain",
            revision_label(report.current.as_deref())
        );
    }
    for issue in &report.reversibility {
        println!("not reversible: {}", issue);
    }
    for problem in &report.checksums {
        println!(
            "checksum mismatch: {} (recorded {}, now {})",
            problem.revision, problem.recorded, problem.current
        );
    }

    if !report.is_clean() {
        bail!(
            "check failed: {} problem(s)",
            report.reversibility.len() + report.checksums.len() + usize::from(report.unknown_current)
        );
    }
    println!("OK");
    Ok(())
}
