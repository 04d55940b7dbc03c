//! Command orchestration layer.

pub mod engine_command;
pub mod engine_query;

use revchain_core::Ledger;
use revchain_store::errors::Result;
use std::path::Path;

/// Load a revisions directory and build its chain
pub fn load_ledger(dir: &Path) -> Result<Ledger> {
    let records = revchain_store::load_revisions_dir(dir)?;
    Ledger::from_records(records)
}
