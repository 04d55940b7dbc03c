//! Heads command

use revchain_engine::commands::engine_query::{
    apply_engine_query, EngineQuery, EngineQueryResult,
};

use super::{load_ledger, open_existing_database};
use crate::config::Settings;

pub fn execute(settings: &Settings) -> anyhow::Result<()> {
    let ledger = load_ledger(settings)?;
    let conn = open_existing_database(settings)?;

    if let EngineQueryResult::Heads(heads) = apply_engine_query(EngineQuery::Heads, &conn, &ledger)?
    {
        for head in heads {
            match head.branch_label {
                Some(label) => println!("{} ({}@head)", head.revision, label),
                None => println!("{}", head.revision),
            }
        }
    }
    Ok(())
}
