//! Current revision command

use revchain_engine::commands::engine_query::{
    apply_engine_query, EngineQuery, EngineQueryResult,
};

use super::{load_ledger, open_existing_database, revision_label};
use crate::config::Settings;

pub fn execute(settings: &Settings) -> anyhow::Result<()> {
    let ledger = load_ledger(settings)?;
    let conn = open_existing_database(settings)?;

    if let EngineQueryResult::Current(current) =
        apply_engine_query(EngineQuery::Current, &conn, &ledger)?
    {
        let suffix = if current.is_head && current.revision.is_some() {
            " (head)"
        } else {
            ""
        };
        println!("{}{}", revision_label(current.revision.as_deref()), suffix);
    }
    Ok(())
}
