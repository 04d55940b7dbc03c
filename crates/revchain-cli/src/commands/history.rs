//! History command: every revision in application order, newest last

use revchain_engine::commands::engine_query::{
    apply_engine_query, EngineQuery, EngineQueryResult,
};

use super::{load_ledger, open_existing_database};
use crate::config::Settings;

pub fn execute(settings: &Settings) -> anyhow::Result<()> {
    let ledger = load_ledger(settings)?;
    let conn = open_existing_database(settings)?;

    let EngineQueryResult::History(items) =
        apply_engine_query(EngineQuery::History, &conn, &ledger)?
    else {
        return Ok(());
    };

    for item in items {
        let mark = if item.is_current {
            '>'
        } else if item.applied {
            '*'
        } else {
            ' '
        };
        let parents = if item.down_revisions.is_empty() {
            "<base>".to_string()
        } else {
            item.down_revisions.join(", ")
        };

        let mut tags = Vec::new();
        if item.is_head {
            tags.push("head".to_string());
        }
        if item.is_merge {
            tags.push("merge".to_string());
        }
        if item.irreversible {
            tags.push("irreversible".to_string());
        }
        if let Some(label) = &item.branch_label {
            tags.push(format!("branch: {}", label));
        }
        let tags = if tags.is_empty() {
            String::new()
        } else {
            format!(" [{}]", tags.join(", "))
        };

        println!(
            "{} {} -> {}{} {}",
            mark, parents, item.revision, tags, item.message
        );
    }
    Ok(())
}
