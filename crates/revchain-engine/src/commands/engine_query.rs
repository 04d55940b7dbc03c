//! Engine-level read-only query surface.
//!
//! `apply_engine_query` is the single entry point for all read-only queries
//! that span the store and core layers. Unlike `apply_engine_command`, it
//! accepts a shared connection and never writes to the database; an
//! untouched database reads as base.

use std::time::Instant;

use revchain_core::{
    log_op_end, log_op_error, log_op_start, verify_reversibility, Ledger, LedgerError,
    MigrationRecord, ReversibilityIssue,
};
use revchain_store::bookkeeping::{applied_checksums, read_history, read_marker, HistoryRow};
use revchain_store::errors::Result;
use rusqlite::Connection;
use serde::Serialize;

/// Read-only queries supported by the engine.
#[derive(Debug, Clone)]
pub enum EngineQuery {
    /// The revision the database is at.
    Current,
    /// Every record in linear order with its applied state.
    History,
    /// Records nothing builds on yet.
    Heads,
    /// One record by revision id or unique prefix.
    Show { revision: String },
    /// Chain, reversibility and checksum health.
    Check,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CurrentResult {
    pub revision: Option<String>,
    pub is_head: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryItem {
    pub revision: String,
    pub down_revisions: Vec<String>,
    pub branch_label: Option<String>,
    pub message: String,
    pub applied: bool,
    pub is_current: bool,
    pub is_head: bool,
    pub is_merge: bool,
    pub irreversible: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeadItem {
    pub revision: String,
    /// Label of the nearest labelled record on the head's line, if any
    pub branch_label: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShowResult {
    pub record: MigrationRecord,
    pub checksum: String,
    pub applied: bool,
    pub children: Vec<String>,
    /// History rows for this revision, oldest first
    pub history: Vec<HistoryRow>,
}

/// A record whose stored checksum no longer matches its definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChecksumProblem {
    pub revision: String,
    pub recorded: String,
    pub current: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckReport {
    pub records: usize,
    pub heads: Vec<String>,
    pub current: Option<String>,
    /// The marker names a revision missing from the chain
    pub unknown_current: bool,
    pub reversibility: Vec<ReversibilityIssue>,
    pub checksums: Vec<ChecksumProblem>,
}

impl CheckReport {
    pub fn is_clean(&self) -> bool {
        !self.unknown_current && self.reversibility.is_empty() && self.checksums.is_empty()
    }
}

/// Result of an engine query.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", content = "result", rename_all = "snake_case")]
pub enum EngineQueryResult {
    Current(CurrentResult),
    History(Vec<HistoryItem>),
    Heads(Vec<HeadItem>),
    Show(Box<ShowResult>),
    Check(CheckReport),
}

/// Apply a read-only engine query.
pub fn apply_engine_query(
    query: EngineQuery,
    conn: &Connection,
    ledger: &Ledger,
) -> Result<EngineQueryResult> {
    let start = Instant::now();
    let op = query_op(&query);
    log_op_start!(op);

    let result = match query {
        EngineQuery::Current => current(conn, ledger).map(EngineQueryResult::Current),
        EngineQuery::History => history(conn, ledger).map(EngineQueryResult::History),
        EngineQuery::Heads => Ok(EngineQueryResult::Heads(heads(ledger))),
        EngineQuery::Show { revision } => {
            show(conn, ledger, &revision).map(|r| EngineQueryResult::Show(Box::new(r)))
        }
        EngineQuery::Check => check(conn, ledger).map(EngineQueryResult::Check),
    };

    let duration_ms = start.elapsed().as_millis() as u64;
    match &result {
        Ok(_) => {
            log_op_end!(op, duration_ms = duration_ms);
        }
        Err(err) => {
            log_op_error!(op, err.clone(), duration_ms = duration_ms);
        }
    }
    result
}

fn query_op(query: &EngineQuery) -> &'static str {
    match query {
        EngineQuery::Current => "query_current",
        EngineQuery::History => "query_history",
        EngineQuery::Heads => "query_heads",
        EngineQuery::Show { .. } => "query_show",
        EngineQuery::Check => "query_check",
    }
}

fn current(conn: &Connection, ledger: &Ledger) -> Result<CurrentResult> {
    let revision = read_marker(conn)?;
    let chain = ledger.chain();
    if let Some(rev) = &revision {
        chain.record(rev)?;
    }
    let is_head = match &revision {
        Some(rev) => chain.heads().iter().any(|h| &h.revision == rev),
        None => chain.is_empty(),
    };
    Ok(CurrentResult { revision, is_head })
}

/// Number of records applied, as a position in the linear order
fn applied_len(ledger: &Ledger, marker: Option<&str>) -> Result<usize> {
    match marker {
        None => Ok(0),
        Some(rev) => ledger
            .chain()
            .position(rev)
            .map(|p| p + 1)
            .ok_or_else(|| LedgerError::RevisionNotFound {
                revision: rev.to_string(),
            }),
    }
}

fn history(conn: &Connection, ledger: &Ledger) -> Result<Vec<HistoryItem>> {
    let marker = read_marker(conn)?;
    let applied = applied_len(ledger, marker.as_deref())?;
    let chain = ledger.chain();

    Ok(chain
        .history()
        .enumerate()
        .map(|(pos, record)| HistoryItem {
            revision: record.revision.clone(),
            down_revisions: record.down_revisions.clone(),
            branch_label: record.branch_label.clone(),
            message: record.message.clone(),
            applied: pos < applied,
            is_current: pos + 1 == applied,
            is_head: chain.children_of(&record.revision).is_empty(),
            is_merge: record.is_merge(),
            irreversible: record.irreversible,
        })
        .collect())
}

fn heads(ledger: &Ledger) -> Vec<HeadItem> {
    let chain = ledger.chain();
    chain
        .heads()
        .into_iter()
        .map(|head| {
            let branch_label = head.branch_label.clone().or_else(|| {
                chain.ancestors(&head.revision).ok().and_then(|ancestors| {
                    ancestors
                        .iter()
                        .rev()
                        .find_map(|a| a.branch_label.clone())
                })
            });
            HeadItem {
                revision: head.revision.clone(),
                branch_label,
            }
        })
        .collect()
}

fn show(conn: &Connection, ledger: &Ledger, revision: &str) -> Result<ShowResult> {
    let chain = ledger.chain();
    let record = chain.resolve_prefix(revision)?;
    let marker = read_marker(conn)?;
    let applied_count = applied_len(ledger, marker.as_deref())?;
    let applied = chain
        .position(&record.revision)
        .is_some_and(|p| p < applied_count);

    let history = read_history(conn)?
        .into_iter()
        .filter(|row| row.revision == record.revision)
        .collect();

    Ok(ShowResult {
        record: record.clone(),
        checksum: record.checksum()?,
        applied,
        children: chain
            .children_of(&record.revision)
            .iter()
            .map(|c| c.revision.clone())
            .collect(),
        history,
    })
}

fn check(conn: &Connection, ledger: &Ledger) -> Result<CheckReport> {
    let chain = ledger.chain();
    let current = read_marker(conn)?;
    let unknown_current = current.as_deref().is_some_and(|rev| chain.get(rev).is_none());

    let mut checksums = Vec::new();
    for recorded in applied_checksums(conn)? {
        let Some(record) = chain.get(&recorded.revision) else {
            continue;
        };
        let now = record.checksum()?;
        if now != recorded.checksum {
            checksums.push(ChecksumProblem {
                revision: recorded.revision,
                recorded: recorded.checksum,
                current: now,
            });
        }
    }

    let report = CheckReport {
        records: chain.len(),
        heads: chain.heads().iter().map(|h| h.revision.clone()).collect(),
        current,
        unknown_current,
        reversibility: verify_reversibility(chain),
        checksums,
    };

    if !report.is_clean() {
        tracing::warn!(
            reversibility = report.reversibility.len(),
            checksums = report.checksums.len(),
            unknown_current = report.unknown_current,
            "check found problems"
        );
    }
    Ok(report)
}
