use std::collections::{BTreeSet, HashMap};

use crate::errors::ChainIntegrityError;

/// Words with a meaning in target expressions, so never valid revision ids
pub const RESERVED_REVISIONS: &[&str] = &["head", "heads", "base"];

/// Check that a revision id can be used unambiguously in target expressions
pub fn validate_revision_id(revision: &str) -> Result<(), ChainIntegrityError> {
    let reason = if revision.is_empty() {
        Some("must not be empty")
    } else if revision.chars().any(char::is_whitespace) {
        Some("must not contain whitespace")
    } else if revision.contains('@') {
        Some("must not contain '@'")
    } else if revision.starts_with('+') || revision.starts_with('-') {
        Some("must not start with '+' or '-'")
    } else if RESERVED_REVISIONS.contains(&revision) {
        Some("is a reserved word")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(ChainIntegrityError::InvalidRevisionId {
            revision: revision.to_string(),
            reason: reason.to_string(),
        }),
        None => Ok(()),
    }
}

/// Kahn's algorithm over record indices
///
/// Ready records are taken lowest index first, so ties fall back to authoring
/// order and the result is deterministic. On failure returns the indices that
/// could not be ordered; every one of them sits on or behind a cycle.
pub fn topological_order(
    parents: &[Vec<usize>],
    children: &[Vec<usize>],
) -> Result<Vec<usize>, Vec<usize>> {
    let mut pending: Vec<usize> = parents.iter().map(Vec::len).collect();
    let mut ready: BTreeSet<usize> = pending
        .iter()
        .enumerate()
        .filter(|(_, n)| **n == 0)
        .map(|(i, _)| i)
        .collect();

    let mut order = Vec::with_capacity(parents.len());
    while let Some(next) = ready.pop_first() {
        order.push(next);
        for &child in &children[next] {
            pending[child] -= 1;
            if pending[child] == 0 {
                ready.insert(child);
            }
        }
    }

    if order.len() == parents.len() {
        Ok(order)
    } else {
        Err(pending
            .iter()
            .enumerate()
            .filter(|(_, n)| **n > 0)
            .map(|(i, _)| i)
            .collect())
    }
}

/// Extract one cycle from the records left over by `topological_order`
///
/// Each leftover record still has a leftover parent, so following parents
/// from any of them must revisit a record. The returned path starts and ends
/// on the same index.
pub fn find_cycle(parents: &[Vec<usize>], leftover: &[usize]) -> Vec<usize> {
    let Some(&start) = leftover.first() else {
        return Vec::new();
    };
    let leftover: BTreeSet<usize> = leftover.iter().copied().collect();

    let mut path = Vec::new();
    let mut seen_at: HashMap<usize, usize> = HashMap::new();
    let mut current = start;

    loop {
        if let Some(&at) = seen_at.get(&current) {
            let mut cycle = path[at..].to_vec();
            cycle.push(current);
            return cycle;
        }
        seen_at.insert(current, path.len());
        path.push(current);

        match parents[current].iter().find(|p| leftover.contains(p)) {
            Some(&parent) => current = parent,
            None => return path,
        }
    }
}
