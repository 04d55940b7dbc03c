//! The migration chain
//!
//! A `Chain` is built once from the full set of records. Construction checks
//! integrity (unknown or duplicate revisions, cycles, one root per branch) and
//! linearizes the down_revision DAG into a single deterministic order: parents
//! before children, ties broken by authoring order. Every walk follows that
//! order, which keeps the single-row marker exact after each record.

pub mod build;
pub mod plan;
pub mod target;

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::errors::{ChainIntegrityError, LedgerError, Result};
use crate::model::MigrationRecord;

pub use plan::{Direction, MigrationPlan, PlannedRecord};
pub use target::Target;

/// Validated, linearized set of migration records
#[derive(Debug, Clone)]
pub struct Chain {
    /// Records in authoring order
    records: Vec<MigrationRecord>,
    index: HashMap<String, usize>,
    parents: Vec<Vec<usize>>,
    children: Vec<Vec<usize>>,
    /// Record indices in linear (topological) order
    linear: Vec<usize>,
    /// Position of each record in `linear`
    position: Vec<usize>,
}

impl Chain {
    /// Build and validate a chain
    ///
    /// Records are expected in authoring order (e.g. sorted by file name);
    /// that order breaks ties between independent branches.
    ///
    /// # Errors
    ///
    /// Returns a `ChainIntegrityError` for malformed or duplicate revision
    /// ids, unknown, repeated or self-referencing down revisions, cycles, and
    /// branches with more than one root.
    pub fn build(records: Vec<MigrationRecord>) -> std::result::Result<Self, ChainIntegrityError> {
        let mut index = HashMap::with_capacity(records.len());
        for (i, record) in records.iter().enumerate() {
            build::validate_revision_id(&record.revision)?;
            if index.insert(record.revision.clone(), i).is_some() {
                return Err(ChainIntegrityError::DuplicateRevision {
                    revision: record.revision.clone(),
                });
            }
        }

        let mut parents = vec![Vec::new(); records.len()];
        let mut children = vec![Vec::new(); records.len()];
        for (i, record) in records.iter().enumerate() {
            for down in &record.down_revisions {
                if down == &record.revision {
                    return Err(ChainIntegrityError::SelfReference {
                        revision: record.revision.clone(),
                    });
                }
                let parent = *index.get(down).ok_or_else(|| {
                    ChainIntegrityError::UnknownDownRevision {
                        revision: record.revision.clone(),
                        down_revision: down.clone(),
                    }
                })?;
                if parents[i].contains(&parent) {
                    return Err(ChainIntegrityError::DuplicateDownRevision {
                        revision: record.revision.clone(),
                        down_revision: down.clone(),
                    });
                }
                parents[i].push(parent);
                children[parent].push(i);
            }
        }

        let linear = build::topological_order(&parents, &children).map_err(|leftover| {
            ChainIntegrityError::CycleDetected {
                revisions: build::find_cycle(&parents, &leftover)
                    .into_iter()
                    .map(|i| records[i].revision.clone())
                    .collect(),
            }
        })?;

        let mut roots_by_branch: BTreeMap<Option<&str>, Vec<&str>> = BTreeMap::new();
        for record in records.iter().filter(|r| r.is_root()) {
            roots_by_branch
                .entry(record.branch_label.as_deref())
                .or_default()
                .push(&record.revision);
        }
        if let Some((branch, roots)) = roots_by_branch.iter().find(|(_, roots)| roots.len() > 1) {
            return Err(ChainIntegrityError::MultipleRoots {
                branch: branch.unwrap_or("<default>").to_string(),
                roots: roots.iter().map(|r| r.to_string()).collect(),
            });
        }

        let mut position = vec![0; records.len()];
        for (pos, &i) in linear.iter().enumerate() {
            position[i] = pos;
        }

        tracing::debug!(
            records = records.len(),
            heads = children.iter().filter(|c| c.is_empty()).count(),
            "chain built"
        );

        Ok(Self {
            records,
            index,
            parents,
            children,
            linear,
            position,
        })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Look up a record by exact revision id
    pub fn get(&self, revision: &str) -> Option<&MigrationRecord> {
        self.index.get(revision).map(|&i| &self.records[i])
    }

    /// Look up a record by exact revision id, failing if absent
    ///
    /// # Errors
    ///
    /// Returns `RevisionNotFound` if no record has this id.
    pub fn record(&self, revision: &str) -> Result<&MigrationRecord> {
        self.get(revision)
            .ok_or_else(|| LedgerError::RevisionNotFound {
                revision: revision.to_string(),
            })
    }

    /// Records in authoring order
    pub fn records(&self) -> &[MigrationRecord] {
        &self.records
    }

    /// Records in linear order, root first
    pub fn history(&self) -> impl DoubleEndedIterator<Item = &MigrationRecord> + '_ {
        self.linear.iter().map(move |&i| &self.records[i])
    }

    /// Position of a revision in the linear order
    pub fn position(&self, revision: &str) -> Option<usize> {
        self.index.get(revision).map(|&i| self.position[i])
    }

    /// Record at a position of the linear order
    pub fn at(&self, position: usize) -> Option<&MigrationRecord> {
        self.linear.get(position).map(|&i| &self.records[i])
    }

    pub fn roots(&self) -> Vec<&MigrationRecord> {
        self.history().filter(|r| r.is_root()).collect()
    }

    /// Records no other record names as a down revision, in linear order
    pub fn heads(&self) -> Vec<&MigrationRecord> {
        self.linear
            .iter()
            .filter(|&&i| self.children[i].is_empty())
            .map(|&i| &self.records[i])
            .collect()
    }

    /// Records naming `revision` as a down revision
    pub fn children_of(&self, revision: &str) -> Vec<&MigrationRecord> {
        match self.index.get(revision) {
            Some(&i) => self.children[i].iter().map(|&c| &self.records[c]).collect(),
            None => Vec::new(),
        }
    }

    /// All strict ancestors of `revision`, in linear order
    ///
    /// # Errors
    ///
    /// Returns `RevisionNotFound` for an unknown revision.
    pub fn ancestors(&self, revision: &str) -> Result<Vec<&MigrationRecord>> {
        let start = *self
            .index
            .get(revision)
            .ok_or_else(|| LedgerError::RevisionNotFound {
                revision: revision.to_string(),
            })?;

        let set = self.ancestor_set(start);
        let mut found: Vec<usize> = set.into_iter().collect();
        found.sort_by_key(|&i| self.position[i]);
        Ok(found.into_iter().map(|i| &self.records[i]).collect())
    }

    /// True when `ancestor` is a strict ancestor of `descendant`
    pub fn is_ancestor(&self, ancestor: &str, descendant: &str) -> bool {
        match (self.index.get(ancestor), self.index.get(descendant)) {
            (Some(&a), Some(&d)) => a != d && self.ancestor_set(d).contains(&a),
            _ => false,
        }
    }

    /// The only head of the chain
    ///
    /// # Errors
    ///
    /// Returns `EmptyChain` when there are no records and `MultipleHeads`
    /// when branches have not been merged.
    pub fn single_head(&self) -> Result<&MigrationRecord> {
        let heads = self.heads();
        match heads.as_slice() {
            [] => Err(LedgerError::EmptyChain),
            [head] => Ok(head),
            _ => Err(LedgerError::MultipleHeads {
                heads: heads.iter().map(|h| h.revision.clone()).collect(),
            }),
        }
    }

    /// Head of the branch carrying `label`
    ///
    /// The branch is every record descending from (or equal to) a record
    /// labelled `label`; its head must be unique.
    ///
    /// # Errors
    ///
    /// Returns `BranchNotFound` when no record carries the label and
    /// `MultipleHeads` when the branch has forked without merging.
    pub fn branch_head(&self, label: &str) -> Result<&MigrationRecord> {
        let labelled: Vec<usize> = (0..self.records.len())
            .filter(|&i| self.records[i].branch_label.as_deref() == Some(label))
            .collect();
        if labelled.is_empty() {
            return Err(LedgerError::BranchNotFound {
                label: label.to_string(),
            });
        }

        let heads: Vec<&MigrationRecord> = self
            .linear
            .iter()
            .filter(|&&h| self.children[h].is_empty())
            .filter(|&&h| {
                labelled.contains(&h) || {
                    let ancestors = self.ancestor_set(h);
                    labelled.iter().any(|l| ancestors.contains(l))
                }
            })
            .map(|&h| &self.records[h])
            .collect();

        match heads.as_slice() {
            [head] => Ok(head),
            _ => Err(LedgerError::MultipleHeads {
                heads: heads.iter().map(|h| h.revision.clone()).collect(),
            }),
        }
    }

    /// Resolve a full revision id or a unique prefix of one
    ///
    /// # Errors
    ///
    /// Returns `RevisionNotFound` when nothing matches and
    /// `AmbiguousRevision` when a prefix matches several records.
    pub fn resolve_prefix(&self, prefix: &str) -> Result<&MigrationRecord> {
        if let Some(record) = self.get(prefix) {
            return Ok(record);
        }

        let matches: Vec<&MigrationRecord> = self
            .history()
            .filter(|r| r.revision.starts_with(prefix))
            .collect();

        match matches.as_slice() {
            [] => Err(LedgerError::RevisionNotFound {
                revision: prefix.to_string(),
            }),
            [record] => Ok(record),
            _ => Err(LedgerError::AmbiguousRevision {
                prefix: prefix.to_string(),
                candidates: matches.iter().map(|r| r.revision.clone()).collect(),
            }),
        }
    }

    fn ancestor_set(&self, start: usize) -> HashSet<usize> {
        let mut seen = HashSet::new();
        let mut stack: Vec<usize> = self.parents[start].clone();
        while let Some(i) = stack.pop() {
            if seen.insert(i) {
                stack.extend(self.parents[i].iter().copied());
            }
        }
        seen
    }
}
