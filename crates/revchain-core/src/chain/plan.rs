use serde::Serialize;

use super::Chain;
use crate::errors::{LedgerError, MigrationError, Result};

/// Direction of a walk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Upgrade,
    Downgrade,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Upgrade => "upgrade",
            Direction::Downgrade => "downgrade",
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One record of a plan and where the marker lands once it is applied
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedRecord {
    pub revision: String,
    pub marker_after: Option<String>,
    pub step_count: usize,
}

/// Ordered records a walk will apply
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationPlan {
    pub direction: Direction,
    pub from: Option<String>,
    pub to: Option<String>,
    pub records: Vec<PlannedRecord>,
}

impl MigrationPlan {
    /// True when the walk would apply nothing
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }
}

impl Chain {
    /// Plan a walk from `current` to the resolved `target`
    ///
    /// The applied set of an environment is the prefix of the linear order
    /// ending at `current`. An upgrade applies the records after `current` up
    /// to `target`; a downgrade undoes the records after `target` up to
    /// `current`, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RevisionNotFound` when `current` or `target` is not in the
    /// chain, `TargetNotReachable` when the target lies in the other
    /// direction, and `MigrationError::Irreversible` when a downgrade would
    /// cross an irreversible record.
    pub fn plan(
        &self,
        direction: Direction,
        current: Option<&str>,
        target: Option<&str>,
    ) -> Result<MigrationPlan> {
        // Positions counted from base: 0 = nothing applied, n = first n records
        let from = self.applied_len(current)?;
        let to = self.applied_len(target)?;

        let not_reachable = |reason: &str| LedgerError::TargetNotReachable {
            direction: direction.to_string(),
            from: current.map(str::to_string),
            to: target.map(str::to_string),
            reason: reason.to_string(),
        };

        let records = match direction {
            Direction::Upgrade => {
                if to < from {
                    return Err(not_reachable(
                        "target is behind the current revision; downgrade instead",
                    ));
                }
                (from..to)
                    .filter_map(|pos| self.at(pos))
                    .map(|record| PlannedRecord {
                        revision: record.revision.clone(),
                        marker_after: Some(record.revision.clone()),
                        step_count: record.upgrade_steps.len(),
                    })
                    .collect::<Vec<_>>()
            }
            Direction::Downgrade => {
                if to > from {
                    return Err(not_reachable(
                        "target is ahead of the current revision; upgrade instead",
                    ));
                }
                let mut planned = Vec::with_capacity(from - to);
                for pos in (to..from).rev() {
                    let Some(record) = self.at(pos) else {
                        continue;
                    };
                    if record.irreversible {
                        return Err(MigrationError::Irreversible {
                            revision: record.revision.clone(),
                        }
                        .into());
                    }
                    planned.push(PlannedRecord {
                        revision: record.revision.clone(),
                        marker_after: pos
                            .checked_sub(1)
                            .and_then(|p| self.at(p))
                            .map(|r| r.revision.clone()),
                        step_count: record.downgrade_steps.len(),
                    });
                }
                planned
            }
        };

        Ok(MigrationPlan {
            direction,
            from: current.map(str::to_string),
            to: target.map(str::to_string),
            records,
        })
    }

    fn applied_len(&self, revision: Option<&str>) -> Result<usize> {
        match revision {
            None => Ok(0),
            Some(rev) => self
                .position(rev)
                .map(|p| p + 1)
                .ok_or_else(|| LedgerError::RevisionNotFound {
                    revision: rev.to_string(),
                }),
        }
    }
}
