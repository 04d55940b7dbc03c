use std::str::FromStr;

use super::Chain;
use crate::errors::{LedgerError, Result};

/// Where a walk should end
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// The single head of the chain
    Head,
    /// Before the first record: nothing applied
    Base,
    /// Head of the branch carrying a label (`<label>@head`)
    BranchHead(String),
    /// Full revision id or unique prefix
    Revision(String),
    /// Steps along the linear order from the current revision (`+N` / `-N`)
    Relative(i64),
}

impl FromStr for Target {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let invalid = |reason: &str| LedgerError::InvalidTarget {
            target: s.to_string(),
            reason: reason.to_string(),
        };

        if s.is_empty() {
            return Err(invalid("target must not be empty"));
        }
        match s {
            "head" => return Ok(Target::Head),
            "base" => return Ok(Target::Base),
            "heads" => return Err(invalid("only a single head can be targeted")),
            _ => {}
        }

        if let Some(label) = s.strip_suffix("@head") {
            if label.is_empty() {
                return Err(invalid("branch label missing before '@head'"));
            }
            return Ok(Target::BranchHead(label.to_string()));
        }
        if s.contains('@') {
            return Err(invalid("only '<label>@head' is supported"));
        }

        if s.starts_with('+') || s.starts_with('-') {
            let steps: i64 = s
                .parse()
                .map_err(|_| invalid("relative target must be +N or -N"))?;
            if steps == 0 {
                return Err(invalid("relative target must move at least one step"));
            }
            return Ok(Target::Relative(steps));
        }

        Ok(Target::Revision(s.to_string()))
    }
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Target::Head => f.write_str("head"),
            Target::Base => f.write_str("base"),
            Target::BranchHead(label) => write!(f, "{}@head", label),
            Target::Revision(rev) => f.write_str(rev),
            Target::Relative(steps) => write!(f, "{:+}", steps),
        }
    }
}

impl Chain {
    /// Resolve a target to a revision id (`None` means base)
    ///
    /// `current` is only consulted for relative targets.
    ///
    /// # Errors
    ///
    /// Returns the lookup error for head/branch/revision targets and
    /// `InvalidTarget` when a relative target steps outside the chain.
    pub fn resolve(&self, target: &Target, current: Option<&str>) -> Result<Option<String>> {
        match target {
            Target::Head => Ok(Some(self.single_head()?.revision.clone())),
            Target::Base => Ok(None),
            Target::BranchHead(label) => Ok(Some(self.branch_head(label)?.revision.clone())),
            Target::Revision(prefix) => Ok(Some(self.resolve_prefix(prefix)?.revision.clone())),
            Target::Relative(steps) => {
                // Position counted from base: 0 = nothing applied
                let from = match current {
                    Some(rev) => self.record(rev).map(|_| self.position(rev))?,
                    None => None,
                }
                .map_or(0, |p| p as i64 + 1);

                let to = match from.checked_add(*steps) {
                    Some(to) if (0..=self.len() as i64).contains(&to) => to,
                    _ => {
                        return Err(LedgerError::InvalidTarget {
                            target: target.to_string(),
                            reason: format!(
                                "relative move leaves the chain ({} records, currently at {})",
                                self.len(),
                                from
                            ),
                        })
                    }
                };
                Ok(match to {
                    0 => None,
                    n => self.at(n as usize - 1).map(|r| r.revision.clone()),
                })
            }
        }
    }
}
