use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::op::SchemaOp;
use crate::errors::Result;

/// One authored entry of the migration chain
///
/// Records are immutable once applied: a schema change is expressed by a new
/// record appended after the current head, never by editing an old one. The
/// checksum makes such edits detectable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MigrationRecord {
    /// Unique revision id
    pub revision: String,

    /// Predecessor revision(s); empty for a root, several for a merge point
    #[serde(
        default,
        rename = "down_revision",
        deserialize_with = "deserialize_down_revisions",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub down_revisions: Vec<String>,

    /// Optional label naming the branch this record starts or belongs to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch_label: Option<String>,

    /// Human description of the change
    #[serde(default)]
    pub message: String,

    /// Refuse downgrades through this record
    #[serde(default)]
    pub irreversible: bool,

    #[serde(default, rename = "upgrade")]
    pub upgrade_steps: Vec<SchemaOp>,

    #[serde(default, rename = "downgrade")]
    pub downgrade_steps: Vec<SchemaOp>,
}

impl MigrationRecord {
    /// Create a root no-op record
    pub fn new(revision: impl Into<String>) -> Self {
        Self {
            revision: revision.into(),
            down_revisions: Vec::new(),
            branch_label: None,
            message: String::new(),
            irreversible: false,
            upgrade_steps: Vec::new(),
            downgrade_steps: Vec::new(),
        }
    }

    pub fn with_down_revision(mut self, down_revision: impl Into<String>) -> Self {
        self.down_revisions.push(down_revision.into());
        self
    }

    pub fn with_branch_label(mut self, label: impl Into<String>) -> Self {
        self.branch_label = Some(label.into());
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn with_upgrade(mut self, op: SchemaOp) -> Self {
        self.upgrade_steps.push(op);
        self
    }

    pub fn with_downgrade(mut self, op: SchemaOp) -> Self {
        self.downgrade_steps.push(op);
        self
    }

    pub fn irreversible(mut self) -> Self {
        self.irreversible = true;
        self
    }

    pub fn is_root(&self) -> bool {
        self.down_revisions.is_empty()
    }

    pub fn is_merge(&self) -> bool {
        self.down_revisions.len() > 1
    }

    /// A no-op record marks a point in history without touching the schema
    pub fn is_noop(&self) -> bool {
        self.upgrade_steps.is_empty() && self.downgrade_steps.is_empty()
    }

    /// SHA-256 of the canonical JSON form of the record
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::Serialization` if the record cannot be serialized.
    pub fn checksum(&self) -> Result<String> {
        let canonical = serde_json::to_string(self)?;
        let mut hasher = Sha256::new();
        hasher.update(canonical.as_bytes());
        Ok(hex::encode(hasher.finalize()))
    }
}

/// Accept `down_revision` as a string, a list of strings, or null
fn deserialize_down_revisions<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::{self, Visitor};
    use std::fmt;

    struct DownRevisionVisitor;

    impl<'de> Visitor<'de> for DownRevisionVisitor {
        type Value = Vec<String>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a revision id, a list of revision ids, or null")
        }

        fn visit_str<E>(self, value: &str) -> std::result::Result<Vec<String>, E>
        where
            E: de::Error,
        {
            Ok(vec![value.to_string()])
        }

        fn visit_unit<E>(self) -> std::result::Result<Vec<String>, E>
        where
            E: de::Error,
        {
            Ok(Vec::new())
        }

        fn visit_none<E>(self) -> std::result::Result<Vec<String>, E>
        where
            E: de::Error,
        {
            Ok(Vec::new())
        }

        fn visit_seq<A>(self, mut seq: A) -> std::result::Result<Vec<String>, A::Error>
        where
            A: de::SeqAccess<'de>,
        {
            let mut revisions = Vec::new();
            while let Some(revision) = seq.next_element::<String>()? {
                revisions.push(revision);
            }
            Ok(revisions)
        }
    }

    deserializer.deserialize_any(DownRevisionVisitor)
}
