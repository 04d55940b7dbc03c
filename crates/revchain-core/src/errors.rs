use revchain_core_types::RunId;
use thiserror::Error;

/// Result type alias using LedgerError
pub type Result<T> = std::result::Result<T, LedgerError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Every error surfaced by revchain maps onto one of these kinds, and each
/// kind has a stable `ERR_*` code that tests, logs and the CLI rely on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExErrorKind {
    // Chain integrity
    InvalidRevisionId,
    DuplicateRevision,
    UnknownDownRevision,
    CycleDetected,
    MultipleRoots,

    // Target resolution
    NotFound,
    AmbiguousRevision,
    MultipleHeads,
    EmptyChain,
    InvalidTarget,
    TargetNotReachable,

    // Schema application
    AlreadyExists,
    MissingObject,
    InvalidColumn,
    Irreversible,
    ChecksumMismatch,

    // Integration/IO
    InvalidInput,
    Io,
    Serialization,
    Persistence,

    // Internal
    Internal,
}

impl ExErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::InvalidRevisionId => "ERR_INVALID_REVISION_ID",
            ExErrorKind::DuplicateRevision => "ERR_DUPLICATE_REVISION",
            ExErrorKind::UnknownDownRevision => "ERR_UNKNOWN_DOWN_REVISION",
            ExErrorKind::CycleDetected => "ERR_CYCLE_DETECTED",
            ExErrorKind::MultipleRoots => "ERR_MULTIPLE_ROOTS",
            ExErrorKind::NotFound => "ERR_NOT_FOUND",
            ExErrorKind::AmbiguousRevision => "ERR_AMBIGUOUS_REVISION",
            ExErrorKind::MultipleHeads => "ERR_MULTIPLE_HEADS",
            ExErrorKind::EmptyChain => "ERR_EMPTY_CHAIN",
            ExErrorKind::InvalidTarget => "ERR_INVALID_TARGET",
            ExErrorKind::TargetNotReachable => "ERR_TARGET_NOT_REACHABLE",
            ExErrorKind::AlreadyExists => "ERR_ALREADY_EXISTS",
            ExErrorKind::MissingObject => "ERR_MISSING_OBJECT",
            ExErrorKind::InvalidColumn => "ERR_INVALID_COLUMN",
            ExErrorKind::Irreversible => "ERR_IRREVERSIBLE",
            ExErrorKind::ChecksumMismatch => "ERR_CHECKSUM_MISMATCH",
            ExErrorKind::InvalidInput => "ERR_INVALID_INPUT",
            ExErrorKind::Io => "ERR_IO",
            ExErrorKind::Serialization => "ERR_SERIALIZATION",
            ExErrorKind::Persistence => "ERR_PERSISTENCE",
            ExErrorKind::Internal => "ERR_INTERNAL",
        }
    }

    /// True for kinds raised while building the chain, before any step runs
    pub fn is_chain_integrity(&self) -> bool {
        matches!(
            self,
            ExErrorKind::InvalidRevisionId
                | ExErrorKind::DuplicateRevision
                | ExErrorKind::UnknownDownRevision
                | ExErrorKind::CycleDetected
                | ExErrorKind::MultipleRoots
        )
    }
}

/// Canonical structured error type
///
/// Carries a kind for programmatic handling plus the context needed to read a
/// failure out of a log line: the operation, the revision involved and the
/// run it happened in.
#[derive(Debug, Clone)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    revision: Option<String>,
    run_id: Option<RunId>,
    message: String,
    source: Option<Box<ExError>>,
}

impl ExError {
    /// Create a new error with the specified kind
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            revision: None,
            run_id: None,
            message: String::new(),
            source: None,
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add revision context
    pub fn with_revision(mut self, revision: impl Into<String>) -> Self {
        self.revision = Some(revision.into());
        self
    }

    /// Add run correlation context
    pub fn with_run_id(mut self, run_id: RunId) -> Self {
        self.run_id = Some(run_id);
        self
    }

    /// Add custom message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Add source error
    pub fn with_source(mut self, source: ExError) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub fn kind(&self) -> ExErrorKind {
        self.kind
    }

    /// Get the stable error code
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    pub fn revision(&self) -> Option<&str> {
        self.revision.as_deref()
    }

    pub fn run_id(&self) -> Option<&RunId> {
        self.run_id.as_ref()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn source_error(&self) -> Option<&ExError> {
        self.source.as_deref()
    }
}

impl std::fmt::Display for ExError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(revision) = &self.revision {
            write!(f, " (revision: {})", revision)?;
        }
        if let Some(run_id) = &self.run_id {
            write!(f, " (run_id: {})", run_id)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

// ========== End Error Facility ==========

/// Structural problems in the set of records, found while building the chain
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChainIntegrityError {
    /// Revision id is empty, reserved, or contains forbidden characters
    #[error("Invalid revision id '{revision}': {reason}")]
    InvalidRevisionId { revision: String, reason: String },

    /// Two records share a revision id
    #[error("Duplicate revision id: {revision}")]
    DuplicateRevision { revision: String },

    /// A down_revision names a record that is not in the set
    #[error("Revision {revision} has unknown down_revision {down_revision}")]
    UnknownDownRevision {
        revision: String,
        down_revision: String,
    },

    /// A record names itself as its own predecessor
    #[error("Revision {revision} lists itself as a down_revision")]
    SelfReference { revision: String },

    /// A record lists the same predecessor more than once
    #[error("Revision {revision} lists down_revision {down_revision} more than once")]
    DuplicateDownRevision {
        revision: String,
        down_revision: String,
    },

    /// down_revision pointers form a cycle
    #[error("Cycle detected in down_revision graph: {}", revisions.join(" -> "))]
    CycleDetected { revisions: Vec<String> },

    /// More than one root record carries the same branch label
    #[error("Branch {branch} has multiple roots: {}", roots.join(", "))]
    MultipleRoots { branch: String, roots: Vec<String> },
}

/// Failure of a single schema operation against a schema
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("Table {table} already exists")]
    TableAlreadyExists { table: String },

    #[error("Table {table} does not exist")]
    TableNotFound { table: String },

    #[error("Table {table} must have at least one column")]
    EmptyTable { table: String },

    #[error("Column {table}.{column} already exists")]
    ColumnAlreadyExists { table: String, column: String },

    #[error("Column {table}.{column} does not exist")]
    ColumnNotFound { table: String, column: String },

    /// Column definition the target schema cannot accept
    #[error("Invalid column {table}.{column}: {reason}")]
    InvalidColumn {
        table: String,
        column: String,
        reason: String,
    },
}

/// A record could not be applied
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MigrationError {
    /// A step of the record failed; earlier steps of the same record are rolled back
    #[error("Migration {revision} failed at step {step}: {source}")]
    StepFailed {
        revision: String,
        step: usize,
        #[source]
        source: SchemaError,
    },

    /// The record is marked irreversible and cannot be downgraded
    #[error("Migration {revision} is irreversible and cannot be downgraded")]
    Irreversible { revision: String },

    /// The backend failed for a reason outside the schema model (driver, disk)
    #[error("Migration {revision} failed in backend: {message}")]
    Backend { revision: String, message: String },
}

impl MigrationError {
    /// Revision of the record that failed
    pub fn revision(&self) -> &str {
        match self {
            MigrationError::StepFailed { revision, .. }
            | MigrationError::Irreversible { revision }
            | MigrationError::Backend { revision, .. } => revision,
        }
    }

    /// Underlying schema error, if the failure came from a step
    pub fn schema_error(&self) -> Option<&SchemaError> {
        match self {
            MigrationError::StepFailed { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Top-level error for ledger operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error(transparent)]
    Chain(#[from] ChainIntegrityError),

    #[error(transparent)]
    Migration(#[from] MigrationError),

    #[error("Revision not found: {revision}")]
    RevisionNotFound { revision: String },

    #[error("Revision prefix '{prefix}' is ambiguous: {}", candidates.join(", "))]
    AmbiguousRevision {
        prefix: String,
        candidates: Vec<String>,
    },

    #[error("Chain has multiple heads: {}", heads.join(", "))]
    MultipleHeads { heads: Vec<String> },

    #[error("Chain is empty")]
    EmptyChain,

    #[error("No branch labelled '{label}'")]
    BranchNotFound { label: String },

    #[error("Invalid target '{target}': {reason}")]
    InvalidTarget { target: String, reason: String },

    #[error("Cannot {direction} from {} to {}: {reason}", display_marker(from), display_marker(to))]
    TargetNotReachable {
        direction: String,
        from: Option<String>,
        to: Option<String>,
        reason: String,
    },

    /// A record was edited after it had been applied
    #[error("Checksum mismatch for applied revision {revision}: recorded {recorded}, current {current}")]
    ChecksumMismatch {
        revision: String,
        recorded: String,
        current: String,
    },

    #[error("Invalid input: {reason}")]
    InvalidInput { reason: String },

    #[error("Serialization failed: {message}")]
    Serialization { message: String },

    #[error("Persistence failure in {op}: {message}")]
    Persistence { op: String, message: String },

    #[error("IO failure in {op}: {message}")]
    Io { op: String, message: String },
}

fn display_marker(revision: &Option<String>) -> &str {
    revision.as_deref().unwrap_or("<base>")
}

impl LedgerError {
    /// True when the error was raised during chain construction
    pub fn is_chain_integrity(&self) -> bool {
        matches!(self, LedgerError::Chain(_))
    }

    /// True when the error was raised while applying a record
    pub fn is_migration(&self) -> bool {
        matches!(self, LedgerError::Migration(_))
    }
}

impl From<serde_json::Error> for LedgerError {
    fn from(err: serde_json::Error) -> Self {
        LedgerError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<SchemaError> for ExError {
    fn from(err: SchemaError) -> Self {
        let kind = match &err {
            SchemaError::TableAlreadyExists { .. } | SchemaError::ColumnAlreadyExists { .. } => {
                ExErrorKind::AlreadyExists
            }
            SchemaError::TableNotFound { .. } | SchemaError::ColumnNotFound { .. } => {
                ExErrorKind::MissingObject
            }
            SchemaError::InvalidColumn { .. } | SchemaError::EmptyTable { .. } => {
                ExErrorKind::InvalidColumn
            }
        };
        ExError::new(kind).with_message(err.to_string())
    }
}

impl From<LedgerError> for ExError {
    fn from(err: LedgerError) -> Self {
        let message = err.to_string();
        match err {
            LedgerError::Chain(chain) => {
                let (kind, revision) = match chain {
                    ChainIntegrityError::InvalidRevisionId { revision, .. } => {
                        (ExErrorKind::InvalidRevisionId, Some(revision))
                    }
                    ChainIntegrityError::DuplicateRevision { revision } => {
                        (ExErrorKind::DuplicateRevision, Some(revision))
                    }
                    ChainIntegrityError::UnknownDownRevision { revision, .. }
                    | ChainIntegrityError::SelfReference { revision }
                    | ChainIntegrityError::DuplicateDownRevision { revision, .. } => {
                        (ExErrorKind::UnknownDownRevision, Some(revision))
                    }
                    ChainIntegrityError::CycleDetected { revisions } => {
                        (ExErrorKind::CycleDetected, revisions.into_iter().next())
                    }
                    ChainIntegrityError::MultipleRoots { .. } => (ExErrorKind::MultipleRoots, None),
                };
                let ex = ExError::new(kind)
                    .with_op("build_chain")
                    .with_message(message);
                match revision {
                    Some(r) => ex.with_revision(r),
                    None => ex,
                }
            }

            LedgerError::Migration(migration) => {
                let revision = migration.revision().to_string();
                match migration {
                    MigrationError::StepFailed { source, .. } => {
                        let inner: ExError = source.into();
                        ExError::new(inner.kind())
                            .with_op("apply_record")
                            .with_revision(revision)
                            .with_message(message)
                            .with_source(inner)
                    }
                    MigrationError::Irreversible { .. } => ExError::new(ExErrorKind::Irreversible)
                        .with_op("downgrade")
                        .with_revision(revision)
                        .with_message(message),
                    MigrationError::Backend { .. } => ExError::new(ExErrorKind::Persistence)
                        .with_op("apply_record")
                        .with_revision(revision)
                        .with_message(message),
                }
            }

            LedgerError::RevisionNotFound { revision } => ExError::new(ExErrorKind::NotFound)
                .with_revision(revision)
                .with_message(message),

            LedgerError::AmbiguousRevision { .. } => {
                ExError::new(ExErrorKind::AmbiguousRevision).with_message(message)
            }

            LedgerError::MultipleHeads { .. } => {
                ExError::new(ExErrorKind::MultipleHeads).with_message(message)
            }

            LedgerError::EmptyChain => ExError::new(ExErrorKind::EmptyChain).with_message(message),

            LedgerError::BranchNotFound { .. } => {
                ExError::new(ExErrorKind::NotFound).with_message(message)
            }

            LedgerError::InvalidTarget { .. } => ExError::new(ExErrorKind::InvalidTarget)
                .with_op("resolve_target")
                .with_message(message),

            LedgerError::TargetNotReachable { direction, .. } => {
                ExError::new(ExErrorKind::TargetNotReachable)
                    .with_op(direction)
                    .with_message(message)
            }

            LedgerError::ChecksumMismatch { revision, .. } => {
                ExError::new(ExErrorKind::ChecksumMismatch)
                    .with_op("verify_checksums")
                    .with_revision(revision)
                    .with_message(message)
            }

            LedgerError::InvalidInput { .. } => {
                ExError::new(ExErrorKind::InvalidInput).with_message(message)
            }

            LedgerError::Serialization { .. } => {
                ExError::new(ExErrorKind::Serialization).with_message(message)
            }

            LedgerError::Persistence { op, .. } => ExError::new(ExErrorKind::Persistence)
                .with_op(op)
                .with_message(message),

            LedgerError::Io { op, .. } => ExError::new(ExErrorKind::Io)
                .with_op(op)
                .with_message(message),
        }
    }
}
