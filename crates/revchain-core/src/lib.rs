//! revchain core - migration chain and replay engine
//!
//! This crate provides:
//! - Migration records and the schema operations they carry
//! - Chain construction with integrity checks and deterministic linearization
//! - Target resolution and path planning for upgrades and downgrades
//! - The `Ledger` replay engine over a pluggable `MigrationBackend`
//! - An in-memory schema model used for dry runs and reversibility checks
//!
//! Persistence lives in `revchain-store`.

pub mod backend;
pub mod chain;
pub mod errors;
pub mod ledger;
pub mod logging_facility;
pub mod model;
pub mod state;
pub mod verify;

// Used by the exported logging macros
pub use revchain_core_types;
pub use tracing;

// Re-export commonly used types
pub use backend::{InMemoryBackend, MigrationBackend, RecordApplication, RecordedChecksum};
pub use chain::{Chain, Direction, MigrationPlan, PlannedRecord, Target};
pub use errors::{
    ChainIntegrityError, ExError, ExErrorKind, LedgerError, MigrationError, Result, SchemaError,
};
pub use ledger::{Ledger, MigrationReport};
pub use model::{ColumnDef, ColumnType, MigrationRecord, SchemaOp};
pub use state::SchemaState;
pub use verify::{verify_reversibility, ReversibilityIssue};
