//! Error handling for revchain-store
//!
//! Store failures surface as `LedgerError` so the replay engine can propagate
//! them unchanged; these helpers attach the store operation that failed.

use revchain_core::errors::{LedgerError, MigrationError};

/// Result type alias using LedgerError
pub type Result<T> = std::result::Result<T, LedgerError>;

/// Create a persistence error from rusqlite::Error
pub fn from_rusqlite(op: &str, err: rusqlite::Error) -> LedgerError {
    LedgerError::Persistence {
        op: op.to_string(),
        message: err.to_string(),
    }
}

/// A step passed the schema checks but the database still refused it
pub fn step_rejected(revision: &str, step: usize, err: rusqlite::Error) -> LedgerError {
    MigrationError::Backend {
        revision: revision.to_string(),
        message: format!("step {}: {}", step, err),
    }
    .into()
}

/// Create a revision file validation error
pub fn revision_file_invalid(origin: &str, reason: &str) -> LedgerError {
    LedgerError::InvalidInput {
        reason: format!("{}: {}", origin, reason),
    }
}

/// Create an IO error
pub fn io_error(op: &str, err: std::io::Error) -> LedgerError {
    LedgerError::Io {
        op: op.to_string(),
        message: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use revchain_core::errors::{ExError, ExErrorKind};

    #[test]
    fn test_step_rejected_is_migration_error() {
        let err = step_rejected("b2", 1, rusqlite::Error::InvalidQuery);

        assert!(err.is_migration());
        let ex: ExError = err.into();
        assert_eq!(ex.kind(), ExErrorKind::Persistence);
        assert_eq!(ex.revision(), Some("b2"));
        assert!(ex.message().contains("step 1"));
    }

    #[test]
    fn test_from_rusqlite_keeps_op() {
        let ex: ExError = from_rusqlite("read_marker", rusqlite::Error::InvalidQuery).into();
        assert_eq!(ex.code(), "ERR_PERSISTENCE");
        assert_eq!(ex.op(), Some("read_marker"));
    }
}
