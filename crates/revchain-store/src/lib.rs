//! revchain store - SQLite persistence for the migration ledger
//!
//! Provides:
//! - Connection management
//! - The `revchain_version` marker and `revchain_history` tables
//! - `SqliteBackend`, applying one record per transaction
//! - Schema introspection and DDL rendering
//! - The YAML revision file loader

pub mod backend;
pub mod bookkeeping;
pub mod db;
pub mod ddl;
pub mod errors;
pub mod introspect;
pub mod loader;

// Re-export key types
pub use backend::SqliteBackend;
pub use errors::Result;
pub use loader::load_revisions_dir;
