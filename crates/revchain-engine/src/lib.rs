//! revchain engine - orchestration layer
//!
//! Ties the revision loader, the SQLite store and the replay engine together
//! behind two entry points: `apply_engine_command` for walks that change the
//! schema and `apply_engine_query` for read-only inspection.

pub mod commands;
