//! Core types shared across revchain crates
//!
//! - **Correlation**: `RunId`, one per upgrade/downgrade walk
//! - **Schema constants**: canonical structured-logging field keys and event names

pub mod correlation;
pub mod schema;

pub use correlation::RunId;
