//! Database abstraction layer
//!
//! This module provides a driver-agnostic interface for opening per-request
//! connections and running the statements built in [`statement`].

pub mod statement;
pub mod traits;

#[cfg(feature = "mysql")]
pub mod mysql;

// Re-export the main traits
pub use statement::Statement;
pub use traits::{DatabaseConnection, DatabaseProvider, ExecutionSummary};
