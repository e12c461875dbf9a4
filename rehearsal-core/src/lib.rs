//! Core library for Rehearsal.
//!
//! This crate provides the domain models and database operations for the
//! sales-conversation trainer, independent of any transport layer (HTTP, CLI).
//!
//! # Usage
//!
//! ```no_run
//! use rehearsal_core::db::Database;
//!
//! let db = Database::open_default()?;
//! db.migrate()?;
//!
//! let cases = db.list_cases()?;
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod db;
pub mod error;
pub mod models;

// Re-export commonly used types at crate root
pub use db::Database;
pub use error::StoreError;
