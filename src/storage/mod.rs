//! Table storage subsystem for strata
//!
//! Tables are append-only slot vectors; each table owns zero or more
//! secondary indexes kept consistent by every mutation.
//!
//! # Design Principles
//!
//! - Append-only slots, tombstoned on delete, never reused
//! - Write-ahead: the journal record is appended before the change is applied
//! - Indexes are derived state, rebuilt from slots on demand
//!
//! # Invariants
//!
//! - Row ids are slot offsets and never dangle
//! - Every live tuple has exactly one entry in each index of its table
//! - A rejected mutation leaves tables and indexes untouched

mod database;
mod errors;
mod table;
mod traits;

pub use database::Database;
pub use errors::{StorageError, StorageErrorCode, StorageResult};
pub use table::Table;
pub use traits::{IndexCatalog, IndexDef, IndexEntries, Storage, TupleIter};
