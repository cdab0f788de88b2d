//! Mutation journal for strata
//!
//! Storage emits one record per changed row to a journal sink before the
//! change is applied. The file sink is an append-only JSON-lines log that
//! recovery replays into a freshly declared schema.
//!
//! # Invariants
//!
//! - Records are appended in mutation order under a single writer lock
//! - Every line carries a sequence number and a CRC32 of its record
//! - Any checksum or sequence mismatch is corruption

mod errors;
mod reader;
mod record;
mod writer;

pub use errors::{JournalError, JournalErrorCode, JournalResult};
pub use reader::JournalReader;
pub use record::{JournalEntry, MutationOp, MutationRecord};
pub use writer::{FileJournal, JournalSink, MemoryJournal, NoopJournal};
