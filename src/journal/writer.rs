//! Journal sinks
//!
//! Storage hands every mutation record to a sink before applying it.
//! Appends are serialized through a mutex; the file sink writes one framed
//! JSON line per record.

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::observability::{log_event_with_fields, Event};

use super::errors::{JournalError, JournalResult};
use super::reader::JournalReader;
use super::record::{JournalEntry, MutationRecord};

/// Destination for mutation records
pub trait JournalSink: fmt::Debug + Send + Sync {
    /// Append a record. The record is durable once `flush` returns.
    fn append(&self, record: &MutationRecord) -> JournalResult<()>;

    /// Flush buffered records to durable storage
    fn flush(&self) -> JournalResult<()>;
}

/// Sink that discards records
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopJournal;

impl JournalSink for NoopJournal {
    fn append(&self, _record: &MutationRecord) -> JournalResult<()> {
        Ok(())
    }

    fn flush(&self) -> JournalResult<()> {
        Ok(())
    }
}

/// In-memory sink for testing
///
/// Clones share the same record buffer, so a test can keep a handle while
/// storage owns another.
#[derive(Debug, Default, Clone)]
pub struct MemoryJournal {
    records: Arc<Mutex<Vec<MutationRecord>>>,
}

impl MemoryJournal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all records appended so far
    pub fn records(&self) -> Vec<MutationRecord> {
        self.records
            .lock()
            .map(|records| records.clone())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.records.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl JournalSink for MemoryJournal {
    fn append(&self, record: &MutationRecord) -> JournalResult<()> {
        let mut records = self
            .records
            .lock()
            .map_err(|_| JournalError::lock_poisoned())?;
        records.push(record.clone());
        Ok(())
    }

    fn flush(&self) -> JournalResult<()> {
        Ok(())
    }
}

struct FileState {
    writer: BufWriter<File>,
    next_seq: u64,
}

/// Append-only JSON-lines journal file
///
/// - One framed record per line
/// - Sequence numbers continue from the existing file
/// - With `sync_each`, every append is fsynced before returning
pub struct FileJournal {
    path: PathBuf,
    sync_each: bool,
    state: Mutex<FileState>,
}

impl FileJournal {
    /// Open or create a journal file
    ///
    /// Existing contents are verified so new records continue the sequence.
    pub fn open(path: impl AsRef<Path>, sync_each: bool) -> JournalResult<Self> {
        let path = path.as_ref().to_path_buf();
        let existing = JournalReader::read_entries(&path)?;
        let next_seq = existing.last().map_or(1, |e| e.seq + 1);

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| JournalError::io(format!("Failed to open {}", path.display()), e))?;

        Ok(Self {
            path,
            sync_each,
            state: Mutex::new(FileState {
                writer: BufWriter::new(file),
                next_seq,
            }),
        })
    }

    /// Get the journal path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sequence number the next append will receive
    pub fn next_seq(&self) -> JournalResult<u64> {
        let state = self.state.lock().map_err(|_| JournalError::lock_poisoned())?;
        Ok(state.next_seq)
    }
}

impl fmt::Debug for FileJournal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileJournal")
            .field("path", &self.path)
            .field("sync_each", &self.sync_each)
            .finish()
    }
}

impl JournalSink for FileJournal {
    fn append(&self, record: &MutationRecord) -> JournalResult<()> {
        let mut state = self.state.lock().map_err(|_| JournalError::lock_poisoned())?;
        let seq = state.next_seq;
        let line = JournalEntry::seal(seq, record.clone())?.to_line()?;

        writeln!(state.writer, "{}", line)
            .and_then(|_| state.writer.flush())
            .map_err(|e| JournalError::io("Failed to append journal record", e))?;
        if self.sync_each {
            state
                .writer
                .get_ref()
                .sync_all()
                .map_err(|e| JournalError::io("Failed to fsync journal", e))?;
        }
        state.next_seq += 1;

        log_event_with_fields(
            Event::JournalAppend,
            &[
                ("op", record.op.as_str()),
                ("seq", &seq.to_string()),
                ("table", &record.table),
            ],
        );
        Ok(())
    }

    fn flush(&self) -> JournalResult<()> {
        let mut state = self.state.lock().map_err(|_| JournalError::lock_poisoned())?;
        state
            .writer
            .flush()
            .map_err(|e| JournalError::io("Failed to flush journal", e))?;
        state
            .writer
            .get_ref()
            .sync_all()
            .map_err(|e| JournalError::io("Failed to fsync journal", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::Tuple;
    use tempfile::tempdir;

    fn record(row_id: u64) -> MutationRecord {
        MutationRecord::insert("users", row_id, Tuple::new().with("id", row_id as i64))
    }

    #[test]
    fn test_memory_journal_shares_records() {
        let journal = MemoryJournal::new();
        let handle = journal.clone();
        journal.append(&record(0)).unwrap();
        journal.append(&record(1)).unwrap();

        assert_eq!(handle.len(), 2);
        assert_eq!(handle.records()[1].row_id, 1);
    }

    #[test]
    fn test_file_journal_appends_lines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("journal.log");

        let journal = FileJournal::open(&path, false).unwrap();
        journal.append(&record(0)).unwrap();
        journal.append(&record(1)).unwrap();
        journal.flush().unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 2);
        assert_eq!(journal.next_seq().unwrap(), 3);
    }

    #[test]
    fn test_reopen_continues_sequence() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("journal.log");

        {
            let journal = FileJournal::open(&path, true).unwrap();
            journal.append(&record(0)).unwrap();
        }

        let journal = FileJournal::open(&path, true).unwrap();
        assert_eq!(journal.next_seq().unwrap(), 2);
        journal.append(&record(1)).unwrap();

        let entries = JournalReader::read_entries(&path).unwrap();
        let seqs: Vec<u64> = entries.iter().map(|e| e.seq).collect();
        assert_eq!(seqs, vec![1, 2]);
    }
}
