//! Journal reader used for recovery

use std::fs;
use std::io;
use std::path::Path;

use crate::observability::{log_event_with_fields, Event};

use super::errors::{JournalError, JournalResult};
use super::record::{JournalEntry, MutationRecord};

/// Reads and verifies journal files
pub struct JournalReader;

impl JournalReader {
    /// Reads every framed entry, verifying checksums and sequence continuity
    ///
    /// A missing file is an empty journal. Blank lines are skipped.
    pub fn read_entries(path: &Path) -> JournalResult<Vec<JournalEntry>> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(JournalError::io(
                    format!("Failed to read {}", path.display()),
                    e,
                ))
            }
        };

        let mut entries: Vec<JournalEntry> = Vec::new();
        for (i, line) in content.lines().enumerate() {
            let line_no = i + 1;
            if line.trim().is_empty() {
                continue;
            }

            let entry: JournalEntry = serde_json::from_str(line)
                .map_err(|e| Self::corrupt(path, line_no, format!("unparseable record: {}", e)))?;

            if !entry.verify()? {
                return Err(Self::corrupt(path, line_no, "checksum mismatch"));
            }

            let expected = entries.last().map_or(1, |prev| prev.seq + 1);
            if entry.seq != expected {
                return Err(Self::corrupt(
                    path,
                    line_no,
                    format!("expected sequence {}, found {}", expected, entry.seq),
                ));
            }

            entries.push(entry);
        }

        Ok(entries)
    }

    /// Reads every record in sequence order
    pub fn read_all(path: &Path) -> JournalResult<Vec<MutationRecord>> {
        Ok(Self::read_entries(path)?
            .into_iter()
            .map(|e| e.record)
            .collect())
    }

    fn corrupt(path: &Path, line: usize, reason: impl Into<String>) -> JournalError {
        let err = JournalError::corruption(line, reason);
        log_event_with_fields(
            Event::JournalCorruption,
            &[
                ("line", &line.to_string()),
                ("path", &path.display().to_string()),
            ],
        );
        err
    }
}
