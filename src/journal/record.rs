//! Mutation records and their on-disk envelope

use serde::{Deserialize, Serialize};

use crate::expr::{RowId, Tuple};

use super::errors::{JournalError, JournalResult};

/// Kind of mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MutationOp {
    Insert,
    Update,
    Delete,
}

impl MutationOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            MutationOp::Insert => "insert",
            MutationOp::Update => "update",
            MutationOp::Delete => "delete",
        }
    }
}

/// One row-level change emitted by storage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MutationRecord {
    pub op: MutationOp,
    pub table: String,
    pub row_id: RowId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before: Option<Tuple>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after: Option<Tuple>,
}

impl MutationRecord {
    pub fn insert(table: impl Into<String>, row_id: RowId, after: Tuple) -> Self {
        Self {
            op: MutationOp::Insert,
            table: table.into(),
            row_id,
            before: None,
            after: Some(after),
        }
    }

    pub fn update(table: impl Into<String>, row_id: RowId, before: Tuple, after: Tuple) -> Self {
        Self {
            op: MutationOp::Update,
            table: table.into(),
            row_id,
            before: Some(before),
            after: Some(after),
        }
    }

    pub fn delete(table: impl Into<String>, row_id: RowId, before: Tuple) -> Self {
        Self {
            op: MutationOp::Delete,
            table: table.into(),
            row_id,
            before: Some(before),
            after: None,
        }
    }
}

/// Framed journal line: sequence number and CRC32 of the record JSON
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub seq: u64,
    pub checksum: u32,
    pub record: MutationRecord,
}

impl JournalEntry {
    /// Frames a record, computing its checksum
    pub fn seal(seq: u64, record: MutationRecord) -> JournalResult<Self> {
        let checksum = checksum_of(&record)?;
        Ok(Self {
            seq,
            checksum,
            record,
        })
    }

    /// Recomputes the checksum and compares it with the stored one
    pub fn verify(&self) -> JournalResult<bool> {
        Ok(checksum_of(&self.record)? == self.checksum)
    }

    /// Encodes as a single JSON line without the trailing newline
    pub fn to_line(&self) -> JournalResult<String> {
        serde_json::to_string(self).map_err(|e| JournalError::serialization(e.to_string()))
    }
}

fn checksum_of(record: &MutationRecord) -> JournalResult<u32> {
    let bytes =
        serde_json::to_vec(record).map_err(|e| JournalError::serialization(e.to_string()))?;
    Ok(crc32fast::hash(&bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> Tuple {
        Tuple::new().with("id", 8).with("name", "Quincy")
    }

    #[test]
    fn test_record_json_shape() {
        let record = MutationRecord::insert("users", 7, row());
        let json: serde_json::Value = serde_json::to_value(&record).unwrap();
        assert_eq!(json["op"], "insert");
        assert_eq!(json["table"], "users");
        assert_eq!(json["row_id"], 7);
        assert_eq!(json["after"]["name"], "Quincy");
        assert!(json.get("before").is_none());
    }

    #[test]
    fn test_seal_and_verify() {
        let entry = JournalEntry::seal(1, MutationRecord::delete("users", 7, row())).unwrap();
        assert!(entry.verify().unwrap());

        let mut tampered = entry.clone();
        tampered.record.row_id = 8;
        assert!(!tampered.verify().unwrap());
    }

    #[test]
    fn test_line_parses_back() {
        let entry = JournalEntry::seal(
            2,
            MutationRecord::update("users", 7, row(), row().with("name", "Q")),
        )
        .unwrap();
        let line = entry.to_line().unwrap();
        assert!(!line.contains('\n'));

        let parsed: JournalEntry = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed, entry);
        assert!(parsed.verify().unwrap());
    }
}
